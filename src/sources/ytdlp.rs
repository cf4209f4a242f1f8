use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{MediaResolver, Requester, StreamHandle, Track};
use crate::{config::Config, error::ResolveError};

const UNKNOWN_TITLE: &str = "Unknown title";

/// Resolver que usa el binario de yt-dlp sin descargar el archivo
pub struct YtDlpResolver {
    binary: String,
    default_search: String,
    // Limitar procesos concurrentes de yt-dlp
    rate_limiter: Arc<Semaphore>,
}

/// Información extraída de `yt-dlp -J`
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    url: Option<String>,
    entries: Option<Vec<YtDlpInfo>>,
}

impl YtDlpResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.ytdlp_path.clone(),
            default_search: config.default_search.clone(),
            rate_limiter: Arc::new(Semaphore::new(config.max_concurrent_resolves)),
        }
    }

    fn args<'a>(&'a self, query: &'a str) -> [&'a str; 10] {
        [
            "-J",
            "--no-playlist",
            "-f",
            "bestaudio/best",
            "--default-search",
            self.default_search.as_str(),
            "--quiet",
            "--no-warnings",
            "--",
            query,
        ]
    }

    async fn run(&self, query: &str) -> Result<Vec<u8>, ResolveError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolveError::new(query, e.to_string()))?;

        debug!("📊 Ejecutando {} para: {}", self.binary, query);

        let output = Command::new(&self.binary)
            .args(self.args(query))
            .output()
            .await
            .map_err(|e| ResolveError::new(query, format!("Error al ejecutar yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp falló para {}: {}", query, stderr.trim());
            return Err(ResolveError::new(query, stderr.trim().to_string()));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requested_by: Requester) -> Result<Track, ResolveError> {
        info!("🔍 Resolviendo: {}", query);
        let stdout = self.run(query).await?;
        let track = parse_track(query, &stdout, requested_by)?;
        info!("✅ Resuelto '{}': {} ({})", track.query(), track.title(), track.url());
        Ok(track)
    }
}

/// Convierte la salida JSON de yt-dlp en un [`Track`].
///
/// Si la respuesta es una búsqueda o playlist se toma la primera entrada.
fn parse_track(query: &str, json: &[u8], requested_by: Requester) -> Result<Track, ResolveError> {
    let info: YtDlpInfo = serde_json::from_slice(json)
        .map_err(|e| ResolveError::new(query, format!("Respuesta de yt-dlp inválida: {}", e)))?;

    let info = match info.entries {
        Some(entries) => entries
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::new(query, "No se encontraron resultados"))?,
        None => info,
    };

    let stream = info
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ResolveError::new(query, "yt-dlp no devolvió URL de stream"))?;

    let mut track = Track::new(
        query,
        info.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        info.webpage_url.unwrap_or_else(|| query.to_string()),
        StreamHandle::new(stream),
        requested_by,
    );

    // 0 o ausente significa duración desconocida (streams en vivo)
    if let Some(seconds) = info.duration.filter(|d| d.is_finite() && *d > 0.0) {
        track = track.with_duration(Duration::from_secs_f64(seconds));
    }

    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serenity::model::id::UserId;

    fn requester() -> Requester {
        Requester::new(UserId::new(7), "ana")
    }

    #[test]
    fn test_parse_single_video() {
        let json = br#"{
            "title": "Never Gonna Give You Up",
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "duration": 212.0,
            "url": "https://rr1.googlevideo.com/videoplayback?id=1"
        }"#;

        let track = parse_track("https://youtu.be/dQw4w9WgXcQ", json, requester()).unwrap();

        assert_eq!(track.title(), "Never Gonna Give You Up");
        assert_eq!(track.url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(track.query(), "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(track.duration(), Some(Duration::from_secs(212)));
        assert_eq!(
            track.stream().as_str(),
            "https://rr1.googlevideo.com/videoplayback?id=1"
        );
        assert_eq!(track.requested_by().name, "ana");
    }

    #[test]
    fn test_search_takes_first_entry() {
        let json = br#"{
            "title": "lofi beats",
            "entries": [
                {"title": "first", "webpage_url": "https://a", "url": "https://stream/a"},
                {"title": "second", "webpage_url": "https://b", "url": "https://stream/b"}
            ]
        }"#;

        let track = parse_track("lofi beats", json, requester()).unwrap();
        assert_eq!(track.title(), "first");
        assert_eq!(track.stream().as_str(), "https://stream/a");
    }

    #[test]
    fn test_missing_metadata_uses_defaults() {
        let json = br#"{"url": "https://stream/x", "duration": 0}"#;

        let track = parse_track("some query", json, requester()).unwrap();
        assert_eq!(track.title(), UNKNOWN_TITLE);
        assert_eq!(track.url(), "some query");
        assert_eq!(track.duration(), None);
    }

    #[test]
    fn test_empty_search_is_an_error() {
        let err = parse_track("nada", br#"{"entries": []}"#, requester()).unwrap_err();
        assert_eq!(err.query, "nada");
        assert_eq!(err.reason, "No se encontraron resultados");
    }

    #[test]
    fn test_missing_stream_url_is_an_error() {
        let err = parse_track("q", br#"{"title": "sin url"}"#, requester()).unwrap_err();
        assert!(err.reason.contains("URL de stream"));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(parse_track("q", b"not json", requester()).is_err());
    }
}
