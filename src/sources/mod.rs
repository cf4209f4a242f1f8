pub mod ytdlp;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::{fmt, time::Duration};

use crate::error::ResolveError;

pub use ytdlp::YtDlpResolver;

/// Convierte la consulta de un usuario en un track reproducible
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resuelve una URL o término de búsqueda. Nunca reintenta.
    async fn resolve(&self, query: &str, requested_by: Requester) -> Result<Track, ResolveError>;
}

/// Quién pidió un track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
}

impl Requester {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Handle opaco del stream de audio (URL directa entregada por el resolver)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamHandle(String);

impl StreamHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Track resuelto, listo para la cola. Inmutable una vez creado.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    query: String,
    title: String,
    url: String,
    duration: Option<Duration>,
    stream: StreamHandle,
    requested_by: Requester,
    added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(
        query: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        stream: StreamHandle,
        requested_by: Requester,
    ) -> Self {
        Self {
            query: query.into(),
            title: title.into(),
            url: url.into(),
            duration: None,
            stream,
            requested_by,
            added_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    // Getters
    pub fn query(&self) -> &str {
        &self.query
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
    pub fn stream(&self) -> &StreamHandle {
        &self.stream
    }
    pub fn requested_by(&self) -> &Requester {
        &self.requested_by
    }
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }
}
