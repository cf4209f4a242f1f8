use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Cola
    pub max_queue_size: usize,
    pub queue_page_size: usize,

    // Resolución
    pub ytdlp_path: String,
    pub default_search: String,
    pub max_concurrent_resolves: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            // Discord
            discord_token: value("DISCORD_TOKEN").context("DISCORD_TOKEN no está definido")?,
            guild_id: value("GUILD_ID").and_then(|s| s.trim().parse().ok()),

            // Cola
            max_queue_size: parse_or(value("MAX_QUEUE_SIZE"), defaults.max_queue_size)
                .context("MAX_QUEUE_SIZE inválido")?,
            queue_page_size: parse_or(value("QUEUE_PAGE_SIZE"), defaults.queue_page_size)
                .context("QUEUE_PAGE_SIZE inválido")?,

            // Resolución
            ytdlp_path: value("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            default_search: value("DEFAULT_SEARCH").unwrap_or(defaults.default_search),
            max_concurrent_resolves: parse_or(
                value("MAX_CONCURRENT_RESOLVES"),
                defaults.max_concurrent_resolves,
            )
            .context("MAX_CONCURRENT_RESOLVES inválido")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// Limits must be positive and the yt-dlp settings non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token must not be empty");
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.queue_page_size == 0 {
            anyhow::bail!("Queue page size must be greater than 0");
        }

        if self.max_concurrent_resolves == 0 {
            anyhow::bail!("Max concurrent resolves must be greater than 0");
        }

        if self.ytdlp_path.trim().is_empty() {
            anyhow::bail!("yt-dlp path must not be empty");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The Discord token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Queue: {} max, {} per page\n  \
            Resolver: {} ({}, {} concurrent)",
            self.guild_id
                .map_or("global".to_string(), |id| format!("on guild {}", id)),
            self.max_queue_size,
            self.queue_page_size,
            self.ytdlp_path,
            self.default_search,
            self.max_concurrent_resolves,
        )
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => Ok(raw.trim().parse()?),
        None => Ok(default),
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin valores por defecto)
            discord_token: String::new(),
            guild_id: None,

            max_queue_size: 100,
            queue_page_size: 10,

            ytdlp_path: "yt-dlp".to_string(),
            default_search: "ytsearch".to_string(),
            max_concurrent_resolves: 3,
        }
    }
}
