use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::audio::{queue::TrackSummary, registry::QueueSnapshot};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const QUEUE_BLURPLE: Colour = Colour::new(0x5865F2);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Guild Jukebox";

/// Embed de respuesta a `/play` cuando el track empezó a sonar
pub fn create_now_playing_embed(track: &TrackSummary) -> CreateEmbed {
    CreateEmbed::default()
        .title("▶️ Reproduciendo ahora")
        .description(track_line(track))
        .color(colors::SUCCESS_GREEN)
        .field("👤 Solicitado por", track.requester.name.clone(), true)
        .url(&track.link)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Embed de respuesta a `/play` cuando el track quedó en cola
pub fn create_track_added_embed(track: &TrackSummary, position: usize) -> CreateEmbed {
    CreateEmbed::default()
        .title("➕ Agregado a la cola")
        .description(track_line(track))
        .color(colors::SUCCESS_GREEN)
        .field("📍 Posición", position.to_string(), true)
        .field("👤 Solicitado por", track.requester.name.clone(), true)
        .url(&track.link)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(
            "🎵 Se reproducirá automáticamente cuando le toque",
        ))
}

/// Crea un embed para mostrar la cola de reproducción
pub fn create_queue_embed(snapshot: &QueueSnapshot, page: usize, per_page: usize) -> CreateEmbed {
    let embed = CreateEmbed::default().title("🎶 Cola de reproducción");

    if snapshot.tracks.is_empty() {
        return embed
            .description("📭 **La cola está vacía**\n\n💡 Usa `/play <canción>` para agregar música")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
            .timestamp(Timestamp::now());
    }

    let page = QueuePage::new(snapshot.tracks.len(), page, per_page);
    let description = queue_lines(snapshot, &page).join("\n");

    let footer = if page.total_pages > 1 {
        format!(
            "Página {} de {} • {} canciones",
            page.current, page.total_pages, snapshot.tracks.len()
        )
    } else {
        STANDARD_FOOTER.to_string()
    };

    embed
        .description(description)
        .color(colors::QUEUE_BLURPLE)
        .footer(CreateEmbedFooter::new(footer))
        .timestamp(Timestamp::now())
}

/// Crea un embed de error
pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("❌ {}", title))
        .description(description)
        .color(colors::ERROR_RED)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

#[derive(Debug, PartialEq, Eq)]
struct QueuePage {
    current: usize,
    total_pages: usize,
    start: usize,
    end: usize,
}

impl QueuePage {
    fn new(total_items: usize, page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_items.div_ceil(per_page).max(1);
        let current = page.clamp(1, total_pages);
        let start = (current - 1) * per_page;
        let end = (start + per_page).min(total_items);

        Self {
            current,
            total_pages,
            start,
            end,
        }
    }
}

fn queue_lines(snapshot: &QueueSnapshot, page: &QueuePage) -> Vec<String> {
    snapshot.tracks[page.start..page.end]
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let position = page.start + i + 1;
            // La posición 1 es la que suena mientras hay reproducción
            let prefix = if position == 1 && snapshot.is_playing() {
                "▶️".to_string()
            } else {
                format!("{}.", position)
            };
            format!(
                "{} {} - solicitado por `{}` {}",
                prefix,
                track_line(track),
                track.requester.name,
                added_ago(track)
            )
        })
        .collect()
}

fn track_line(track: &TrackSummary) -> String {
    format!(
        "**[{}]({})** (`{}`)",
        track.title,
        track.link,
        format_duration(track.duration)
    )
}

/// Timestamp relativo de Discord ("hace 5 minutos")
fn added_ago(track: &TrackSummary) -> String {
    format!("<t:{}:R>", track.added_at.timestamp())
}

/// `m:ss` o `h:mm:ss`; "desconocida" si no hay duración
pub fn format_duration(duration: Option<Duration>) -> String {
    let total_seconds = match duration {
        Some(d) if d.as_secs() > 0 => d.as_secs(),
        _ => return "desconocida".to_string(),
    };

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{sequencer::PlaybackState, testing::track};
    use pretty_assertions::assert_eq;

    fn snapshot(count: usize, state: PlaybackState) -> QueueSnapshot {
        QueueSnapshot {
            tracks: (1..=count)
                .map(|i| TrackSummary::from(&track(&format!("t{}", i))))
                .collect(),
            state,
            last_failure: None,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(Duration::from_secs(59))), "0:59");
        assert_eq!(format_duration(Some(Duration::from_secs(212))), "3:32");
        assert_eq!(format_duration(Some(Duration::from_secs(3725))), "1:02:05");
        assert_eq!(format_duration(Some(Duration::ZERO)), "desconocida");
        assert_eq!(format_duration(None), "desconocida");
    }

    #[test]
    fn test_queue_page_bounds() {
        assert_eq!(
            QueuePage::new(25, 3, 10),
            QueuePage { current: 3, total_pages: 3, start: 20, end: 25 }
        );
        // Páginas fuera de rango se ajustan
        assert_eq!(QueuePage::new(5, 9, 10).current, 1);
        assert_eq!(QueuePage::new(5, 0, 10).start, 0);
    }

    #[test]
    fn test_playing_head_is_marked() {
        let playing = snapshot(2, PlaybackState::Playing { attempt: 1 });
        let lines = queue_lines(&playing, &QueuePage::new(2, 1, 10));
        assert!(lines[0].starts_with("▶️ **[t1]"));
        assert!(lines[1].starts_with("2. **[t2]"));
        assert!(lines[1].contains("solicitado por `tester`"));

        let idle = snapshot(2, PlaybackState::Idle);
        let lines = queue_lines(&idle, &QueuePage::new(2, 1, 10));
        assert!(lines[0].starts_with("1. "));
    }

    #[test]
    fn test_lines_show_when_track_was_added() {
        let mut queue = snapshot(1, PlaybackState::Idle);
        queue.tracks[0].added_at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let lines = queue_lines(&queue, &QueuePage::new(1, 1, 10));
        assert!(lines[0].ends_with("<t:1700000000:R>"));
    }

    #[test]
    fn test_second_page_keeps_absolute_positions() {
        let queue = snapshot(12, PlaybackState::Playing { attempt: 1 });
        let lines = queue_lines(&queue, &QueuePage::new(12, 2, 10));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("11. "));
    }
}
