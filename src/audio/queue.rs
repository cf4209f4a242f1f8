use chrono::{DateTime, Utc};
use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use crate::{
    error::UsageError,
    sources::{Requester, Track},
};

/// Cola de reproducción de una guild.
///
/// Estructura de datos pura: se inserta siempre al final y se extrae
/// siempre del frente. Mientras hay reproducción activa, el elemento en la
/// posición 0 es exactamente el track que está sonando.
#[derive(Debug)]
pub struct GuildQueue {
    items: VecDeque<Track>,
    max_size: usize,
}

impl GuildQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega un track al final y devuelve su posición (base 1)
    pub fn enqueue(&mut self, track: Track) -> Result<usize, UsageError> {
        if self.items.len() >= self.max_size {
            return Err(UsageError::QueueFull { max: self.max_size });
        }

        info!("➕ Agregado a la cola: {}", track.title());
        self.items.push_back(track);
        Ok(self.items.len())
    }

    pub fn peek_head(&self) -> Option<&Track> {
        self.items.front()
    }

    /// Quita el track del frente; no hace nada si la cola está vacía
    pub fn pop_head(&mut self) -> Option<Track> {
        let popped = self.items.pop_front();
        if let Some(ref track) = popped {
            debug!("➡️ Quitado del frente: {}", track.title());
        }
        popped
    }

    pub fn clear(&mut self) {
        if !self.is_empty() {
            info!("🗑️ Cola limpiada ({} canciones)", self.items.len());
        }
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copia ordenada de la cola para mostrarla
    pub fn snapshot(&self) -> Vec<TrackSummary> {
        self.items.iter().map(TrackSummary::from).collect()
    }
}

/// Lo que la capa de presentación necesita de cada entrada
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSummary {
    pub title: String,
    pub link: String,
    pub duration: Option<Duration>,
    pub requester: Requester,
    pub added_at: DateTime<Utc>,
}

impl From<&Track> for TrackSummary {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title().to_string(),
            link: track.url().to_string(),
            duration: track.duration(),
            requester: track.requested_by().clone(),
            added_at: track.added_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::track;
    use pretty_assertions::assert_eq;

    fn titles(queue: &GuildQueue) -> Vec<String> {
        queue.snapshot().into_iter().map(|t| t.title).collect()
    }

    #[test]
    fn test_enqueue_returns_tail_position() {
        let mut queue = GuildQueue::new(10);
        assert_eq!(queue.enqueue(track("a")), Ok(1));
        assert_eq!(queue.enqueue(track("b")), Ok(2));
        assert_eq!(queue.enqueue(track("c")), Ok(3));
        assert_eq!(titles(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_pop_head_is_fifo_and_noop_when_empty() {
        let mut queue = GuildQueue::new(10);
        queue.enqueue(track("a")).unwrap();
        queue.enqueue(track("b")).unwrap();

        assert_eq!(queue.pop_head().map(|t| t.title().to_string()), Some("a".into()));
        assert_eq!(queue.peek_head().map(|t| t.title()), Some("b"));
        assert!(queue.pop_head().is_some());
        assert!(queue.pop_head().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_rejects_without_mutation() {
        let mut queue = GuildQueue::new(2);
        queue.enqueue(track("a")).unwrap();
        queue.enqueue(track("b")).unwrap();

        assert_eq!(queue.enqueue(track("c")), Err(UsageError::QueueFull { max: 2 }));
        assert_eq!(titles(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_clear_empties_queue() {
        let mut queue = GuildQueue::new(10);
        queue.enqueue(track("a")).unwrap();
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_carries_display_fields() {
        let mut queue = GuildQueue::new(10);
        let item = track("a").with_duration(Duration::from_secs(61));
        let added_at = item.added_at();
        queue.enqueue(item).unwrap();

        let summary = &queue.snapshot()[0];
        assert_eq!(summary.title, "a");
        assert_eq!(summary.link, "https://example.com/a");
        assert_eq!(summary.duration, Some(Duration::from_secs(61)));
        assert_eq!(summary.requester.name, "tester");
        assert_eq!(summary.added_at, added_at);
    }
}
