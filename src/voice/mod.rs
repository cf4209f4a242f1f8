//! # Voice Module
//!
//! Boundary between the playback core and the voice transport.
//!
//! The core only talks to a [`VoiceSink`]. Every `play` call carries a
//! [`PlaybackTicket`]; the sink uses it to report back, from whatever task
//! the transport runs its callbacks on, that the track began sounding or that
//! it stopped (naturally, by `stop`, or with an error). Those reports travel
//! as [`SinkEvent`] messages over a channel and are applied by the registry
//! under the guild's lock, never directly from the transport's callback.
//!
//! [`songbird_sink::SongbirdSink`] is the production implementation.

pub mod songbird_sink;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tracing::debug;

use crate::{error::TransportError, sources::StreamHandle};

pub use songbird_sink::SongbirdSink;

/// Señales que el transporte de voz envía al secuenciador
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// El track del intento `attempt` empezó a sonar
    Started { guild_id: GuildId, attempt: u64 },
    /// El track del intento `attempt` dejó de sonar, por cualquier motivo
    Finished {
        guild_id: GuildId,
        attempt: u64,
        error: Option<String>,
    },
}

impl SinkEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            SinkEvent::Started { guild_id, .. } | SinkEvent::Finished { guild_id, .. } => *guild_id,
        }
    }
}

pub type SinkEventSender = flume::Sender<SinkEvent>;
pub type SinkEventReceiver = flume::Receiver<SinkEvent>;

/// Ticket de un intento de reproducción.
///
/// Se entrega al sink en cada `play`; el sink lo usa para avisar inicio y fin.
#[derive(Debug, Clone)]
pub struct PlaybackTicket {
    guild_id: GuildId,
    attempt: u64,
    events: SinkEventSender,
}

impl PlaybackTicket {
    pub fn new(guild_id: GuildId, attempt: u64, events: SinkEventSender) -> Self {
        Self {
            guild_id,
            attempt,
            events,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn started(&self) {
        self.send(SinkEvent::Started {
            guild_id: self.guild_id,
            attempt: self.attempt,
        });
    }

    pub fn finished(&self, error: Option<String>) {
        self.send(SinkEvent::Finished {
            guild_id: self.guild_id,
            attempt: self.attempt,
            error,
        });
    }

    fn send(&self, event: SinkEvent) {
        // Sin receptor el bot se está apagando
        if self.events.send(event).is_err() {
            debug!("Canal de eventos cerrado para guild {}", self.guild_id);
        }
    }
}

/// Conexión de voz por guild
#[async_trait]
pub trait VoiceSink: Send + Sync {
    async fn is_connected(&self, guild_id: GuildId) -> bool;

    /// Reproduciendo o pausado
    async fn is_busy(&self, guild_id: GuildId) -> bool;

    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    /// Empieza a transmitir `stream`. El fin del track se reporta por `ticket`.
    ///
    /// Un `Err` significa que el track nunca llegó a arrancar y que el ticket
    /// no se usará.
    async fn play(
        &self,
        guild_id: GuildId,
        stream: &StreamHandle,
        ticket: PlaybackTicket,
    ) -> Result<(), TransportError>;

    async fn stop(&self, guild_id: GuildId);

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError>;

    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError>;

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ticket_reports_its_attempt() {
        let (tx, rx) = flume::unbounded();
        let guild_id = GuildId::new(1);
        let ticket = PlaybackTicket::new(guild_id, 4, tx);

        ticket.started();
        ticket.finished(Some("boom".into()));

        assert_eq!(rx.try_recv(), Ok(SinkEvent::Started { guild_id, attempt: 4 }));
        assert_eq!(
            rx.try_recv(),
            Ok(SinkEvent::Finished {
                guild_id,
                attempt: 4,
                error: Some("boom".into()),
            })
        );
    }

    #[test]
    fn test_ticket_survives_closed_channel() {
        let (tx, rx) = flume::unbounded();
        drop(rx);
        PlaybackTicket::new(GuildId::new(1), 1, tx).finished(None);
    }
}
