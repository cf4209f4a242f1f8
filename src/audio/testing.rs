//! Dobles de prueba compartidos por los tests del núcleo de reproducción.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use crate::{
    error::TransportError,
    sources::{Requester, StreamHandle, Track},
    voice::{PlaybackTicket, VoiceSink},
};

pub fn requester() -> Requester {
    Requester::new(UserId::new(42), "tester")
}

pub fn track(title: &str) -> Track {
    track_for(title, requester())
}

pub fn track_for(title: &str, requested_by: Requester) -> Track {
    Track::new(
        title,
        title,
        format!("https://example.com/{}", title),
        StreamHandle::new(format!("stream://{}", title)),
        requested_by,
    )
}

#[derive(Default)]
struct FakeState {
    connected: HashMap<GuildId, ChannelId>,
    busy: HashMap<GuildId, bool>,
    tickets: HashMap<GuildId, PlaybackTicket>,
    rejected: HashSet<String>,
    reject_all: bool,
    plays: Vec<String>,
    overlapping_starts: usize,
    stops: usize,
    disconnects: usize,
}

/// Sink en memoria que guarda los tickets para disparar los fines a mano
#[derive(Default)]
pub struct FakeSink {
    state: Mutex<FakeState>,
}

impl FakeSink {
    pub fn connected(guild_id: GuildId) -> Self {
        let sink = Self::default();
        sink.state
            .lock()
            .unwrap()
            .connected
            .insert(guild_id, ChannelId::new(1));
        sink
    }

    pub fn reject(self, stream: &str) -> Self {
        self.state.lock().unwrap().rejected.insert(stream.to_string());
        self
    }

    pub fn reject_all(self) -> Self {
        self.state.lock().unwrap().reject_all = true;
        self
    }

    pub fn set_busy(&self, guild_id: GuildId, busy: bool) {
        self.state.lock().unwrap().busy.insert(guild_id, busy);
    }

    pub fn plays(&self) -> Vec<String> {
        self.state.lock().unwrap().plays.clone()
    }

    pub fn overlapping_starts(&self) -> usize {
        self.state.lock().unwrap().overlapping_starts
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    pub fn is_connected_now(&self, guild_id: GuildId) -> bool {
        self.state.lock().unwrap().connected.contains_key(&guild_id)
    }

    pub fn channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.state.lock().unwrap().connected.get(&guild_id).copied()
    }

    /// Ticket del track en curso, para repetir señales
    pub fn ticket(&self, guild_id: GuildId) -> Option<PlaybackTicket> {
        self.state.lock().unwrap().tickets.get(&guild_id).cloned()
    }

    pub fn start_current(&self, guild_id: GuildId) {
        if let Some(ticket) = self.ticket(guild_id) {
            ticket.started();
        }
    }

    /// Simula el fin natural (o por error) del track en curso.
    /// Devuelve si había un track que terminar.
    pub fn finish_current(&self, guild_id: GuildId, error: Option<&str>) -> bool {
        let ticket = {
            let mut state = self.state.lock().unwrap();
            state.busy.insert(guild_id, false);
            state.tickets.remove(&guild_id)
        };
        match ticket {
            Some(ticket) => {
                ticket.finished(error.map(str::to_string));
                true
            }
            None => false,
        }
    }

    /// Simula que la conexión de voz se cayó desde fuera
    pub fn drop_connection(&self, guild_id: GuildId) {
        self.state.lock().unwrap().connected.remove(&guild_id);
        self.finish_current(guild_id, None);
    }
}

#[async_trait]
impl VoiceSink for FakeSink {
    async fn is_connected(&self, guild_id: GuildId) -> bool {
        self.is_connected_now(guild_id)
    }

    async fn is_busy(&self, guild_id: GuildId) -> bool {
        self.state
            .lock()
            .unwrap()
            .busy
            .get(&guild_id)
            .copied()
            .unwrap_or(false)
    }

    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.channel(guild_id)
    }

    async fn play(
        &self,
        guild_id: GuildId,
        stream: &StreamHandle,
        ticket: PlaybackTicket,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.plays.push(stream.to_string());

        if !state.connected.contains_key(&guild_id) {
            return Err(TransportError::new("not connected"));
        }
        if state.reject_all || state.rejected.contains(stream.as_str()) {
            return Err(TransportError::new(format!("invalid stream {}", stream)));
        }
        if state.busy.get(&guild_id).copied().unwrap_or(false) {
            state.overlapping_starts += 1;
        }

        state.busy.insert(guild_id, true);
        state.tickets.insert(guild_id, ticket);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        self.state.lock().unwrap().stops += 1;
        // Igual que Songbird: detener dispara el evento de fin
        self.finish_current(guild_id, None);
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError> {
        self.state
            .lock()
            .unwrap()
            .connected
            .insert(guild_id, channel_id);
        Ok(())
    }

    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError> {
        self.connect(guild_id, channel_id).await
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), TransportError> {
        {
            let mut state = self.state.lock().unwrap();
            state.disconnects += 1;
            state.connected.remove(&guild_id);
        }
        self.finish_current(guild_id, None);
        Ok(())
    }
}
