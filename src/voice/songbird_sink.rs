use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle},
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{PlaybackTicket, VoiceSink};
use crate::{error::TransportError, sources::StreamHandle};

/// [`VoiceSink`] sobre las llamadas de Songbird
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    current_tracks: Arc<DashMap<GuildId, TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self {
            manager,
            http,
            current_tracks: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl VoiceSink for SongbirdSink {
    async fn is_connected(&self, guild_id: GuildId) -> bool {
        match self.manager.get(guild_id) {
            Some(call) => call.lock().await.current_connection().is_some(),
            None => false,
        }
    }

    async fn is_busy(&self, guild_id: GuildId) -> bool {
        // Clonar el handle para no retener la entrada del mapa durante el await
        let Some(track) = self.current_tracks.get(&guild_id).map(|t| t.clone()) else {
            return false;
        };

        match track.get_info().await {
            Ok(info) => matches!(info.playing, PlayMode::Play | PlayMode::Pause),
            Err(_) => false,
        }
    }

    async fn current_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let call = self.manager.get(guild_id)?;
        let call = call.lock().await;
        call.current_channel().map(|channel| ChannelId::from(channel.0))
    }

    async fn play(
        &self,
        guild_id: GuildId,
        stream: &StreamHandle,
        ticket: PlaybackTicket,
    ) -> Result<(), TransportError> {
        let call = self
            .manager
            .get(guild_id)
            .ok_or_else(|| TransportError::new("No hay llamada de voz para esta guild"))?;

        let input: Input = HttpRequest::new(self.http.clone(), stream.as_str().to_string()).into();

        let track = {
            let mut call = call.lock().await;
            call.play_input(input)
        };

        self.current_tracks.insert(guild_id, track.clone());

        for event in [TrackEvent::Play, TrackEvent::End, TrackEvent::Error] {
            let notifier = TrackNotifier {
                event,
                ticket: ticket.clone(),
                current_tracks: self.current_tracks.clone(),
            };

            if let Err(e) = track.add_event(Event::Track(event), notifier) {
                error!("❌ No se pudo registrar {:?} en guild {}: {:?}", event, guild_id, e);
                self.forget(guild_id, &track);
                let _ = track.stop();
                return Err(TransportError::new(format!(
                    "Error al agregar event handler: {}",
                    e
                )));
            }
        }

        debug!("🎵 Track {} iniciado en guild {}", track.uuid(), guild_id);
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) {
        if let Some((_, track)) = self.current_tracks.remove(&guild_id) {
            if let Err(e) = track.stop() {
                debug!("Track ya detenido en guild {}: {:?}", guild_id, e);
            }
            info!("⏹️ Reproducción detenida en guild {}", guild_id);
        }
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| TransportError::new(format!("Error al conectar al canal de voz: {}", e)))?;

        info!("🔊 Conectado al canal {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn move_to(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), TransportError> {
        // Songbird mueve la llamada existente al volver a hacer join
        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| TransportError::new(format!("Error al cambiar de canal: {}", e)))?;

        info!("🔀 Movido al canal {} en guild {}", channel_id, guild_id);
        Ok(())
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), TransportError> {
        self.current_tracks.remove(&guild_id);
        self.manager
            .remove(guild_id)
            .await
            .map_err(|e| TransportError::new(format!("Error al desconectar: {}", e)))?;

        info!("👋 Desconectado del canal de voz en guild {}", guild_id);
        Ok(())
    }
}

impl SongbirdSink {
    fn forget(&self, guild_id: GuildId, track: &TrackHandle) {
        let uuid = track.uuid();
        self.current_tracks.remove_if(&guild_id, |_, current| current.uuid() == uuid);
    }
}

/// Traduce los eventos de un track de Songbird a señales del ticket
struct TrackNotifier {
    event: TrackEvent,
    ticket: PlaybackTicket,
    current_tracks: Arc<DashMap<GuildId, TrackHandle>>,
}

#[async_trait]
impl VoiceEventHandler for TrackNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(track_list) = ctx else {
            return None;
        };

        let guild_id = self.ticket.guild_id();

        for (state, handle) in *track_list {
            if self.event == TrackEvent::Play {
                debug!("▶️ Intento {} sonando en guild {}", self.ticket.attempt(), guild_id);
                self.ticket.started();
                continue;
            }

            // Solo quitar el handle si sigue siendo el de este track
            let uuid = handle.uuid();
            self.current_tracks
                .remove_if(&guild_id, |_, current| current.uuid() == uuid);

            let error = match &state.playing {
                PlayMode::Errored(e) => Some(format!("{:?}", e)),
                _ if self.event == TrackEvent::Error => Some(format!("{:?}", state.playing)),
                _ => None,
            };

            if let Some(ref reason) = error {
                warn!("❌ Error en track para guild {}: {}", guild_id, reason);
            }

            self.ticket.finished(error);
        }

        None
    }
}
