use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    queue::TrackSummary,
    sequencer::{Evaluation, FailureRecord, GuildPlayback, PlaybackSequencer, PlaybackState, Trigger},
};
use crate::{
    error::{PlaybackError, UsageError},
    sources::{MediaResolver, Requester},
    voice::{SinkEvent, SinkEventReceiver, VoiceSink},
};

/// Resultado de `enqueue` para la respuesta al usuario
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueOutcome {
    /// Esta llamada arrancó la reproducción
    pub started: bool,
    /// Posición (base 1) del track en la cola al terminar la llamada
    pub position: usize,
    pub track: TrackSummary,
    /// Track que empezó a sonar, si `started`; puede ser uno que ya esperaba
    pub now_playing: Option<TrackSummary>,
    /// El sink rechazó el track recién agregado y se descartó
    pub discarded: Option<FailureRecord>,
}

/// Vista consistente de la cola de una guild
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub tracks: Vec<TrackSummary>,
    pub state: PlaybackState,
    pub last_failure: Option<FailureRecord>,
}

impl QueueSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state.is_active()
    }
}

/// Registro de reproducción de todas las guilds.
///
/// Cada guild tiene su propio `Mutex` sobre (cola, estado); es el único punto
/// de entrada para leer o modificar ese par. Ninguna operación toma el lock
/// de dos guilds a la vez.
pub struct GuildPlaybackRegistry {
    guilds: DashMap<GuildId, Arc<Mutex<GuildPlayback>>>,
    sequencer: PlaybackSequencer,
    sink: Arc<dyn VoiceSink>,
    resolver: Arc<dyn MediaResolver>,
    max_queue_size: usize,
}

impl GuildPlaybackRegistry {
    /// Crea el registro y el receptor de señales del sink.
    ///
    /// El receptor debe entregarse a [`GuildPlaybackRegistry::run`].
    pub fn new(
        sink: Arc<dyn VoiceSink>,
        resolver: Arc<dyn MediaResolver>,
        max_queue_size: usize,
    ) -> (Arc<Self>, SinkEventReceiver) {
        let (events_tx, events_rx) = flume::unbounded();

        let registry = Arc::new(Self {
            guilds: DashMap::new(),
            sequencer: PlaybackSequencer::new(sink.clone(), events_tx),
            sink,
            resolver,
            max_queue_size,
        });

        (registry, events_rx)
    }

    /// Despacha las señales del sink, cada una en su propia tarea para que
    /// una guild bloqueada no frene a las demás.
    pub async fn run(self: Arc<Self>, events: SinkEventReceiver) {
        info!("🎧 Despachador de eventos de voz iniciado");

        while let Ok(event) = events.recv_async().await {
            let registry = self.clone();
            tokio::spawn(async move {
                registry.handle_event(event).await;
            });
        }

        debug!("Canal de eventos de voz cerrado");
    }

    /// Aplica una señal del sink bajo el lock de su guild
    pub async fn handle_event(&self, event: SinkEvent) {
        let entry = self.entry(event.guild_id());
        let mut entry = entry.lock().await;

        match event {
            SinkEvent::Started { guild_id, attempt } => {
                self.sequencer.acknowledge(guild_id, &mut entry, attempt);
            }
            SinkEvent::Finished {
                guild_id,
                attempt,
                error,
            } => {
                self.sequencer
                    .complete(guild_id, &mut entry, attempt, error)
                    .await;
            }
        }
    }

    /// Conecta (o mueve) el sink al canal y arranca lo que esté pendiente
    pub async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), PlaybackError> {
        let connected = self.sink.is_connected(guild_id).await;
        match self.sink.current_channel(guild_id).await {
            Some(current) if connected && current == channel_id => {}
            Some(_) if connected => self.sink.move_to(guild_id, channel_id).await?,
            _ => self.sink.connect(guild_id, channel_id).await?,
        }

        let entry = self.entry(guild_id);
        let mut entry = entry.lock().await;
        self.sequencer
            .evaluate(guild_id, &mut entry, Trigger::Request)
            .await;

        Ok(())
    }

    /// Resuelve la consulta, la agrega a la cola y arranca si estaba parada
    pub async fn enqueue(
        &self,
        guild_id: GuildId,
        query: &str,
        requested_by: Requester,
    ) -> Result<EnqueueOutcome, PlaybackError> {
        let entry = self.entry(guild_id);

        // Evitar lanzar yt-dlp si la cola ya está llena
        if entry.lock().await.queue().len() >= self.max_queue_size {
            return Err(UsageError::QueueFull {
                max: self.max_queue_size,
            }
            .into());
        }

        // La resolución ocurre fuera del lock
        let track = self.resolver.resolve(query, requested_by).await?;

        let summary = TrackSummary::from(&track);
        let mut entry = entry.lock().await;
        entry.queue_mut().enqueue(track)?;
        let evaluation = self
            .sequencer
            .evaluate(guild_id, &mut entry, Trigger::Request)
            .await;

        // El track nuevo es el último: solo se descartó si la cola quedó vacía
        let position = entry.queue().len();
        let discarded = if position == 0 {
            entry.last_failure().cloned()
        } else {
            None
        };
        let now_playing = match evaluation {
            Evaluation::Started { .. } => entry.queue().peek_head().map(TrackSummary::from),
            _ => None,
        };

        Ok(EnqueueOutcome {
            started: now_playing.is_some(),
            position,
            track: summary,
            now_playing,
            discarded,
        })
    }

    /// Pide al sink detener el track actual; el fin hace avanzar la cola
    pub async fn skip(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        let entry = self.entry(guild_id);
        let entry = entry.lock().await;

        if !self.sink.is_connected(guild_id).await {
            return Err(UsageError::NotConnected.into());
        }
        if !entry.state().is_active() {
            return Err(UsageError::NothingPlaying.into());
        }

        self.sink.stop(guild_id).await;
        info!("⏭️ Track saltado en guild {}", guild_id);
        Ok(())
    }

    /// Vacía la cola y detiene la reproducción. Idempotente.
    pub async fn stop(&self, guild_id: GuildId) {
        let entry = self.entry(guild_id);
        let mut entry = entry.lock().await;
        self.halt(guild_id, &mut entry).await;
    }

    /// Igual que `stop` y además desconecta del canal de voz
    pub async fn leave(&self, guild_id: GuildId) -> Result<(), PlaybackError> {
        let entry = self.entry(guild_id);
        let mut entry = entry.lock().await;

        if !self.sink.is_connected(guild_id).await {
            return Err(UsageError::NotConnected.into());
        }

        self.halt(guild_id, &mut entry).await;
        self.sink.disconnect(guild_id).await?;
        Ok(())
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        let entry = self.entry(guild_id);
        let entry = entry.lock().await;

        QueueSnapshot {
            tracks: entry.queue().snapshot(),
            state: entry.state(),
            last_failure: entry.last_failure().cloned(),
        }
    }

    async fn halt(&self, guild_id: GuildId, entry: &mut GuildPlayback) {
        let was_active = entry.reset();
        if was_active || self.sink.is_busy(guild_id).await {
            self.sink.stop(guild_id).await;
        }
        info!("⏹️ Reproducción detenida y cola limpiada en guild {}", guild_id);
    }

    fn entry(&self, guild_id: GuildId) -> Arc<Mutex<GuildPlayback>> {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(GuildPlayback::new(self.max_queue_size))))
            .clone()
    }
}
