//! Per-guild playback state machine.
//!
//! ```text
//!            evaluate (queue non-empty, sink connected and idle)
//!   Idle ───────────────────────────────────────────────▶ Starting{n}
//!    ▲                                                        │ Started{n}
//!    │  Finished{n}: pop head, evaluate again                 ▼
//!    └──────────────────────────────────────────────────── Playing{n}
//! ```
//!
//! Every start gets a fresh attempt number `n`. Signals for any other attempt
//! are stale: they never pop the queue, they only trigger a harmless
//! re-evaluation. All functions here take the guild entry by `&mut`, which
//! the registry only hands out while holding that guild's lock.

use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::queue::GuildQueue;
use crate::voice::{PlaybackTicket, SinkEventSender, VoiceSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nada suena ni se está lanzando
    Idle,
    /// Se pidió `play` al sink y todavía no confirmó el inicio
    Starting { attempt: u64 },
    /// El sink confirmó que el track está sonando
    Playing { attempt: u64 },
}

impl PlaybackState {
    pub fn is_active(&self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }

    pub fn attempt(&self) -> Option<u64> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Starting { attempt } | PlaybackState::Playing { attempt } => Some(*attempt),
        }
    }
}

/// Último fallo de transporte registrado en una guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub title: String,
    pub reason: String,
}

/// Qué provocó una evaluación
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Un comando de usuario (enqueue, join). Sin sink, la cola se conserva.
    Request,
    /// El fin de un track. Sin sink, la cola se vacía.
    Advance,
}

/// Resultado de evaluar Idle → Starting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Started { attempt: u64 },
    AlreadyActive,
    Empty,
    NoSink,
    SinkBusy,
}

/// Cola + estado de una guild
#[derive(Debug)]
pub struct GuildPlayback {
    queue: GuildQueue,
    state: PlaybackState,
    attempts: u64,
    last_failure: Option<FailureRecord>,
}

impl GuildPlayback {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            queue: GuildQueue::new(max_queue_size),
            state: PlaybackState::Idle,
            attempts: 0,
            last_failure: None,
        }
    }

    pub fn queue(&self) -> &GuildQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut GuildQueue {
        &mut self.queue
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn last_failure(&self) -> Option<&FailureRecord> {
        self.last_failure.as_ref()
    }

    /// Vacía la cola y vuelve a Idle. Devuelve si había reproducción activa.
    pub fn reset(&mut self) -> bool {
        let was_active = self.state.is_active();
        self.queue.clear();
        self.state = PlaybackState::Idle;
        was_active
    }

    fn next_attempt(&mut self) -> u64 {
        self.attempts += 1;
        self.attempts
    }

    fn record_failure(&mut self, title: &str, reason: &str) {
        self.last_failure = Some(FailureRecord {
            title: title.to_string(),
            reason: reason.to_string(),
        });
    }
}

pub struct PlaybackSequencer {
    sink: Arc<dyn VoiceSink>,
    events: SinkEventSender,
}

impl PlaybackSequencer {
    pub fn new(sink: Arc<dyn VoiceSink>, events: SinkEventSender) -> Self {
        Self { sink, events }
    }

    /// Intenta la transición Idle → Starting.
    ///
    /// Idempotente: con una reproducción en curso no hace nada. Si el sink
    /// rechaza el track al arrancar, se descarta y se prueba el siguiente.
    pub async fn evaluate(
        &self,
        guild_id: GuildId,
        entry: &mut GuildPlayback,
        trigger: Trigger,
    ) -> Evaluation {
        loop {
            if entry.state.is_active() {
                return Evaluation::AlreadyActive;
            }

            let Some(head) = entry.queue.peek_head() else {
                debug!("📭 Cola vacía en guild {}", guild_id);
                return Evaluation::Empty;
            };

            if !self.sink.is_connected(guild_id).await {
                if trigger == Trigger::Advance {
                    warn!("🔌 Sin conexión de voz en guild {}, limpiando cola", guild_id);
                    entry.queue.clear();
                }
                return Evaluation::NoSink;
            }

            if self.sink.is_busy(guild_id).await {
                debug!("Sink ocupado en guild {}", guild_id);
                return Evaluation::SinkBusy;
            }

            let title = head.title().to_string();
            let stream = head.stream().clone();
            let attempt = entry.next_attempt();
            let ticket = PlaybackTicket::new(guild_id, attempt, self.events.clone());

            match self.sink.play(guild_id, &stream, ticket).await {
                Ok(()) => {
                    entry.state = PlaybackState::Starting { attempt };
                    info!("🎵 Reproduciendo en guild {}: {}", guild_id, title);
                    return Evaluation::Started { attempt };
                }
                Err(e) => {
                    error!("❌ Error al iniciar '{}' en guild {}: {}", title, guild_id, e);
                    entry.record_failure(&title, &e.to_string());
                    entry.queue.pop_head();
                }
            }
        }
    }

    /// El sink confirmó que el track empezó a sonar
    pub fn acknowledge(&self, guild_id: GuildId, entry: &mut GuildPlayback, attempt: u64) {
        match entry.state {
            PlaybackState::Starting { attempt: current } if current == attempt => {
                entry.state = PlaybackState::Playing { attempt };
                debug!("▶️ Intento {} sonando en guild {}", attempt, guild_id);
            }
            _ => debug!("Inicio obsoleto ({}) ignorado en guild {}", attempt, guild_id),
        }
    }

    /// El track del intento `attempt` terminó: quitarlo y avanzar.
    pub async fn complete(
        &self,
        guild_id: GuildId,
        entry: &mut GuildPlayback,
        attempt: u64,
        error: Option<String>,
    ) -> Evaluation {
        if entry.state.attempt() != Some(attempt) {
            debug!("Fin obsoleto ({}) en guild {}", attempt, guild_id);
            return self.evaluate(guild_id, entry, Trigger::Request).await;
        }

        let finished = entry.queue.pop_head();
        entry.state = PlaybackState::Idle;

        if let Some(reason) = error {
            let title = finished
                .as_ref()
                .map(|t| t.title().to_string())
                .unwrap_or_default();
            error!("❌ Error de reproducción en guild {} ('{}'): {}", guild_id, title, reason);
            entry.record_failure(&title, &reason);
        } else if let Some(track) = finished {
            debug!("✅ Terminó '{}' en guild {}", track.title(), guild_id);
        }

        self.evaluate(guild_id, entry, Trigger::Advance).await
    }
}
