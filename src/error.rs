//! # Errors
//!
//! Failure taxonomy of the playback core.
//!
//! - [`ResolveError`]: the query could not be turned into a playable track.
//!   Shown to the user as-is, never retried.
//! - [`TransportError`]: the voice connection could not start or keep a
//!   track. The sequencer recovers by advancing the queue.
//! - [`UsageError`]: the command makes no sense in the current state
//!   (nothing playing, not connected, queue full). Nothing is mutated.
//!
//! None of them is fatal to the process; the worst outcome is a guild whose
//! queue made no progress on a given call.

use thiserror::Error;

/// La consulta no pudo resolverse en un track reproducible
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("No se pudo obtener audio de `{query}`: {reason}")]
pub struct ResolveError {
    pub query: String,
    pub reason: String,
}

impl ResolveError {
    pub fn new(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            reason: reason.into(),
        }
    }
}

/// Fallo del transporte de voz
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Comando usado en un contexto inválido
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("No estoy conectado a ningún canal de voz")]
    NotConnected,
    #[error("No hay nada reproduciéndose ahora mismo")]
    NothingPlaying,
    #[error("La cola está llena (máximo {max} canciones)")]
    QueueFull { max: usize },
}

/// Error devuelto por las operaciones del registro de reproducción
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error(transparent)]
    Resolution(#[from] ResolveError),
    #[error("Error de voz: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl PlaybackError {
    /// Indica si el error se debe a un uso incorrecto del comando
    pub fn is_usage(&self) -> bool {
        matches!(self, PlaybackError::Usage(_))
    }
}
