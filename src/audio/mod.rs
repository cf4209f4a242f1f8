//! # Audio Module
//!
//! Per-guild playback sequencing for Guild Jukebox.
//!
//! ## Architecture
//!
//! ### [`queue`] - Queue Storage
//! - Bounded FIFO of resolved tracks per guild
//! - The head is the playing track while playback is active
//!
//! ### [`sequencer`] - Playback Sequencer
//! - `Idle` / `Starting` / `Playing` state machine
//! - Starts the head on the voice sink and advances on completion
//! - Drops tracks the sink refuses to start and moves on
//!
//! ### [`registry`] - Guild Registry
//! - Lazily creates one playback entry per guild
//! - Serializes commands and completion signals under the guild lock
//! - Dispatches [`SinkEvent`](crate::voice::SinkEvent)s from the voice layer

pub mod queue;
pub mod registry;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod testing;
