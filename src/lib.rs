//! Session and request orchestration engine for a local chat client.
//!
//! The engine owns conversation state for a locally hosted model server:
//! persisted sessions, global preferences, the optional web-search
//! augmentation stage, the outbound completion pipeline, and the incremental
//! reveal of replies.
//!
//! # Public API Overview
//! - [`EngineState`] is the single owner of all mutable state. Hosts feed it
//!   user actions, worker results ([`TurnEvent`]) and reveal ticks.
//! - [`SessionRegistry`] and [`Preferences`] mirror their state into a
//!   [`session_store::KeyValueStore`] after every change.
//! - [`run_turn`] performs the blocking search + completion work for one
//!   submission and is meant to run off the event loop.
//! - [`Revealer`] drives generation-guarded, chunked disclosure of a reply.

pub mod augment;
pub mod engine;
pub mod error;
pub mod keys;
pub mod pipeline;
pub mod preferences;
pub mod registry;
pub mod reveal;
pub mod turn;

pub use crate::augment::{
    augment, outbound_turns, search_query, AugmentOutcome, Augmented, AugmentationConfig,
    MarkerPolicy,
};
pub use crate::engine::{EngineConfig, EngineHost, EngineState, Notice, NoticeLevel};
pub use crate::error::EngineError;
pub use crate::keys::{SessionId, SESSION_KEY_PREFIX};
pub use crate::pipeline::{run_turn, TurnEvent, TurnJob};
pub use crate::preferences::{Preferences, Theme, UnknownTheme, DEFAULT_USERNAME};
pub use crate::registry::{Clock, Confirmed, ManualClock, SessionRegistry, SessionSummary, SystemClock};
pub use crate::reveal::{Generation, Reveal, RevealStep, Revealer, DEFAULT_CHUNK_CHARS};
pub use crate::turn::Turn;

pub use chat_provider::{Role, Throughput};
