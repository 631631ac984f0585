#![forbid(unsafe_code)]

//! Core domain model and timing logic for the RoxApp workout player.
//!
//! This crate provides:
//! - Domain types (exercises, sections, workouts)
//! - Clock sources (wall clock and virtual clock)
//! - Audible cues
//! - The per-section timer engine
//! - Section views and the multi-section workout player
//! - Plan loading, configuration and logging

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod clock;
pub mod cue;
pub mod timer;
pub mod views;
pub mod player;
pub mod plan;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use clock::{ClockSource, Frame, FrameHandle, SystemClock, VirtualClock};
pub use cue::{Cue, CueEmitter, CueLog, CueProfile, SilentCues, TerminalBell, Tone};
pub use timer::{TimerEngine, TimerSnapshot};
pub use views::{format_time, PlayerAction, SectionView};
pub use player::{NoWakeLock, PlayerEvent, SectionSummary, WakeLock, WorkoutPlayer};
pub use plan::{get_sample_workout, load_workout, resolve_plan_path, sample_workout};
