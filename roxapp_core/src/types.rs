//! Core domain types for the RoxApp workout player.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and their display quantity
//! - Workout sections and their timing type
//! - Whole workout structures (one training-plan entry)
//! - Timer run state

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Exercise Types
// ============================================================================

/// A single exercise within a section (e.g., "Wall Balls, 20 reps")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Exercise {
    /// Create an exercise with no quantity attached
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            reps: None,
            duration: None,
            distance: None,
            rest: None,
            notes: None,
        }
    }

    pub fn with_reps(mut self, reps: u32) -> Self {
        self.reps = Some(reps);
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_distance(mut self, meters: u32) -> Self {
        self.distance = Some(meters);
        self
    }

    /// The quantity shown for this exercise
    ///
    /// Priority is reps, then duration, then distance. Zero values are
    /// treated as absent.
    pub fn quantity(&self) -> Option<Quantity> {
        match (self.reps, self.duration, self.distance) {
            (Some(r), _, _) if r > 0 => Some(Quantity::Reps(r)),
            (_, Some(d), _) if d > 0 => Some(Quantity::Seconds(d)),
            (_, _, Some(m)) if m > 0 => Some(Quantity::Meters(m)),
            _ => None,
        }
    }
}

/// Primary unit of an exercise, as displayed to the athlete
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    Reps(u32),
    Seconds(u32),
    Meters(u32),
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Reps(n) => write!(f, "{} reps", n),
            Quantity::Seconds(n) => write!(f, "{}s", n),
            Quantity::Meters(n) => write!(f, "{}m", n),
        }
    }
}

// ============================================================================
// Section Types
// ============================================================================

/// Timing type of a workout section
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SectionType {
    #[serde(rename = "EMOM")]
    Emom,
    #[serde(rename = "AMRAP")]
    Amrap,
    ForTime,
    Rounds,
    Warmup,
    CoolDown,
}

impl SectionType {
    /// Sections that finish on their own once `duration` is reached
    pub fn auto_completes(self) -> bool {
        matches!(self, SectionType::Amrap | SectionType::Emom)
    }

    /// Sections whose current exercise advances with the clock
    pub fn auto_advances(self) -> bool {
        self == SectionType::Emom
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SectionType::Emom => "EMOM",
            SectionType::Amrap => "AMRAP",
            SectionType::ForTime => "ForTime",
            SectionType::Rounds => "Rounds",
            SectionType::Warmup => "Warmup",
            SectionType::CoolDown => "CoolDown",
        };
        f.pad(label)
    }
}

/// One independently timed phase of a workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSection {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Total cap in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// EMOM cycle length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u32>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_between_rounds: Option<u32>,
}

impl WorkoutSection {
    pub fn new(id: impl Into<String>, kind: SectionType) -> Self {
        Self {
            id: id.into(),
            kind,
            title: None,
            duration: None,
            interval_duration: None,
            rounds: None,
            exercises: Vec::new(),
            rest_between_rounds: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_interval(mut self, seconds: u32) -> Self {
        self.interval_duration = Some(seconds);
        self
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = Some(rounds);
        self
    }

    pub fn with_exercises(mut self, exercises: Vec<Exercise>) -> Self {
        self.exercises = exercises;
        self
    }

    /// EMOM interval length, ignoring a zero value
    pub fn effective_interval(&self) -> Option<u32> {
        self.interval_duration.filter(|&i| i > 0)
    }
}

/// One training-plan entry: an ordered list of sections
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutStructure {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub sections: Vec<WorkoutSection>,
}

// ============================================================================
// Timer State
// ============================================================================

/// Run state of a section-play session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Completed => "completed",
        };
        f.pad(label)
    }
}
