//! Timer engine for a single workout section.
//!
//! The engine owns the section-relative context (elapsed time, interval time,
//! round, exercise index, run state) and advances it once per frame delivered
//! by its [`ClockSource`]:
//!
//! 1. `elapsed = floor((now - run_baseline) / 1000)`
//! 2. `interval = elapsed - interval_baseline`
//! 3. EMOM: when `interval >= interval_duration`, move to the next exercise
//!    (wrapping) and restart the interval at `elapsed`
//! 4. EMOM: countdown cue when 3, 2 or 1 seconds remain, once per value
//! 5. AMRAP/EMOM: complete once `elapsed >= duration`
//! 6. Otherwise schedule the next frame
//!
//! Only one frame is ever pending. A frame that arrives after the engine
//! stopped waiting for it (pause, reset, completion) is ignored.

use crate::clock::{ClockSource, Frame, FrameHandle, VirtualClock};
use crate::cue::{Cue, CueEmitter, CueProfile};
use crate::{TimerState, WorkoutSection};
use serde::Serialize;

/// Read-only view of the engine outputs
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub state: TimerState,
    pub elapsed_time: u32,
    pub interval_time: u32,
    pub interval_remaining: u32,
    pub remaining_time: u32,
    pub current_round: u32,
    pub current_exercise: usize,
}

/// Per-section timer state machine
pub struct TimerEngine<C: ClockSource, E: CueEmitter> {
    section: WorkoutSection,
    clock: C,
    cues: E,
    profile: CueProfile,

    state: TimerState,
    elapsed_time: u32,
    interval_time: u32,
    current_exercise: usize,
    current_round: u32,

    run_baseline_ms: u64,
    interval_baseline: u32,
    pending: Option<FrameHandle>,
    last_countdown: Option<u32>,
}

impl<C: ClockSource, E: CueEmitter> TimerEngine<C, E> {
    /// Create an idle engine for `section` with the default tone profile
    pub fn new(section: WorkoutSection, clock: C, cues: E) -> Self {
        Self::with_profile(section, clock, cues, CueProfile::default())
    }

    pub fn with_profile(section: WorkoutSection, clock: C, cues: E, profile: CueProfile) -> Self {
        Self {
            section,
            clock,
            cues,
            profile,
            state: TimerState::Idle,
            elapsed_time: 0,
            interval_time: 0,
            current_exercise: 0,
            current_round: 1,
            run_baseline_ms: 0,
            interval_baseline: 0,
            pending: None,
            last_countdown: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn section(&self) -> &WorkoutSection {
        &self.section
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed_time(&self) -> u32 {
        self.elapsed_time
    }

    pub fn interval_time(&self) -> u32 {
        self.interval_time
    }

    pub fn current_exercise(&self) -> usize {
        self.current_exercise
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Seconds left in the section, 0 when it has no duration
    pub fn remaining_time(&self) -> u32 {
        self.section
            .duration
            .map_or(0, |d| d.saturating_sub(self.elapsed_time))
    }

    /// Seconds left in the current EMOM interval, 0 without an interval
    pub fn interval_remaining(&self) -> u32 {
        self.section
            .effective_interval()
            .map_or(0, |i| i.saturating_sub(self.interval_time))
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state,
            elapsed_time: self.elapsed_time,
            interval_time: self.interval_time,
            interval_remaining: self.interval_remaining(),
            remaining_time: self.remaining_time(),
            current_round: self.current_round,
            current_exercise: self.current_exercise,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Running or paused, i.e. a session is in progress
    pub fn is_active(&self) -> bool {
        matches!(self.state, TimerState::Running | TimerState::Paused)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Begin a fresh run from `Idle`. Ignored in any other state.
    pub fn start(&mut self) {
        if self.state != TimerState::Idle {
            tracing::debug!("start ignored in state {}", self.state);
            return;
        }
        if let Err(e) = self.cues.acquire() {
            tracing::warn!("Cue output unavailable: {}", e);
        }

        self.run_baseline_ms = self.clock.now_millis();
        self.elapsed_time = 0;
        self.interval_time = 0;
        self.interval_baseline = 0;
        self.last_countdown = None;
        self.state = TimerState::Running;
        self.schedule_tick();

        tracing::info!("Section '{}' ({}) started", self.section.id, self.section.kind);
        self.emit(Cue::Start);
    }

    /// Freeze the counters. Ignored unless running.
    pub fn pause(&mut self) {
        if self.state != TimerState::Running {
            return;
        }
        self.cancel_tick();
        self.state = TimerState::Paused;
        tracing::info!("Paused at {}s", self.elapsed_time);
    }

    /// Continue from the frozen counters. Ignored unless paused.
    pub fn resume(&mut self) {
        if self.state != TimerState::Paused {
            return;
        }
        let frozen_ms = u64::from(self.elapsed_time) * 1000;
        self.run_baseline_ms = self.clock.now_millis().saturating_sub(frozen_ms);
        self.interval_baseline = self.elapsed_time.saturating_sub(self.interval_time);
        self.state = TimerState::Running;
        self.schedule_tick();
        tracing::info!("Resumed at {}s", self.elapsed_time);
    }

    /// Stop and return to a zeroed idle context, from any state
    pub fn reset(&mut self) {
        self.cancel_tick();
        self.state = TimerState::Idle;
        self.elapsed_time = 0;
        self.interval_time = 0;
        self.interval_baseline = 0;
        self.run_baseline_ms = 0;
        self.current_round = 1;
        self.current_exercise = 0;
        self.last_countdown = None;
        tracing::debug!("Section '{}' reset", self.section.id);
    }

    /// Move to the next exercise, stopping at the last one. Ignored unless
    /// running or paused.
    pub fn next_exercise(&mut self) {
        let count = self.section.exercises.len();
        if !self.is_active() || count == 0 {
            return;
        }
        self.current_exercise = (self.current_exercise + 1).min(count - 1);
        self.emit(Cue::NextExercise);
    }

    /// Record a finished round and go back to the first exercise. Ignored
    /// unless running or paused.
    pub fn next_round(&mut self) {
        if !self.is_active() {
            return;
        }
        self.current_round += 1;
        self.current_exercise = 0;
        tracing::info!("Round {} begins at {}s", self.current_round, self.elapsed_time);
        self.emit(Cue::NextRound);
    }

    /// Finish the section by hand. Ignored unless running or paused.
    pub fn complete(&mut self) {
        if !self.is_active() {
            return;
        }
        self.finish();
    }

    /// Discard the current context and install a new section, idle
    pub fn load(&mut self, section: WorkoutSection) {
        self.reset();
        self.section = section;
    }

    // ========================================================================
    // Update loop
    // ========================================================================

    /// Pull one due frame from the clock and run it.
    ///
    /// Returns `true` if a tick actually ran.
    pub fn pump(&mut self) -> bool {
        match self.clock.next_frame() {
            Some(frame) => self.on_frame(frame),
            None => false,
        }
    }

    /// Run one tick for `frame`. Stale frames are ignored.
    pub fn on_frame(&mut self, frame: Frame) -> bool {
        if self.state != TimerState::Running || self.pending != Some(frame.handle) {
            tracing::trace!("Dropping stale frame {:?}", frame.handle);
            return false;
        }
        self.pending = None;
        self.tick(frame.timestamp_ms);
        true
    }

    fn tick(&mut self, now_ms: u64) {
        let elapsed = (now_ms.saturating_sub(self.run_baseline_ms) / 1000) as u32;
        self.elapsed_time = self.elapsed_time.max(elapsed);
        self.interval_time = self.elapsed_time.saturating_sub(self.interval_baseline);

        let kind = self.section.kind;
        let interval = if kind.auto_advances() {
            self.section.effective_interval()
        } else {
            None
        };

        if let Some(interval) = interval {
            if self.interval_time >= interval {
                self.advance_interval();
            }

            let seconds_left = interval.saturating_sub(self.interval_time);
            if (1..=3).contains(&seconds_left) && self.last_countdown != Some(seconds_left) {
                self.last_countdown = Some(seconds_left);
                self.emit(Cue::Countdown(seconds_left));
            }
        }

        if kind.auto_completes() {
            if let Some(duration) = self.section.duration {
                if self.elapsed_time >= duration {
                    self.finish();
                    return;
                }
            }
        }

        self.schedule_tick();
    }

    fn advance_interval(&mut self) {
        let count = self.section.exercises.len();
        if count > 0 {
            self.current_exercise = (self.current_exercise + 1) % count;
        }
        self.interval_baseline = self.elapsed_time;
        self.interval_time = 0;
        self.last_countdown = None;
        tracing::debug!(
            "Interval boundary at {}s, exercise {}",
            self.elapsed_time,
            self.current_exercise
        );
        self.emit(Cue::Transition);
    }

    fn finish(&mut self) {
        self.cancel_tick();
        self.state = TimerState::Completed;
        tracing::info!(
            "Section '{}' completed at {}s after {} round(s)",
            self.section.id,
            self.elapsed_time,
            self.current_round
        );
        self.emit(Cue::Complete);
    }

    fn schedule_tick(&mut self) {
        if let Some(old) = self.pending.take() {
            self.clock.cancel(old);
        }
        self.pending = Some(self.clock.schedule());
    }

    fn cancel_tick(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.clock.cancel(handle);
        }
    }

    fn emit(&mut self, cue: Cue) {
        let tone = self.profile.tone(cue);
        if let Err(e) = self.cues.play(cue, tone) {
            tracing::warn!("Failed to play {:?} cue: {}", cue, e);
        }
    }
}

impl<E: CueEmitter> TimerEngine<VirtualClock, E> {
    /// Advance virtual time by `millis`, one frame interval at a time,
    /// running every frame that comes due.
    pub fn run_for(&mut self, millis: u64) {
        let step = self.clock.frame_interval_ms();
        let mut remaining = millis;
        while remaining > 0 {
            let delta = step.min(remaining);
            self.clock.advance(delta);
            self.pump();
            remaining -= delta;
        }
    }
}

impl<C: ClockSource, E: CueEmitter> Drop for TimerEngine<C, E> {
    fn drop(&mut self) {
        self.cancel_tick();
        self.cues.release();
    }
}
