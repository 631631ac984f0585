//! Workout player: plays the sections of a workout one after another.
//!
//! The player owns one [`TimerEngine`] and reacts to its state changes after
//! every command and every tick. Reactions run once per change, never on
//! redraw:
//! - the wake lock follows `Running`
//! - a completed section is recorded and the next one is loaded (idle)
//! - completing the last section ends the workout

use crate::clock::{ClockSource, VirtualClock};
use crate::cue::{CueEmitter, CueProfile};
use crate::timer::{TimerEngine, TimerSnapshot};
use crate::views::{PlayerAction, SectionView};
use crate::{Error, Result, SectionType, TimerState, WorkoutSection, WorkoutStructure};

/// Keeps the display awake while a section is running
pub trait WakeLock {
    fn set_awake(&mut self, awake: bool);
}

/// Wake lock for hosts with nothing to keep awake
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn set_awake(&mut self, _awake: bool) {}
}

/// Outcome of one finished section
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionSummary {
    pub index: usize,
    pub section_id: String,
    pub kind: SectionType,
    pub elapsed_time: u32,
    pub rounds: u32,
}

/// Something the host may want to show
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    StateChanged { index: usize, state: TimerState },
    SectionCompleted(SectionSummary),
    SectionLoaded { index: usize },
    WorkoutCompleted,
}

/// Header line shown above the section view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerHeader {
    pub kind: SectionType,
    pub part: Option<(usize, usize)>,
    pub title: String,
}

impl std::fmt::Display for PlayerHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.part {
            Some((n, total)) => write!(f, "{} • Part {}/{}: {}", self.kind, n, total, self.title),
            None => write!(f, "{}: {}", self.kind, self.title),
        }
    }
}

/// Sequential player over a workout's sections
pub struct WorkoutPlayer<C: ClockSource, E: CueEmitter, W: WakeLock> {
    workout: WorkoutStructure,
    index: usize,
    engine: TimerEngine<C, E>,
    wake: W,
    observed: TimerState,
    summaries: Vec<SectionSummary>,
    finished: bool,
}

impl<C: ClockSource, E: CueEmitter, W: WakeLock> WorkoutPlayer<C, E, W> {
    /// Create a player positioned on the first section
    pub fn new(workout: WorkoutStructure, clock: C, cues: E, wake: W) -> Result<Self> {
        Self::with_profile(workout, clock, cues, wake, CueProfile::default())
    }

    pub fn with_profile(
        workout: WorkoutStructure,
        clock: C,
        cues: E,
        wake: W,
        profile: CueProfile,
    ) -> Result<Self> {
        let first = workout
            .sections
            .first()
            .cloned()
            .ok_or_else(|| Error::Plan(format!("Workout '{}' has no sections", workout.id)))?;

        tracing::info!(
            "Playing '{}' ({} sections)",
            workout.title,
            workout.sections.len()
        );

        Ok(Self {
            workout,
            index: 0,
            engine: TimerEngine::with_profile(first, clock, cues, profile),
            wake,
            observed: TimerState::Idle,
            summaries: Vec::new(),
            finished: false,
        })
    }

    pub fn workout(&self) -> &WorkoutStructure {
        &self.workout
    }

    pub fn section_index(&self) -> usize {
        self.index
    }

    pub fn section(&self) -> &WorkoutSection {
        self.engine.section()
    }

    pub fn engine(&self) -> &TimerEngine<C, E> {
        &self.engine
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }

    pub fn view(&self) -> SectionView {
        SectionView::render(self.engine.section(), &self.engine.snapshot())
    }

    pub fn summaries(&self) -> &[SectionSummary] {
        &self.summaries
    }

    pub fn is_last_section(&self) -> bool {
        self.index + 1 >= self.workout.sections.len()
    }

    /// True once the last section has completed
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn header(&self) -> PlayerHeader {
        let total = self.workout.sections.len();
        let section = self.engine.section();
        PlayerHeader {
            kind: section.kind,
            part: (total > 1).then_some((self.index + 1, total)),
            title: section
                .title
                .clone()
                .unwrap_or_else(|| self.workout.title.clone()),
        }
    }

    /// Forward a command to the engine and react to the outcome
    pub fn dispatch(&mut self, action: PlayerAction) -> Vec<PlayerEvent> {
        match action {
            PlayerAction::Start => self.engine.start(),
            PlayerAction::Pause => self.engine.pause(),
            PlayerAction::Resume => self.engine.resume(),
            PlayerAction::Reset => self.engine.reset(),
            PlayerAction::NextExercise => self.engine.next_exercise(),
            PlayerAction::NextRound => self.engine.next_round(),
            PlayerAction::Complete => self.engine.complete(),
        }
        self.observe()
    }

    /// Run at most one due frame and react to the outcome
    pub fn pump(&mut self) -> (bool, Vec<PlayerEvent>) {
        let ticked = self.engine.pump();
        (ticked, self.observe())
    }

    /// Skip to the next section without completing the current one
    pub fn next_section(&mut self) -> Vec<PlayerEvent> {
        if self.is_last_section() {
            return Vec::new();
        }
        let mut events = Vec::new();
        self.load_section(self.index + 1, &mut events);
        events
    }

    fn load_section(&mut self, index: usize, events: &mut Vec<PlayerEvent>) {
        let Some(section) = self.workout.sections.get(index).cloned() else {
            return;
        };
        self.index = index;
        self.engine.load(section);
        self.observed = TimerState::Idle;
        self.wake.set_awake(false);
        tracing::info!("Loaded section {} of {}", index + 1, self.workout.sections.len());
        events.push(PlayerEvent::SectionLoaded { index });
    }

    fn observe(&mut self) -> Vec<PlayerEvent> {
        let state = self.engine.state();
        let mut events = Vec::new();
        if state == self.observed {
            return events;
        }
        self.observed = state;
        self.wake.set_awake(state == TimerState::Running);
        events.push(PlayerEvent::StateChanged {
            index: self.index,
            state,
        });

        if state == TimerState::Completed {
            let section = self.engine.section();
            let summary = SectionSummary {
                index: self.index,
                section_id: section.id.clone(),
                kind: section.kind,
                elapsed_time: self.engine.elapsed_time(),
                rounds: self.engine.current_round(),
            };
            self.summaries.push(summary.clone());
            events.push(PlayerEvent::SectionCompleted(summary));

            if self.is_last_section() {
                self.finished = true;
                tracing::info!("Workout '{}' complete", self.workout.title);
                events.push(PlayerEvent::WorkoutCompleted);
            } else {
                self.load_section(self.index + 1, &mut events);
            }
        }
        events
    }
}

impl<E: CueEmitter, W: WakeLock> WorkoutPlayer<VirtualClock, E, W> {
    /// Advance virtual time frame by frame, collecting events
    pub fn run_for(&mut self, millis: u64) -> Vec<PlayerEvent> {
        let clock = self.engine.clock().clone();
        let step = clock.frame_interval_ms();
        let mut remaining = millis;
        let mut events = Vec::new();
        while remaining > 0 {
            let delta = step.min(remaining);
            clock.advance(delta);
            events.extend(self.pump().1);
            remaining -= delta;
        }
        events
    }
}

impl<C: ClockSource, E: CueEmitter, W: WakeLock> Drop for WorkoutPlayer<C, E, W> {
    fn drop(&mut self) {
        self.wake.set_awake(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::{Cue, CueLog};
    use crate::Exercise;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingWakeLock(Rc<RefCell<Vec<bool>>>);

    impl WakeLock for RecordingWakeLock {
        fn set_awake(&mut self, awake: bool) {
            self.0.borrow_mut().push(awake);
        }
    }

    fn workout() -> WorkoutStructure {
        let ex = |id: &str| Exercise::new(id, id.to_uppercase()).with_reps(10);
        WorkoutStructure {
            id: "w1".into(),
            title: "Hyrox Engine".into(),
            date: None,
            sections: vec![
                WorkoutSection::new("warmup", SectionType::Warmup)
                    .with_exercises(vec![ex("row")]),
                WorkoutSection::new("emom", SectionType::Emom)
                    .with_title("Main EMOM")
                    .with_duration(120)
                    .with_interval(60)
                    .with_exercises(vec![ex("wb"), ex("burpee")]),
                WorkoutSection::new("amrap", SectionType::Amrap)
                    .with_duration(60)
                    .with_exercises(vec![ex("lunge")]),
            ],
        }
    }

    type TestPlayer = WorkoutPlayer<VirtualClock, CueLog, RecordingWakeLock>;

    fn player() -> (TestPlayer, CueLog, RecordingWakeLock) {
        let cues = CueLog::new();
        let wake = RecordingWakeLock::default();
        let player =
            WorkoutPlayer::new(workout(), VirtualClock::new(1000), cues.clone(), wake.clone())
                .unwrap();
        (player, cues, wake)
    }

    #[test]
    fn test_empty_workout_rejected() {
        let mut w = workout();
        w.sections.clear();
        let result = WorkoutPlayer::new(w, VirtualClock::default(), CueLog::new(), NoWakeLock);
        assert!(matches!(result, Err(Error::Plan(_))));
    }

    #[test]
    fn test_full_workout_flow() {
        let (mut player, cues, _wake) = player();

        player.dispatch(PlayerAction::Start);
        player.run_for(30_000);
        let events = player.dispatch(PlayerAction::Complete);
        assert!(events.contains(&PlayerEvent::SectionLoaded { index: 1 }));
        assert_eq!(player.section_index(), 1);
        assert_eq!(player.snapshot().state, TimerState::Idle);

        // EMOM completes on its own and the AMRAP gets loaded
        player.dispatch(PlayerAction::Start);
        let events = player.run_for(120_000);
        assert!(events.contains(&PlayerEvent::SectionLoaded { index: 2 }));
        assert_eq!(player.section().id, "amrap");

        player.dispatch(PlayerAction::Start);
        player.run_for(20_000);
        player.dispatch(PlayerAction::NextRound);
        let events = player.run_for(40_000);
        assert!(events.contains(&PlayerEvent::WorkoutCompleted));
        assert!(player.is_finished());
        assert_eq!(player.section_index(), 2);

        let summaries = player.summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].elapsed_time, 30);
        assert_eq!(summaries[1].elapsed_time, 120);
        assert_eq!(summaries[2].rounds, 2);
        assert_eq!(cues.count(Cue::Complete), 3);
    }

    #[test]
    fn test_completion_reacts_once() {
        let (mut player, _cues, _wake) = player();
        player.dispatch(PlayerAction::Start);
        let events = player.dispatch(PlayerAction::Complete);
        let completed = events
            .iter()
            .filter(|e| matches!(e, PlayerEvent::SectionCompleted(_)))
            .count();
        assert_eq!(completed, 1);

        // Further ticks and redundant commands do not advance again
        player.run_for(10_000);
        player.dispatch(PlayerAction::Complete);
        assert_eq!(player.section_index(), 1);
        assert_eq!(player.summaries().len(), 1);
    }

    #[test]
    fn test_wake_lock_follows_running() {
        let (mut player, _cues, wake) = player();
        player.dispatch(PlayerAction::Start);
        player.run_for(3_000);
        player.dispatch(PlayerAction::Pause);
        player.dispatch(PlayerAction::Resume);
        player.dispatch(PlayerAction::Reset);
        assert_eq!(*wake.0.borrow(), vec![true, false, true, false]);

        drop(player);
        assert_eq!(wake.0.borrow().last(), Some(&false));
    }

    #[test]
    fn test_header() {
        let (mut player, _cues, _wake) = player();
        let header = player.header();
        assert_eq!(header.part, Some((1, 3)));
        assert_eq!(header.title, "Hyrox Engine");

        player.next_section();
        let header = player.header();
        assert_eq!(header.kind, SectionType::Emom);
        assert_eq!(header.title, "Main EMOM");
        assert_eq!(header.to_string(), "EMOM • Part 2/3: Main EMOM");
    }

    #[test]
    fn test_next_section_stops_at_last() {
        let (mut player, _cues, _wake) = player();
        assert_eq!(player.next_section(), vec![PlayerEvent::SectionLoaded { index: 1 }]);
        player.next_section();
        assert!(player.is_last_section());
        assert!(player.next_section().is_empty());
        assert_eq!(player.section_index(), 2);
        assert!(!player.is_finished());
    }

    #[test]
    fn test_skipping_running_section_stops_its_loop() {
        let (mut player, _cues, _wake) = player();
        player.dispatch(PlayerAction::Start);
        player.run_for(5_000);
        player.next_section();
        assert!(!player.engine().clock().is_scheduled());
        assert_eq!(player.snapshot().elapsed_time, 0);
        assert!(player.summaries().is_empty());
    }
}
