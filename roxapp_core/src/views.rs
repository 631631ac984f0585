//! Per-section presentation built from timer snapshots.
//!
//! Views never keep time themselves: every number they show comes from the
//! [`TimerSnapshot`] they were rendered from.

use crate::timer::TimerSnapshot;
use crate::{Exercise, Quantity, SectionType, WorkoutSection};
use std::fmt;

/// Format seconds as "MM:SS"
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Commands a player view can issue
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    Start,
    Pause,
    Resume,
    Reset,
    NextExercise,
    NextRound,
    Complete,
}

/// One row of an exercise list
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseRow {
    pub position: usize,
    pub name: String,
    pub quantity: Option<Quantity>,
    pub active: bool,
}

impl ExerciseRow {
    fn from_exercise(idx: usize, ex: &Exercise, active: bool) -> Self {
        Self {
            position: idx + 1,
            name: ex.name.clone(),
            quantity: ex.quantity(),
            active,
        }
    }
}

fn rows(section: &WorkoutSection, active: Option<usize>) -> Vec<ExerciseRow> {
    section
        .exercises
        .iter()
        .enumerate()
        .map(|(idx, ex)| ExerciseRow::from_exercise(idx, ex, active == Some(idx)))
        .collect()
}

/// EMOM: interval countdown with the active exercise
#[derive(Clone, Debug, PartialEq)]
pub struct EmomView {
    pub interval_remaining: u32,
    pub minutes: u32,
    pub current: Option<ExerciseRow>,
    pub next: Option<ExerciseRow>,
    pub completed_intervals: u32,
    pub total_intervals: u32,
    pub exercises: Vec<ExerciseRow>,
}

impl EmomView {
    pub fn render(section: &WorkoutSection, snap: &TimerSnapshot) -> Self {
        let interval = section.effective_interval();
        let total_intervals = match (section.duration, interval) {
            (Some(d), Some(i)) => d / i,
            _ => 0,
        };
        let completed_intervals = interval.map_or(0, |i| snap.elapsed_time / i);

        let count = section.exercises.len();
        let current = section
            .exercises
            .get(snap.current_exercise)
            .map(|ex| ExerciseRow::from_exercise(snap.current_exercise, ex, true));
        let next = if count > 0 {
            let idx = (snap.current_exercise + 1) % count;
            section
                .exercises
                .get(idx)
                .map(|ex| ExerciseRow::from_exercise(idx, ex, false))
        } else {
            None
        };

        Self {
            interval_remaining: snap.interval_remaining,
            minutes: section.duration.unwrap_or(0) / 60,
            current,
            next,
            completed_intervals,
            total_intervals,
            exercises: rows(section, Some(snap.current_exercise)),
        }
    }

    /// Fraction of intervals done, in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        if self.total_intervals == 0 {
            return 0.0;
        }
        (self.completed_intervals as f32 / self.total_intervals as f32).min(1.0)
    }

    /// 1-based number of the interval in progress, capped at the total
    pub fn interval_number(&self) -> u32 {
        if self.total_intervals == 0 {
            return self.completed_intervals + 1;
        }
        (self.completed_intervals + 1).min(self.total_intervals)
    }
}

/// AMRAP: session countdown with the round counter
#[derive(Clone, Debug, PartialEq)]
pub struct AmrapView {
    pub remaining_time: u32,
    pub minutes: u32,
    pub current_round: u32,
    pub exercises: Vec<ExerciseRow>,
}

impl AmrapView {
    pub fn render(section: &WorkoutSection, snap: &TimerSnapshot) -> Self {
        Self {
            remaining_time: snap.remaining_time,
            minutes: section.duration.unwrap_or(0) / 60,
            current_round: snap.current_round,
            exercises: rows(section, None),
        }
    }
}

/// ForTime, Rounds, Warmup and CoolDown: elapsed time counting up
#[derive(Clone, Debug, PartialEq)]
pub struct ManualView {
    pub kind: SectionType,
    pub elapsed_time: u32,
    pub rounds: Option<u32>,
    pub exercises: Vec<ExerciseRow>,
}

impl ManualView {
    pub fn render(section: &WorkoutSection, snap: &TimerSnapshot) -> Self {
        Self {
            kind: section.kind,
            elapsed_time: snap.elapsed_time,
            rounds: section.rounds,
            exercises: rows(section, None),
        }
    }

    pub fn complete_label(&self) -> &'static str {
        if self.kind == SectionType::CoolDown {
            "End session"
        } else {
            "End round"
        }
    }
}

/// The view for whatever type of section is playing
#[derive(Clone, Debug, PartialEq)]
pub enum SectionView {
    Emom(EmomView),
    Amrap(AmrapView),
    Manual(ManualView),
}

impl SectionView {
    pub fn render(section: &WorkoutSection, snap: &TimerSnapshot) -> Self {
        match section.kind {
            SectionType::Emom => SectionView::Emom(EmomView::render(section, snap)),
            SectionType::Amrap => SectionView::Amrap(AmrapView::render(section, snap)),
            SectionType::ForTime
            | SectionType::Rounds
            | SectionType::Warmup
            | SectionType::CoolDown => SectionView::Manual(ManualView::render(section, snap)),
        }
    }

    /// The section-specific action offered to the athlete, with its label
    pub fn primary_action(&self) -> Option<(PlayerAction, &'static str)> {
        match self {
            SectionView::Emom(_) => None,
            SectionView::Amrap(_) => Some((PlayerAction::NextRound, "End round")),
            SectionView::Manual(v) => Some((PlayerAction::Complete, v.complete_label())),
        }
    }

    /// Single line for a live terminal display
    pub fn status_line(&self) -> String {
        match self {
            SectionView::Emom(v) => {
                let current = v
                    .current
                    .as_ref()
                    .map(row_summary)
                    .unwrap_or_else(|| "-".into());
                format!(
                    "{}  {}  [{}/{}]",
                    format_time(v.interval_remaining),
                    current,
                    v.interval_number(),
                    v.total_intervals
                )
            }
            SectionView::Amrap(v) => format!(
                "{}  Round {}",
                format_time(v.remaining_time),
                v.current_round
            ),
            SectionView::Manual(v) => format!("{}  elapsed", format_time(v.elapsed_time)),
        }
    }
}

fn row_summary(row: &ExerciseRow) -> String {
    match row.quantity {
        Some(q) => format!("{} ({})", row.name, q),
        None => row.name.clone(),
    }
}

fn write_rows(f: &mut fmt::Formatter<'_>, rows: &[ExerciseRow]) -> fmt::Result {
    for row in rows {
        let marker = if row.active { '>' } else { ' ' };
        match row.quantity {
            Some(q) => writeln!(f, " {} {:>2}. {:<28} {}", marker, row.position, row.name, q)?,
            None => writeln!(f, " {} {:>2}. {}", marker, row.position, row.name)?,
        }
    }
    Ok(())
}

impl fmt::Display for SectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionView::Emom(v) => {
                writeln!(f, "EMOM {} min", v.minutes)?;
                writeln!(
                    f,
                    "Interval {} / {}   {}",
                    v.interval_number(),
                    v.total_intervals,
                    format_time(v.interval_remaining)
                )?;
                if let Some(next) = &v.next {
                    writeln!(f, "Next: {}", row_summary(next))?;
                }
                write_rows(f, &v.exercises)
            }
            SectionView::Amrap(v) => {
                writeln!(f, "AMRAP {} min   {}", v.minutes, format_time(v.remaining_time))?;
                writeln!(f, "Round {}", v.current_round)?;
                write_rows(f, &v.exercises)
            }
            SectionView::Manual(v) => {
                match v.rounds {
                    Some(r) => writeln!(f, "{} x{}   {}", v.kind, r, format_time(v.elapsed_time))?,
                    None => writeln!(f, "{}   {}", v.kind, format_time(v.elapsed_time))?,
                }
                write_rows(f, &v.exercises)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimerState;

    fn section(kind: SectionType) -> WorkoutSection {
        WorkoutSection::new("s", kind)
            .with_duration(600)
            .with_interval(60)
            .with_exercises(vec![
                Exercise::new("wb", "Wall Balls").with_reps(15),
                Exercise::new("ski", "SkiErg").with_distance(250),
                Exercise::new("plank", "Plank").with_duration(45),
            ])
    }

    fn snap(elapsed: u32, interval: u32, exercise: usize) -> TimerSnapshot {
        TimerSnapshot {
            state: TimerState::Running,
            elapsed_time: elapsed,
            interval_time: interval,
            interval_remaining: 60 - interval,
            remaining_time: 600 - elapsed,
            current_round: 1,
            current_exercise: exercise,
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "00:00");
        assert_eq!(format_time(65), "01:05");
        assert_eq!(format_time(3600), "60:00");
    }

    #[test]
    fn test_emom_view_progress() {
        let section = section(SectionType::Emom);
        let view = EmomView::render(&section, &snap(185, 5, 0));
        assert_eq!(view.total_intervals, 10);
        assert_eq!(view.completed_intervals, 3);
        assert_eq!(view.interval_number(), 4);
        assert!((view.progress() - 0.3).abs() < f32::EPSILON);
        assert_eq!(view.interval_remaining, 55);
    }

    #[test]
    fn test_emom_view_highlights_current_and_wraps_next() {
        let section = section(SectionType::Emom);
        let view = EmomView::render(&section, &snap(130, 10, 2));
        let current = view.current.unwrap();
        assert_eq!(current.name, "Plank");
        assert_eq!(current.quantity, Some(Quantity::Seconds(45)));
        assert_eq!(view.next.unwrap().name, "Wall Balls");

        let active: Vec<_> = view.exercises.iter().filter(|r| r.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].position, 3);
    }

    #[test]
    fn test_emom_view_without_interval() {
        let mut section = section(SectionType::Emom);
        section.interval_duration = None;
        section.exercises.clear();
        let view = EmomView::render(&section, &snap(30, 0, 0));
        assert_eq!(view.total_intervals, 0);
        assert_eq!(view.progress(), 0.0);
        assert!(view.current.is_none());
        assert!(view.next.is_none());
    }

    #[test]
    fn test_amrap_view() {
        let section = section(SectionType::Amrap);
        let mut s = snap(100, 0, 0);
        s.current_round = 4;
        let view = SectionView::render(&section, &s);
        assert_eq!(view.primary_action(), Some((PlayerAction::NextRound, "End round")));
        assert_eq!(view.status_line(), "08:20  Round 4");
        match view {
            SectionView::Amrap(v) => {
                assert_eq!(v.minutes, 10);
                assert!(v.exercises.iter().all(|r| !r.active));
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_manual_view_labels() {
        let cooldown = SectionView::render(&section(SectionType::CoolDown), &snap(75, 0, 0));
        assert_eq!(
            cooldown.primary_action(),
            Some((PlayerAction::Complete, "End session"))
        );
        assert_eq!(cooldown.status_line(), "01:15  elapsed");

        for kind in [SectionType::ForTime, SectionType::Rounds, SectionType::Warmup] {
            let view = SectionView::render(&section(kind), &snap(0, 0, 0));
            assert_eq!(view.primary_action(), Some((PlayerAction::Complete, "End round")));
        }
    }

    #[test]
    fn test_rounds_view_shows_round_count() {
        let rounds = WorkoutSection::new("r", SectionType::Rounds)
            .with_rounds(5)
            .with_exercises(vec![Exercise::new("pu", "Pull-up").with_reps(10)]);
        let view = SectionView::render(&rounds, &snap(75, 0, 0));
        let text = view.to_string();
        assert!(text.starts_with("Rounds x5   01:15"));
        assert!(text.contains("Pull-up"));

        // No round count when the plan gives none
        let text = SectionView::render(&section(SectionType::ForTime), &snap(75, 0, 0)).to_string();
        assert!(text.starts_with("ForTime   01:15"));
    }

    #[test]
    fn test_display_lists_exercises() {
        let view = SectionView::render(&section(SectionType::Emom), &snap(65, 5, 1));
        let text = view.to_string();
        assert!(text.contains("EMOM 10 min"));
        assert!(text.contains("Interval 2 / 10"));
        assert!(text.contains(">  2. SkiErg"));
        assert!(text.contains("250m"));
        assert!(text.contains("Next: Plank (45s)"));
    }
}
