//! Workout plan loading and validation.
//!
//! Plans are `WorkoutStructure` documents stored as JSON (the shape the
//! training-plan API serves) or TOML.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Cached built-in sample workout
static SAMPLE_WORKOUT: Lazy<WorkoutStructure> = Lazy::new(sample_workout);

/// Get a reference to the cached sample workout
pub fn get_sample_workout() -> &'static WorkoutStructure {
    &SAMPLE_WORKOUT
}

/// Load a workout from a `.json` or `.toml` file
pub fn load_workout(path: &Path) -> Result<WorkoutStructure> {
    let contents = std::fs::read_to_string(path)?;
    let workout: WorkoutStructure = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&contents)?,
        Some("json") | None => serde_json::from_str(&contents)?,
        Some(other) => {
            return Err(Error::Plan(format!(
                "Unsupported plan format '.{}' for {:?}",
                other, path
            )))
        }
    };
    tracing::info!(
        "Loaded workout '{}' with {} section(s) from {:?}",
        workout.title,
        workout.sections.len(),
        path
    );
    Ok(workout)
}

/// Resolve a plan argument to a file path
///
/// Existing paths are used as-is. Otherwise `name`, `name.json` and
/// `name.toml` are tried inside `plans_dir`.
pub fn resolve_plan_path(name: &str, plans_dir: &Path) -> Result<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Ok(direct);
    }

    let candidates = [
        plans_dir.join(name),
        plans_dir.join(format!("{}.json", name)),
        plans_dir.join(format!("{}.toml", name)),
    ];
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| Error::Plan(format!("No plan named '{}' in {:?}", name, plans_dir)))
}

impl WorkoutStructure {
    /// Check the workout for problems that would degrade playback
    ///
    /// Returns a list of human readable issues, empty when the plan is sound.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.is_empty() {
            errors.push("Workout has empty ID".to_string());
        }
        if self.title.is_empty() {
            errors.push(format!("Workout '{}' has empty title", self.id));
        }
        if self.sections.is_empty() {
            errors.push(format!("Workout '{}' has no sections", self.id));
        }

        let mut section_ids = HashSet::new();
        for (idx, section) in self.sections.iter().enumerate() {
            let label = if section.id.is_empty() {
                errors.push(format!("Section {} has empty ID", idx + 1));
                format!("#{}", idx + 1)
            } else {
                section.id.clone()
            };
            if !section.id.is_empty() && !section_ids.insert(section.id.as_str()) {
                errors.push(format!("Duplicate section ID '{}'", section.id));
            }
            errors.extend(section.validate().into_iter().map(|e| format!("Section '{}': {}", label, e)));
        }

        errors
    }
}

impl WorkoutSection {
    /// Section-level checks, see [`WorkoutStructure::validate`]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.exercises.is_empty() {
            errors.push("has no exercises".to_string());
        }

        if self.kind == SectionType::Emom {
            match self.interval_duration {
                None => errors.push("EMOM without intervalDuration never advances".to_string()),
                Some(0) => errors.push("intervalDuration must be greater than 0".to_string()),
                Some(_) => {}
            }
        }
        if self.kind.auto_completes() && self.duration.is_none() {
            errors.push(format!("{} without duration never completes on its own", self.kind));
        }
        if self.duration == Some(0) {
            errors.push("duration must be greater than 0".to_string());
        }

        let mut ids = HashSet::new();
        for ex in &self.exercises {
            if ex.id.is_empty() {
                errors.push(format!("exercise '{}' has empty ID", ex.name));
            } else if !ids.insert(ex.id.as_str()) {
                errors.push(format!("duplicate exercise ID '{}'", ex.id));
            }
            if ex.name.is_empty() {
                errors.push(format!("exercise '{}' has empty name", ex.id));
            }
            for (field, value) in [
                ("reps", ex.reps),
                ("duration", ex.duration),
                ("distance", ex.distance),
            ] {
                if value == Some(0) {
                    errors.push(format!("exercise '{}' has {} of 0", ex.id, field));
                }
            }
        }

        errors
    }
}

/// Builds the built-in sample workout: a Hyrox engine session
pub fn sample_workout() -> WorkoutStructure {
    WorkoutStructure {
        id: "hyrox_engine_01".into(),
        title: "Hyrox Engine Builder".into(),
        date: None,
        sections: vec![
            WorkoutSection::new("warmup", SectionType::Warmup)
                .with_title("Warm-up")
                .with_exercises(vec![
                    Exercise::new("row_easy", "Row (easy)").with_distance(500),
                    Exercise::new("worlds_greatest", "World's Greatest Stretch").with_reps(6),
                    Exercise::new("air_squat", "Air Squat").with_reps(15),
                ]),
            WorkoutSection::new("emom_main", SectionType::Emom)
                .with_title("EMOM 12")
                .with_duration(720)
                .with_interval(60)
                .with_exercises(vec![
                    Exercise::new("wall_balls", "Wall Balls").with_reps(15),
                    Exercise::new("skierg", "SkiErg").with_distance(200),
                    Exercise::new("burpee_broad_jump", "Burpee Broad Jump").with_reps(8),
                ]),
            WorkoutSection::new("amrap_finisher", SectionType::Amrap)
                .with_title("AMRAP 8")
                .with_duration(480)
                .with_exercises(vec![
                    Exercise::new("sandbag_lunge", "Sandbag Lunges").with_distance(20),
                    Exercise::new("farmers_carry", "Farmers Carry").with_distance(50),
                    Exercise::new("kb_swing", "Kettlebell Swing").with_reps(12),
                ]),
            WorkoutSection::new("run_for_time", SectionType::ForTime)
                .with_title("1 km Buy-out")
                .with_exercises(vec![Exercise::new("run", "Run").with_distance(1000)]),
            WorkoutSection::new("cooldown", SectionType::CoolDown)
                .with_title("Cool-down")
                .with_exercises(vec![
                    Exercise::new("bike_easy", "Bike (easy)").with_duration(300),
                    Exercise::new("couch_stretch", "Couch Stretch").with_duration(60),
                ]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_workout_is_valid() {
        let workout = sample_workout();
        let errors = workout.validate();
        assert!(errors.is_empty(), "Sample workout errors: {:?}", errors);
        assert_eq!(workout.sections.len(), 5);
        assert_eq!(get_sample_workout().id, workout.id);
    }

    #[test]
    fn test_validate_reports_problems() {
        let workout = WorkoutStructure {
            id: "w".into(),
            title: "Broken".into(),
            date: None,
            sections: vec![
                WorkoutSection::new("e", SectionType::Emom),
                WorkoutSection::new("e", SectionType::Amrap).with_exercises(vec![
                    Exercise::new("x", "Row").with_reps(0),
                    Exercise::new("x", "Row again"),
                ]),
            ],
        };
        let errors = workout.validate();
        let has = |needle: &str| errors.iter().any(|e| e.contains(needle));

        assert!(has("Section 'e': has no exercises"));
        assert!(has("EMOM without intervalDuration"));
        assert!(has("EMOM without duration"));
        assert!(has("AMRAP without duration"));
        assert!(has("Duplicate section ID 'e'"));
        assert!(has("duplicate exercise ID 'x'"));
        assert!(has("exercise 'x' has reps of 0"));
    }

    #[test]
    fn test_empty_workout_invalid() {
        let workout = WorkoutStructure {
            id: "w".into(),
            title: "Nothing".into(),
            date: None,
            sections: vec![],
        };
        assert_eq!(workout.validate(), vec!["Workout 'w' has no sections".to_string()]);
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("sample.json");
        std::fs::write(&json_path, serde_json::to_string_pretty(&sample_workout()).unwrap())
            .unwrap();
        let loaded = load_workout(&json_path).unwrap();
        assert_eq!(loaded, sample_workout());

        let toml_path = dir.path().join("short.toml");
        std::fs::write(
            &toml_path,
            r#"
id = "short"
title = "Short EMOM"
date = "2026-01-05"

[[sections]]
id = "emom"
type = "EMOM"
duration = 300
intervalDuration = 60

[[sections.exercises]]
id = "burpee"
name = "Burpee"
reps = 10
"#,
        )
        .unwrap();
        let loaded = load_workout(&toml_path).unwrap();
        assert_eq!(loaded.sections[0].kind, SectionType::Emom);
        assert_eq!(loaded.sections[0].interval_duration, Some(60));
        assert!(loaded.date.is_some());
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        std::fs::write(&path, "id: x").unwrap();
        assert!(matches!(load_workout(&path), Err(Error::Plan(_))));
    }

    #[test]
    fn test_resolve_plan_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monday.json");
        std::fs::write(&path, "{}").unwrap();

        assert_eq!(resolve_plan_path("monday", dir.path()).unwrap(), path);
        assert_eq!(
            resolve_plan_path(path.to_str().unwrap(), Path::new("/nonexistent")).unwrap(),
            path
        );
        assert!(resolve_plan_path("tuesday", dir.path()).is_err());
    }
}
