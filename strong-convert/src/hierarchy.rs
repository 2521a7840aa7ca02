//! Hierarchy builder
//!
//! Turns grouped records into Workout → WorkoutExercise → ExerciseSet
//! entities, threading identifiers from the [`IdAllocator`] and resolving
//! exercise identifiers through the run's [`ExerciseRegistry`].

use crate::grouping::{ExerciseGroup, WorkoutGroup};
use crate::ids::{ExerciseRegistry, IdAllocator};
use crate::record::{FlatRecord, WorkoutDate};

/// One recorded performance of an exercise
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSet {
    pub set_id: String,
    pub workout_exercise_id: String,
    /// Copied verbatim from the export; gaps and duplicates pass through
    pub set_order: Option<i64>,
    pub weight: Option<f64>,
    pub weight_unit: Option<String>,
    pub reps: Option<f64>,
    pub rpe: Option<f64>,
    pub distance: Option<f64>,
    pub distance_unit: Option<String>,
    pub seconds: Option<f64>,
    pub notes: Option<String>,
}

impl ExerciseSet {
    fn from_record(record: &FlatRecord, set_id: String, workout_exercise_id: &str) -> Self {
        Self {
            set_id,
            workout_exercise_id: workout_exercise_id.to_string(),
            set_order: record.set_order,
            weight: record.weight,
            weight_unit: record.weight_unit.clone(),
            reps: record.reps,
            rpe: record.rpe,
            distance: record.distance,
            distance_unit: record.distance_unit.clone(),
            seconds: record.seconds,
            notes: record.notes.clone(),
        }
    }
}

/// An exercise as performed within one workout
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutExercise {
    pub workout_exercise_id: String,
    pub workout_id: String,
    pub exercise_id: String,
    pub sets: Vec<ExerciseSet>,
}

/// One training session
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub workout_id: String,
    pub start_time: WorkoutDate,
    pub duration: Option<String>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub exercises: Vec<WorkoutExercise>,
}

impl Workout {
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// Build every workout, in group order
pub fn build_workouts(
    groups: &[WorkoutGroup],
    ids: &mut IdAllocator,
    registry: &mut ExerciseRegistry,
) -> Vec<Workout> {
    groups
        .iter()
        .map(|group| build_workout(group, ids, registry))
        .collect()
}

/// Build one workout and its children
///
/// Name, notes and duration take the last non-empty value among the
/// workout's records; an empty cell never clears an earlier value.
pub fn build_workout(
    group: &WorkoutGroup,
    ids: &mut IdAllocator,
    registry: &mut ExerciseRegistry,
) -> Workout {
    let workout_id = ids.new_id_for(&format!("workout:{}", group.key.epoch_seconds()));

    let mut workout = Workout {
        workout_id,
        start_time: group.start_time,
        duration: None,
        name: None,
        notes: None,
        exercises: Vec::new(),
    };

    for record in &group.records {
        overwrite_if_present(&mut workout.duration, &record.workout_duration);
        overwrite_if_present(&mut workout.name, &record.workout_name);
        overwrite_if_present(&mut workout.notes, &record.workout_notes);
    }

    workout.exercises = group
        .exercise_groups()
        .iter()
        .map(|exercise| build_workout_exercise(&workout.workout_id, exercise, ids, registry))
        .collect();

    workout
}

fn build_workout_exercise(
    workout_id: &str,
    group: &ExerciseGroup<'_>,
    ids: &mut IdAllocator,
    registry: &mut ExerciseRegistry,
) -> WorkoutExercise {
    let workout_exercise_id = ids.new_id_for(&format!("workout_exercise:{}:{}", workout_id, group.name));
    let exercise_id = ids.exercise_id(registry, group.name);

    let sets = group
        .records
        .iter()
        .map(|record| {
            let set_id = ids.new_id_for(&format!("set:{}:{}", workout_exercise_id, record.row));
            ExerciseSet::from_record(record, set_id, &workout_exercise_id)
        })
        .collect();

    WorkoutExercise {
        workout_exercise_id,
        workout_id: workout_id.to_string(),
        exercise_id,
        sets,
    }
}

fn overwrite_if_present(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        *slot = Some(v.to_string());
    }
}
