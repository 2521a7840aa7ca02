//! Grouping engine
//!
//! Two-level partition of the flat record stream:
//! 1. by workout key (the record's date truncated to whole local seconds)
//! 2. within a workout, by exact exercise name
//!
//! Both levels keep first-seen order of distinct keys, and records keep input
//! order inside their group, so output is deterministic for a given input.

use crate::record::{FlatRecord, WorkoutDate};
use indexmap::IndexMap;
use strong_common::{Error, Result};

/// Grouping key of a workout: local epoch seconds of its records' dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkoutKey(i64);

impl WorkoutKey {
    pub fn from_date(date: &WorkoutDate) -> Self {
        Self(date.local_epoch_seconds())
    }

    pub fn epoch_seconds(self) -> i64 {
        self.0
    }
}

/// All records of one workout, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutGroup {
    pub key: WorkoutKey,
    /// Date of the last record in input order
    pub start_time: WorkoutDate,
    pub records: Vec<FlatRecord>,
}

impl WorkoutGroup {
    /// Split this workout's records by exercise name
    pub fn exercise_groups(&self) -> Vec<ExerciseGroup<'_>> {
        group_by_exercise(&self.records)
    }
}

/// All records of one exercise within one workout, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseGroup<'a> {
    pub name: &'a str,
    pub records: Vec<&'a FlatRecord>,
}

/// Partition records into workouts
///
/// Records sharing a workout key need not be contiguous. Fails on the first
/// record without a date, since it has no key.
pub fn group_by_workout(records: Vec<FlatRecord>) -> Result<Vec<WorkoutGroup>> {
    let mut groups: IndexMap<WorkoutKey, WorkoutGroup> = IndexMap::new();

    for record in records {
        let date = record.date.ok_or(Error::MissingDate {
            row: record.row,
            line: record.line,
        })?;
        let key = WorkoutKey::from_date(&date);

        let group = groups.entry(key).or_insert_with(|| WorkoutGroup {
            key,
            start_time: date,
            records: Vec::new(),
        });
        group.start_time = date;
        group.records.push(record);
    }

    Ok(groups.into_values().collect())
}

/// Partition one workout's records by exact (case-sensitive) exercise name
pub fn group_by_exercise(records: &[FlatRecord]) -> Vec<ExerciseGroup<'_>> {
    let mut groups: IndexMap<&str, Vec<&FlatRecord>> = IndexMap::new();
    for record in records {
        groups
            .entry(record.exercise_name.as_str())
            .or_default()
            .push(record);
    }
    groups
        .into_iter()
        .map(|(name, records)| ExerciseGroup { name, records })
        .collect()
}
