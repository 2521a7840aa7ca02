//! Conversion pipeline
//!
//! raw rows → [`parse_record`] → [`group_by_workout`] → [`build_workouts`]
//! → [`write_store`]
//!
//! All in-memory work finishes before the output store is created, so a
//! fatal input problem never leaves a file behind. The store is written to a
//! staging file and renamed over the target only after commit, so a failed
//! write never costs the previous store.

use crate::grouping::group_by_workout;
use crate::hierarchy::{build_workouts, Workout};
use crate::ids::{ExerciseRegistry, IdAllocator};
use crate::reader::read_records;
use crate::record::{parse_record, FlatRecord, RawRecord};
use crate::store::write_store;
use serde::Serialize;
use strong_common::config::{ConvertConfig, MissingDatePolicy};
use std::path::Path;
use strong_common::db::{
    create_output_store, publish_output_store, remove_output_store, staging_path,
};
use strong_common::{Error, Result};
use tracing::{info, warn};

/// Outcome of one conversion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub input_rows: usize,
    pub skipped_rows: usize,
    pub workouts: usize,
    pub exercises: usize,
    pub workout_exercises: usize,
    pub sets: usize,
}

/// The fully built hierarchy for one run, ready to persist
#[derive(Debug)]
pub struct Normalized {
    pub workouts: Vec<Workout>,
    pub registry: ExerciseRegistry,
    pub input_rows: usize,
    pub skipped_rows: usize,
}

impl Normalized {
    pub fn summary(&self) -> ConversionSummary {
        ConversionSummary {
            input_rows: self.input_rows,
            skipped_rows: self.skipped_rows,
            workouts: self.workouts.len(),
            exercises: self.registry.len(),
            workout_exercises: self.workouts.iter().map(|w| w.exercises.len()).sum(),
            sets: self.workouts.iter().map(Workout::set_count).sum(),
        }
    }
}

/// Parse, group and build the hierarchy for `raw` records
///
/// Under [`MissingDatePolicy::Abort`] the first dateless record fails the
/// run; under [`MissingDatePolicy::Skip`] it is dropped with a warning.
pub fn normalize(
    raw: &[RawRecord],
    on_missing_date: MissingDatePolicy,
    ids: &mut IdAllocator,
) -> Result<Normalized> {
    let mut records: Vec<FlatRecord> = raw.iter().map(parse_record).collect();
    let input_rows = records.len();

    if on_missing_date == MissingDatePolicy::Skip {
        records.retain(|r| {
            if r.date.is_none() {
                warn!("Skipping row {} (line {}): no parseable Date", r.row, r.line);
            }
            r.date.is_some()
        });
    }
    let skipped_rows = input_rows - records.len();

    let groups = group_by_workout(records)?;
    let mut registry = ExerciseRegistry::new();
    let workouts = build_workouts(&groups, ids, &mut registry);

    Ok(Normalized {
        workouts,
        registry,
        input_rows,
        skipped_rows,
    })
}

/// Run one full conversion as described by `config`
pub async fn run(config: &ConvertConfig) -> Result<ConversionSummary> {
    if !config.input_path.is_file() {
        return Err(Error::InvalidInput(format!(
            "input file not found: {}",
            config.input_path.display()
        )));
    }
    if config.output_path.exists() && !config.overwrite {
        return Err(Error::OutputExists(config.output_path.clone()));
    }

    info!(
        "Reading {} (delimiter {:?})",
        config.input_path.display(),
        config.delimiter as char
    );
    let raw = read_records(&config.input_path, config.delimiter)?;

    let mut ids = IdAllocator::new(config.id_strategy);
    let normalized = normalize(&raw, config.on_missing_date, &mut ids)?;
    let summary = normalized.summary();
    info!(
        "Normalized {} rows into {} workouts using {} identifiers",
        summary.input_rows - summary.skipped_rows,
        summary.workouts,
        ids.strategy()
    );

    persist(&normalized, &config.output_path, config.overwrite).await?;
    Ok(summary)
}

/// Write `normalized` to a staging store, then move it to `output`
///
/// On any failure the staging file is removed and `output` is untouched.
pub async fn persist(normalized: &Normalized, output: &Path, overwrite: bool) -> Result<()> {
    let staging = staging_path(output);
    let pool = create_output_store(&staging, true).await?;
    let written = write_store(&pool, &normalized.workouts, &normalized.registry).await;
    pool.close().await;

    let published = written.and_then(|_| publish_output_store(&staging, output, overwrite));
    if let Err(e) = published {
        warn!("Conversion failed, removing {}", staging.display());
        if let Err(cleanup) = remove_output_store(&staging) {
            warn!("Could not remove {}: {}", staging.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{COL_DATE, COL_EXERCISE_NAME, COL_WORKOUT_NAME};
    use strong_common::config::IdStrategy;
    use tempfile::TempDir;

    fn raw(row: usize, date: &str, exercise: &str) -> RawRecord {
        RawRecord::new(row, row as u64 + 1)
            .with(COL_DATE, date)
            .with(COL_WORKOUT_NAME, "Day 1")
            .with(COL_EXERCISE_NAME, exercise)
    }

    #[test]
    fn test_summary_counts() {
        let rows = vec![
            raw(1, "2023-01-01 09:00:00", "Squat"),
            raw(2, "2023-01-01 09:00:00", "Squat"),
            raw(3, "2023-01-01 09:00:00", "Bench"),
            raw(4, "2023-01-03 09:00:00", "Squat"),
        ];
        let mut ids = IdAllocator::new(IdStrategy::Random);
        let summary = normalize(&rows, MissingDatePolicy::Abort, &mut ids)
            .unwrap()
            .summary();

        assert_eq!(
            summary,
            ConversionSummary {
                input_rows: 4,
                skipped_rows: 0,
                workouts: 2,
                exercises: 2,
                workout_exercises: 3,
                sets: 4,
            }
        );
    }

    #[test]
    fn test_missing_date_aborts_by_default() {
        let rows = vec![raw(1, "2023-01-01 09:00:00", "Squat"), raw(2, "", "Squat")];
        let mut ids = IdAllocator::new(IdStrategy::Random);
        let result = normalize(&rows, MissingDatePolicy::Abort, &mut ids);
        assert!(matches!(result, Err(Error::MissingDate { row: 2, line: 3 })));
    }

    #[test]
    fn test_missing_date_skip_policy() {
        let rows = vec![raw(1, "2023-01-01 09:00:00", "Squat"), raw(2, "garbage", "Squat")];
        let mut ids = IdAllocator::new(IdStrategy::Random);
        let summary = normalize(&rows, MissingDatePolicy::Skip, &mut ids)
            .unwrap()
            .summary();
        assert_eq!(summary.skipped_rows, 1);
        assert_eq!(summary.sets, 1);
    }

    #[test]
    fn test_grouping_is_stable_across_runs() {
        let rows = vec![
            raw(1, "2023-01-02 09:00:00", "Squat"),
            raw(2, "2023-01-01 09:00:00", "Bench"),
            raw(3, "2023-01-02 09:00:00", "Row"),
        ];
        let shape = || {
            let mut ids = IdAllocator::new(IdStrategy::Random);
            let normalized = normalize(&rows, MissingDatePolicy::Abort, &mut ids).unwrap();
            let names: Vec<String> = normalized.registry.iter().map(|(n, _)| n.to_string()).collect();
            let sizes: Vec<usize> = normalized.workouts.iter().map(|w| w.set_count()).collect();
            (names, sizes)
        };
        assert_eq!(shape(), shape());
        assert_eq!(shape().0, vec!["Squat", "Row", "Bench"]);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_store() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("strong.db");
        std::fs::write(&output, b"previous store").unwrap();

        let rows = vec![raw(1, "2023-01-01 09:00:00", "Squat")];
        let mut ids = IdAllocator::new(IdStrategy::Sequential);
        let mut normalized = normalize(&rows, MissingDatePolicy::Abort, &mut ids).unwrap();
        // workout exercises now point at an exercise that is never inserted
        normalized.registry = ExerciseRegistry::new();

        let result = persist(&normalized, &output, true).await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(std::fs::read(&output).unwrap(), b"previous store");
        assert!(!staging_path(&output).exists());
    }

    #[tokio::test]
    async fn test_persist_replaces_previous_store() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("strong.db");
        std::fs::write(&output, b"previous store").unwrap();

        let rows = vec![raw(1, "2023-01-01 09:00:00", "Squat")];
        let mut ids = IdAllocator::new(IdStrategy::Sequential);
        let normalized = normalize(&rows, MissingDatePolicy::Abort, &mut ids).unwrap();

        persist(&normalized, &output, true).await.unwrap();

        assert_ne!(std::fs::read(&output).unwrap(), b"previous store");
        assert!(!staging_path(&output).exists());
    }
}
