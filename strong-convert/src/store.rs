//! Persistence of the built hierarchy
//!
//! Everything (tables, rows, indexes, view) is written in one transaction:
//! if any statement fails the transaction is dropped and nothing is
//! committed.

use crate::hierarchy::Workout;
use crate::ids::ExerciseRegistry;
use sqlx::{SqliteConnection, SqlitePool};
use strong_common::db::{
    create_indexes, create_rep_maxes_view, create_tables, ExerciseSetTable, ExerciseTable,
    TableSchema, WorkoutExerciseTable, WorkoutTable,
};
use strong_common::Result;
use tracing::{debug, info};

/// Row counts written per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub workouts: usize,
    pub exercises: usize,
    pub workout_exercises: usize,
    pub sets: usize,
}

/// Write schema and data to a fresh store
pub async fn write_store(
    pool: &SqlitePool,
    workouts: &[Workout],
    registry: &ExerciseRegistry,
) -> Result<StoreCounts> {
    let mut tx = pool.begin().await?;

    create_tables(&mut tx).await?;
    let counts = insert_all(&mut tx, workouts, registry).await?;
    create_indexes(&mut tx).await?;
    create_rep_maxes_view(&mut tx).await?;

    tx.commit().await?;

    info!(
        "Committed {} workouts, {} exercises, {} workout exercises, {} sets",
        counts.workouts, counts.exercises, counts.workout_exercises, counts.sets
    );
    Ok(counts)
}

/// Insert rows parents-first: EXERCISE, WORKOUT, WORKOUT_EXERCISE, EXERCISE_SET
async fn insert_all(
    conn: &mut SqliteConnection,
    workouts: &[Workout],
    registry: &ExerciseRegistry,
) -> Result<StoreCounts> {
    let mut counts = StoreCounts::default();

    let sql = ExerciseTable::insert_sql();
    for (name, exercise_id) in registry.iter() {
        sqlx::query(&sql)
            .bind(exercise_id)
            .bind(name)
            .execute(&mut *conn)
            .await?;
        counts.exercises += 1;
    }
    debug!("Inserted {} exercises", counts.exercises);

    let sql = WorkoutTable::insert_sql();
    for workout in workouts {
        sqlx::query(&sql)
            .bind(&workout.workout_id)
            .bind(workout.start_time.to_string())
            .bind(&workout.duration)
            .bind(&workout.name)
            .bind(&workout.notes)
            .execute(&mut *conn)
            .await?;
        counts.workouts += 1;
    }
    debug!("Inserted {} workouts", counts.workouts);

    let sql = WorkoutExerciseTable::insert_sql();
    for exercise in workouts.iter().flat_map(|w| &w.exercises) {
        sqlx::query(&sql)
            .bind(&exercise.workout_exercise_id)
            .bind(&exercise.workout_id)
            .bind(&exercise.exercise_id)
            .execute(&mut *conn)
            .await?;
        counts.workout_exercises += 1;
    }
    debug!("Inserted {} workout exercises", counts.workout_exercises);

    let sql = ExerciseSetTable::insert_sql();
    for set in workouts
        .iter()
        .flat_map(|w| &w.exercises)
        .flat_map(|e| &e.sets)
    {
        sqlx::query(&sql)
            .bind(&set.set_id)
            .bind(&set.workout_exercise_id)
            .bind(set.set_order)
            .bind(set.weight)
            .bind(&set.weight_unit)
            .bind(set.reps)
            .bind(set.rpe)
            .bind(set.distance)
            .bind(&set.distance_unit)
            .bind(set.seconds)
            .bind(&set.notes)
            .execute(&mut *conn)
            .await?;
        counts.sets += 1;
    }
    debug!("Inserted {} sets", counts.sets);

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::{ExerciseSet, WorkoutExercise};
    use crate::ids::IdAllocator;
    use crate::record::parse_date;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use strong_common::config::IdStrategy;

    async fn memory_pool() -> SqlitePool {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap()
    }

    fn sample() -> (Vec<Workout>, ExerciseRegistry) {
        let mut ids = IdAllocator::new(IdStrategy::Sequential);
        let mut registry = ExerciseRegistry::new();
        let workout_id = ids.new_id();
        let workout_exercise_id = ids.new_id();
        let exercise_id = ids.exercise_id(&mut registry, "Squat");
        let set = ExerciseSet {
            set_id: ids.new_id(),
            workout_exercise_id: workout_exercise_id.clone(),
            set_order: Some(1),
            weight: None,
            weight_unit: Some("kg".to_string()),
            reps: Some(5.0),
            rpe: None,
            distance: None,
            distance_unit: None,
            seconds: None,
            notes: Some(String::new()),
        };
        let workout = Workout {
            workout_id: workout_id.clone(),
            start_time: parse_date(Some("2023-01-01 09:00:00")).unwrap(),
            duration: Some("45m".to_string()),
            name: Some("Day 1".to_string()),
            notes: None,
            exercises: vec![WorkoutExercise {
                workout_exercise_id,
                workout_id,
                exercise_id,
                sets: vec![set],
            }],
        };
        (vec![workout], registry)
    }

    #[tokio::test]
    async fn test_writes_all_tables() {
        let pool = memory_pool().await;
        let (workouts, registry) = sample();

        let counts = write_store(&pool, &workouts, &registry).await.unwrap();
        assert_eq!(
            counts,
            StoreCounts {
                workouts: 1,
                exercises: 1,
                workout_exercises: 1,
                sets: 1
            }
        );

        let (start, duration, name, notes): (String, Option<String>, Option<String>, Option<String>) =
            sqlx::query_as(
                "SELECT WORKOUT_START_TIME, WORKOUT_DURATION, WORKOUT_NAME, WORKOUT_NOTES FROM WORKOUT",
            )
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(start, "2023-01-01 09:00:00");
        assert_eq!(duration.as_deref(), Some("45m"));
        assert_eq!(name.as_deref(), Some("Day 1"));
        assert_eq!(notes, None);

        let (weight, notes): (Option<f64>, Option<String>) =
            sqlx::query_as("SELECT WEIGHT, NOTES FROM EXERCISE_SET")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(weight, None);
        assert_eq!(notes.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_failed_write_commits_nothing() {
        let pool = memory_pool().await;
        let (mut workouts, registry) = sample();
        // Dangling parent reference violates the EXERCISE_SET foreign key
        workouts[0].exercises[0].sets[0].workout_exercise_id = "missing!".to_string();

        let result = write_store(&pool, &workouts, &registry).await;
        assert!(result.is_err());

        let objects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(objects, 0);
    }
}
