//! Output store schema
//!
//! Single source of truth for the normalized tables. Each struct defines the
//! expected schema for one table; column order is the insert tuple order.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut tx = pool.begin().await?;
//! create_tables(&mut tx).await?;
//! // ... bulk inserts ...
//! create_indexes(&mut tx).await?;
//! create_rep_maxes_view(&mut tx).await?;
//! tx.commit().await?;
//! ```

use crate::Result;
use sqlx::SqliteConnection;
use tracing::debug;

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: &'static str,
    /// SQL type ("TEXT", "INTEGER", "REAL")
    pub sql_type: &'static str,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// FOREIGN KEY target as (table, column)
    pub references: Option<(&'static str, &'static str)>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            references: None,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Add a FOREIGN KEY reference
    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }
}

/// Defines the expected schema for one output table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Column definitions (order matters: it is the insert order)
    fn columns() -> Vec<ColumnDefinition>;

    /// `CREATE TABLE` statement for this table
    fn create_sql() -> String {
        let columns = Self::columns();
        let mut parts: Vec<String> = columns
            .iter()
            .map(|c| {
                if c.primary_key {
                    format!("{} {} PRIMARY KEY", c.name, c.sql_type)
                } else {
                    format!("{} {}", c.name, c.sql_type)
                }
            })
            .collect();
        parts.extend(columns.iter().filter_map(|c| {
            c.references
                .map(|(table, column)| format!("FOREIGN KEY({}) REFERENCES {}({})", c.name, table, column))
        }));
        format!("CREATE TABLE {} (\n    {}\n)", Self::table_name(), parts.join(",\n    "))
    }

    /// `INSERT` statement with one placeholder per column
    fn insert_sql() -> String {
        let columns = Self::columns();
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!("INSERT INTO {} VALUES ({})", Self::table_name(), placeholders)
    }
}

pub struct WorkoutTable;

impl TableSchema for WorkoutTable {
    fn table_name() -> &'static str {
        "WORKOUT"
    }

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("WORKOUT_ID", "TEXT").primary_key(),
            ColumnDefinition::new("WORKOUT_START_TIME", "TEXT"),
            ColumnDefinition::new("WORKOUT_DURATION", "TEXT"),
            ColumnDefinition::new("WORKOUT_NAME", "TEXT"),
            ColumnDefinition::new("WORKOUT_NOTES", "TEXT"),
        ]
    }
}

pub struct ExerciseTable;

impl TableSchema for ExerciseTable {
    fn table_name() -> &'static str {
        "EXERCISE"
    }

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("EXERCISE_ID", "TEXT").primary_key(),
            ColumnDefinition::new("EXERCISE_NAME", "TEXT"),
        ]
    }
}

/// Exercise-in-workout link table
///
/// WORKOUT_EXERCISE_ID is a primary key so EXERCISE_SET's foreign key has a
/// valid parent key while `foreign_keys` is enforced.
pub struct WorkoutExerciseTable;

impl TableSchema for WorkoutExerciseTable {
    fn table_name() -> &'static str {
        "WORKOUT_EXERCISE"
    }

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("WORKOUT_EXERCISE_ID", "TEXT").primary_key(),
            ColumnDefinition::new("WORKOUT_ID", "TEXT").references("WORKOUT", "WORKOUT_ID"),
            ColumnDefinition::new("EXERCISE_ID", "TEXT").references("EXERCISE", "EXERCISE_ID"),
        ]
    }
}

pub struct ExerciseSetTable;

impl TableSchema for ExerciseSetTable {
    fn table_name() -> &'static str {
        "EXERCISE_SET"
    }

    fn columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("SET_ID", "TEXT").primary_key(),
            ColumnDefinition::new("WORKOUT_EXERCISE_ID", "TEXT")
                .references("WORKOUT_EXERCISE", "WORKOUT_EXERCISE_ID"),
            ColumnDefinition::new("SET_ORDER", "INTEGER"),
            ColumnDefinition::new("WEIGHT", "REAL"),
            ColumnDefinition::new("WEIGHT_UNIT", "TEXT"),
            ColumnDefinition::new("REPS", "REAL"),
            ColumnDefinition::new("RPE", "REAL"),
            ColumnDefinition::new("DISTANCE", "REAL"),
            ColumnDefinition::new("DISTANCE_UNIT", "TEXT"),
            ColumnDefinition::new("SECONDS", "REAL"),
            ColumnDefinition::new("NOTES", "TEXT"),
        ]
    }
}

/// Secondary indexes, created after the bulk insert
pub const INDEXES: &[&str] = &[
    "CREATE INDEX idx_ex_id ON WORKOUT_EXERCISE(EXERCISE_ID)",
    "CREATE INDEX idx_workout_id ON WORKOUT_EXERCISE(WORKOUT_ID)",
    "CREATE INDEX idx_ex_workout_id ON EXERCISE_SET(WORKOUT_EXERCISE_ID)",
];

/// Best weight per (exercise, whole rep count)
pub const REP_MAXES_VIEW: &str = r#"
CREATE VIEW REP_MAXES AS
SELECT c.EXERCISE_NAME,
       CAST(a.REPS AS INTEGER) AS REP_MAX,
       MAX(a.WEIGHT) AS WEIGHT
FROM EXERCISE_SET a
JOIN WORKOUT_EXERCISE b ON b.WORKOUT_EXERCISE_ID = a.WORKOUT_EXERCISE_ID
JOIN EXERCISE c ON c.EXERCISE_ID = b.EXERCISE_ID
WHERE a.REPS IS NOT NULL
GROUP BY c.EXERCISE_NAME, CAST(a.REPS AS INTEGER)
ORDER BY c.EXERCISE_NAME, CAST(a.REPS AS INTEGER)
"#;

/// Create all four tables, parents before children
pub async fn create_tables(conn: &mut SqliteConnection) -> Result<()> {
    for sql in [
        WorkoutTable::create_sql(),
        ExerciseTable::create_sql(),
        WorkoutExerciseTable::create_sql(),
        ExerciseSetTable::create_sql(),
    ] {
        debug!("{}", sql);
        sqlx::query(&sql).execute(&mut *conn).await?;
    }
    Ok(())
}

pub async fn create_indexes(conn: &mut SqliteConnection) -> Result<()> {
    for sql in INDEXES {
        sqlx::query(sql).execute(&mut *conn).await?;
    }
    Ok(())
}

pub async fn create_rep_maxes_view(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(REP_MAXES_VIEW).execute(&mut *conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_create_sql_includes_foreign_keys() {
        let sql = ExerciseSetTable::create_sql();
        assert!(sql.starts_with("CREATE TABLE EXERCISE_SET ("));
        assert!(sql.contains("SET_ID TEXT PRIMARY KEY"));
        assert!(sql.contains(
            "FOREIGN KEY(WORKOUT_EXERCISE_ID) REFERENCES WORKOUT_EXERCISE(WORKOUT_EXERCISE_ID)"
        ));
    }

    #[test]
    fn test_insert_sql_placeholder_count() {
        assert_eq!(WorkoutTable::insert_sql(), "INSERT INTO WORKOUT VALUES (?, ?, ?, ?, ?)");
        assert_eq!(ExerciseSetTable::insert_sql().matches('?').count(), 11);
    }

    #[tokio::test]
    async fn test_full_schema_creates_tables_indexes_and_view() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();

        create_tables(&mut conn).await.unwrap();
        create_indexes(&mut conn).await.unwrap();
        create_rep_maxes_view(&mut conn).await.unwrap();

        let names: Vec<(String, String)> = sqlx::query_as(
            "SELECT type, name FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name",
        )
        .fetch_all(&mut *conn)
        .await
        .unwrap();

        let expected = vec![
            ("index", "idx_ex_id"),
            ("index", "idx_ex_workout_id"),
            ("index", "idx_workout_id"),
            ("table", "EXERCISE"),
            ("table", "EXERCISE_SET"),
            ("table", "WORKOUT"),
            ("table", "WORKOUT_EXERCISE"),
            ("view", "REP_MAXES"),
        ];
        let actual: Vec<(&str, &str)> = names.iter().map(|(t, n)| (t.as_str(), n.as_str())).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_rep_maxes_truncates_reps_and_takes_max_weight() {
        let pool = setup_test_db().await;
        let mut conn = pool.acquire().await.unwrap();
        create_tables(&mut conn).await.unwrap();
        create_rep_maxes_view(&mut conn).await.unwrap();

        sqlx::query("INSERT INTO EXERCISE VALUES ('ex1', 'Bench Press')")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO WORKOUT VALUES ('w1', '2023-01-01 10:00:00', NULL, 'A', NULL)")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO WORKOUT_EXERCISE VALUES ('we1', 'w1', 'ex1')")
            .execute(&mut *conn)
            .await
            .unwrap();
        for (id, reps, weight) in [("s1", 5.0, 100.0), ("s2", 5.5, 110.0), ("s3", 3.0, 120.0)] {
            sqlx::query(
                "INSERT INTO EXERCISE_SET (SET_ID, WORKOUT_EXERCISE_ID, REPS, WEIGHT) VALUES (?, 'we1', ?, ?)",
            )
            .bind(id)
            .bind(reps)
            .bind(weight)
            .execute(&mut *conn)
            .await
            .unwrap();
        }
        sqlx::query("INSERT INTO EXERCISE_SET (SET_ID, WORKOUT_EXERCISE_ID, WEIGHT) VALUES ('s4', 'we1', 500.0)")
            .execute(&mut *conn)
            .await
            .unwrap();

        let rows: Vec<(String, i64, f64)> =
            sqlx::query_as("SELECT EXERCISE_NAME, REP_MAX, WEIGHT FROM REP_MAXES")
                .fetch_all(&mut *conn)
                .await
                .unwrap();

        assert_eq!(
            rows,
            vec![
                ("Bench Press".to_string(), 3, 120.0),
                ("Bench Press".to_string(), 5, 110.0),
            ]
        );
    }
}
