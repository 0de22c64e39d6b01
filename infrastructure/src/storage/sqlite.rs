//! SQLite trial repository

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use jury_application::{RepositoryError, TrialRepository};
use jury_domain::{InteractionType, Persona, Trial, TrialInteraction, TrialStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS trials (
        id                TEXT PRIMARY KEY,
        original_question TEXT NOT NULL,
        personas          TEXT NOT NULL,
        status            TEXT NOT NULL,
        verdict           TEXT,
        created_at        TEXT NOT NULL,
        completed_at      TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trial_interactions (
        seq              INTEGER PRIMARY KEY AUTOINCREMENT,
        id               TEXT NOT NULL UNIQUE,
        trial_id         TEXT NOT NULL REFERENCES trials(id) ON DELETE CASCADE,
        interaction_type TEXT NOT NULL,
        speaker          TEXT NOT NULL,
        content          TEXT NOT NULL,
        target_persona   TEXT,
        timestamp        TEXT NOT NULL,
        round_number     INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_trial_interactions_trial
        ON trial_interactions (trial_id, round_number, timestamp)
    "#,
];

/// SQLite-backed [`TrialRepository`]
#[derive(Clone)]
pub struct SqliteTrialRepository {
    pool: SqlitePool,
}

impl SqliteTrialRepository {
    /// Open (creating if missing) the database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                RepositoryError::Storage(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(storage_err)?;

        info!("Trial database opened at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Private in-memory database; a single connection keeps it alive.
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(storage_err)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage_err)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(storage_err)?;
        }
        Ok(Self { pool })
    }

    async fn interactions_for(&self, trial_id: &str) -> Result<Vec<TrialInteraction>, RepositoryError> {
        let rows: Vec<InteractionRow> = sqlx::query_as(
            r#"
            SELECT id, trial_id, interaction_type, speaker, content,
                   target_persona, timestamp, round_number
            FROM trial_interactions
            WHERE trial_id = ?
            ORDER BY round_number ASC, timestamp ASC, seq ASC
            "#,
        )
        .bind(trial_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(TrialInteraction::try_from).collect()
    }

    async fn hydrate(&self, row: TrialRow) -> Result<Trial, RepositoryError> {
        let mut trial = Trial::try_from(row)?;
        trial.interactions = self.interactions_for(&trial.id).await?;
        Ok(trial)
    }

    fn expect_row(affected: u64, trial_id: &str) -> Result<(), RepositoryError> {
        if affected == 0 {
            return Err(RepositoryError::NotFound(trial_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TrialRepository for SqliteTrialRepository {
    async fn save_trial(&self, trial: &Trial) -> Result<(), RepositoryError> {
        let personas = serde_json::to_string(&trial.personas)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        // Upsert rather than REPLACE, which would cascade-delete interactions
        sqlx::query(
            r#"
            INSERT INTO trials (id, original_question, personas, status, verdict, created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                original_question = excluded.original_question,
                personas = excluded.personas,
                status = excluded.status,
                verdict = excluded.verdict,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&trial.id)
        .bind(&trial.original_question)
        .bind(personas)
        .bind(trial.status.as_str())
        .bind(&trial.verdict)
        .bind(encode_time(&trial.created_at))
        .bind(trial.completed_at.as_ref().map(encode_time))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!("Saved trial {} ({})", trial.id, trial.status);
        Ok(())
    }

    async fn load_trials(&self) -> Result<Vec<Trial>, RepositoryError> {
        let rows: Vec<TrialRow> = sqlx::query_as(
            r#"
            SELECT id, original_question, personas, status, verdict, created_at, completed_at
            FROM trials
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut trials = Vec::with_capacity(rows.len());
        for row in rows {
            trials.push(self.hydrate(row).await?);
        }
        Ok(trials)
    }

    async fn get_trial(&self, id: &str) -> Result<Option<Trial>, RepositoryError> {
        let row: Option<TrialRow> = sqlx::query_as(
            r#"
            SELECT id, original_question, personas, status, verdict, created_at, completed_at
            FROM trials
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn save_interaction(
        &self,
        interaction: &TrialInteraction,
    ) -> Result<(), RepositoryError> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM trials WHERE id = ?")
            .bind(&interaction.trial_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound(interaction.trial_id.clone()));
        }

        sqlx::query(
            r#"
            INSERT INTO trial_interactions
                (id, trial_id, interaction_type, speaker, content, target_persona, timestamp, round_number)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&interaction.id)
        .bind(&interaction.trial_id)
        .bind(interaction.interaction_type.as_str())
        .bind(&interaction.speaker)
        .bind(&interaction.content)
        .bind(&interaction.target_persona)
        .bind(encode_time(&interaction.timestamp))
        .bind(i64::from(interaction.round_number))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn load_interactions(
        &self,
        trial_id: &str,
    ) -> Result<Vec<TrialInteraction>, RepositoryError> {
        self.interactions_for(trial_id).await
    }

    async fn update_status(
        &self,
        trial_id: &str,
        status: TrialStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE trials SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(trial_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Self::expect_row(result.rows_affected(), trial_id)
    }

    async fn update_verdict(
        &self,
        trial_id: &str,
        verdict: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE trials SET verdict = ?, status = ?, completed_at = ? WHERE id = ?",
        )
        .bind(verdict)
        .bind(TrialStatus::Completed.as_str())
        .bind(encode_time(&completed_at))
        .bind(trial_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Self::expect_row(result.rows_affected(), trial_id)
    }

    async fn mark_failed(
        &self,
        trial_id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE trials SET status = ?, completed_at = ? WHERE id = ?")
            .bind(TrialStatus::Failed.as_str())
            .bind(encode_time(&completed_at))
            .bind(trial_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Self::expect_row(result.rows_affected(), trial_id)
    }
}

// ==================== Row Mapping ====================

#[derive(sqlx::FromRow)]
struct TrialRow {
    id: String,
    original_question: String,
    personas: String,
    status: String,
    verdict: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl TryFrom<TrialRow> for Trial {
    type Error = RepositoryError;

    fn try_from(row: TrialRow) -> Result<Self, Self::Error> {
        let personas: Vec<Persona> = serde_json::from_str(&row.personas)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        Ok(Trial {
            id: row.id,
            original_question: row.original_question,
            personas,
            interactions: Vec::new(),
            status: TrialStatus::from_str(&row.status).map_err(serialization_err)?,
            verdict: row.verdict,
            created_at: decode_time(&row.created_at)?,
            completed_at: row.completed_at.as_deref().map(decode_time).transpose()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    id: String,
    trial_id: String,
    interaction_type: String,
    speaker: String,
    content: String,
    target_persona: Option<String>,
    timestamp: String,
    round_number: i64,
}

impl TryFrom<InteractionRow> for TrialInteraction {
    type Error = RepositoryError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        Ok(TrialInteraction {
            id: row.id,
            trial_id: row.trial_id,
            interaction_type: InteractionType::from_str(&row.interaction_type)
                .map_err(serialization_err)?,
            speaker: row.speaker,
            content: row.content,
            target_persona: row.target_persona,
            timestamp: decode_time(&row.timestamp)?,
            round_number: u32::try_from(row.round_number)
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        })
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Serialization(format!("bad timestamp {raw:?}: {e}")))
}

fn storage_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

fn serialization_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Serialization(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn jury() -> Vec<Persona> {
        vec![
            Persona::with_id("vc", "The VC", "Investor", "You are a VC."),
            Persona::with_id("mom", "The Mom", "Parent", "You are a mom."),
        ]
    }

    #[tokio::test]
    async fn test_trial_round_trip_with_personas() {
        let repo = SqliteTrialRepository::in_memory().await.unwrap();
        let trial = Trial::new("Should I move?", jury());
        repo.save_trial(&trial).await.unwrap();

        let loaded = repo.get_trial(&trial.id).await.unwrap().unwrap();
        assert_eq!(loaded.personas, trial.personas);
        assert_eq!(loaded.status, TrialStatus::Initializing);
        assert_eq!(loaded.created_at, trial.created_at);
        assert!(loaded.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_interactions() {
        let repo = SqliteTrialRepository::in_memory().await.unwrap();
        let mut trial = Trial::new("q", jury());
        repo.save_trial(&trial).await.unwrap();
        repo.save_interaction(&TrialInteraction::initial_question(&trial.id, "q"))
            .await
            .unwrap();

        trial.status = TrialStatus::GatheringInitialResponses;
        repo.save_trial(&trial).await.unwrap();

        let loaded = repo.get_trial(&trial.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, TrialStatus::GatheringInitialResponses);
        assert_eq!(loaded.interactions.len(), 1);
        assert_eq!(
            loaded.interactions[0].interaction_type,
            InteractionType::InitialQuestion
        );
    }

    #[tokio::test]
    async fn test_interaction_order_and_fields() {
        let repo = SqliteTrialRepository::in_memory().await.unwrap();
        let trial = Trial::new("q", jury());
        repo.save_trial(&trial).await.unwrap();

        let now = Utc::now();
        let mut follow_up = TrialInteraction::follow_up_question(&trial.id, "vc", "Why?", 2);
        follow_up.timestamp = now - Duration::seconds(30);
        let mut first = TrialInteraction::initial_response(&trial.id, "mom", "first");
        first.timestamp = now;
        let mut second = TrialInteraction::initial_response(&trial.id, "vc", "second");
        second.timestamp = now;

        for interaction in [&follow_up, &first, &second] {
            repo.save_interaction(interaction).await.unwrap();
        }

        let loaded = repo.load_interactions(&trial.id).await.unwrap();
        let contents: Vec<&str> = loaded.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "Why?"]);
        assert_eq!(loaded[2].target_persona.as_deref(), Some("vc"));
        assert_eq!(loaded[2].round_number, 2);
        assert_eq!(loaded[2].timestamp, follow_up.timestamp);
    }

    #[tokio::test]
    async fn test_verdict_and_failure() {
        let repo = SqliteTrialRepository::in_memory().await.unwrap();
        let done = Trial::new("a", jury());
        let failed = Trial::new("b", jury());
        repo.save_trial(&done).await.unwrap();
        repo.save_trial(&failed).await.unwrap();
        let at = Utc::now();

        repo.update_verdict(&done.id, "Move.", at).await.unwrap();
        repo.mark_failed(&failed.id, at).await.unwrap();

        let done = repo.get_trial(&done.id).await.unwrap().unwrap();
        assert_eq!(done.status, TrialStatus::Completed);
        assert_eq!(done.verdict.as_deref(), Some("Move."));
        assert_eq!(done.completed_at, Some(at));

        let failed = repo.get_trial(&failed.id).await.unwrap().unwrap();
        assert_eq!(failed.status, TrialStatus::Failed);
        assert_eq!(failed.completed_at, Some(at));
        assert!(failed.verdict.is_none());
    }

    #[tokio::test]
    async fn test_unknown_trial() {
        let repo = SqliteTrialRepository::in_memory().await.unwrap();
        assert!(repo.get_trial("ghost").await.unwrap().is_none());
        assert_eq!(
            repo.update_status("ghost", TrialStatus::Deliberating).await,
            Err(RepositoryError::NotFound("ghost".to_string()))
        );
        assert!(matches!(
            repo.save_interaction(&TrialInteraction::initial_question("ghost", "q"))
                .await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_trials_newest_first() {
        let repo = SqliteTrialRepository::in_memory().await.unwrap();
        let mut older = Trial::new("old", jury());
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = Trial::new("new", jury());
        repo.save_trial(&older).await.unwrap();
        repo.save_trial(&newer).await.unwrap();

        let questions: Vec<String> = repo
            .load_trials()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.original_question)
            .collect();
        assert_eq!(questions, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("trials.db");
        let trial = Trial::new("durable?", jury());

        {
            let repo = SqliteTrialRepository::open(&path).await.unwrap();
            repo.save_trial(&trial).await.unwrap();
            repo.save_interaction(&TrialInteraction::initial_question(&trial.id, "durable?"))
                .await
                .unwrap();
            repo.pool.close().await;
        }

        let repo = SqliteTrialRepository::open(&path).await.unwrap();
        let loaded = repo.get_trial(&trial.id).await.unwrap().unwrap();
        assert_eq!(loaded.original_question, "durable?");
        assert_eq!(loaded.interactions.len(), 1);
    }
}
