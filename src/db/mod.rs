//! Decision journal.
//!
//! The advisor core never persists anything; the CLI records each verdict
//! here so past advice can be reviewed:
//! - One row per evaluated signal
//! - Verdict counts for a quick summary

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use crate::models::{DecisionResult, TradeSignal};

/// Database connection pool for the journal.
pub struct Database {
    pool: SqlitePool,
}

/// Stored decision record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredDecision {
    pub id: String,
    pub pair: String,
    pub action: String,
    pub amount: String,
    pub price: String,
    pub decision: String,
    pub confidence: String,
    pub mean_score: String,
    pub risk_assessment: String,
    pub recommended_amount: Option<String>,
    pub reasoning: String,
    pub created_at: String,
}

/// Verdict tallies across the journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionCounts {
    pub total: i64,
    pub approved: i64,
    pub rejected: i64,
    pub held: i64,
}

impl Database {
    /// Create a new database connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run all database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decisions (
                id TEXT PRIMARY KEY,
                pair TEXT NOT NULL,
                action TEXT NOT NULL,
                amount TEXT NOT NULL,
                price TEXT NOT NULL,
                decision TEXT NOT NULL,
                confidence TEXT NOT NULL,
                mean_score TEXT NOT NULL,
                risk_assessment TEXT NOT NULL,
                recommended_amount TEXT,
                reasoning TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_decisions_created ON decisions(created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== Decisions ====================

    /// Record one evaluation. Returns the new row id.
    pub async fn record_decision(
        &self,
        signal: &TradeSignal,
        result: &DecisionResult,
    ) -> Result<String> {
        self.record_decision_at(signal, result, Utc::now()).await
    }

    async fn record_decision_at(
        &self,
        signal: &TradeSignal,
        result: &DecisionResult,
        at: DateTime<Utc>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO decisions (
                id, pair, action, amount, price, decision, confidence,
                mean_score, risk_assessment, recommended_amount, reasoning, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(signal.normalized_pair())
        .bind(signal.action.as_str())
        .bind(signal.amount.to_string())
        .bind(signal.price.to_string())
        .bind(result.decision.as_str())
        .bind(result.confidence.to_string())
        .bind(result.mean_score.to_string())
        .bind(result.risk_assessment.as_str())
        .bind(result.recommended_amount.map(|a| a.to_string()))
        .bind(&result.reasoning)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to record decision")?;

        Ok(id)
    }

    /// Most recent decisions, newest first.
    pub async fn recent_decisions(&self, limit: i64) -> Result<Vec<StoredDecision>> {
        sqlx::query_as::<_, StoredDecision>(
            "SELECT * FROM decisions ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch decisions")
    }

    /// Get decision statistics.
    pub async fn decision_counts(&self) -> Result<DecisionCounts> {
        let (total, approved, rejected, held): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN decision = 'approve' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN decision = 'reject' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN decision = 'hold' THEN 1 ELSE 0 END), 0)
            FROM decisions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DecisionCounts {
            total,
            approved,
            rejected,
            held,
        })
    }
}
