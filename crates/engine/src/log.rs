use std::collections::HashMap;

use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{info, warn};

use common::{Execution, ExecutionStatus, Result, TradeOutcome};

/// Append-only trade log.
///
/// Executions are created once, advanced through their status machine, and
/// never deleted. Every status change is an atomic check-and-set under the
/// write lock, then mirrored to SQLite; a late or duplicate settlement
/// finds a terminal status and becomes a no-op. The in-memory map is the
/// source of truth: a failed mirror write is logged, never propagated, so
/// downstream bookkeeping (ledger credit, bot counters) always follows the
/// in-memory transition.
pub struct ExecutionLog {
    entries: RwLock<HashMap<String, Execution>>,
    db: SqlitePool,
}

impl ExecutionLog {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            db,
        }
    }

    /// Append a freshly created (Pending) execution.
    pub async fn insert(&self, execution: &Execution) -> Result<()> {
        {
            let mut entries = self.entries.write().await;
            entries.insert(execution.id.clone(), execution.clone());
        }

        sqlx::query(
            r#"
            INSERT INTO executions
                (id, bot_id, signal_id, symbol, direction, stake, entry_price,
                 executed_at, status, profit)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&execution.id)
        .bind(&execution.bot_id)
        .bind(&execution.signal_id)
        .bind(&execution.symbol)
        .bind(execution.direction.to_string())
        .bind(execution.stake)
        .bind(execution.entry_price)
        .bind(execution.executed_at.to_rfc3339())
        .bind(execution.status.to_string())
        .bind(execution.profit)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Record the broker ack: Pending → Executed with the actual entry price.
    pub async fn mark_executed(&self, execution_id: &str, entry_price: f64) -> Result<()> {
        let updated = {
            let mut entries = self.entries.write().await;
            let execution = entries
                .get_mut(execution_id)
                .ok_or_else(|| common::Error::UnknownExecution(execution_id.to_string()))?;
            execution.transition(ExecutionStatus::Executed)?;
            execution.entry_price = entry_price;
            execution.clone()
        };
        self.persist_status(&updated).await;
        Ok(())
    }

    /// Settle an execution. Returns the settled execution, or `None` when
    /// the status is already terminal (late or duplicate settlement).
    /// Exactly one caller can ever observe `Some` for a given execution.
    pub async fn settle(
        &self,
        execution_id: &str,
        outcome: TradeOutcome,
        profit: f64,
    ) -> Result<Option<Execution>> {
        let settled = {
            let mut entries = self.entries.write().await;
            let execution = entries
                .get_mut(execution_id)
                .ok_or_else(|| common::Error::UnknownExecution(execution_id.to_string()))?;

            let next = match outcome {
                TradeOutcome::Win => ExecutionStatus::Won,
                TradeOutcome::Loss => ExecutionStatus::Lost,
            };
            if !execution.status.can_transition_to(next) {
                return Ok(None);
            }
            execution.status = next;
            execution.profit = Some(profit);
            execution.clone()
        };
        self.persist_status(&settled).await;
        Ok(Some(settled))
    }

    /// Mark a pending execution failed (broker rejected the order).
    /// `None` if the execution already reached a terminal state.
    pub async fn fail(&self, execution_id: &str) -> Result<Option<Execution>> {
        self.terminate(execution_id, ExecutionStatus::Failed).await
    }

    /// Cancel one in-flight execution. `None` if it already settled.
    pub async fn cancel(&self, execution_id: &str) -> Result<Option<Execution>> {
        self.terminate(execution_id, ExecutionStatus::Cancelled).await
    }

    /// Cancel every non-terminal execution owned by `bot_id`. Returns the
    /// executions that were actually cancelled; any that settle first are
    /// left alone.
    pub async fn cancel_open_for_bot(&self, bot_id: &str) -> Vec<Execution> {
        let cancelled = {
            let mut entries = self.entries.write().await;
            let mut cancelled = Vec::new();
            for execution in entries.values_mut() {
                if execution.bot_id == bot_id
                    && execution.status.can_transition_to(ExecutionStatus::Cancelled)
                {
                    execution.status = ExecutionStatus::Cancelled;
                    cancelled.push(execution.clone());
                }
            }
            cancelled
        };
        for execution in &cancelled {
            self.persist_status(execution).await;
            info!(execution = %execution.id, bot = %execution.bot_id, "Execution cancelled");
        }
        cancelled
    }

    pub async fn get(&self, execution_id: &str) -> Option<Execution> {
        self.entries.read().await.get(execution_id).cloned()
    }

    pub async fn all(&self) -> Vec<Execution> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn open(&self) -> Vec<Execution> {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.status.is_terminal())
            .cloned()
            .collect()
    }

    async fn terminate(
        &self,
        execution_id: &str,
        terminal: ExecutionStatus,
    ) -> Result<Option<Execution>> {
        let updated = {
            let mut entries = self.entries.write().await;
            let execution = entries
                .get_mut(execution_id)
                .ok_or_else(|| common::Error::UnknownExecution(execution_id.to_string()))?;
            if !execution.status.can_transition_to(terminal) {
                return Ok(None);
            }
            execution.status = terminal;
            execution.clone()
        };
        self.persist_status(&updated).await;
        Ok(Some(updated))
    }

    async fn persist_status(&self, execution: &Execution) {
        let result = sqlx::query(
            r#"
            UPDATE executions
            SET status = ?1, profit = ?2, entry_price = ?3
            WHERE id = ?4
            "#,
        )
        .bind(execution.status.to_string())
        .bind(execution.profit)
        .bind(execution.entry_price)
        .bind(&execution.id)
        .execute(&self.db)
        .await;
        if let Err(e) = result {
            warn!(execution = %execution.id, error = %e, "Failed to mirror status change to database");
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection so the in-memory database is shared.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query(
        r#"
        CREATE TABLE executions (
            id TEXT PRIMARY KEY,
            bot_id TEXT NOT NULL,
            signal_id TEXT NOT NULL,
            symbol TEXT NOT NULL,
            direction TEXT NOT NULL,
            stake REAL NOT NULL,
            entry_price REAL NOT NULL,
            executed_at TEXT NOT NULL,
            status TEXT NOT NULL,
            profit REAL
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    pool
}
