use internal::{domain::audit::AuditEntry, port::audit::AuditDrivenPort};
use log::{debug, error, warn};
use sqlx::{PgPool, query};
use tokio::runtime::Handle;

pub struct AuditRepository {
    pool: PgPool,
    table: String,
}

impl AuditRepository {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        query(&Self::create_table_statement(&self.table))
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow::anyhow!("Unable to create audit table {}: {}", self.table, e))?;
        Ok(())
    }

    fn create_table_statement(table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
             id BIGSERIAL PRIMARY KEY, \
             device_id TEXT, \
             action TEXT NOT NULL, \
             details JSONB NOT NULL, \
             recorded_at TIMESTAMPTZ NOT NULL)"
        )
    }

    fn insert_statement(table: &str) -> String {
        format!("INSERT INTO {table} (device_id, action, details, recorded_at) VALUES ($1, $2, $3, $4)")
    }
}

impl AuditDrivenPort for AuditRepository {
    fn record(&self, entry: AuditEntry) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No runtime to record audit entry {}", entry.action);
            return;
        };
        let pool = self.pool.clone();
        let statement = Self::insert_statement(&self.table);
        runtime.spawn(async move {
            let action = entry.action.clone();
            match query(&statement)
                .bind(entry.device_id)
                .bind(entry.action)
                .bind(entry.details)
                .bind(entry.timestamp)
                .execute(&pool)
                .await
            {
                Ok(_) => debug!("Audit entry {action} recorded"),
                Err(e) => error!("Unable to record audit entry {action}: {e}"),
            }
        });
    }
}
