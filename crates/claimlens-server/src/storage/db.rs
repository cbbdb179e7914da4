//! PostgreSQL storage layer for the external claim table
//!
//! All four statements filter with `lower(creator) = lower($1)`; case
//! varies in input addresses, so the comparison must be
//! case-insensitive.

use anyhow::Context;
use claimlens_core::{AggregatedRow, ClaimlensError, Result};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres};

use crate::Config;

pub struct Database {
    pool: PgPool,
    table: String,
}

impl Database {
    /// Connect to the claim store and probe it once. The probe makes an
    /// unreachable store a startup failure instead of a first-request
    /// surprise.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        tracing::info!("Connecting to claim store, table: {}", config.table);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await
            .context("Failed to open claim store connection pool")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Claim store probe failed")?;

        tracing::info!("Claim store probe succeeded");

        Ok(Self {
            pool,
            table: config.table.clone(),
        })
    }

    /// Pool that connects on first use instead of up front, so handler
    /// paths that never reach a query stay testable without a store.
    #[cfg(test)]
    pub fn connect_lazy(config: &Config) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&config.database_url)
            .expect("test database URL must parse");

        Self {
            pool,
            table: config.table.clone(),
        }
    }

    /// Check out one pooled connection for the duration of a request.
    /// Dropping it returns it to the pool on every exit path.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(query_err)
    }

    /// Total matching claim count. 0 when nothing matches.
    pub async fn count_claims(&self, conn: &mut PgConnection, creator: &str) -> Result<i64> {
        let stmt = count_stmt(&self.table);
        sqlx::query_scalar(&stmt)
            .bind(creator)
            .fetch_one(conn)
            .await
            .map_err(query_err)
    }

    /// Count of distinct recipient addresses among the matches.
    pub async fn unique_address_count(
        &self,
        conn: &mut PgConnection,
        creator: &str,
    ) -> Result<i64> {
        let stmt = unique_stmt(&self.table);
        sqlx::query_scalar(&stmt)
            .bind(creator)
            .fetch_one(conn)
            .await
            .map_err(query_err)
    }

    /// Sum of `value` among the matches. COALESCE keeps this 0.0
    /// rather than NULL when nothing matches.
    pub async fn total_value_sum(&self, conn: &mut PgConnection, creator: &str) -> Result<f64> {
        let stmt = sum_stmt(&self.table);
        sqlx::query_scalar(&stmt)
            .bind(creator)
            .fetch_one(conn)
            .await
            .map_err(query_err)
    }

    /// Per-recipient totals, largest `total_value` first, truncated to
    /// `limit`. The limit affects only this preview, never the
    /// aggregate counts.
    pub async fn query_rows(
        &self,
        conn: &mut PgConnection,
        creator: &str,
        limit: i64,
    ) -> Result<Vec<AggregatedRow>> {
        let stmt = rows_stmt(&self.table);
        let rows: Vec<ClaimRow> = sqlx::query_as(&stmt)
            .bind(creator)
            .bind(limit)
            .fetch_all(conn)
            .await
            .map_err(query_err)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

fn query_err(e: sqlx::Error) -> ClaimlensError {
    ClaimlensError::Query(e.to_string())
}

/// The table name is interpolated into statement text (it cannot be a
/// bind parameter), so it comes only from startup configuration and
/// must pass this check first.
pub fn is_safe_table_name(table: &str) -> bool {
    !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn count_stmt(table: &str) -> String {
    format!("SELECT count(1) FROM {} WHERE lower(creator) = lower($1)", table)
}

fn unique_stmt(table: &str) -> String {
    format!(
        "SELECT COUNT(DISTINCT to_address) FROM {} WHERE lower(creator) = lower($1)",
        table
    )
}

fn sum_stmt(table: &str) -> String {
    format!(
        "SELECT COALESCE(SUM(value), 0)::FLOAT8 FROM {} WHERE lower(creator) = lower($1)",
        table
    )
}

fn rows_stmt(table: &str) -> String {
    format!(
        r#"
        SELECT
          to_address,
          SUM(value)::FLOAT8 AS total_value,
          COUNT(*) AS claim_count,
          creator
        FROM {}
        WHERE lower(creator) = lower($1)
        GROUP BY to_address, creator
        ORDER BY total_value DESC
        LIMIT $2
        "#,
        table
    )
}

// Helper struct for sqlx query_as; the store driver's loosely typed
// row becomes a typed struct here, with defaults applied at the
// boundary
#[derive(sqlx::FromRow)]
struct ClaimRow {
    to_address: Option<String>,
    total_value: Option<f64>,
    claim_count: Option<i64>,
    creator: Option<String>,
}

impl From<ClaimRow> for AggregatedRow {
    fn from(r: ClaimRow) -> Self {
        AggregatedRow {
            to_address: r.to_address.unwrap_or_default().trim().to_string(),
            total_value: r.total_value.unwrap_or(0.0),
            claim_count: r.claim_count.unwrap_or(0),
            creator: r.creator.unwrap_or_default().trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_table_names() {
        assert!(is_safe_table_name("public.merkle"));
        assert!(is_safe_table_name("merkle"));
        assert!(is_safe_table_name("schema_2.claims_v1"));

        assert!(!is_safe_table_name(""));
        assert!(!is_safe_table_name("public.merkle; DROP TABLE users"));
        assert!(!is_safe_table_name("merkle--"));
        assert!(!is_safe_table_name("merkle claims"));
        assert!(!is_safe_table_name("\"merkle\""));
    }

    #[test]
    fn test_statements_compare_creator_case_insensitively() {
        for stmt in [
            count_stmt("public.merkle"),
            unique_stmt("public.merkle"),
            sum_stmt("public.merkle"),
            rows_stmt("public.merkle"),
        ] {
            assert!(
                stmt.contains("lower(creator) = lower($1)"),
                "missing case-insensitive predicate in: {}",
                stmt
            );
            assert!(stmt.contains("FROM public.merkle"));
        }
    }

    #[test]
    fn test_sum_statement_coalesces_to_zero() {
        assert!(sum_stmt("public.merkle").contains("COALESCE(SUM(value), 0)"));
    }

    #[test]
    fn test_rows_statement_orders_and_limits() {
        let stmt = rows_stmt("public.merkle");
        assert!(stmt.contains("GROUP BY to_address, creator"));
        assert!(stmt.contains("ORDER BY total_value DESC"));
        assert!(stmt.contains("LIMIT $2"));
    }

    #[test]
    fn test_claim_row_defaults_and_trims_at_the_boundary() {
        let row = ClaimRow {
            to_address: Some("  0xabc  ".to_string()),
            total_value: None,
            claim_count: None,
            creator: None,
        };

        let agg: AggregatedRow = row.into();
        assert_eq!(agg.to_address, "0xabc");
        assert_eq!(agg.total_value, 0.0);
        assert_eq!(agg.claim_count, 0);
        assert_eq!(agg.creator, "");
    }
}
