//! MSP Billing Core - Worker Binary
//!
//! Applies migrations and runs the overdue refresh sweep for one company.
//!
//! # Usage
//!
//! ```bash
//! BILLING_DATABASE_URL=postgres://... BILLING_COMPANY_ID=<uuid> cargo run --bin billing-worker
//! ```
//!
//! # Environment Variables
//!
//! * `BILLING_DATABASE_URL` - PostgreSQL connection string
//! * `BILLING_MAX_CONNECTIONS` - Pool size (default: 5)
//! * `BILLING_COMPANY_ID` - Company to sweep (required)
//! * `BILLING_ACTOR_ID` - User recorded on worker changes (default: nil uuid)
//! * `BILLING_TIMEZONE` - IANA timezone of the company (default: UTC)
//! * `BILLING_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `BILLING_LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::sync::Arc;

use anyhow::Context;

use core_kernel::{CompanyId, OperationContext, UserId};
use infra_db::{create_pool, run_migrations, PostgresInvoiceStore};
use interface_worker::{run_overdue_sweep, telemetry, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env().context("invalid BILLING_* configuration")?;
    telemetry::init_tracing(&config.log_level, config.log_format);

    let company_id = config
        .company_id
        .map(CompanyId::from)
        .context("BILLING_COMPANY_ID is required")?;

    tracing::info!(company_id = %company_id, timezone = ?config.timezone, "Starting billing worker");

    let pool = create_pool(config.database())
        .await
        .context("failed to connect to the database")?;
    run_migrations(&pool).await.context("failed to apply migrations")?;

    let ctx = OperationContext::new(company_id, UserId::from(config.actor_id))
        .with_timezone(config.timezone);
    let store = Arc::new(PostgresInvoiceStore::new(pool));

    let report = run_overdue_sweep(store, &ctx)
        .await
        .context("overdue refresh failed")?;

    tracing::info!(
        examined = report.examined,
        transitioned = report.transitioned.len(),
        failed = report.failed.len(),
        "Billing worker finished"
    );
    Ok(())
}
