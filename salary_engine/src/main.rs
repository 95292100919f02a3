//! Entry point for the Salary Engine binary.
//!
//! Running this binary starts the HTTP server for the payroll
//! console.  Configuration is read from the environment (see
//! `config::AppConfig`); `SALARY_CATALOG_FILE` may point at a JSON
//! document used to seed the component catalog.

use salary_engine::config::AppConfig;
use salary_engine::{api, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level)?;
    api::serve(config).await
}
