//! Embedded PostgreSQL helpers shared by the Diesel repository suites.
//!
//! Every suite gets a fresh temporary database on the process-wide cluster,
//! migrated with the same embedded migrations the server applies at start-up.
//! Set `SKIP_TEST_CLUSTER=1` to skip the suites where no cluster can start.

use std::time::Duration;

use pg_embedded_setup_unpriv::{ClusterHandle, TemporaryDatabase};
use tokio::runtime::Runtime;
use training_backend::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};

const SHARED_CLUSTER_RETRIES: usize = 5;
const SHARED_CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A migrated temporary database and the runtime that drives its pools.
pub struct EmbeddedDatabase {
    pub runtime: Runtime,
    pub database: TemporaryDatabase,
}

impl EmbeddedDatabase {
    /// Connection string of the temporary database.
    pub fn url(&self) -> &str {
        self.database.url()
    }

    /// Small pool over the temporary database for `collection`.
    pub fn pool(&self, collection: &'static str) -> Result<DbPool, String> {
        let config = PoolConfig::new(collection, self.url())
            .with_max_size(2)
            .with_min_idle(Some(1));
        self.runtime
            .block_on(DbPool::new(config))
            .map_err(|err| err.to_string())
    }
}

fn shared_cluster() -> Result<&'static ClusterHandle, String> {
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(err) if attempt >= SHARED_CLUSTER_RETRIES => return Err(format!("{err:?}")),
            Err(_) => {
                std::thread::sleep(SHARED_CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Create and migrate a temporary database.
pub fn embedded_database() -> Result<EmbeddedDatabase, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = shared_cluster()?
        .temporary_database(format!("test_{}", uuid::Uuid::new_v4().simple()))
        .map_err(|err| format!("create temporary database: {err:?}"))?;
    runtime
        .block_on(run_pending_migrations(database.url()))
        .map_err(|err| format!("migrate: {err}"))?;
    Ok(EmbeddedDatabase { runtime, database })
}

/// Render a `postgres` error with its SQLSTATE and message.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    match error.as_db_error() {
        Some(db_error) => format!(
            "postgres error {:?}: {}",
            db_error.code(),
            db_error.message()
        ),
        None => error.to_string(),
    }
}

fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Skip when `SKIP_TEST_CLUSTER` is truthy, otherwise fail loudly.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
