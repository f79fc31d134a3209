// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Volley - coordinated chat reporting from a pool of Telegram sessions.
//!
//! Binary entry point. Each invocation loads configuration, connects the
//! session pool, runs one command, and exits.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod actions;
mod doctor;
mod status;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::warn;

use volley_config::VolleyConfig;
use volley_core::{RequesterId, SessionCredential, VolleyError};
use volley_engine::{
    AccessGate, ActionDispatcher, DispatchConfig, RateLimiter, RetryPolicy, SessionPool,
};
use volley_storage::{Database, SqliteAuditStore};
use volley_telegram::HttpConnector;

/// Volley - coordinated chat reporting from a pool of Telegram sessions.
#[derive(Parser, Debug)]
#[command(name = "volley", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Report a chat from every currently idle session.
    Report {
        /// Chat to report: @name, a t.me link, or text containing one.
        chat_ref: String,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Resolve a user and record the profile.
    Lookup {
        /// Username or forwarded text to resolve.
        query: String,
        /// Print the record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Send a message from every idle session to its saved messages.
    Broadcast {
        /// Message text.
        message: String,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Show pool state and recorded totals.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Run environment diagnostics.
    Doctor {
        /// Run intensive checks as well.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

/// Connected subsystems a command runs against.
struct App {
    dispatcher: ActionDispatcher,
    pool: Arc<SessionPool>,
    db: Database,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match volley_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            volley_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log.level);

    if let Err(err) = run(cli.command, &config).await {
        eprintln!("volley: {err}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &VolleyConfig) -> Result<(), VolleyError> {
    // Doctor must run even when the pool or database cannot come up.
    if let Commands::Doctor { deep, plain } = command {
        return doctor::run_doctor(config, deep, plain).await;
    }

    let app = build_app(config).await?;
    let requester = RequesterId(config.owner.id);
    let result = match command {
        Commands::Report { chat_ref, plain } => {
            actions::run_report(&app, requester, &chat_ref, plain).await
        }
        Commands::Lookup { query, json } => {
            actions::run_lookup(&app, requester, &query, json).await
        }
        Commands::Broadcast { message, plain } => {
            actions::run_broadcast(&app, requester, &message, plain).await
        }
        Commands::Status { json, plain } => status::run_status(&app, json, plain).await,
        Commands::Doctor { .. } => Ok(()), // handled above
    };

    if let Err(err) = app.db.close().await {
        warn!(error = %err, "database did not close cleanly");
    }
    result
}

/// Connect every configured subsystem: database, audit store, session pool,
/// dispatcher. Sessions that fail to authenticate are skipped, not fatal.
async fn build_app(config: &VolleyConfig) -> Result<App, VolleyError> {
    let db = Database::open(&config.storage.database_path).await?;
    let store = Arc::new(SqliteAuditStore::new(db.clone()));

    let connector = HttpConnector::new(config.platform.base_url.clone());
    let credentials: Vec<SessionCredential> = config
        .platform
        .sessions
        .iter()
        .map(|entry| entry.credential())
        .collect();
    let limiter = RateLimiter::new(Duration::from_secs(config.pool.fallback_cooldown_secs));
    let (pool, failures) = SessionPool::connect_all(&connector, &credentials, limiter).await;
    if !failures.is_empty() {
        eprintln!(
            "volley: {} of {} sessions failed to connect",
            failures.len(),
            credentials.len()
        );
    }
    let pool = Arc::new(pool);

    let dispatch = DispatchConfig {
        job_deadline: Duration::from_secs(config.dispatch.job_deadline_secs),
        acquire_timeout: Duration::from_secs(config.dispatch.acquire_timeout_secs),
        lookup_retry_wait: Duration::from_secs(config.dispatch.lookup_retry_wait_secs),
        max_fanout: config.dispatch.max_fanout,
        retry: RetryPolicy {
            network_attempts: config.dispatch.network_attempts,
            base_delay: Duration::from_millis(config.dispatch.retry_base_delay_ms),
        },
    };
    let gate = AccessGate::new(RequesterId(config.owner.id));
    let dispatcher = ActionDispatcher::new(Arc::clone(&pool), store, gate, dispatch);

    Ok(App {
        dispatcher,
        pool,
        db,
    })
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so that `--json` output on stdout stays parseable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "volley={log_level},volley_engine={log_level},volley_storage={log_level},volley_telegram={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn empty_config_is_rejected() {
        // owner.id has no usable default; a bare config must not validate.
        let result = volley_config::load_and_validate_str("");
        let errors = result.expect_err("config without an owner should fail");
        assert!(errors.iter().any(|e| e.to_string().contains("owner.id")));
    }
}
