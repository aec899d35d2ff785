//! Dispatch server - field-service job lifecycle and live tracking
//!
//! # Overview
//!
//! - **Jobs** (`jobs`): ticket intake, offers, claims and the job status
//!   state machine, persisted in redb
//! - **ETA** (`eta`): routing-backed arrival estimates with manual fallback
//! - **Geo** (`geo`): technician positions and reverse geocoding
//! - **Disclosure** (`disclosure`): which fields each viewer may see
//! - **Tracking** (`tracking`): assembled snapshots for polling clients
//! - **HTTP API** (`api`): REST interface behind bearer-token auth
//!
//! # Layout
//!
//! ```text
//! dispatch-server/src/
//! ├── core/          # config, state, server, background tasks
//! ├── auth/          # JWT validation, role middleware
//! ├── api/           # routes and handlers
//! ├── jobs/          # state machine and storage
//! ├── eta/           # estimator and routing clients
//! ├── geo/           # positions and geocoding
//! ├── disclosure/    # per-role field visibility
//! ├── tracking/      # snapshot assembly, poll cadence
//! └── utils/         # logging, validation
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod disclosure;
pub mod eta;
pub mod geo;
pub mod jobs;
pub mod tracking;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use crate::core::{Config, Server, ServerState, build_router};
pub use jobs::{Actor, JobsManager};
pub use tracking::TrackingFeed;
pub use utils::{AppError, AppResult};

pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

// Security logging macro
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load `.env`, read configuration and start logging
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let log_dir = config.log_dir();
    init_logger_with_file(&config.log_level, config.log_json, log_dir.to_str())?;
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
    ____  _                   __       __
   / __ \(_)________  ____ _/ /______/ /_
  / / / / / ___/ __ \/ __ `/ __/ ___/ __ \
 / /_/ / (__  ) /_/ / /_/ / /_/ /__/ / / /
/_____/_/____/ .___/\__,_/\__/\___/_/ /_/
            /_/
    "#
    );
}
