//! Shim host for the AppLatch detection engine.
//!
//! This binary runs as the off-device counterpart of the on-device
//! accessibility shim. It communicates via stdin/stdout using the shim's
//! length-prefixed messaging protocol.

use applatch_lib::db::{migrations, Database};
use applatch_lib::detector::Detector;
use applatch_lib::host::{HostPlatform, ShimHost};
use applatch_lib::platform::Platform;
use applatch_lib::session::UnlockState;
use applatch_lib::settings::SettingsRepository;
use directories::ProjectDirs;
use log::error;
use std::io;
use std::sync::{Arc, Mutex};

/// Error type for AppLatch initialization failures
#[derive(Debug)]
enum InitError {
    NoProjectDirs,
    DataDirCreation(std::io::Error),
    DatabaseOpen(rusqlite::Error),
    Migration(rusqlite::Error),
    Startup(applatch_lib::error::AppError),
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitError::NoProjectDirs => write!(f, "Could not determine project directories"),
            InitError::DataDirCreation(e) => write!(f, "Could not create data directory: {}", e),
            InitError::DatabaseOpen(e) => write!(f, "Failed to open database: {}", e),
            InitError::Migration(e) => write!(f, "Failed to run database migrations: {}", e),
            InitError::Startup(e) => write!(f, "Failed to start detector: {}", e),
        }
    }
}

impl std::error::Error for InitError {}

fn get_db_path() -> Result<std::path::PathBuf, InitError> {
    let proj_dirs =
        ProjectDirs::from("dev", "applatch", "AppLatch").ok_or(InitError::NoProjectDirs)?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(InitError::DataDirCreation)?;
    Ok(data_dir.join("applatch.db"))
}

fn build_host() -> Result<ShimHost, InitError> {
    let db_path = get_db_path()?;
    let db = Database::open(&db_path).map_err(InitError::DatabaseOpen)?;
    migrations::run(db.connection()).map_err(InitError::Migration)?;

    let db = Arc::new(Mutex::new(db));
    let settings = Arc::new(SettingsRepository::new(db));
    let session = Arc::new(UnlockState::new());
    let platform = Arc::new(HostPlatform::new(Box::new(io::stdout())));

    let detector = Detector::new(
        settings,
        session,
        Arc::clone(&platform) as Arc<dyn Platform>,
    );
    detector.on_created().map_err(InitError::Startup)?;

    Ok(ShimHost::new(detector, platform))
}

fn main() {
    env_logger::init();

    let mut host = match build_host() {
        Ok(host) => host,
        Err(e) => {
            error!("AppLatch initialization failed: {}", e);
            eprintln!("AppLatch initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    // Run the shim host event loop
    // This will read from stdin and write to stdout until the connection is closed
    if let Err(e) = host.run() {
        // Only report unexpected errors; EOF is expected when the shim closes the connection
        if e.kind() != std::io::ErrorKind::UnexpectedEof {
            error!("Shim host error: {}", e);
            std::process::exit(1);
        }
    }
}
