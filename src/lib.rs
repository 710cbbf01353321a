pub mod config;
pub mod csv;
pub mod error;
pub mod fetch;
pub mod identifier;
pub mod listener;
pub mod normalize;
pub mod output;
pub mod poller;
pub mod registry;
pub mod retry;

use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber; `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Loads `.env.local` then `.env` from the working directory, ignoring missing files.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
