// src/logging.rs

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::CONFIG;

/// Installs the global tracing subscriber at the configured level. Called
/// once by the hosting process; a second call is a no-op (the first
/// subscriber wins).
pub fn init() {
    let level = Level::from_str(&CONFIG.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
