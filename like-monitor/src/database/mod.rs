//! Database module for like-monitor.
//!
//! Read-only access to the shop's MySQL order table through sqlx.

pub mod models;
pub mod repositories;

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, Pool};

use crate::config::settings::DatabaseSettings;

/// Database connection pool type alias.
pub type DbPool = Pool<MySql>;

/// Default connection pool size.
const DEFAULT_POOL_SIZE: u32 = 10;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

fn connect_options(settings: &DatabaseSettings) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.name)
        .charset("utf8mb4")
}

/// Create the pool without connecting.
///
/// Connections are opened on first use, so an unreachable database fails
/// the pass that needs it instead of process startup.
pub fn init_pool(settings: &DatabaseSettings) -> DbPool {
    init_pool_with_size(settings, DEFAULT_POOL_SIZE)
}

pub fn init_pool_with_size(settings: &DatabaseSettings, max_connections: u32) -> DbPool {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_lazy_with(connect_options(settings));

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        database = %settings.name,
        max_connections,
        "Database pool initialized"
    );
    pool
}
