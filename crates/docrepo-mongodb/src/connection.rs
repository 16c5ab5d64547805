//! MongoDB connection configuration and client setup

use bson::doc;
use docrepo_common::{RepositoryError, Result};
use mongodb::{
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Database,
};
use std::time::Duration;
use tracing::{info, instrument};

/// Environment variable holding the connection string
pub const URI_ENV: &str = "MONGODB_URI";

/// Environment variable overriding the database name
pub const DATABASE_ENV: &str = "MONGODB_DATABASE";

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool
    pub min_pool_size: Option<u32>,
    /// Maximum number of connections in the pool
    pub max_pool_size: Option<u32>,
    /// Maximum time a connection can remain idle before being closed
    pub max_idle_time: Option<Duration>,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout (default: 30s)
    pub server_selection_timeout: Option<Duration>,
    /// Application name for server logs
    pub app_name: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: None,
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            app_name: Some("docrepo".to_string()),
        }
    }
}

impl PoolConfig {
    /// Apply the configured values onto parsed client options
    pub fn apply(&self, client_options: &mut ClientOptions) {
        if let Some(min) = self.min_pool_size {
            client_options.min_pool_size = Some(min);
        }
        if let Some(max) = self.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(idle) = self.max_idle_time {
            client_options.max_idle_time = Some(idle);
        }
        if let Some(connect) = self.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = self.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if let Some(app) = &self.app_name {
            client_options.app_name = Some(app.clone());
        }
    }
}

/// Where and how to connect
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// MongoDB connection string
    pub connection_string: String,
    /// Database name; falls back to the connection string's default database
    pub database_name: Option<String>,
    /// Pool settings
    pub pool: PoolConfig,
}

impl ContextConfig {
    /// Configuration with default pool settings
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            database_name: None,
            pool: PoolConfig::default(),
        }
    }

    /// Use a specific database instead of the connection string's default
    pub fn with_database(mut self, name: impl Into<String>) -> Self {
        self.database_name = Some(name.into());
        self
    }

    /// Override the pool settings
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Read `MONGODB_URI` and the optional `MONGODB_DATABASE`
    pub fn from_env() -> Result<Self> {
        let uri = std::env::var(URI_ENV).map_err(|_| {
            RepositoryError::Connection(format!("{} is not set", URI_ENV))
        })?;

        let mut config = Self::new(uri);
        if let Ok(name) = std::env::var(DATABASE_ENV) {
            if !name.is_empty() {
                config.database_name = Some(name);
            }
        }
        Ok(config)
    }
}

/// Build a client from the configuration and return the target database
#[instrument(skip(config), fields(database = ?config.database_name))]
pub async fn connect(config: &ContextConfig) -> Result<Database> {
    let mut client_options = ClientOptions::parse(config.connection_string.as_str()).await?;
    config.pool.apply(&mut client_options);

    // Stable API version for compatibility
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)?;

    let database = match &config.database_name {
        Some(name) => client.database(name),
        None => client.default_database().ok_or_else(|| {
            RepositoryError::Connection(
                "No default database specified in connection string".to_string(),
            )
        })?,
    };

    info!(database = database.name(), "MongoDB client ready");
    Ok(database)
}

/// Check that the server answers a ping
pub async fn ping(database: &Database) -> Result<()> {
    database.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}
