//! MongoDB connection management
//!
//! The driver's `Client` owns its own connection pool, so one client is
//! opened per process and shared by cloning. [`ConnectionManager`] memoizes
//! that client; startup code owns the manager and hands out
//! [`Connection`]s.

use mongodb::bson::doc;
use mongodb::{Client, Database};
use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::error::{Result, StoreError};

/// Memoized client for the process lifetime.
///
/// Concurrent first callers wait on a single open attempt. A failed
/// attempt leaves the manager empty so the next call retries.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    client: OnceCell<Client>,
}

impl ConnectionManager {
    pub const fn new() -> Self {
        Self {
            client: OnceCell::const_new(),
        }
    }

    /// Return the memoized client, opening one to `uri` on first use.
    ///
    /// Once a client exists, later `uri` values are ignored.
    pub async fn connect(&self, uri: &str) -> Result<Client> {
        self.client
            .get_or_try_init(|| open_client(uri))
            .await
            .cloned()
    }

    /// Connect and resolve the database named in `uri`, or `test` when the
    /// URI names none.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let manager = ConnectionManager::new();
    /// let conn = manager.connect_database("mongodb://localhost/lighthouse-dashboard").await?;
    /// let latest = ReportRepo::new(conn.database()).get_latest_report_by_site_id("site").await?;
    /// ```
    pub async fn connect_database(&self, uri: &str) -> Result<Connection> {
        let client = self.connect(uri).await?;
        Ok(Connection::from_client(client))
    }

    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }
}

/// Client plus the database the repositories operate on
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    database: Database,
}

/// Database used when the connection string does not name one
pub const FALLBACK_DATABASE: &str = "test";

impl Connection {
    /// Use the database named in the client's URI, falling back to
    /// [`FALLBACK_DATABASE`] like the other driver clients do.
    pub fn from_client(client: Client) -> Self {
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(FALLBACK_DATABASE));
        Self { client, database }
    }

    /// Use a named database instead of the URI default.
    pub fn with_database(client: Client, name: &str) -> Self {
        let database = client.database(name);
        Self { client, database }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Round trip to the server.
    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

async fn open_client(uri: &str) -> Result<Client> {
    let shown = redact_uri(uri);
    debug!(uri = %shown, "Connect to mongodb");

    let client = Client::with_uri_str(uri).await.map_err(|e| {
        error!(uri = %shown, "{}", e);
        StoreError::connection(shown.clone(), e)
    })?;

    // with_uri_str does not touch the network; ping so a bad host fails here
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| {
            error!(uri = %shown, "{}", e);
            StoreError::connection(shown.clone(), e)
        })?;

    debug!(uri = %shown, "Connection to mongodb established");
    Ok(client)
}

/// Mask credentials in a connection string for logs and errors.
pub fn redact_uri(uri: &str) -> String {
    let Some(scheme_end) = uri.find("://") else {
        return uri.to_string();
    };
    let rest = &uri[scheme_end + 3..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", &uri[..scheme_end], &rest[at + 1..]),
        None => uri.to_string(),
    }
}
