//! Connection lifecycle and failover.

use crate::db::server_pool::ServerPool;
use crate::driver::{Driver, DriverConnection};
use crate::error::{DbError, DbResult};
use crate::models::ServerDescriptor;
use tracing::{info, warn};

/// Sentinel host name reported while no connection exists.
pub const NO_CONNECTION_HOST: &str = "No Connection";

/// The live connection plus the metadata the layer tracks for it.
struct ActiveConnection<C> {
    conn: C,
    host: String,
    database: String,
    silent_errors: bool,
}

/// Owns at most one driver connection and the failover policy that creates
/// it.
///
/// Failover happens only here, exactly once per connect call, walking the
/// pool in its current order with no retry or backoff. A connection lost
/// mid-statement surfaces as an execution failure; it is never silently
/// re-established for that statement.
pub struct ConnectionManager<D: Driver> {
    driver: D,
    servers: ServerPool,
    active: Option<ActiveConnection<D::Conn>>,
    persistent: bool,
    /// Bumped on every connection replacement or close; the invalidation
    /// key for catalog caches and streaming cursors.
    generation: u64,
}

impl<D: Driver> ConnectionManager<D> {
    /// Create a manager over a driver and server pool. No connection is
    /// established until first use.
    pub fn new(driver: D, servers: Vec<ServerDescriptor>) -> Self {
        Self {
            driver,
            servers: ServerPool::new(servers),
            active: None,
            persistent: false,
            generation: 0,
        }
    }

    /// The driver this manager connects through.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Whether a live connection exists.
    pub fn connection_exists(&self) -> bool {
        self.active.is_some()
    }

    /// Current connection generation. Changes whenever the connection is
    /// replaced or closed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Host of the live connection, or the sentinel when none exists.
    pub fn host(&self) -> String {
        self.active
            .as_ref()
            .map(|a| a.host.clone())
            .unwrap_or_else(|| NO_CONNECTION_HOST.to_string())
    }

    /// Database name of the live connection, or empty when none exists.
    pub fn database_name(&self) -> String {
        self.active
            .as_ref()
            .map(|a| a.database.clone())
            .unwrap_or_default()
    }

    /// Whether suppressed-error mode is active on the live connection.
    /// Always false with no connection.
    pub fn silent(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.silent_errors)
    }

    /// Set the error-reporting mode of the live connection.
    ///
    /// With no connection this is a no-op: the mode is connection-scoped
    /// and is not remembered for future connects.
    pub fn silent_errors(&mut self, silent: bool) {
        if let Some(active) = self.active.as_mut() {
            active.silent_errors = silent;
        }
    }

    /// Randomize the server attempt order for the next connect.
    pub fn load_balance(&mut self) {
        self.servers.load_balance();
    }

    /// Establish a connection, replacing any existing one.
    ///
    /// Walks the pool in current order; the first server that accepts
    /// becomes the active connection and the walk stops. When every server
    /// refuses, fails with the full attempted-host list.
    pub async fn connect(&mut self) -> DbResult<()> {
        self.close().await;

        let mut attempted = Vec::new();
        let descriptors: Vec<ServerDescriptor> = self.servers.descriptors().to_vec();
        for server in &descriptors {
            attempted.push(server.host.clone());
            match self.driver.connect(server, self.persistent).await {
                Ok(conn) => {
                    info!(host = %server.host, database = %server.database, "Connected");
                    self.generation += 1;
                    self.active = Some(ActiveConnection {
                        conn,
                        host: server.host.clone(),
                        database: server.database.clone(),
                        silent_errors: false,
                    });
                    return Ok(());
                }
                Err(err) => {
                    warn!(host = %server.host, error = %err, "Connect attempt failed");
                }
            }
        }

        Err(DbError::connection(
            format!("no server accepted a connection ({} attempted)", attempted.len()),
            attempted,
        ))
    }

    /// Get the live connection, establishing one first if needed.
    pub async fn obtain(&mut self) -> DbResult<&mut D::Conn> {
        if self.active.is_none() {
            self.connect().await?;
        }
        match self.active.as_mut() {
            Some(active) => Ok(&mut active.conn),
            None => Err(DbError::internal("connection missing after connect")),
        }
    }

    /// Get the live connection without connecting.
    pub fn current(&mut self) -> Option<&mut D::Conn> {
        self.active.as_mut().map(|a| &mut a.conn)
    }

    /// Switch persistence mode.
    ///
    /// Equal mode is a no-op. Otherwise the active connection (if any) is
    /// closed and a fresh connect is performed under the new flag.
    pub async fn set_persistent(&mut self, want: bool) -> DbResult<()> {
        if want == self.persistent {
            return Ok(());
        }
        self.persistent = want;
        self.connect().await
    }

    /// Current persistence mode.
    pub fn persistent(&self) -> bool {
        self.persistent
    }

    /// Release the driver connection and clear its metadata.
    pub async fn close(&mut self) {
        if let Some(mut active) = self.active.take() {
            info!(host = %active.host, "Closing connection");
            active.conn.close().await;
            self.generation += 1;
        }
    }
}
