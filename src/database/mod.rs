pub mod user_store;

pub use user_store::*;

use crate::utils::AppError;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_DATABASE: &str = "expense_tracker";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Connectivity of the document store as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

/// Shared, lock-free holder of the current [`ConnectionState`].
#[derive(Debug)]
pub struct ConnectionMonitor(AtomicU8);

impl ConnectionMonitor {
    pub fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn state(&self) -> ConnectionState {
        match self.0.load(Ordering::Acquire) {
            2 => ConnectionState::Connected,
            1 => ConnectionState::Connecting,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn set(&self, state: ConnectionState) {
        let previous = self.0.swap(state as u8, Ordering::AcqRel);
        if previous != state as u8 {
            log::info!("🔌 Store connection: {}", state.as_str());
        }
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unavailable(String),
    DuplicateKey(String),
    Other(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::DuplicateKey(msg) => write!(f, "Duplicate key: {}", msg),
            StoreError::Other(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write_error))
                if write_error.code == DUPLICATE_KEY_CODE =>
            {
                StoreError::DuplicateKey(write_error.message.clone())
            }
            ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE => {
                StoreError::DuplicateKey(command_error.message.clone())
            }
            ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Other(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            // Callers that know which unique key was hit map this themselves
            StoreError::DuplicateKey(msg) => {
                AppError::Internal(format!("Unhandled duplicate key: {}", msg))
            }
            StoreError::Other(msg) => AppError::Internal(msg),
        }
    }
}

/// MongoDB handle shared by every worker.
#[derive(Clone)]
pub struct MongoDB {
    db: Database,
    monitor: Arc<ConnectionMonitor>,
}

impl MongoDB {
    /// Parses the URI and builds the client. No round trip is made here, the
    /// state stays `Disconnected` until [`MongoDB::ping`] succeeds.
    pub async fn connect(uri: &str) -> Result<Self, StoreError> {
        let mut client_options = ClientOptions::parse(uri).await.map_err(|e| {
            StoreError::Other(format!("Invalid DATABASE_URL: {}", e))
        })?;

        client_options.app_name = Some("expense-tracker".to_string());
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(Duration::from_secs(300));

        // Store calls fail fast instead of waiting on an unreachable server
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        Ok(Self {
            db,
            monitor: Arc::new(ConnectionMonitor::default()),
        })
    }

    /// Round trip to the server, driving the connection state machine.
    pub async fn ping(&self) -> Result<(), StoreError> {
        if self.monitor.state() != ConnectionState::Connected {
            self.monitor.set(ConnectionState::Connecting);
        }

        match self.db.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                self.monitor.set(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                self.monitor.set(ConnectionState::Disconnected);
                Err(StoreError::Unavailable(e.to_string()))
            }
        }
    }

    /// Creates the indexes that back the schema constraints.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(USERS_COLLECTION);
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        users.create_index(email_index).await?;
        log::info!("   ✅ Index ready: users(email) unique");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn monitor(&self) -> Arc<ConnectionMonitor> {
        Arc::clone(&self.monitor)
    }

    pub fn state(&self) -> ConnectionState {
        self.monitor.state()
    }
}
