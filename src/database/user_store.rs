use super::{ConnectionMonitor, ConnectionState, MongoDB, StoreError};
use crate::models::{User, UserRecord};
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const USERS_COLLECTION: &str = "users";

/// Persistence seam for user documents.
///
/// Implementations guarantee that no two documents share an email and report
/// a clash as [`StoreError::DuplicateKey`].
#[async_trait]
pub trait UserStore: Send + Sync {
    fn state(&self) -> ConnectionState;

    async fn insert(&self, record: &UserRecord) -> Result<String, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Replaces the stored document with the same id. Returns `false` when no
    /// such document exists.
    async fn replace(&self, user: &User) -> Result<bool, StoreError>;
}

/// Document shape in the `users` collection.
#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(flatten)]
    record: UserRecord,
}

impl From<UserDocument> for User {
    fn from(document: UserDocument) -> Self {
        User {
            id: document.id.to_hex(),
            record: document.record,
        }
    }
}

pub struct MongoUserStore {
    collection: Collection<UserDocument>,
    monitor: Arc<ConnectionMonitor>,
}

impl MongoUserStore {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            collection: db.collection::<UserDocument>(USERS_COLLECTION),
            monitor: db.monitor(),
        }
    }

    /// Converts a driver error, flipping the monitor to `Disconnected` when
    /// the server could not be reached.
    fn observe(&self, err: mongodb::error::Error) -> StoreError {
        let err = StoreError::from(err);
        if let StoreError::Unavailable(msg) = &err {
            log::error!("❌ Lost connection to MongoDB: {}", msg);
            self.monitor.set(ConnectionState::Disconnected);
        }
        err
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    fn state(&self) -> ConnectionState {
        self.monitor.state()
    }

    async fn insert(&self, record: &UserRecord) -> Result<String, StoreError> {
        let document = UserDocument {
            id: ObjectId::new(),
            record: record.clone(),
        };

        self.collection
            .insert_one(&document)
            .await
            .map_err(|e| self.observe(e))?;

        Ok(document.id.to_hex())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.collection
            .find_one(doc! { "email": email })
            .await
            .map(|found| found.map(User::from))
            .map_err(|e| self.observe(e))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        self.collection
            .find_one(doc! { "_id": oid })
            .await
            .map(|found| found.map(User::from))
            .map_err(|e| self.observe(e))
    }

    async fn replace(&self, user: &User) -> Result<bool, StoreError> {
        let Ok(oid) = ObjectId::parse_str(&user.id) else {
            return Ok(false);
        };

        let document = UserDocument {
            id: oid,
            record: user.record.clone(),
        };

        let result = self
            .collection
            .replace_one(doc! { "_id": oid }, &document)
            .await
            .map_err(|e| self.observe(e))?;

        Ok(result.matched_count > 0)
    }
}

/// In-process store with the same uniqueness guarantee as the unique index.
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
    monitor: ConnectionMonitor,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            monitor: ConnectionMonitor::new(ConnectionState::Connected),
        }
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.monitor.set(state);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        match self.monitor.state() {
            ConnectionState::Connected => Ok(()),
            state => Err(StoreError::Unavailable(format!("memory store is {}", state.as_str()))),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    fn state(&self) -> ConnectionState {
        self.monitor.state()
    }

    async fn insert(&self, record: &UserRecord) -> Result<String, StoreError> {
        self.ensure_connected()?;
        let mut users = self.users.write().await;

        if users.values().any(|u| u.record.email == record.email) {
            return Err(StoreError::DuplicateKey(format!("email {}", record.email)));
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        users.insert(
            id.clone(),
            User {
                id: id.clone(),
                record: record.clone(),
            },
        );
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.ensure_connected()?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.record.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.ensure_connected()?;
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn replace(&self, user: &User) -> Result<bool, StoreError> {
        self.ensure_connected()?;
        let mut users = self.users.write().await;

        if !users.contains_key(&user.id) {
            return Ok(false);
        }
        if users
            .values()
            .any(|u| u.id != user.id && u.record.email == user.record.email)
        {
            return Err(StoreError::DuplicateKey(format!("email {}", user.record.email)));
        }

        users.insert(user.id.clone(), user.clone());
        Ok(true)
    }
}
