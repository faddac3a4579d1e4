use crate::{
    database::{ConnectionState, StoreError, UserStore},
    models::{NewUser, User, UserPatch, UserRecord},
    utils::{
        password::{hash_password, verify_password},
        AppError,
    },
};
use std::sync::Arc;

/// Sole read/write path to user records.
///
/// Every operation validates its input before touching the store and fails
/// with `StoreUnavailable` while the store is not `Connected`. Passwords are
/// hashed here, so plaintext never reaches the store.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub fn state(&self) -> ConnectionState {
        self.store.state()
    }

    fn ensure_connected(&self) -> Result<(), AppError> {
        match self.store.state() {
            ConnectionState::Connected => Ok(()),
            state => Err(AppError::StoreUnavailable(format!(
                "store is {}",
                state.as_str()
            ))),
        }
    }

    /// Creates a user and returns its id.
    pub async fn create(&self, candidate: &NewUser) -> Result<String, AppError> {
        self.register(candidate).await.map(|user| user.id)
    }

    /// Creates a user and returns the stored record.
    pub async fn register(&self, candidate: &NewUser) -> Result<User, AppError> {
        let mut record = UserRecord::validate(candidate)?;
        self.ensure_connected()?;

        if self.store.find_by_email(&record.email).await?.is_some() {
            return Err(AppError::DuplicateEmail(record.email));
        }

        record.password = hash_password(record.password, self.bcrypt_cost).await?;

        match self.store.insert(&record).await {
            Ok(id) => {
                log::info!("👤 User created: {} ({})", record.email, id);
                Ok(User { id, record })
            }
            // Lost a race against a concurrent insert of the same email
            Err(StoreError::DuplicateKey(_)) => Err(AppError::DuplicateEmail(record.email)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.ensure_connected()?;
        Ok(self.store.find_by_email(email.trim()).await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.ensure_connected()?;
        Ok(self.store.find_by_id(id).await?)
    }

    /// Applies a partial update. A new email must not belong to another user;
    /// a new password is hashed before it is stored.
    pub async fn update(&self, id: &str, patch: &UserPatch) -> Result<User, AppError> {
        let patch = patch.validate()?;
        self.ensure_connected()?;

        let mut user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;

        if patch.is_empty() {
            return Ok(user);
        }

        if let Some(email) = patch.email {
            if email != user.record.email {
                if let Some(other) = self.store.find_by_email(&email).await? {
                    if other.id != user.id {
                        return Err(AppError::DuplicateEmail(email));
                    }
                }
            }
            user.record.email = email;
        }
        if let Some(name) = patch.name {
            user.record.name = name;
        }
        if let Some(mobile_no) = patch.mobile_no {
            user.record.mobile_no = mobile_no;
        }
        if let Some(password) = patch.password {
            user.record.password = hash_password(password, self.bcrypt_cost).await?;
        }

        match self.store.replace(&user).await {
            Ok(true) => Ok(user),
            Ok(false) => Err(AppError::NotFound(format!("user {}", id))),
            Err(StoreError::DuplicateKey(_)) => Err(AppError::DuplicateEmail(user.record.email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves an email/password pair to a user. Unknown emails and wrong
    /// passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if verify_password(password.to_string(), user.record.password.clone()).await? {
            Ok(user)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }
}
