use std::cell::RefCell;
use std::collections::HashMap;

use leptos::logging::{error, warn};
use leptos::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::config::api_base;
use crate::model::{session_version_text, LoginRequest, User};

/// Storage key of the persisted session, in both local and session storage.
pub const SESSION_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub token: String,
    #[serde(default, deserialize_with = "session_version_text")]
    pub session_version: Option<String>,
}

impl Session {
    /// A session stays valid until the server's session version moves past the one it was issued
    /// under. A server that reports no version accepts every session.
    pub fn is_current(&self, server_version: Option<&str>) -> bool {
        match server_version {
            None => true,
            Some(version) => self.session_version.as_deref() == Some(version),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,
    #[error("failed to write storage: {0}")]
    Write(String),
    #[error("failed to serialize session: {0}")]
    Serialize(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
}

/// In-memory store, used where there is no browser storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserStorage {
    /// `localStorage`, survives the browser being closed.
    Local,
    /// `sessionStorage`, dropped with the tab.
    Session,
}

#[cfg(feature = "hydrate")]
impl BrowserStorage {
    fn storage(&self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        let storage = match self {
            BrowserStorage::Local => window.local_storage(),
            BrowserStorage::Session => window.session_storage(),
        };
        storage.ok().flatten()
    }
}

#[cfg(feature = "hydrate")]
impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()
            .ok_or(StorageError::Unavailable)?
            .set_item(key, value)
            .map_err(|e| StorageError::Write(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.storage() {
            let _ = storage.remove_item(key);
        }
    }
}

// Outside the browser there is nothing to persist to.
#[cfg(not(feature = "hydrate"))]
impl KeyValueStore for BrowserStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove(&self, _key: &str) {}
}

/// Persists the session to exactly one of two stores: durable when the user asked to be
/// remembered, ephemeral otherwise.
#[derive(Debug, Clone, Copy)]
pub struct SessionStore<D, E> {
    durable: D,
    ephemeral: E,
}

impl SessionStore<BrowserStorage, BrowserStorage> {
    pub const fn browser() -> Self {
        Self {
            durable: BrowserStorage::Local,
            ephemeral: BrowserStorage::Session,
        }
    }
}

impl<D: KeyValueStore, E: KeyValueStore> SessionStore<D, E> {
    pub fn new(durable: D, ephemeral: E) -> Self {
        Self { durable, ephemeral }
    }

    pub fn durable(&self) -> &D {
        &self.durable
    }

    pub fn ephemeral(&self) -> &E {
        &self.ephemeral
    }

    /// Reads the durable slot first, then the ephemeral one. Corrupt entries are skipped.
    pub fn restore(&self) -> Option<Session> {
        [self.durable.get(SESSION_KEY), self.ephemeral.get(SESSION_KEY)]
            .into_iter()
            .flatten()
            .find_map(|raw| match serde_json::from_str::<Session>(&raw) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!("Failed to parse stored session: {}", e);
                    None
                }
            })
    }

    pub fn persist(&self, session: &Session, remember_me: bool) -> Result<(), StorageError> {
        let raw =
            serde_json::to_string(session).map_err(|e| StorageError::Serialize(e.to_string()))?;
        if remember_me {
            self.ephemeral.remove(SESSION_KEY);
            self.durable.set(SESSION_KEY, &raw)
        } else {
            self.durable.remove(SESSION_KEY);
            self.ephemeral.set(SESSION_KEY, &raw)
        }
    }

    pub fn clear(&self) {
        self.durable.remove(SESSION_KEY);
        self.ephemeral.remove(SESSION_KEY);
    }
}

/// Reactive view of the current session, provided as context by the shell.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    session: RwSignal<Option<Session>>,
    server_version: RwSignal<Option<String>>,
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new()
    }
}

impl UserContext {
    pub fn new() -> Self {
        Self {
            session: RwSignal::new(None),
            server_version: RwSignal::new(None),
        }
    }

    /// Picks up a previously persisted session. Call from a client-only effect so the first
    /// client render matches the server-rendered HTML.
    pub fn restore(&self) {
        if let Some(session) = SessionStore::browser().restore() {
            self.session.set(Some(session));
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.session.get()
    }

    pub fn user(&self) -> Option<User> {
        self.session.with(|s| s.as_ref().map(|s| s.user.clone()))
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.with(Option::is_some)
    }

    pub fn is_admin(&self) -> bool {
        self.session
            .with(|s| s.as_ref().is_some_and(|s| s.user.is_admin))
    }

    /// False once an admin forced every user out.
    pub fn is_session_valid(&self) -> bool {
        let server_version = self.server_version.get();
        self.session
            .with(|s| s.as_ref().is_some_and(|s| s.is_current(server_version.as_deref())))
    }

    /// An API client carrying the current token.
    pub fn api(&self) -> ApiClient {
        let token = self
            .session
            .with_untracked(|s| s.as_ref().map(|s| s.token.clone()));
        ApiClient::new(api_base()).with_token(token)
    }

    pub async fn refresh_server_version(self) -> Result<(), ApiError> {
        let version = self.api().session_version().await?;
        self.server_version.set(version);
        Ok(())
    }

    /// Logs in or registers, then keeps the session in memory and in the chosen storage.
    pub async fn login(
        self,
        credentials: LoginRequest,
        remember_me: bool,
    ) -> Result<Session, ApiError> {
        let client = ApiClient::new(api_base());
        let version = match client.session_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!("Failed to fetch session version: {}", e);
                None
            }
        };
        self.server_version.set(version.clone());

        let response = client.login(&credentials).await?;
        let session = Session {
            user: response.user,
            token: response.token,
            session_version: version,
        };
        self.sign_in(session.clone(), remember_me, &SessionStore::browser());
        Ok(session)
    }

    /// Makes `session` current and persists it to the store picked by `remember_me`.
    pub fn sign_in<D: KeyValueStore, E: KeyValueStore>(
        &self,
        session: Session,
        remember_me: bool,
        store: &SessionStore<D, E>,
    ) {
        if let Err(e) = store.persist(&session, remember_me) {
            error!("Failed to persist session: {}", e);
        }
        self.session.set(Some(session));
    }

    pub fn logout(&self) {
        self.sign_out(&SessionStore::browser());
    }

    /// Drops the session from memory and from both stores.
    pub fn sign_out<D: KeyValueStore, E: KeyValueStore>(&self, store: &SessionStore<D, E>) {
        self.session.set(None);
        store.clear();
    }
}

pub fn use_user() -> UserContext {
    expect_context::<UserContext>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(version: Option<&str>) -> Session {
        Session {
            user: User {
                id: 7,
                email: "sam@example.com".to_string(),
                firstname: "Sam".to_string(),
                surname: "Jones".to_string(),
                is_admin: false,
            },
            token: "secret".to_string(),
            session_version: version.map(str::to_string),
        }
    }

    fn memory_store() -> SessionStore<MemoryStore, MemoryStore> {
        SessionStore::new(MemoryStore::default(), MemoryStore::default())
    }

    #[test]
    fn test_remember_me_uses_durable_storage() {
        let store = memory_store();
        store.persist(&session(None), true).unwrap();
        assert!(store.durable().get(SESSION_KEY).is_some());
        assert!(store.ephemeral().get(SESSION_KEY).is_none());
        assert_eq!(store.restore(), Some(session(None)));
    }

    #[test]
    fn test_without_remember_me_uses_ephemeral_storage() {
        let store = memory_store();
        store.persist(&session(None), false).unwrap();
        assert!(store.durable().get(SESSION_KEY).is_none());
        assert!(store.ephemeral().get(SESSION_KEY).is_some());
        assert_eq!(store.restore(), Some(session(None)));
    }

    #[test]
    fn test_persist_never_fills_both_stores() {
        let store = memory_store();
        store.persist(&session(Some("1")), true).unwrap();
        store.persist(&session(Some("2")), false).unwrap();
        assert!(store.durable().get(SESSION_KEY).is_none());
        assert_eq!(store.restore(), Some(session(Some("2"))));

        store.persist(&session(Some("3")), true).unwrap();
        assert!(store.ephemeral().get(SESSION_KEY).is_none());
        assert_eq!(store.restore(), Some(session(Some("3"))));
    }

    #[test]
    fn test_clear_removes_both() {
        let store = memory_store();
        // Populate both directly, as an older client might have.
        let raw = serde_json::to_string(&session(None)).unwrap();
        store.durable().set(SESSION_KEY, &raw).unwrap();
        store.ephemeral().set(SESSION_KEY, &raw).unwrap();

        store.clear();
        assert!(store.durable().get(SESSION_KEY).is_none());
        assert!(store.ephemeral().get(SESSION_KEY).is_none());
        assert_eq!(store.restore(), None);
    }

    #[test]
    fn test_restore_skips_corrupt_entries() {
        let store = memory_store();
        store.durable().set(SESSION_KEY, "{not json").unwrap();
        assert_eq!(store.restore(), None);

        store
            .ephemeral()
            .set(SESSION_KEY, &serde_json::to_string(&session(None)).unwrap())
            .unwrap();
        assert_eq!(store.restore(), Some(session(None)));
    }

    #[test]
    fn test_session_json_layout() {
        let value = serde_json::to_value(session(Some("4"))).unwrap();
        assert_eq!(value["token"], "secret");
        assert_eq!(value["user"]["email"], "sam@example.com");
        assert_eq!(value["user"]["isAdmin"], false);
        assert_eq!(value["sessionVersion"], "4");
    }

    #[test]
    fn test_sign_in_and_out() {
        let owner = Owner::new();
        owner.set();
        let store = memory_store();
        let user = UserContext::new();

        user.sign_in(session(Some("1")), false, &store);
        assert!(user.is_logged_in());
        assert_eq!(user.user().map(|u| u.id), Some(7));
        assert!(store.durable().get(SESSION_KEY).is_none());
        assert!(store.ephemeral().get(SESSION_KEY).is_some());

        user.sign_in(session(Some("2")), true, &store);
        assert!(store.durable().get(SESSION_KEY).is_some());
        assert!(store.ephemeral().get(SESSION_KEY).is_none());

        user.sign_out(&store);
        assert!(!user.is_logged_in());
        assert!(!user.is_admin());
        assert!(!user.is_session_valid());
        assert_eq!(user.session(), None);
        assert_eq!(store.restore(), None);
    }

    #[test]
    fn test_restore_numeric_session_version() {
        let store = memory_store();
        store
            .durable()
            .set(
                SESSION_KEY,
                r#"{"user": {"id": 7, "email": "sam@example.com", "firstname": "Sam", "surname": "Jones", "isAdmin": false}, "token": "secret", "sessionVersion": 5}"#,
            )
            .unwrap();
        let restored = store.restore().unwrap();
        assert!(restored.is_current(Some("5")));
        assert!(!restored.is_current(Some("6")));
    }

    #[test]
    fn test_session_validity() {
        assert!(session(None).is_current(None));
        assert!(session(Some("3")).is_current(None));
        assert!(session(Some("3")).is_current(Some("3")));
        assert!(!session(Some("3")).is_current(Some("4")));
        assert!(!session(None).is_current(Some("4")));
    }
}
