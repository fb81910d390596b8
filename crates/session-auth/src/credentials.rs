//! Credential storage for the client session
//!
//! `CredentialStore` holds the current access credential, the refresh
//! credential, and the user identifier derived from login. It is a pure state
//! holder: reads are cheap clones, writes go through a `SessionStorage`
//! backend so the session survives restarts.
//!
//! Persistence follows three rules: read once on startup, write on change,
//! erase on clear. Setting the access credential to the value it already has
//! is a no-op and produces no write.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// On-disk shape of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Durable backing for the credential store.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn SessionStorage>`).
pub trait SessionStorage: Send + Sync {
    /// Read the persisted session. `None` when nothing was ever saved.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>>> + Send + '_>>;

    /// Replace the persisted session.
    fn save<'a>(
        &'a self,
        session: &'a PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Remove the persisted session entirely.
    fn erase(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// In-memory state. Tokens stay wrapped so they never reach a log line.
#[derive(Default)]
struct SessionState {
    access: Option<Secret<String>>,
    refresh: Option<Secret<String>>,
    user: Option<String>,
}

impl SessionState {
    fn from_persisted(session: PersistedSession) -> Self {
        Self {
            access: non_empty(session.access_token).map(Secret::new),
            refresh: non_empty(session.refresh_token).map(Secret::new),
            user: session.user,
        }
    }

    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            access_token: self.access.as_ref().map(|s| s.expose().clone()),
            refresh_token: self.refresh.as_ref().map(|s| s.expose().clone()),
            user: self.user.clone(),
        }
    }
}

/// Holder of the session's access and refresh credentials.
///
/// The Mutex serializes writes together with their persistence, so the
/// backend always sees writes in the order they were applied in memory.
pub struct CredentialStore {
    storage: Arc<dyn SessionStorage>,
    state: Mutex<SessionState>,
}

impl CredentialStore {
    /// Restore the session from `storage`. An empty backend yields a logged-out store.
    pub async fn load(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let state = match storage.load().await? {
            Some(session) => {
                info!(
                    has_access = session.access_token.is_some(),
                    has_refresh = session.refresh_token.is_some(),
                    "restored session credentials"
                );
                SessionState::from_persisted(session)
            }
            None => {
                info!("no persisted session, starting logged out");
                SessionState::default()
            }
        };

        Ok(Self {
            storage,
            state: Mutex::new(state),
        })
    }

    /// A logged-out store that never touches disk.
    pub fn ephemeral() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub async fn access(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.access.as_ref().map(|s| s.expose().clone())
    }

    pub async fn refresh(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.refresh.as_ref().map(|s| s.expose().clone())
    }

    /// Identifier of the logged-in user, when the login reply carried one.
    pub async fn user(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.lock().await;
        state.access.is_some()
    }

    /// Replace the access credential and persist it.
    ///
    /// Returns `false` without writing when `token` equals the stored value.
    pub async fn set_access(&self, token: String) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.access.as_ref().is_some_and(|current| current.matches(&token)) {
            debug!("access token unchanged, skipping write");
            return Ok(false);
        }
        state.access = Some(Secret::new(token));
        self.storage.save(&state.to_persisted()).await?;
        debug!("access token updated");
        Ok(true)
    }

    /// Install a complete grant after login or registration.
    pub async fn begin_session(
        &self,
        access: String,
        refresh: Option<String>,
        user: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = SessionState {
            access: Some(Secret::new(access)),
            refresh: non_empty(refresh).map(Secret::new),
            user,
        };
        self.storage.save(&state.to_persisted()).await?;
        info!(has_refresh = state.refresh.is_some(), "session started");
        Ok(())
    }

    /// Remove both credentials and the user identifier, and erase the persisted copy.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = SessionState::default();
        self.storage.erase().await?;
        info!("session credentials cleared");
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// JSON file backend.
///
/// All writes use atomic temp-file + rename to prevent corruption on crash,
/// and the file is created 0600 since it contains bearer tokens.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>>> + Send + '_>> {
        Box::pin(async move {
            if !self.path.exists() {
                return Ok(None);
            }
            let contents = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let session = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            debug!(path = %self.path.display(), "loaded session file");
            Ok(Some(session))
        })
    }

    fn save<'a>(
        &'a self,
        session: &'a PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(write_atomic(&self.path, session))
    }

    fn erase(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "erased session file");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::Io(format!("removing session file: {e}"))),
            }
        })
    }
}

/// Write the session to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target.
async fn write_atomic(path: &Path, session: &PersistedSession) -> Result<()> {
    let json = serde_json::to_string_pretty(session)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}

/// Backend that keeps the session in memory and counts writes.
#[derive(Default)]
pub struct MemoryStorage {
    session: std::sync::Mutex<Option<PersistedSession>>,
    writes: AtomicUsize,
    erases: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an already-persisted session, as if restored from disk.
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            session: std::sync::Mutex::new(Some(session)),
            ..Self::default()
        }
    }

    /// Number of `save` calls observed.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of `erase` calls observed.
    pub fn erases(&self) -> usize {
        self.erases.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn put(&self, session: Option<PersistedSession>) {
        *self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<Option<PersistedSession>>> + Send + '_>> {
        let session = self.snapshot();
        Box::pin(async move { Ok(session) })
    }

    fn save<'a>(
        &'a self,
        session: &'a PersistedSession,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        self.put(Some(session.clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn erase(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.put(None);
        self.erases.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}
