//! Per-browser sessions keyed by the opaque id carried in the session cookie.
//!
//! Each entry owns its own identity provider session, shadow store and
//! reconciler, so one client's sign-in never leaks into another's requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use garage_session::shadow::{KeyedShadowStore, MemoryMedium};
use garage_session::{SessionFacade, SessionSettings};

use crate::config::ConsoleConfig;
use crate::infra::gotrue::GoTrueProvider;
use crate::infra::rest::RestProfileStore;

pub type ConsoleShadowStore = KeyedShadowStore<MemoryMedium>;
pub type ConsoleSession = SessionFacade<GoTrueProvider, RestProfileStore, ConsoleShadowStore>;

/// How often a session's refresh task re-checks when no token is due.
const REFRESH_IDLE: Duration = Duration::from_secs(30);

/// Everything needed to mount a fresh client session.
#[derive(Clone)]
pub struct SessionBackend {
    client: Client,
    backend_url: String,
    api_key: String,
    profiles_table: String,
    settings: SessionSettings,
    refresh_margin: chrono::Duration,
}

impl SessionBackend {
    pub fn from_config(config: &ConsoleConfig, client: Client) -> Self {
        Self {
            client,
            backend_url: config.backend_url.clone(),
            api_key: config.backend_anon_key.clone(),
            profiles_table: config.profiles_table.clone(),
            settings: config.session_settings(),
            refresh_margin: chrono::Duration::seconds(i64::from(config.token_refresh_margin_secs)),
        }
    }
}

/// One browser session: its provider, its mounted facade and the task keeping
/// its federated token fresh.
pub struct ClientSession {
    pub provider: Arc<GoTrueProvider>,
    pub session: Arc<ConsoleSession>,
    refresh: JoinHandle<()>,
    last_seen: Mutex<Instant>,
}

impl ClientSession {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_seen.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.refresh.abort();
    }
}

pub struct SessionRegistry {
    backend: SessionBackend,
    clients: Mutex<HashMap<String, Arc<ClientSession>>>,
}

impl SessionRegistry {
    pub fn new(backend: SessionBackend) -> Self {
        Self {
            backend,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<String, Arc<ClientSession>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live session and mark it used.
    pub fn get(&self, id: &str) -> Option<Arc<ClientSession>> {
        let client = self.clients().get(id).cloned()?;
        client.touch();
        Some(client)
    }

    /// The live session for `id`, or a newly mounted one under a freshly
    /// generated id. An id the registry does not know is never adopted.
    /// Returns `(id, session, created)`. Must be called within a Tokio runtime.
    pub fn get_or_open(&self, id: Option<&str>) -> (String, Arc<ClientSession>, bool) {
        if let Some(id) = id {
            if let Some(client) = self.get(id) {
                return (id.to_owned(), client, false);
            }
        }
        let id = Uuid::new_v4().to_string();
        let client = Arc::new(self.mount());
        let open = {
            let mut clients = self.clients();
            clients.insert(id.clone(), Arc::clone(&client));
            clients.len()
        };
        debug!(open, "client session opened");
        (id, client, true)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<ClientSession>> {
        self.clients().remove(id)
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of open sessions still resolving their principal.
    pub fn resolving(&self) -> usize {
        self.clients().values().filter(|c| c.session.loading()).count()
    }

    /// Forget sessions unused for longer than `max_idle`. Dropping the last
    /// handle cancels the reconciler and refresh task; nothing is sent to the
    /// identity provider. Returns how many were evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let evicted = {
            let mut clients = self.clients();
            let before = clients.len();
            clients.retain(|_, c| c.idle_for(now) <= max_idle);
            before - clients.len()
        };
        if evicted > 0 {
            info!(evicted, "idle client sessions evicted");
        }
        evicted
    }

    /// Periodically evict idle sessions until the task is aborted.
    pub async fn sweep_idle(self: Arc<Self>, max_idle: Duration, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            self.evict_idle(max_idle);
        }
    }

    fn mount(&self) -> ClientSession {
        let b = &self.backend;
        let provider = Arc::new(GoTrueProvider::new(b.client.clone(), &b.backend_url, b.api_key.clone()));
        let profiles = RestProfileStore::new(
            b.client.clone(),
            &b.backend_url,
            b.api_key.clone(),
            b.profiles_table.clone(),
            Arc::clone(&provider),
        );
        let shadow = Arc::new(KeyedShadowStore::new(MemoryMedium::new()));
        let session = SessionFacade::mount(Arc::clone(&provider), profiles, shadow, b.settings.clone());
        let refresh = tokio::spawn(GoTrueProvider::auto_refresh(
            Arc::clone(&provider),
            b.refresh_margin,
            REFRESH_IDLE,
        ));
        ClientSession {
            provider,
            session: Arc::new(session),
            refresh,
            last_seen: Mutex::new(Instant::now()),
        }
    }
}
