//! In-memory session store.
//!
//! Sessions are created only once an identity has been established and live
//! until they are invalidated (logout, principal change) or stay idle longer
//! than the configured timeout. Expiry is lazy: an idle entry is dropped when
//! it is looked up, and session creation sweeps idle entries at most once per
//! sweep interval (or immediately when the store is full).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use headergate_security::SecurityContext;

use crate::config::SessionConfig;
use crate::cookies::CookieSpec;

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
}

impl SessionCookie {
    #[must_use]
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            name: cfg.cookie_name.clone(),
            secure: cfg.cookie_secure,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cookie_spec(&self) -> CookieSpec<'_> {
        CookieSpec {
            name: &self.name,
            path: "/",
            http_only: true,
            secure: self.secure,
        }
    }

    /// `Set-Cookie` value binding the client to session `id`.
    #[must_use]
    pub fn issue(&self, id: &str) -> String {
        self.cookie_spec().issue(id)
    }

    #[must_use]
    pub fn expire(&self) -> String {
        self.cookie_spec().expire()
    }
}

/// One server-side session.
#[derive(Debug)]
pub struct SessionEntry {
    /// Held across the whole pre-auth step (including the delegate call) so
    /// that concurrent requests in one session apply their transitions in order.
    context: tokio::sync::Mutex<SecurityContext>,
    last_access: parking_lot::Mutex<Instant>,
}

impl SessionEntry {
    fn new(context: SecurityContext) -> Self {
        Self {
            context: tokio::sync::Mutex::new(context),
            last_access: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn context(&self) -> &tokio::sync::Mutex<SecurityContext> {
        &self.context
    }

    fn touch(&self, now: Instant) {
        *self.last_access.lock() = now;
    }

    fn is_expired(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(*self.last_access.lock()) > idle_timeout
    }
}

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_MAX_SESSIONS: usize = 100_000;

/// Sessions keyed by the opaque id carried in the session cookie.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionEntry>>,
    idle_timeout: Duration,
    sweep_interval: Duration,
    max_sessions: usize,
    last_sweep: parking_lot::Mutex<Instant>,
}

impl SessionStore {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_sessions: DEFAULT_MAX_SESSIONS,
            last_sweep: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self::new(Duration::from_secs(cfg.idle_timeout_secs))
            .with_sweep_interval(Duration::from_secs(cfg.sweep_interval_secs))
            .with_max_sessions(cfg.max_sessions)
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Live session for `id`, refreshing its last-access time.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<Arc<SessionEntry>> {
        let now = Instant::now();
        let entry = self.sessions.get(id).map(|e| Arc::clone(e.value()))?;

        if entry.is_expired(now, self.idle_timeout) {
            self.sessions.remove(id);
            tracing::debug!("Session expired after idle timeout");
            return None;
        }

        entry.touch(now);
        Some(entry)
    }

    /// Store `context` under a fresh random id and return the id.
    ///
    /// Returns `None` when the store is full even after dropping idle sessions.
    #[must_use]
    pub fn create(&self, context: SecurityContext) -> Option<String> {
        let full = self.sessions.len() >= self.max_sessions;
        if full || self.sweep_due(Instant::now()) {
            let purged = self.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged idle sessions");
            }
        }

        if self.sessions.len() >= self.max_sessions {
            tracing::warn!(
                max_sessions = self.max_sessions,
                "Session store full; identity not persisted"
            );
            return None;
        }

        let id = uuid::Uuid::new_v4().simple().to_string();
        self.sessions
            .insert(id.clone(), Arc::new(SessionEntry::new(context)));
        Some(id)
    }

    /// Claims the next periodic sweep if the interval has elapsed.
    fn sweep_due(&self, now: Instant) -> bool {
        let mut last = self.last_sweep.lock();
        if now.saturating_duration_since(*last) < self.sweep_interval {
            return false;
        }
        *last = now;
        true
    }

    /// Whether `id` still names `entry` (it has not been rotated or invalidated).
    #[must_use]
    pub fn is_current(&self, id: &str, entry: &Arc<SessionEntry>) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current.value(), entry))
    }

    /// Remove a session. Returns whether it existed.
    #[must_use]
    pub fn invalidate(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Move the session to a new id; the old id stops working immediately.
    ///
    /// Returns `None` when the old session is gone (invalidated concurrently).
    #[must_use]
    pub fn rotate(&self, old_id: &str) -> Option<String> {
        let (_, entry) = self.sessions.remove(old_id)?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        entry.touch(Instant::now());
        self.sessions.insert(id.clone(), entry);
        Some(id)
    }

    /// Drop every idle session. Returns how many were removed.
    #[must_use]
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        *self.last_sweep.lock() = now;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| !entry.is_expired(now, self.idle_timeout));
        before.saturating_sub(self.sessions.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
