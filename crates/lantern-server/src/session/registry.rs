//! In-memory session registry.
//!
//! Every operation takes the map lock for a short synchronous section and
//! never holds it across an `.await`. Push delivery is a per-session list of
//! bounded listeners; a listener whose receiver is gone is dropped on the
//! next notify.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lantern_core::SessionId;
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::metrics::{
    PUSH_DROPS_TOTAL, SESSIONS_ACTIVE, SESSIONS_CREATED_TOTAL, SESSIONS_EVICTED_TOTAL, SESSIONS_REMOVED_TOTAL,
    SESSION_LIFETIME_SECONDS,
};

/// Encoded envelope ready to be framed by a channel.
pub type Payload = Arc<str>;

/// Handle identifying one registered push listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    tx: mpsc::Sender<Payload>,
}

struct Session {
    created_at: Instant,
    last_activity_at: Instant,
    identity_override: Option<String>,
    listeners: Vec<Listener>,
}

/// Point-in-time copy of a session's public state.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    /// Session id.
    pub id: SessionId,
    /// Most recent activity.
    pub last_activity_at: Instant,
    /// Identity to act as for this session's requests.
    pub identity_override: Option<String>,
    /// Number of attached push listeners.
    pub listener_count: usize,
}

/// Registry of live sessions.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Session>>,
    timeout: Duration,
    listener_capacity: usize,
    next_listener: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry.
    ///
    /// `timeout` is the idle duration after which a session stops being live;
    /// `listener_capacity` bounds each listener's queue.
    pub fn new(timeout: Duration, listener_capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
            listener_capacity: listener_capacity.max(1),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Idle timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a new session and return its id.
    pub fn create(&self, identity_override: Option<String>) -> SessionId {
        let id = SessionId::new();
        let now = Instant::now();
        let session = Session {
            created_at: now,
            last_activity_at: now,
            identity_override,
            listeners: Vec::new(),
        };
        let mut sessions = self.sessions.lock();
        let _ = sessions.insert(id.clone(), session);
        counter!(SESSIONS_CREATED_TOTAL).increment(1);
        record_active(sessions.len());
        debug!(session_id = %id, "session created");
        id
    }

    /// Record activity. No-op for unknown ids.
    pub fn touch(&self, id: &SessionId) {
        if let Some(session) = self.sessions.lock().get_mut(id) {
            session.last_activity_at = session.last_activity_at.max(Instant::now());
        }
    }

    /// Snapshot of a session.
    pub fn get(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.sessions.lock().get(id).map(|s| SessionSnapshot {
            id: id.clone(),
            last_activity_at: s.last_activity_at,
            identity_override: s.identity_override.clone(),
            listener_count: s.listeners.len(),
        })
    }

    /// Remove a session. Its listeners are dropped, ending their channels.
    pub fn remove(&self, id: &SessionId) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(session) = sessions.remove(id) else {
            return false;
        };
        counter!(SESSIONS_REMOVED_TOTAL).increment(1);
        record_active(sessions.len());
        histogram!(SESSION_LIFETIME_SECONDS).record(session.created_at.elapsed().as_secs_f64());
        debug!(session_id = %id, "session removed");
        true
    }

    /// Whether the session exists and has been active within the timeout.
    pub fn is_live(&self, id: &SessionId) -> bool {
        self.sessions
            .lock()
            .get(id)
            .is_some_and(|s| s.last_activity_at.elapsed() < self.timeout)
    }

    /// Replace the identity override. Returns `false` for unknown ids.
    pub fn set_identity_override(&self, id: &SessionId, identity: Option<String>) -> bool {
        match self.sessions.lock().get_mut(id) {
            Some(session) => {
                session.identity_override = identity;
                true
            }
            None => false,
        }
    }

    /// Attach a push listener to a session.
    pub fn subscribe(&self, id: &SessionId) -> Option<(ListenerId, mpsc::Receiver<Payload>)> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(id)?;
        let listener_id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.listener_capacity);
        session.listeners.push(Listener { id: listener_id, tx });
        debug!(session_id = %id, listeners = session.listeners.len(), "listener attached");
        Some((listener_id, rx))
    }

    /// Detach a push listener. The session itself is untouched.
    pub fn unsubscribe(&self, id: &SessionId, listener: ListenerId) {
        if let Some(session) = self.sessions.lock().get_mut(id) {
            session.listeners.retain(|l| l.id != listener);
            debug!(session_id = %id, listeners = session.listeners.len(), "listener detached");
        }
    }

    /// Push a payload to every listener of one session.
    ///
    /// Returns the number of listeners that accepted it.
    pub fn notify(&self, id: &SessionId, payload: &Payload) -> usize {
        match self.sessions.lock().get_mut(id) {
            Some(session) => push(id, session, payload),
            None => 0,
        }
    }

    /// Push a payload to every listener of every session.
    pub fn notify_all(&self, payload: &Payload) -> usize {
        self.sessions
            .lock()
            .iter_mut()
            .map(|(id, session)| push(id, session, payload))
            .sum()
    }

    /// Remove every session idle for at least the timeout.
    pub fn evict_idle(&self) -> Vec<SessionId> {
        let timeout = self.timeout;
        let mut evicted = Vec::new();
        let mut sessions = self.sessions.lock();
        sessions.retain(|id, session| {
            let keep = session.last_activity_at.elapsed() < timeout;
            if !keep {
                histogram!(SESSION_LIFETIME_SECONDS).record(session.created_at.elapsed().as_secs_f64());
                evicted.push(id.clone());
            }
            keep
        });
        if !evicted.is_empty() {
            counter!(SESSIONS_EVICTED_TOTAL).increment(evicted.len() as u64);
            record_active(sessions.len());
        }
        evicted
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[allow(clippy::cast_precision_loss)]
fn record_active(count: usize) {
    gauge!(SESSIONS_ACTIVE).set(count as f64);
}

fn push(id: &SessionId, session: &mut Session, payload: &Payload) -> usize {
    let mut delivered = 0;
    session.listeners.retain(|listener| match listener.tx.try_send(Arc::clone(payload)) {
        Ok(()) => {
            delivered += 1;
            true
        }
        Err(mpsc::error::TrySendError::Full(_)) => {
            counter!(PUSH_DROPS_TOTAL).increment(1);
            warn!(session_id = %id, "push listener full, dropping envelope");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
    delivered
}
