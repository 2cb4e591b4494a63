use std::collections::HashMap;
use std::sync::Arc;
use std::time::{ Duration, Instant };
use log::{ debug, info, warn };
use serde::Serialize;
use tokio::sync::Mutex;

use crate::history::ConversationMemory;
use crate::models::campaign::{ CampaignDescription, ProductRecord };

pub const DEFAULT_SESSION_ID: &str = "default";

/// Mutable campaign progress for one conversation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionState {
    pub products: Vec<ProductRecord>,
    pub campaign_info_complete: bool,
    pub campaign_json: Option<CampaignDescription>,
}

impl SessionState {
    /// Completion is sticky; only a reset clears it.
    pub fn mark_complete(&mut self) {
        self.campaign_info_complete = true;
    }
}

#[derive(Debug, Default)]
pub struct Session {
    pub state: SessionState,
    pub memory: ConversationMemory,
}

impl Session {
    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.memory.clear();
    }
}

pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_used: Instant,
}

impl SessionEntry {
    /// A session handed out to a running pipeline is never evicted.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.session) > 1
    }
}

/// Sessions keyed by caller-supplied id. Holding a session's lock for a whole
/// pipeline run serialises messages within that conversation only.
///
/// Sessions idle for longer than `idle_ttl` are dropped, and once
/// `max_sessions` is reached the least recently used idle session makes room
/// for a new one. A zero TTL or cap disables that limit.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions,
        }
    }

    pub async fn session(&self, session_id: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut sessions, now);

        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_used = now;
            return Arc::clone(&entry.session);
        }

        if self.max_sessions > 0 && sessions.len() >= self.max_sessions {
            Self::evict_least_recent(&mut sessions);
        }
        info!("Created session '{}'", session_id);
        let session = Arc::new(Mutex::new(Session::default()));
        sessions.insert(session_id.to_string(), SessionEntry {
            session: Arc::clone(&session),
            last_used: now,
        });
        session
    }

    /// Forgets the session. A pipeline still holding it sees the cleared state.
    pub async fn reset(&self, session_id: &str) {
        let removed = self.sessions.lock().await.remove(session_id);
        if let Some(entry) = removed {
            entry.session.lock().await.reset();
        }
        info!("Session '{}' reset", session_id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        if self.idle_ttl.is_zero() {
            return;
        }
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.in_use() || now.duration_since(entry.last_used) < self.idle_ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s)", evicted);
        }
    }

    fn evict_least_recent(sessions: &mut HashMap<String, SessionEntry>) {
        let oldest = sessions
            .iter()
            .filter(|(_, entry)| !entry.in_use())
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                sessions.remove(&id);
                debug!("Evicted least recently used session '{}'", id);
            }
            None => warn!("Session limit reached with every session busy; admitting one more"),
        }
    }
}
