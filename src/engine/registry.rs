// src/engine/registry.rs

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::session::{QuizSession, SessionState};
use crate::models::identity::Identity;

/// A session plus the clock that drives its countdown.
struct LiveSession {
    session: QuizSession,
    owner: Option<Uuid>,
    /// Start of the current, not yet applied, time unit.
    clock: Instant,
    touched_at: Instant,
}

impl LiveSession {
    /// Applies every whole time unit elapsed since the last sync.
    fn sync(&mut self, now: Instant, tick: Duration) {
        if self.session.state() != &SessionState::Answering {
            return;
        }

        let elapsed = now.saturating_duration_since(self.clock);
        let due = elapsed.as_nanos() / tick.as_nanos();
        let mut applied: u32 = 0;
        while (applied as u128) < due {
            applied += 1;
            if self.session.tick() {
                break;
            }
        }
        self.clock += tick * applied;
    }
}

/// In-process store of running attempts.
///
/// Time is applied lazily: every access first replays the elapsed ticks of
/// the session, and the clock re-arms whenever a new question starts.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, LiveSession>>,
    tick: Duration,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(tick: Duration, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            tick: tick.max(Duration::from_millis(1)),
            ttl,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Stores `session` and returns its id. Idle sessions past the TTL are
    /// dropped first.
    pub async fn insert(&self, owner: Option<Uuid>, session: QuizSession) -> Uuid {
        let now = Instant::now();
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|_, live| now.saturating_duration_since(live.touched_at) <= self.ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {} idle quiz sessions", evicted);
        }

        sessions.insert(
            id,
            LiveSession {
                session,
                owner,
                clock: now,
                touched_at: now,
            },
        );
        id
    }

    /// Runs `f` on a synced session. `None` when the session does not exist
    /// or belongs to someone else.
    pub async fn with_session<R>(
        &self,
        id: Uuid,
        identity: &Identity,
        f: impl FnOnce(&mut QuizSession) -> R,
    ) -> Option<R> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let live = sessions.get_mut(&id)?;
        if !identity.can_access(live.owner) {
            return None;
        }

        live.sync(now, self.tick);

        let was_answering = live.session.state() == &SessionState::Answering;
        let cursor = live.session.cursor();
        let result = f(&mut live.session);

        let answering = live.session.state() == &SessionState::Answering;
        if answering && (!was_answering || cursor != live.session.cursor()) {
            live.clock = now;
        }
        live.touched_at = now;

        Some(result)
    }

    /// Removes the session and hands it back.
    pub async fn remove(&self, id: Uuid, identity: &Identity) -> Option<QuizSession> {
        let mut sessions = self.sessions.lock().await;
        let owner = sessions.get(&id)?.owner;
        if !identity.can_access(owner) {
            return None;
        }
        sessions.remove(&id).map(|live| live.session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
