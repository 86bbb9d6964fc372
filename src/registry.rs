//! Live game sessions, one per WebSocket connection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tictactoe_engine::{GameSession, GameStatus};
use tracing::{debug, info, instrument};

/// Identifier assigned to each connection.
pub type ConnectionId = u64;

/// A session shared between its connection task and status queries.
pub type SharedSession = Arc<tokio::sync::Mutex<GameSession>>;

#[derive(Debug)]
struct Entry {
    session: SharedSession,
    connected_at: DateTime<Utc>,
}

/// Point-in-time view of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Connection id.
    pub id: ConnectionId,
    /// When the connection opened.
    pub connected_at: DateTime<Utc>,
    /// Board side length; absent while an exchange holds the session.
    pub size: Option<usize>,
    /// Moves played this session; absent while an exchange holds the session.
    pub moves: Option<usize>,
    /// Game status; absent while an exchange holds the session.
    pub status: Option<GameStatus>,
}

/// Maps connection ids to their sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<ConnectionId, Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session registry");
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `session` under a fresh id.
    ///
    /// The entry lives exactly as long as the returned guard.
    #[instrument(skip(self, session), fields(size = session.board().size()))]
    pub fn open(&self, session: GameSession) -> SessionGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Arc::new(tokio::sync::Mutex::new(session));
        let entry = Entry {
            session: Arc::clone(&session),
            connected_at: Utc::now(),
        };
        let active = {
            let mut sessions = self.lock();
            sessions.insert(id, entry);
            sessions.len()
        };
        info!(connection_id = id, active, "Session opened");
        SessionGuard {
            id,
            session,
            registry: self.clone(),
        }
    }

    /// Looks up a session.
    pub fn get(&self, id: ConnectionId) -> Option<SharedSession> {
        let session = self.lock().get(&id).map(|entry| Arc::clone(&entry.session));
        if session.is_none() {
            debug!(connection_id = id, "Session not found");
        }
        session
    }

    /// Removes a session; true if it was present.
    #[instrument(skip(self))]
    pub fn remove(&self, id: ConnectionId) -> bool {
        let (removed, active) = {
            let mut sessions = self.lock();
            (sessions.remove(&id).is_some(), sessions.len())
        };
        if removed {
            info!(connection_id = id, active, "Session closed");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no session is live.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Summaries of all sessions, ordered by id.
    ///
    /// Sessions busy in an exchange are listed without game details rather
    /// than waited on.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        let sessions = self.lock();
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|(&id, entry)| {
                let game = entry.session.try_lock().ok();
                SessionSummary {
                    id,
                    connected_at: entry.connected_at,
                    size: game.as_ref().map(|g| g.board().size()),
                    moves: game.as_ref().map(|g| g.history().len()),
                    status: game.as_ref().map(|g| g.status()),
                }
            })
            .collect();
        summaries.sort_by_key(|summary| summary.id);
        summaries
    }
}

/// Keeps a session registered; dropping it removes the entry.
#[derive(Debug)]
pub struct SessionGuard {
    id: ConnectionId,
    session: SharedSession,
    registry: SessionRegistry,
}

impl SessionGuard {
    /// Connection id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The guarded session.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
