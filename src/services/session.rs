//! Per-visitor scratch state, identified by a cookie.
//!
//! The only thing a visitor carries between requests is the name of a video
//! they uploaded but have not yet attached to a quote. Sessions live in
//! memory and are lost on restart.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "quotedb_session";

#[derive(Debug, Clone)]
struct SessionData {
    /// Uploaded but not yet attached video, or empty.
    pending_video: String,
    last_seen: Instant,
}

impl SessionData {
    fn new(now: Instant) -> Self {
        Self {
            pending_video: String::new(),
            last_seen: now,
        }
    }
}

/// Shared map of live sessions. A session unused for longer than the idle
/// timeout is dropped.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionData>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_timeout,
        }
    }

    /// Look up the session named by the request's cookie, or start a new one.
    ///
    /// The second value is the `Set-Cookie` header to send back when a new
    /// session was created. Starting a session also evicts idle ones.
    pub async fn resolve(&self, headers: &HeaderMap) -> (Session, Option<HeaderValue>) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if let Some(id) = session_id_from_cookies(headers)
            && let Some(data) = sessions.get_mut(&id)
            && now.duration_since(data.last_seen) <= self.idle_timeout
        {
            data.last_seen = now;
            return (self.handle(id), None);
        }

        let before = sessions.len();
        sessions.retain(|_, data| now.duration_since(data.last_seen) <= self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!("evicted {} idle sessions", evicted);
        }

        let id = Uuid::new_v4();
        sessions.insert(id, SessionData::new(now));
        drop(sessions);
        tracing::debug!("started session {}", id);

        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
        (self.handle(id), HeaderValue::from_str(&cookie).ok())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn handle(&self, id: Uuid) -> Session {
        Session {
            id,
            store: self.clone(),
        }
    }
}

/// Handle to one visitor's session, passed explicitly to the operations
/// that read or change it.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    store: SessionStore,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the video waiting to be attached, or an empty string.
    pub async fn pending_video(&self) -> String {
        self.store
            .sessions
            .read()
            .await
            .get(&self.id)
            .map(|d| d.pending_video.clone())
            .unwrap_or_default()
    }

    /// Record a newly uploaded video and return the one it replaces (possibly empty).
    pub async fn replace_pending_video(&self, name: impl Into<String>) -> String {
        let mut sessions = self.store.sessions.write().await;
        let data = sessions
            .entry(self.id)
            .or_insert_with(|| SessionData::new(Instant::now()));
        std::mem::replace(&mut data.pending_video, name.into())
    }

    pub async fn clear_pending_video(&self) {
        if let Some(data) = self.store.sessions.write().await.get_mut(&self.id) {
            data.pending_video.clear();
        }
    }
}

/// Middleware that resolves the visitor's [`Session`], stores it in the
/// request extensions for handlers to extract, and sets the cookie on the
/// response when the session is new.
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let (session, set_cookie) = store.resolve(request.headers()).await;
    request.extensions_mut().insert(session);

    let mut response = next.run(request).await;
    if let Some(cookie) = set_cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

fn session_id_from_cookies(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(60);

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn new_visitor_gets_a_cookie() {
        let store = SessionStore::new(IDLE);
        let (session, cookie) = store.resolve(&HeaderMap::new()).await;

        let cookie = cookie.unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("{}={}", SESSION_COOKIE, session.id())));
        assert!(cookie.contains("HttpOnly"));
        assert_eq!(session.pending_video().await, "");
    }

    #[tokio::test]
    async fn returning_visitor_keeps_their_session() {
        let store = SessionStore::new(IDLE);
        let (first, _) = store.resolve(&HeaderMap::new()).await;
        first.replace_pending_video("abc_clip.mp4").await;

        let headers = cookie_headers(&format!("theme=dark; {}={}", SESSION_COOKIE, first.id()));
        let (second, cookie) = store.resolve(&headers).await;

        assert!(cookie.is_none());
        assert_eq!(second.id(), first.id());
        assert_eq!(second.pending_video().await, "abc_clip.mp4");
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_or_malformed_cookie_starts_fresh() {
        let store = SessionStore::new(IDLE);
        let stale = Uuid::new_v4();

        let (session, cookie) = store
            .resolve(&cookie_headers(&format!("{}={}", SESSION_COOKIE, stale)))
            .await;
        assert_ne!(session.id(), stale);
        assert!(cookie.is_some());

        let (_, cookie) = store
            .resolve(&cookie_headers(&format!("{}=not-a-uuid", SESSION_COOKIE)))
            .await;
        assert!(cookie.is_some());
    }

    #[tokio::test]
    async fn replace_returns_previous_and_clear_empties() {
        let store = SessionStore::new(IDLE);
        let (session, _) = store.resolve(&HeaderMap::new()).await;

        assert_eq!(session.replace_pending_video("one.mp4").await, "");
        assert_eq!(session.replace_pending_video("two.mp4").await, "one.mp4");
        session.clear_pending_video().await;
        assert_eq!(session.pending_video().await, "");
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let store = SessionStore::new(Duration::from_millis(20));
        let (stale, _) = store.resolve(&HeaderMap::new()).await;
        stale.replace_pending_video("old.mp4").await;

        tokio::time::sleep(Duration::from_millis(60)).await;

        let headers = cookie_headers(&format!("{}={}", SESSION_COOKIE, stale.id()));
        let (fresh, cookie) = store.resolve(&headers).await;

        assert!(cookie.is_some());
        assert_ne!(fresh.id(), stale.id());
        assert_eq!(fresh.pending_video().await, "");
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn active_sessions_survive_a_sweep() {
        let store = SessionStore::new(IDLE);
        let (kept, _) = store.resolve(&HeaderMap::new()).await;
        store.resolve(&HeaderMap::new()).await;

        assert_eq!(store.session_count().await, 2);
        let headers = cookie_headers(&format!("{}={}", SESSION_COOKIE, kept.id()));
        let (again, cookie) = store.resolve(&headers).await;
        assert!(cookie.is_none());
        assert_eq!(again.id(), kept.id());
    }
}
