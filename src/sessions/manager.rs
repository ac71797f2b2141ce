//! Session registry keyed by bound message id.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, info};
use tokio::{
    sync::Mutex as AsyncMutex,
    task::JoinHandle,
    time::{self, Instant},
};
use uuid::Uuid;

use crate::sessions::{
    Delivery, Flow, IgnoreReason, SessionError, SessionEvent, SessionHandle, SessionHandler,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Terminated,
    Expired,
}

/// Mutable part of a session, guarded by its own async lock so that callbacks
/// can await while the registry stays available to other sessions.
struct Slot {
    state: SessionState,
    handler: Box<dyn SessionHandler>,
}

struct Entry {
    session_id: Uuid,
    owner_id: String,
    slot: Arc<AsyncMutex<Slot>>,
    expiry: Option<JoinHandle<()>>,
}

/// Creates, routes to and tears down interactive sessions.
///
/// Clones share the same registry. Every state change away from `Active` happens
/// under the session's lock together with the removal of its registry key, so a
/// concurrent [`SessionManager::deliver`] either sees an active session or no
/// session at all.
#[derive(Clone, Default)]
pub struct SessionManager {
    registry: Arc<Mutex<HashMap<String, Entry>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session on `message_id`, owned by `owner_id`, expiring after `ttl`.
    ///
    /// The deadline is fixed now and is never extended by activity. Must be called
    /// from within a tokio runtime since it schedules the expiry timer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Conflict`] when a live session is already bound to
    /// the message.
    pub fn open(
        &self,
        owner_id: impl Into<String>,
        message_id: impl Into<String>,
        ttl: Duration,
        handler: impl SessionHandler + 'static,
    ) -> Result<SessionHandle, SessionError> {
        let owner_id = owner_id.into();
        let message_id = message_id.into();

        let mut registry = self.lock();
        if registry.contains_key(&message_id) {
            debug!("refusing second session on message {}", message_id);
            return Err(SessionError::Conflict { message_id });
        }

        let created_at = Instant::now();
        let expires_at = created_at + ttl;
        let session_id = Uuid::new_v4();

        // Spawned while the registry is locked, so the timer cannot look the
        // entry up before it exists.
        let expiry = self.schedule_expiry(message_id.clone(), session_id, expires_at);

        registry.insert(
            message_id.clone(),
            Entry {
                session_id,
                owner_id: owner_id.clone(),
                slot: Arc::new(AsyncMutex::new(Slot {
                    state: SessionState::Active,
                    handler: Box::new(handler),
                })),
                expiry: Some(expiry),
            },
        );

        info!(
            "opened session {} on message {} for {} ({}s)",
            session_id,
            message_id,
            owner_id,
            ttl.as_secs()
        );

        Ok(SessionHandle {
            session_id,
            owner_id,
            message_id,
            created_at,
            expires_at,
        })
    }

    /// Routes a follow-up event to the session bound to `message_id`.
    ///
    /// Stale events (no session, session already ended) and events from anyone
    /// but the owner are ignored. If the handler answers [`Flow::Terminate`] the
    /// session ends before this call returns.
    pub async fn deliver(
        &self,
        message_id: &str,
        acting_user_id: &str,
        event: SessionEvent,
    ) -> Delivery {
        let (session_id, slot) = {
            let registry = self.lock();
            let Some(entry) = registry.get(message_id) else {
                debug!("no session on message {}", message_id);
                return Delivery::Ignored(IgnoreReason::NoSession);
            };
            if entry.owner_id != acting_user_id {
                debug!(
                    "{} is not the owner of session {}",
                    acting_user_id, entry.session_id
                );
                return Delivery::Ignored(IgnoreReason::NotOwner);
            }
            (entry.session_id, Arc::clone(&entry.slot))
        };

        let mut slot = slot.lock().await;
        if slot.state != SessionState::Active {
            return Delivery::Ignored(IgnoreReason::NoSession);
        }

        if slot.handler.on_event(event).await == Flow::Terminate {
            self.terminate(&mut slot, message_id, session_id).await;
        }

        Delivery::Handled
    }

    /// Ends a session from the outside.
    ///
    /// Returns `false` if the session had already ended, so calling it twice is
    /// harmless. Must not be called from the session's own callbacks: return
    /// [`Flow::Terminate`] from [`SessionHandler::on_event`] instead.
    pub async fn close(&self, handle: &SessionHandle) -> bool {
        let Some(slot) = self.slot_of(&handle.message_id, handle.session_id) else {
            return false;
        };

        let mut slot = slot.lock().await;
        if slot.state != SessionState::Active {
            return false;
        }

        self.terminate(&mut slot, &handle.message_id, handle.session_id)
            .await;
        true
    }

    /// Number of sessions currently bound to a message.
    pub fn live_sessions(&self) -> usize {
        self.lock().len()
    }

    fn schedule_expiry(
        &self,
        message_id: String,
        session_id: Uuid,
        expires_at: Instant,
    ) -> JoinHandle<()> {
        let manager = self.clone();

        tokio::spawn(async move {
            time::sleep_until(expires_at).await;
            manager.expire(&message_id, session_id).await;
        })
    }

    async fn terminate(&self, slot: &mut Slot, message_id: &str, session_id: Uuid) {
        slot.state = SessionState::Terminated;
        if let Some(timer) = self.deregister(message_id, session_id) {
            timer.abort();
        }

        info!("session {} terminated", session_id);
        slot.handler.finalize().await;
    }

    async fn expire(&self, message_id: &str, session_id: Uuid) {
        let Some(slot) = self.slot_of(message_id, session_id) else {
            return;
        };

        let mut slot = slot.lock().await;
        if slot.state != SessionState::Active {
            return;
        }

        slot.state = SessionState::Expired;
        // Runs on the timer task itself, the handle is only dropped
        drop(self.deregister(message_id, session_id));

        info!("session {} expired", session_id);
        slot.handler.on_expire().await;
        slot.handler.finalize().await;
    }

    fn slot_of(&self, message_id: &str, session_id: Uuid) -> Option<Arc<AsyncMutex<Slot>>> {
        self.lock()
            .get(message_id)
            .filter(|entry| entry.session_id == session_id)
            .map(|entry| Arc::clone(&entry.slot))
    }

    /// Removes the entry of `session_id` and hands back its expiry timer.
    fn deregister(&self, message_id: &str, session_id: Uuid) -> Option<JoinHandle<()>> {
        let mut registry = self.lock();
        match registry.get(message_id) {
            Some(entry) if entry.session_id == session_id => {
                registry.remove(message_id).and_then(|entry| entry.expiry)
            }
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("live_sessions", &self.live_sessions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    const TTL: Duration = Duration::from_secs(30);

    #[derive(Default)]
    struct Counters {
        events: AtomicUsize,
        expired: AtomicUsize,
        finalized: AtomicUsize,
    }

    impl Counters {
        fn events(&self) -> usize {
            self.events.load(Ordering::SeqCst)
        }

        fn expired(&self) -> usize {
            self.expired.load(Ordering::SeqCst)
        }

        fn finalized(&self) -> usize {
            self.finalized.load(Ordering::SeqCst)
        }
    }

    /// Terminates on a `stop` button, continues on anything else.
    struct Recording(Arc<Counters>);

    #[async_trait]
    impl SessionHandler for Recording {
        async fn on_event(&mut self, event: SessionEvent) -> Flow {
            self.0.events.fetch_add(1, Ordering::SeqCst);
            match event {
                SessionEvent::Button { custom_id } if custom_id == "stop" => Flow::Terminate,
                _ => Flow::Continue,
            }
        }

        async fn on_expire(&mut self) {
            self.0.expired.fetch_add(1, Ordering::SeqCst);
        }

        async fn finalize(&mut self) {
            self.0.finalized.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recording() -> (Recording, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (Recording(Arc::clone(&counters)), counters)
    }

    fn button(custom_id: &str) -> SessionEvent {
        SessionEvent::Button {
            custom_id: custom_id.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_without_session_is_ignored() {
        let manager = SessionManager::new();

        let delivery = manager.deliver("m1", "u1", button("yes")).await;

        assert_eq!(delivery, Delivery::Ignored(IgnoreReason::NoSession));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_from_non_owner_is_ignored() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        manager.open("owner", "m1", TTL, handler).unwrap();

        let delivery = manager.deliver("m1", "intruder", button("stop")).await;

        assert_eq!(delivery, Delivery::Ignored(IgnoreReason::NotOwner));
        assert_eq!(counters.events(), 0);
        assert_eq!(manager.live_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continue_keeps_session_alive() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        manager.open("owner", "m1", TTL, handler).unwrap();

        assert_eq!(
            manager.deliver("m1", "owner", button("next")).await,
            Delivery::Handled
        );
        assert_eq!(
            manager
                .deliver(
                    "m1",
                    "owner",
                    SessionEvent::Reply {
                        content: "hi".to_string()
                    }
                )
                .await,
            Delivery::Handled
        );

        assert_eq!(counters.events(), 2);
        assert_eq!(counters.finalized(), 0);
        assert_eq!(manager.live_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_cleans_up_once_and_ignores_later_events() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        let handle = manager.open("owner", "m1", TTL, handler).unwrap();

        assert_eq!(
            manager.deliver("m1", "owner", button("stop")).await,
            Delivery::Handled
        );
        assert_eq!(counters.finalized(), 1);
        assert_eq!(manager.live_sessions(), 0);

        assert_eq!(
            manager.deliver("m1", "owner", button("stop")).await,
            Delivery::Ignored(IgnoreReason::NoSession)
        );
        manager.expire("m1", handle.session_id).await;

        assert_eq!(counters.events(), 1);
        assert_eq!(counters.expired(), 0);
        assert_eq!(counters.finalized(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_cancels_expiry_timer() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        manager.open("owner", "m1", TTL, handler).unwrap();

        manager.deliver("m1", "owner", button("stop")).await;
        time::sleep(TTL * 2).await;

        assert_eq!(counters.expired(), 0);
        assert_eq!(counters.finalized(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expires_after_ttl_without_events() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        manager.open("owner", "m1", TTL, handler).unwrap();

        time::sleep(TTL - Duration::from_millis(1)).await;
        assert_eq!(manager.live_sessions(), 1);
        assert_eq!(counters.expired(), 0);

        time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;

        assert_eq!(counters.expired(), 1);
        assert_eq!(counters.finalized(), 1);
        assert_eq!(manager.live_sessions(), 0);
        assert_eq!(
            manager.deliver("m1", "owner", button("next")).await,
            Delivery::Ignored(IgnoreReason::NoSession)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_does_not_extend_deadline() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        manager.open("owner", "m1", TTL, handler).unwrap();

        time::sleep(Duration::from_secs(29)).await;
        manager.deliver("m1", "owner", button("next")).await;
        time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;

        assert_eq!(counters.expired(), 1);
        assert_eq!(manager.live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_conflicts_with_live_session() {
        let manager = SessionManager::new();
        let (first, _) = recording();
        let (second, _) = recording();
        manager.open("owner", "m1", TTL, first).unwrap();

        let error = manager.open("other", "m1", TTL, second).unwrap_err();

        assert_eq!(
            error,
            SessionError::Conflict {
                message_id: "m1".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_after_previous_session_ended() {
        let manager = SessionManager::new();
        let (first, _) = recording();
        let (second, _) = recording();
        manager.open("owner", "m1", TTL, first).unwrap();
        manager.deliver("m1", "owner", button("stop")).await;

        assert!(manager.open("owner", "m1", TTL, second).is_ok());
        assert_eq!(manager.live_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        let handle = manager.open("owner", "m1", TTL, handler).unwrap();

        assert!(manager.close(&handle).await);
        assert!(!manager.close(&handle).await);
        time::sleep(TTL * 2).await;

        assert_eq!(counters.finalized(), 1);
        assert_eq!(counters.expired(), 0);
        assert_eq!(manager.live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_handle_does_not_close_newer_session() {
        let manager = SessionManager::new();
        let (first, _) = recording();
        let (second, second_counters) = recording();
        let stale = manager.open("owner", "m1", TTL, first).unwrap();
        manager.close(&stale).await;
        manager.open("owner", "m1", TTL, second).unwrap();

        assert!(!manager.close(&stale).await);
        assert_eq!(second_counters.finalized(), 0);
        assert_eq!(manager.live_sessions(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_terminations_clean_up_once() {
        let manager = SessionManager::new();
        let (handler, counters) = recording();
        let handle = manager.open("owner", "m1", TTL, handler).unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            tasks.push(tokio::spawn(async move {
                manager.deliver("m1", "owner", button("stop")).await
            }));
        }
        let closer = manager.clone();
        tasks.push(tokio::spawn(async move {
            closer.close(&handle).await;
            Delivery::Handled
        }));
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(counters.finalized(), 1);
        assert!(counters.events() <= 1);
        assert_eq!(manager.live_sessions(), 0);
    }
}
