use std::collections::HashMap;
use std::sync::RwLock;

use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;

/// Identity of the caller for one request. Passed explicitly into every
/// service operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<Uuid>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn authenticated(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn require(&self) -> Result<Uuid, AppError> {
        self.user_id.ok_or_else(AppError::auth_required)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedUp(Uuid),
    SignedIn(Uuid),
    Refreshed(Uuid),
    SignedOut(Uuid),
}

impl SessionEvent {
    pub fn user_id(&self) -> Uuid {
        match *self {
            SessionEvent::SignedUp(id)
            | SessionEvent::SignedIn(id)
            | SessionEvent::Refreshed(id)
            | SessionEvent::SignedOut(id) => id,
        }
    }
}

/// Process-wide session registry: broadcasts session changes and keeps a
/// per-user session generation. Tokens carry the generation they were issued
/// under; a sign-out bumps it, so every token issued before stops verifying.
pub struct SessionHub {
    events: broadcast::Sender<SessionEvent>,
    generations: RwLock<HashMap<Uuid, u64>>,
}

impl SessionHub {
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            events,
            generations: RwLock::new(HashMap::new()),
        }
    }

    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Generation new tokens for `user_id` are issued under. Starts at 0.
    pub fn generation(&self, user_id: Uuid) -> u64 {
        self.generations
            .read()
            .ok()
            .and_then(|map| map.get(&user_id).copied())
            .unwrap_or(0)
    }

    pub fn sign_out(&self, user_id: Uuid) {
        if let Ok(mut map) = self.generations.write() {
            *map.entry(user_id).or_insert(0) += 1;
        }
        self.publish(SessionEvent::SignedOut(user_id));
    }

    /// `token_generation` is the token's `sgen` claim.
    pub fn is_revoked(&self, user_id: Uuid, token_generation: u64) -> bool {
        token_generation < self.generation(user_id)
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(64)
    }
}

pub fn spawn_event_logger(hub: &SessionHub) -> JoinHandle<()> {
    let mut rx = hub.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!(user_id = %event.user_id(), ?event, "session changed"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_requires_login() {
        let err = Session::anonymous().require().unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));

        let id = Uuid::new_v4();
        assert_eq!(Session::authenticated(id).require().unwrap(), id);
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let hub = SessionHub::new(8);
        let mut rx = hub.subscribe();
        let id = Uuid::new_v4();
        hub.publish(SessionEvent::SignedIn(id));
        hub.sign_out(id);
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SignedIn(id));
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SignedOut(id));
    }

    #[test]
    fn sign_out_revokes_tokens_of_earlier_generations() {
        let hub = SessionHub::default();
        let id = Uuid::new_v4();
        let issued = hub.generation(id);
        assert_eq!(issued, 0);
        assert!(!hub.is_revoked(id, issued));

        hub.sign_out(id);
        assert!(hub.is_revoked(id, issued));
        let reissued = hub.generation(id);
        assert_eq!(reissued, 1);
        assert!(!hub.is_revoked(id, reissued));

        hub.sign_out(id);
        assert!(hub.is_revoked(id, reissued));
        assert!(!hub.is_revoked(Uuid::new_v4(), issued));
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let hub = SessionHub::default();
        hub.publish(SessionEvent::SignedUp(Uuid::new_v4()));
    }
}
