//! EventDispatcher – takes inbound events from a transport that may call concurrently, runs
//! them through the [`MenuEngine`] and delivers the reply.
//!
//! ## Guarantees
//! * Two events for the **same** user never run at the same time. Each user has an async
//!   mutex; an event holds it from session lookup until its reply has been delivered.
//! * Events for different users run in parallel.
//! * [`EventDispatcher::dispatch`] returns only after delivery completed, so the transport
//!   can acknowledge (or reject) the inbound request truthfully.
//! * Each event runs in its own task. A panic anywhere in the engine or in delivery is
//!   reported as [`FlowError::EventFailed`] for that event alone; the per-user lock is
//!   released and later events are unaffected.
//!
//! There is no cancellation: once spawned, an event runs to completion even if the caller
//! stops waiting for it.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    action::Action,
    error::{FlowError, Result},
    menu::MenuEngine,
    session::UserId,
    view::{MenuView, Reply},
};

/// Conversation the reply goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the event reached us, which decides how it is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Message,
    Callback { query_id: String },
}

#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub user: UserId,
    pub chat: ChatId,
    pub origin: Origin,
    pub action: Action,
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send_view(&self, chat: ChatId, view: &MenuView) -> Result<()>;

    /// Answers the event itself. Callbacks are acknowledged with `notice` as a transient
    /// toast; for messages a notice is sent as a plain message and `None` is a no-op.
    async fn answer(&self, chat: ChatId, origin: &Origin, notice: Option<&str>) -> Result<()>;
}

pub struct EventDispatcher {
    engine: Arc<MenuEngine>,
    delivery: Arc<dyn Delivery>,
    locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

impl EventDispatcher {
    pub fn new(engine: Arc<MenuEngine>, delivery: Arc<dyn Delivery>) -> Self {
        Self {
            engine,
            delivery,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<MenuEngine> {
        &self.engine
    }

    /// Users with an event queued or in flight.
    pub fn active_users(&self) -> usize {
        self.locks.len()
    }

    /// Processes one event and delivers its reply.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<Reply> {
        let user = event.user;
        let lock = self.lock_for(user);
        let engine = self.engine.clone();
        let delivery = self.delivery.clone();

        let task = tokio::spawn(async move {
            let _guard = lock.lock().await;
            process(&engine, delivery.as_ref(), event).await
        });

        // Join errors are panics or runtime shutdown, both fail this event only
        let outcome = match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(FlowError::EventFailed(format!(
                "panicked: {}",
                panic_message(e.into_panic().as_ref())
            ))),
            Err(e) => Err(FlowError::EventFailed(e.to_string())),
        };
        self.release(user);

        if let Err(e) = &outcome {
            error!(user_id = %user, error = %e, "event processing failed");
        }
        outcome
    }

    fn lock_for(&self, user: UserId) -> Arc<Mutex<()>> {
        self.locks
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the user's lock once no queued or running event references it.
    fn release(&self, user: UserId) {
        self.locks
            .remove_if(&user, |_, lock| Arc::strong_count(lock) == 1);
    }
}

async fn process(engine: &MenuEngine, delivery: &dyn Delivery, event: InboundEvent) -> Result<Reply> {
    // Get or create the session once, at entry
    let session = engine.sessions().get_or_create(event.user).await?;
    let reply = engine.handle(&session, event.action).await?;

    match &reply {
        Reply::Render(views) => {
            // Stop the client's progress indicator before the views arrive
            if matches!(event.origin, Origin::Callback { .. }) {
                delivery.answer(event.chat, &event.origin, None).await?;
            }
            for view in views {
                delivery.send_view(event.chat, view).await?;
            }
            info!(user_id = %event.user, views = views.len(), "views delivered");
        }
        Reply::Notice(text) => {
            delivery.answer(event.chat, &event.origin, Some(text)).await?;
            debug!(user_id = %event.user, "notice delivered");
        }
    }
    Ok(reply)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
