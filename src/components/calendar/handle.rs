use super::actor::{CalendarActor, CalendarActorHandle};
use super::models::CalendarSnapshot;
use super::source::EventSource;
use crate::error::BoardResult;
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle for interacting with the calendar actor
#[derive(Clone)]
pub struct CalendarHandle {
    actor_handle: CalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CalendarHandle {
    /// Create a new CalendarHandle and spawn the actor
    pub fn new(sources: Vec<Arc<dyn EventSource>>, tz: Tz, timeout: Duration) -> Self {
        let (mut actor, handle) = CalendarActor::new(sources, tz, timeout);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Fetch the current week from every source
    pub async fn refresh(&self) -> BoardResult<CalendarSnapshot> {
        self.actor_handle.refresh().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BoardResult<()> {
        self.actor_handle.shutdown().await
    }
}
