use super::models::CalendarSnapshot;
use super::source::{fetch_all, fetch_window, EventSource};
use crate::error::{component_error, BoardResult};
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The calendar actor that owns the configured sources
pub struct CalendarActor {
    sources: Vec<Arc<dyn EventSource>>,
    tz: Tz,
    timeout: Duration,
    command_rx: mpsc::Receiver<CalendarCommand>,
    shutdown_token: CancellationToken,
}

/// Commands that can be sent to the calendar actor
pub enum CalendarCommand {
    Refresh(mpsc::Sender<BoardResult<CalendarSnapshot>>),
    Shutdown,
}

/// Handle for communicating with the calendar actor
#[derive(Clone)]
pub struct CalendarActorHandle {
    command_tx: mpsc::Sender<CalendarCommand>,
    shutdown_token: CancellationToken,
}

impl CalendarActorHandle {
    /// Poll every source for the current week
    pub async fn refresh(&self) -> BoardResult<CalendarSnapshot> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(CalendarCommand::Refresh(response_tx))
            .await
            .map_err(|e| component_error(&format!("Calendar mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| component_error("Response channel closed"))?
    }

    /// Shutdown the actor, abandoning a fetch in flight
    pub async fn shutdown(&self) -> BoardResult<()> {
        self.shutdown_token.cancel();
        let _ = self.command_tx.send(CalendarCommand::Shutdown).await;
        Ok(())
    }
}

impl CalendarActor {
    /// Create a new actor and return its handle
    pub fn new(
        sources: Vec<Arc<dyn EventSource>>,
        tz: Tz,
        timeout: Duration,
    ) -> (Self, CalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let shutdown_token = CancellationToken::new();

        let actor = Self {
            sources,
            tz,
            timeout,
            command_rx,
            shutdown_token: shutdown_token.clone(),
        };

        (
            actor,
            CalendarActorHandle {
                command_tx,
                shutdown_token,
            },
        )
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Calendar actor started with {} sources", self.sources.len());

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CalendarCommand::Refresh(response_tx) => {
                    let window = fetch_window(&Utc::now(), &self.tz);
                    debug!(
                        "Fetching events between {} and {}",
                        window.time_min, window.time_max
                    );
                    let result = tokio::select! {
                        result = fetch_all(&self.sources, &window, &self.tz, self.timeout) => result,
                        _ = self.shutdown_token.cancelled() => {
                            info!("Calendar refresh abandoned on shutdown");
                            break;
                        }
                    };
                    let _ = response_tx.send(result).await;
                }
                CalendarCommand::Shutdown => {
                    info!("Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Calendar actor shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::calendar::models::{CalendarEvent, FetchWindow};
    use async_trait::async_trait;
    use tokio::time::{sleep, Instant};

    /// Source that never answers within the test
    struct HangingSource;

    #[async_trait]
    impl EventSource for HangingSource {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn fetch(
            &self,
            _source_index: usize,
            _window: &FetchWindow,
            _tz: &Tz,
        ) -> BoardResult<Vec<CalendarEvent>> {
            sleep(Duration::from_secs(600)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_fetch_in_flight() {
        let (mut actor, handle) = CalendarActor::new(
            vec![Arc::new(HangingSource)],
            chrono_tz::UTC,
            Duration::from_secs(300),
        );
        let actor_task = tokio::spawn(async move { actor.run().await });

        let started = Instant::now();
        let refresh = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.refresh().await })
        };
        sleep(Duration::from_secs(1)).await;

        handle.shutdown().await.unwrap();
        let result = refresh.await.unwrap();
        actor_task.await.unwrap();

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(300));
    }
}
