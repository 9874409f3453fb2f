mod actor;
pub mod google;
mod handle;
pub mod ics;
pub mod models;
pub mod source;
pub mod token;

pub use handle::CalendarHandle;
pub use models::{CalendarEvent, CalendarSnapshot, EventSpan, FetchWindow};
pub use source::{fetch_all, fetch_window, EventSource};

use crate::board::Board;
use crate::config::Config;
use crate::error::BoardResult;
use crate::utils::scheduler::{spawn_aligned, TaskHandle};
use async_trait::async_trait;
use google::GoogleCalendarSource;
use ics::IcsFeedSource;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use token::{GoogleCredentials, TokenManager};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Calendar polling period in minutes
pub const REFRESH_MINUTES: u32 = 1;

/// Build every configured source: Google calendars first, then feeds
pub fn build_sources(config: &Config, client: &Client) -> Vec<Arc<dyn EventSource>> {
    let token_manager = TokenManager::new(
        GoogleCredentials {
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            refresh_token: config.google_refresh_token.clone(),
        },
        config.google_token_url.clone(),
        client.clone(),
    );

    let google = config.google_calendar_ids.iter().map(|id| {
        Arc::new(GoogleCalendarSource::new(
            id.clone(),
            config.google_api_base.clone(),
            token_manager.clone(),
            client.clone(),
        )) as Arc<dyn EventSource>
    });

    let feeds = config
        .ics_feed_urls
        .iter()
        .map(|url| Arc::new(IcsFeedSource::new(url, client.clone())) as Arc<dyn EventSource>);

    google.chain(feeds).collect()
}

/// Calendar component: polls every source each minute
#[derive(Default)]
pub struct Calendar {
    handle: RwLock<Option<CalendarHandle>>,
    refresh_task: RwLock<Option<TaskHandle>>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl super::Component for Calendar {
    fn name(&self) -> &'static str {
        "calendar"
    }

    async fn init(&self, config: Arc<RwLock<Config>>, board: Board) -> BoardResult<()> {
        let (sources, timeout) = {
            let config = config.read().await;
            (
                build_sources(&config, &Client::new()),
                Duration::from_secs(config.source_timeout_secs),
            )
        };

        if sources.is_empty() {
            warn!("No calendar sources configured");
        } else {
            info!("Configured {} calendar sources", sources.len());
        }

        let handle = CalendarHandle::new(sources, board.tz(), timeout);
        *self.handle.write().await = Some(handle.clone());

        let task = spawn_aligned("calendar refresh", board.tz(), REFRESH_MINUTES, true, move || {
            let handle = handle.clone();
            let board = board.clone();
            async move {
                let result = handle.refresh().await;
                board.update_calendar(result).await;
            }
        });
        *self.refresh_task.write().await = Some(task);

        Ok(())
    }

    async fn shutdown(&self) -> BoardResult<()> {
        if let Some(task) = self.refresh_task.write().await.take() {
            task.cancel();
        }
        if let Some(handle) = self.handle.write().await.take() {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_google_first() {
        let config = Config {
            google_calendar_ids: vec!["primary".to_string(), "family".to_string()],
            ics_feed_urls: vec!["https://example.com/a.ics".to_string()],
            ..Config::default()
        };

        let sources = build_sources(&config, &Client::new());
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["primary", "family", "https://example.com/a.ics"]);
    }
}
