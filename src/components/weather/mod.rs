pub mod astro;
pub mod client;
pub mod models;

pub use client::WeatherClient;
pub use models::WeatherSnapshot;

use crate::board::Board;
use crate::config::Config;
use crate::error::BoardResult;
use crate::utils::scheduler::{spawn_aligned, TaskHandle};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Weather polling period in minutes
pub const REFRESH_MINUTES: u32 = 5;

/// Weather component: polls the provider every five minutes
#[derive(Default)]
pub struct Weather {
    refresh_task: RwLock<Option<TaskHandle>>,
}

impl Weather {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl super::Component for Weather {
    fn name(&self) -> &'static str {
        "weather"
    }

    async fn init(&self, config: Arc<RwLock<Config>>, board: Board) -> BoardResult<()> {
        let client = {
            let config = config.read().await;
            if config.weather_api_key.is_none() {
                warn!("WEATHER_API_KEY is not set, weather will show as unavailable");
            }
            WeatherClient::from_config(&config, Client::new())
        };

        let task = spawn_aligned("weather refresh", board.tz(), REFRESH_MINUTES, true, move || {
            let client = client.clone();
            let board = board.clone();
            async move {
                let result = client.fetch(&board.tz()).await;
                board.update_weather(result).await;
            }
        });
        *self.refresh_task.write().await = Some(task);

        Ok(())
    }

    async fn shutdown(&self) -> BoardResult<()> {
        if let Some(task) = self.refresh_task.write().await.take() {
            task.cancel();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
