use crate::board::Board;
use crate::config::Config;
use crate::error::BoardResult;
use crate::utils::scheduler::{spawn_aligned, TaskHandle};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Minute tick: moves the time marker and recomputes the scroll target
#[derive(Default)]
pub struct Clock {
    tick_task: RwLock<Option<TaskHandle>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl super::Component for Clock {
    fn name(&self) -> &'static str {
        "clock"
    }

    async fn init(&self, _config: Arc<RwLock<Config>>, board: Board) -> BoardResult<()> {
        let task = spawn_aligned("clock tick", board.tz(), 1, true, move || {
            let board = board.clone();
            async move {
                if let Some(target) = board.tick().await {
                    debug!("Scroll target {:.0}px", target);
                }
            }
        });
        *self.tick_task.write().await = Some(task);
        Ok(())
    }

    async fn shutdown(&self) -> BoardResult<()> {
        if let Some(task) = self.tick_task.write().await.take() {
            task.cancel();
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
