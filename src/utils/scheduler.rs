use chrono::Utc;
use chrono_tz::Tz;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::time::{calculate_wait_duration, next_aligned_boundary};

/// Handle to a spawned background task.
///
/// Dropping the handle cancels the task, so whoever owns the handle owns the
/// task's lifetime.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl TaskHandle {
    /// Spawn a task that receives the cancellation token it must observe
    pub fn spawn<F, Fut>(name: &'static str, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(task(token.clone()));
        Self { name, token, task }
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cancel the task, including any in-flight work
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("Cancelling task {}", self.name);
        }
        self.token.cancel();
        self.task.abort();
    }

    /// Whether the task has stopped running
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `tick` at every wall-clock mark that is a multiple of `period_minutes`.
///
/// With `run_immediately` the first tick happens right away, before waiting
/// for the first mark.
pub fn spawn_aligned<F, Fut>(
    name: &'static str,
    tz: Tz,
    period_minutes: u32,
    run_immediately: bool,
    mut tick: F,
) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    TaskHandle::spawn(name, move |token| async move {
        if run_immediately {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tick() => {}
            }
        }

        loop {
            let now = Utc::now().with_timezone(&tz);
            let next = next_aligned_boundary(&now, period_minutes);
            let wait = calculate_wait_duration(&now, &next);
            debug!("Next {} tick at {}", name, next.format("%H:%M:%S"));

            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(wait) => {}
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick() => {}
            }
        }

        debug!("Task {} stopped", name);
    })
}

/// Single-shot timer that is cancelled and re-armed on every restart
#[derive(Debug)]
pub struct SingleShot {
    name: &'static str,
    pending: Option<TaskHandle>,
}

impl SingleShot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: None,
        }
    }

    /// Cancel any pending run and schedule `fire` after `delay`
    pub fn restart<F, Fut>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.pending = Some(TaskHandle::spawn(self.name, move |token| async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep(delay) => fire().await,
            }
        }));
    }

    /// Cancel the pending run, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }

    /// Whether a run is scheduled and has not fired yet
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_single_shot_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = SingleShot::new("test");

        let counter = Arc::clone(&fired);
        timer.restart(Duration::from_millis(20), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_pending());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test]
    async fn test_single_shot_restart_replaces_pending_run() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = SingleShot::new("test");

        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            timer.restart(Duration::from_millis(40), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            sleep(Duration::from_millis(10)).await;
        }

        sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_shot_cancel() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = SingleShot::new("test");

        let counter = Arc::clone(&fired);
        timer.restart(Duration::from_millis(20), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();

        sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_pending());
    }

    #[tokio::test]
    async fn test_aligned_task_runs_immediately_and_cancels() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let handle = spawn_aligned("test", chrono_tz::UTC, 60, true, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        handle.cancel();
        sleep(Duration::from_millis(20)).await;
        assert!(handle.is_finished());
    }
}
