use crate::ports::{ExpiryScheduler, ExpiryTask};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// Fire-and-forget scheduler backed by the ambient Tokio runtime.
///
/// Each scheduled task gets its own spawned sleeper; nothing tracks or
/// cancels it afterwards. When called outside a runtime the sleeper runs on
/// a dedicated thread instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl ExpiryScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: ExpiryTask) {
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    task.await;
                });
            }
            Err(_) => {
                debug!("No Tokio runtime available, expiring on a dedicated thread");
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    futures::executor::block_on(task);
                });
            }
        }
    }
}
