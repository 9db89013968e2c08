//! Trailing-edge debouncer driven by `tokio::time`
//!
//! Every `push` restarts the quiet-period timer; the latest value is emitted
//! once the timer elapses without another push. Dropping the debouncer aborts
//! the timer task and discards any pending value.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::trace;

/// Search input quiet period
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Draft autosave quiet period
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
    delay: Duration,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver of settled values
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<T>();
        let (output_tx, output_rx) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            let timer = sleep(delay);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    received = input_rx.recv() => match received {
                        Some(value) => {
                            pending = Some(value);
                            timer.as_mut().reset(Instant::now() + delay);
                            trace!(delay_ms = delay.as_millis() as u64, "Debounce timer restarted");
                        }
                        None => break,
                    },
                    () = &mut timer, if pending.is_some() => {
                        if let Some(value) = pending.take() {
                            if output_tx.send(value).is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        });

        (
            Self {
                input: input_tx,
                task,
                delay,
            },
            output_rx,
        )
    }

    /// Feed a new value, restarting the quiet period
    pub fn push(&self, value: T) {
        let _ = self.input.send(value);
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
