use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::protocol::Event;
use argus_core::argus_debug;

use super::ratelimit::RateLimiter;

/// The number of events the queue holds before new ones are dropped.
const QUEUE_SIZE: usize = 30;

enum Task {
    SendEvent(Event),
    Flush(SyncSender<()>),
    Shutdown,
}

/// A single worker thread draining a bounded event queue.
///
/// Sending never blocks: a full queue drops the newest event. One
/// worker means events leave in the order they were queued. The worker
/// owns the rate limiter, so a server-imposed limit discards queued
/// events cheaply without a network roundtrip.
pub struct TransportThread {
    sender: SyncSender<Task>,
    closed: AtomicBool,
    handle: Option<JoinHandle<()>>,
}

impl TransportThread {
    /// Spawns the worker. `send` performs the actual delivery of one
    /// event and returns the rate limiter updated from the response.
    pub fn new<SendFn>(mut send: SendFn) -> Self
    where
        SendFn: FnMut(Event, RateLimiter) -> RateLimiter + Send + 'static,
    {
        let (sender, receiver) = sync_channel(QUEUE_SIZE);
        let handle = thread::Builder::new()
            .name("argus-transport".into())
            .spawn(move || {
                let mut rl = RateLimiter::new();
                for task in receiver.iter() {
                    match task {
                        Task::SendEvent(event) => {
                            if let Some(time_left) = rl.is_disabled() {
                                argus_debug!(
                                    "discarding event, rate limited for {}s",
                                    time_left.as_secs()
                                );
                                continue;
                            }
                            rl = send(event, rl);
                        }
                        Task::Flush(done) => {
                            let _ = done.send(());
                        }
                        Task::Shutdown => return,
                    }
                }
            });
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                argus_debug!("failed to spawn transport thread: {}", err);
                None
            }
        };

        TransportThread {
            sender,
            closed: AtomicBool::new(false),
            handle,
        }
    }

    /// Queues an event, dropping it if the queue is full or the
    /// transport was shut down.
    pub fn send(&self, event: Event) {
        if self.closed.load(Ordering::SeqCst) {
            argus_debug!("event dropped, transport is shut down");
            return;
        }
        match self.sender.try_send(Task::SendEvent(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                argus_debug!("event dropped, transport queue is full");
            }
            Err(TrySendError::Disconnected(_)) => {
                argus_debug!("event dropped, transport worker is gone");
            }
        }
    }

    /// Blocks until everything queued before this call was processed,
    /// or the timeout elapses. Returns `true` if the queue drained.
    ///
    /// The flush marker goes through the same queue as the events, so
    /// the worker acknowledging it proves everything ahead of it was
    /// handled.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (done_tx, done_rx) = sync_channel(1);
        // enqueueing the marker counts against the timeout too, so a
        // full queue with a stalled worker cannot block past it
        let mut task = Task::Flush(done_tx);
        loop {
            match self.sender.try_send(task) {
                Ok(()) => break,
                Err(TrySendError::Full(returned)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    task = returned;
                    thread::sleep(remaining.min(Duration::from_millis(10)));
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        done_rx.recv_timeout(remaining).is_ok()
    }

    /// Stops accepting events, then drains what was already queued.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.closed.store(true, Ordering::SeqCst);
        self.flush(timeout)
    }
}

impl Drop for TransportThread {
    fn drop(&mut self) {
        let _ = self.sender.send(Task::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
