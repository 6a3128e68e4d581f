//! Display hotplug events.
//!
//! Display add/remove callbacks arrive on foreign threads and are appended to
//! a [`HotplugQueue`].  The receive loop drains the queue in one short critical
//! section and sends the notifications outside the lock, so callback order is
//! preserved and callbacks never wait on the network.
//!
//! Some devices never deliver display callbacks.  For those a
//! [`DisplayPoller`] thread diffs the display id set at a fixed interval and
//! feeds the same queue.

use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::application::capabilities::{DisplayListener, DisplayRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Added(i32),
    Removed(i32),
}

/// Lock-guarded FIFO of pending display events.
#[derive(Debug, Default)]
pub struct HotplugQueue {
    pending: Mutex<Vec<DisplayEvent>>,
}

impl HotplugQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: DisplayEvent) {
        self.lock().push(event);
    }

    /// Takes every pending event, oldest first.
    pub fn drain(&self) -> Vec<DisplayEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DisplayEvent>> {
        // A panicking producer cannot leave a Vec half-pushed.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplayListener for HotplugQueue {
    fn on_display_added(&self, display_id: i32) {
        trace!("display {display_id} added");
        self.push(DisplayEvent::Added(display_id));
    }

    fn on_display_removed(&self, display_id: i32) {
        trace!("display {display_id} removed");
        self.push(DisplayEvent::Removed(display_id));
    }

    fn on_display_changed(&self, _display_id: i32) {}
}

// ── Polling fallback ──────────────────────────────────────────────────────────

/// Longest time the poller sleeps before re-checking its stop flag.
const STOP_CHECK_SLICE: Duration = Duration::from_millis(50);

/// Background thread that detects display changes by polling.
pub struct DisplayPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DisplayPoller {
    /// Starts polling `registry` every `interval`.  Changes are reported
    /// relative to the display set listed before this returns.  With
    /// `duration` set the thread exits on its own after that much time.
    pub fn spawn(
        registry: Arc<dyn DisplayRegistry>,
        queue: Arc<HotplugQueue>,
        interval: Duration,
        duration: Option<Duration>,
    ) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let known = display_id_set(registry.as_ref());
        let handle = thread::Builder::new()
            .name("display-poller".to_string())
            .spawn(move || {
                poll_displays(registry, queue, known, interval, duration, thread_stop)
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to exit.  Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("display poller thread panicked");
            }
        }
    }
}

impl Drop for DisplayPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn display_id_set(registry: &dyn DisplayRegistry) -> BTreeSet<i32> {
    match registry.display_ids() {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            warn!("display poller could not list displays: {e}");
            BTreeSet::new()
        }
    }
}

fn poll_displays(
    registry: Arc<dyn DisplayRegistry>,
    queue: Arc<HotplugQueue>,
    mut known: BTreeSet<i32>,
    interval: Duration,
    duration: Option<Duration>,
    stop: Arc<AtomicBool>,
) {
    debug!("display poller started, interval {interval:?}");
    let started = Instant::now();
    'polling: loop {
        let wake_at = Instant::now() + interval;
        loop {
            if stop.load(Ordering::Acquire) {
                break 'polling;
            }
            let now = Instant::now();
            if now >= wake_at {
                break;
            }
            thread::sleep((wake_at - now).min(STOP_CHECK_SLICE));
        }
        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }

        let current = display_id_set(registry.as_ref());
        for &removed in known.difference(&current) {
            queue.push(DisplayEvent::Removed(removed));
        }
        for &added in current.difference(&known) {
            queue.push(DisplayEvent::Added(added));
        }
        known = current;
    }
    debug!("display poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::capabilities::CapabilityError;
    use mirror_core::DisplayInfo;

    #[test]
    fn test_drain_preserves_arrival_order() {
        // Arrange
        let queue = HotplugQueue::new();
        queue.on_display_added(2);
        queue.on_display_removed(2);
        queue.on_display_added(3);

        // Act
        let events = queue.drain();

        // Assert
        assert_eq!(
            events,
            vec![
                DisplayEvent::Added(2),
                DisplayEvent::Removed(2),
                DisplayEvent::Added(3)
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_changed_callback_is_ignored() {
        let queue = HotplugQueue::new();
        queue.on_display_changed(0);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let queue = Arc::new(HotplugQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..100 {
                        queue.push(DisplayEvent::Added(p * 1000 + i));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let events = queue.drain();

        assert_eq!(events.len(), 400);
        // Each producer's events stay in its own order.
        for p in 0..4 {
            let ids: Vec<i32> = events
                .iter()
                .filter_map(|e| match e {
                    DisplayEvent::Added(id) if id / 1000 == p => Some(*id),
                    _ => None,
                })
                .collect();
            assert_eq!(ids, (0..100).map(|i| p * 1000 + i).collect::<Vec<_>>());
        }
    }

    /// Registry whose id list can be replaced while the poller runs.
    struct SwitchableRegistry {
        ids: Mutex<Vec<i32>>,
    }

    impl SwitchableRegistry {
        fn new(ids: Vec<i32>) -> Self {
            Self {
                ids: Mutex::new(ids),
            }
        }
    }

    impl DisplayRegistry for SwitchableRegistry {
        fn display_ids(&self) -> Result<Vec<i32>, CapabilityError> {
            Ok(self.ids.lock().unwrap().clone())
        }
        fn display_info(&self, _display_id: i32) -> Option<DisplayInfo> {
            None
        }
        fn add_listener(&self, _listener: Arc<dyn DisplayListener>) {}
        fn remove_listener(&self, _listener: &Arc<dyn DisplayListener>) {}
    }

    #[test]
    fn test_poller_reports_added_and_removed_displays() {
        // Arrange
        let registry = Arc::new(SwitchableRegistry::new(vec![0, 1]));
        let queue = Arc::new(HotplugQueue::new());
        let mut poller = DisplayPoller::spawn(
            registry.clone(),
            Arc::clone(&queue),
            Duration::from_millis(10),
            None,
        )
        .unwrap();

        // Act
        let deadline = Instant::now() + Duration::from_secs(2);
        *registry.ids.lock().unwrap() = vec![0, 2];
        let mut events = Vec::new();
        while events.len() < 2 && Instant::now() < deadline {
            events.extend(queue.drain());
            thread::sleep(Duration::from_millis(5));
        }
        poller.stop();

        // Assert
        assert_eq!(events, vec![DisplayEvent::Removed(1), DisplayEvent::Added(2)]);
    }

    #[test]
    fn test_poller_stop_is_idempotent() {
        let registry = Arc::new(SwitchableRegistry::new(vec![0]));
        let mut poller = DisplayPoller::spawn(
            registry,
            Arc::new(HotplugQueue::new()),
            Duration::from_secs(60),
            None,
        )
        .unwrap();

        poller.stop();
        poller.stop();
    }
}
