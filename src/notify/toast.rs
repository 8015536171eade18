use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
    },
    time::Duration,
};

use chrono::{
    DateTime,
    Utc,
};
use tokio::{
    runtime::Handle,
    task::AbortHandle,
    time::{
        sleep_until,
        Instant,
    },
};
use tracing::warn;
use uuid::Uuid;

use super::{
    Notification,
    NotificationKind,
    NotificationSink,
};
use crate::core::ClientConfig;

pub const MAX_TOASTS: usize = 5;
pub const DEFAULT_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// `None` for sticky toasts, which stay until dismissed.
    pub duration: Option<Duration>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<Instant>,
}

#[derive(Default)]
struct ToastState {
    toasts: VecDeque<Toast>, // newest first
    timers: HashMap<Uuid, AbortHandle>,
}

impl ToastState {
    fn remove(&mut self, id: Uuid) -> bool {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }
}

/// Bounded, newest-first list of on-screen notifications with per-toast expiry.
///
/// Expiry timers run on the ambient tokio runtime. Pushed outside a runtime, a
/// toast still shows but only leaves through [`ToastQueue::dismiss`] or eviction.
#[derive(Clone)]
pub struct ToastQueue {
    state: Arc<Mutex<ToastState>>,
    capacity: usize,
    default_duration: Duration,
}

impl ToastQueue {
    pub fn new(capacity: usize, default_duration: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            capacity: capacity.max(1),
            default_duration,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.toast_capacity, config.toast_duration())
    }

    fn lock(&self) -> MutexGuard<'_, ToastState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, notification: Notification) -> Uuid {
        self.push_with_duration(notification, self.default_duration)
    }

    /// A zero `duration` makes the toast sticky.
    pub fn push_with_duration(&self, notification: Notification, duration: Duration) -> Uuid {
        let id = Uuid::new_v4();
        let duration = (!duration.is_zero()).then_some(duration);
        let expires_at = duration.map(|d| Instant::now() + d);

        let mut state = self.lock();
        state.toasts.push_front(Toast {
            id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            duration,
            created_at: Utc::now(),
            expires_at,
        });

        while state.toasts.len() > self.capacity {
            if let Some(evicted) = state.toasts.pop_back() {
                if let Some(timer) = state.timers.remove(&evicted.id) {
                    timer.abort();
                }
            }
        }

        // The lock is held until the handle is stored, so the timer cannot fire first.
        if let Some(expires_at) = expires_at {
            match Handle::try_current() {
                Ok(runtime) => {
                    let shared = Arc::downgrade(&self.state);
                    let task = runtime.spawn(async move {
                        sleep_until(expires_at).await;
                        if let Some(shared) = shared.upgrade() {
                            let mut state =
                                shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                            state.timers.remove(&id);
                            state.toasts.retain(|t| t.id != id);
                        }
                    });
                    state.timers.insert(id, task.abort_handle());
                }
                Err(_) => warn!(toast = %id, "No tokio runtime, toast will not expire"),
            }
        }

        id
    }

    /// Remove a toast early. Returns whether it was still showing.
    pub fn dismiss(&self, id: Uuid) -> bool {
        self.lock().remove(id)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        state.toasts.clear();
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().toasts.is_empty()
    }

    #[cfg(test)]
    fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(MAX_TOASTS, DEFAULT_DURATION)
    }
}

impl NotificationSink for ToastQueue {
    fn notify(&self, notification: Notification) {
        self.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(queue: &ToastQueue) -> Vec<String> {
        queue.toasts().into_iter().map(|t| t.title).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_newest_first_and_bounded() {
        let queue = ToastQueue::default();
        for i in 0..7 {
            queue.push(Notification::info(format!("t{i}"), ""));
        }
        assert_eq!(titles(&queue), vec!["t6", "t5", "t4", "t3", "t2"]);
        assert_eq!(queue.pending_timers(), MAX_TOASTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_expires() {
        let queue = ToastQueue::default();
        queue.push(Notification::success("Saved", "Interests updated"));
        tokio::time::sleep(Duration::from_millis(4000)).await;
        queue.push(Notification::success("Added", "\"chess\" added"));
        assert_eq!(queue.len(), 2);

        tokio::time::sleep(Duration::from_millis(1001)).await;
        tokio::task::yield_now().await;
        assert_eq!(titles(&queue), vec!["Added"]);

        tokio::time::sleep(Duration::from_millis(4000)).await;
        tokio::task::yield_now().await;
        assert!(queue.is_empty());
        assert_eq!(queue.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_timer() {
        let queue = ToastQueue::default();
        let id = queue.push(Notification::error("Add failed", "Keyword already exists"));
        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));
        assert_eq!(queue.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sticky_toast_stays() {
        let queue = ToastQueue::default();
        queue.push_with_duration(Notification::info("Heads up", "sticky"), Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(queue.len(), 1);
        assert!(queue.toasts()[0].expires_at.is_none());

        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_outside_runtime() {
        let queue = ToastQueue::new(2, DEFAULT_DURATION);
        queue.notify(Notification::info("a", ""));
        queue.notify(Notification::info("b", ""));
        queue.notify(Notification::info("c", ""));
        assert_eq!(titles(&queue), vec!["c", "b"]);
        assert_eq!(queue.pending_timers(), 0);
    }
}
