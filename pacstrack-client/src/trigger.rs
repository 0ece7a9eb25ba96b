//! Per-control duplicate submission guard.

use std::sync::Arc;
use tokio::sync::watch;

/// The control that starts one kind of job. It is disabled while that job is
/// outstanding; other triggers are unaffected.
#[derive(Debug, Clone)]
pub struct Trigger {
    name: Arc<str>,
    enabled: Arc<watch::Sender<bool>>,
}

impl Trigger {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let (enabled, _) = watch::channel(true);
        Self {
            name: name.into(),
            enabled: Arc::new(enabled),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Observe enable/disable transitions, e.g. to grey out a button.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.enabled.subscribe()
    }

    /// Disable the trigger, or return `None` when it already is.
    pub fn try_acquire(&self) -> Option<TriggerPermit> {
        let acquired = self.enabled.send_if_modified(|enabled| {
            let was_enabled = *enabled;
            *enabled = false;
            was_enabled
        });
        acquired.then(|| TriggerPermit {
            enabled: Arc::clone(&self.enabled),
        })
    }
}

/// Held for the lifetime of one job; re-enables its trigger on drop.
#[derive(Debug)]
pub struct TriggerPermit {
    enabled: Arc<watch::Sender<bool>>,
}

impl Drop for TriggerPermit {
    fn drop(&mut self) {
        self.enabled.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_until_release() {
        let trigger = Trigger::new("find-missing");
        let permit = trigger.try_acquire().expect("first acquire");
        assert!(!trigger.is_enabled());
        assert!(trigger.try_acquire().is_none());

        drop(permit);
        assert!(trigger.is_enabled());
        assert!(trigger.try_acquire().is_some());
    }

    #[test]
    fn triggers_are_independent() {
        let search = Trigger::new("search");
        let send = Trigger::new("send");
        let _busy = search.try_acquire().expect("search acquire");
        assert!(send.try_acquire().is_some());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let trigger = Trigger::new("find-missing");
        let mut rx = trigger.subscribe();

        let permit = trigger.try_acquire().expect("acquire");
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());

        drop(permit);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }
}
