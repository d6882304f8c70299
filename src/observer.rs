//! Observer trait for wizard events.
//!
//! Inject an [`Arc<dyn WizardObserver>`] via
//! [`crate::config::WizardConfigBuilder::observer`] to receive notifications
//! as they appear and disappear, and the derived view after every state
//! change.
//!
//! # Example
//!
//! ```rust
//! use worksheet_wizard::{Notification, WizardConfig, WizardObserver};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl WizardObserver for Printer {
//!     fn on_notification(&self, notification: &Notification) {
//!         eprintln!("{:?}: {}", notification.kind, notification.text);
//!     }
//! }
//!
//! let config = WizardConfig::builder()
//!     .observer(Arc::new(Printer) as Arc<dyn WizardObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::state::Notification;
use crate::view::ViewKind;
use std::sync::Arc;

/// Called by the wizard as its state changes.
///
/// Implementations must be `Send + Sync`: dismissal of a notification runs on
/// a spawned timer task. All methods have no-op defaults.
///
/// Callbacks run while no internal lock is held, so an observer may call back
/// into the wizard's read-only accessors.
pub trait WizardObserver: Send + Sync {
    /// A notification became visible (replacing any previous one).
    fn on_notification(&self, notification: &Notification) {
        let _ = notification;
    }

    /// The visible notification expired.
    fn on_notification_cleared(&self) {}

    /// The derived view changed.
    fn on_view_change(&self, view: ViewKind) {
        let _ = view;
    }
}

/// A no-op observer; the default when none is configured.
pub struct NoopObserver;

impl WizardObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::WizardConfig`].
pub type SharedObserver = Arc<dyn WizardObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NotificationKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        shown: AtomicUsize,
        cleared: AtomicUsize,
    }

    impl WizardObserver for Counting {
        fn on_notification(&self, _notification: &Notification) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }

        fn on_notification_cleared(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let obs = NoopObserver;
        obs.on_notification(&Notification::success("ok"));
        obs.on_notification_cleared();
        obs.on_view_change(ViewKind::SelectingEmpty);
    }

    #[test]
    fn arc_dyn_observer_receives_events() {
        let counting = Arc::new(Counting {
            shown: AtomicUsize::new(0),
            cleared: AtomicUsize::new(0),
        });
        let obs: SharedObserver = counting.clone();
        obs.on_notification(&Notification::error("bad"));
        obs.on_notification(&Notification::success("good"));
        obs.on_notification_cleared();

        assert_eq!(counting.shown.load(Ordering::SeqCst), 2);
        assert_eq!(counting.cleared.load(Ordering::SeqCst), 1);
        assert_eq!(Notification::error("bad").kind, NotificationKind::Error);
    }
}
