use std::sync::Mutex;

use log::{info, warn};

use crate::error::ActionError;
use crate::model::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Write access to the system clipboard
pub trait ClipboardAccess {
    fn set_text(&self, text: &str) -> Result<(), ActionError>;
}

/// Show desktop notifications
pub trait Notifications {
    fn show(&self, message: &str, level: NotificationLevel) -> Result<(), ActionError>;
}

/// Clipboard backed by arboard. The handle is opened on first use and kept
/// for the life of the process, since on Wayland the copied text is served
/// by this process.
#[derive(Default)]
pub struct ArboardClipboard {
    clipboard: Mutex<Option<arboard::Clipboard>>,
}

impl ArboardClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardAccess for ArboardClipboard {
    fn set_text(&self, text: &str) -> Result<(), ActionError> {
        let mut guard = self
            .clipboard
            .lock()
            .map_err(|e| ActionError::Clipboard(e.to_string()))?;

        if guard.is_none() {
            *guard = Some(arboard::Clipboard::new().map_err(|e| ActionError::Clipboard(e.to_string()))?);
        }
        match guard.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text)
                .map_err(|e| ActionError::Clipboard(e.to_string())),
            None => Err(ActionError::Clipboard("clipboard unavailable".to_string())),
        }
    }
}

/// Desktop notifications through notify-rust
pub struct DesktopNotifications {
    summary: String,
}

impl DesktopNotifications {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

impl Notifications for DesktopNotifications {
    fn show(&self, message: &str, level: NotificationLevel) -> Result<(), ActionError> {
        let urgency = match level {
            NotificationLevel::Info => notify_rust::Urgency::Low,
            NotificationLevel::Warning => notify_rust::Urgency::Normal,
            NotificationLevel::Error => notify_rust::Urgency::Critical,
        };
        notify_rust::Notification::new()
            .summary(&self.summary)
            .body(message)
            .urgency(urgency)
            .show()
            .map_err(|e| ActionError::Notification(e.to_string()))?;
        Ok(())
    }
}

/// Copies the entry's reference and tells the user. Returns whether the
/// clipboard now holds the reference.
pub fn link_entry(entry: &Entry, clipboard: &dyn ClipboardAccess, notifications: &dyn Notifications) -> bool {
    let name = entry.display_name().unwrap_or("waypoint");
    let Some(reference) = entry.reference() else {
        warn!("Entry {} has no reference to copy", entry.id);
        return false;
    };

    let (copied, message, level) = match clipboard.set_text(reference) {
        Ok(()) => {
            info!("Copied {} ({})", name, reference);
            (true, format!("Linked: {name}"), NotificationLevel::Info)
        }
        Err(err) => {
            warn!("Failed to copy {}: {}", name, err);
            (false, format!("Could not copy {name}"), NotificationLevel::Warning)
        }
    };

    if let Err(err) = notifications.show(&message, level) {
        warn!("Failed to show notification: {}", err);
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeClipboard {
        fail: bool,
        texts: RefCell<Vec<String>>,
    }

    impl ClipboardAccess for FakeClipboard {
        fn set_text(&self, text: &str) -> Result<(), ActionError> {
            if self.fail {
                return Err(ActionError::Clipboard("no seat".into()));
            }
            self.texts.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct FakeNotifications {
        fail: bool,
        shown: RefCell<Vec<(String, NotificationLevel)>>,
    }

    impl Notifications for FakeNotifications {
        fn show(&self, message: &str, level: NotificationLevel) -> Result<(), ActionError> {
            self.shown.borrow_mut().push((message.to_string(), level));
            if self.fail {
                return Err(ActionError::Notification("no daemon".into()));
            }
            Ok(())
        }
    }

    fn clipboard(fail: bool) -> FakeClipboard {
        FakeClipboard { fail, texts: RefCell::new(Vec::new()) }
    }

    fn notifications(fail: bool) -> FakeNotifications {
        FakeNotifications { fail, shown: RefCell::new(Vec::new()) }
    }

    #[test]
    fn copies_reference_verbatim() {
        let entry = Entry::new(9, Some("Lion's Arch Waypoint".into()), Some("[&BAgAAAA=]".into()));
        let cb = clipboard(false);
        let notes = notifications(false);

        assert!(link_entry(&entry, &cb, &notes));
        assert_eq!(*cb.texts.borrow(), vec!["[&BAgAAAA=]".to_string()]);
        assert_eq!(
            *notes.shown.borrow(),
            vec![("Linked: Lion's Arch Waypoint".to_string(), NotificationLevel::Info)]
        );
    }

    #[test]
    fn clipboard_failure_becomes_warning() {
        let entry = Entry::new(9, Some("Fort Marriner".into()), Some("[&BAgAAAA=]".into()));
        let notes = notifications(false);

        assert!(!link_entry(&entry, &clipboard(true), &notes));
        assert_eq!(notes.shown.borrow()[0].1, NotificationLevel::Warning);
    }

    #[test]
    fn notification_failure_is_swallowed() {
        let entry = Entry::new(9, Some("Fort Marriner".into()), Some("[&BAgAAAA=]".into()));
        let cb = clipboard(false);
        assert!(link_entry(&entry, &cb, &notifications(true)));
        assert_eq!(cb.texts.borrow().len(), 1);
    }

    #[test]
    fn missing_reference_copies_nothing() {
        let entry = Entry::new(9, Some("Fort Marriner".into()), None);
        let cb = clipboard(false);
        let notes = notifications(false);
        assert!(!link_entry(&entry, &cb, &notes));
        assert!(cb.texts.borrow().is_empty());
        assert!(notes.shown.borrow().is_empty());
    }
}
