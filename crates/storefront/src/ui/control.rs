//! Clickable controls with a per-control busy flag.
//!
//! A control is disabled for the duration of its own request, which is the
//! only thing preventing duplicate submissions from double clicks. There is
//! no global lock: two different controls can have requests in flight.

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct ControlState {
    label: String,
    original_label: String,
    disabled: bool,
    message: Option<String>,
}

/// A button-like element: label, disabled flag and an inline message.
#[derive(Debug)]
pub struct Control {
    state: Mutex<ControlState>,
}

impl Control {
    /// Create an enabled control.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            state: Mutex::new(ControlState {
                original_label: label.clone(),
                label,
                disabled: false,
                message: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.lock().label.clone()
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.lock().disabled
    }

    /// Inline message left by the last failed action, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.lock().message.clone()
    }

    /// Show a message without touching the busy flag.
    pub fn show_message(&self, message: impl Into<String>) {
        self.lock().message = Some(message.into());
    }

    /// Disable the control and show `busy_label`.
    ///
    /// Returns `None` if the control is already busy; the caller must not
    /// send anything in that case.
    #[must_use]
    pub fn try_begin(&self, busy_label: &str) -> Option<BusyGuard<'_>> {
        let mut state = self.lock();
        if state.disabled {
            return None;
        }
        state.disabled = true;
        state.label = busy_label.to_string();
        state.message = None;
        Some(BusyGuard { control: self })
    }
}

/// Keeps a control disabled; re-enables it with its original label on drop.
#[derive(Debug)]
#[must_use]
pub struct BusyGuard<'a> {
    control: &'a Control,
}

impl BusyGuard<'_> {
    /// Finish successfully.
    pub fn succeed(self) {}

    /// Finish with a message the user can act on.
    pub fn fail(self, message: &str) {
        self.control.show_message(message);
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.control.lock();
        state.disabled = false;
        state.label = state.original_label.clone();
    }
}
