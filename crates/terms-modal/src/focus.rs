#![forbid(unsafe_code)]

//! Focus capture and restoration around a dialog's open/close cycle.
//!
//! # Invariants
//!
//! - [`FocusMemory`] holds a value only between `remember` and the next
//!   `take`; `take` always leaves it empty.
//! - `remember` overwrites unconditionally, even when a previous value was
//!   never consumed.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Scroll suppression rejected | Host lacks focus options | Plain focus |
//! | Remembered element gone or inert | Not focusable anymore | Skipped, memory still cleared |

use std::cell::RefCell;

use crate::dom::{Dom, DomError, FocusOptions};

/// Slot for the element focused before a dialog opened.
#[derive(Debug)]
pub struct FocusMemory<E> {
    previous: RefCell<Option<E>>,
}

impl<E> Default for FocusMemory<E> {
    fn default() -> Self {
        Self {
            previous: RefCell::new(None),
        }
    }
}

impl<E: Clone> FocusMemory<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element`, replacing whatever was remembered.
    pub fn remember(&self, element: Option<E>) {
        *self.previous.borrow_mut() = element;
    }

    /// Consume the remembered element.
    pub fn take(&self) -> Option<E> {
        self.previous.borrow_mut().take()
    }

    /// Remembered element without consuming it.
    pub fn peek(&self) -> Option<E> {
        self.previous.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.borrow().is_none()
    }
}

/// Focus `element` without scrolling it into view, falling back to a
/// plain focus when the host rejects the option.
///
/// Does nothing for elements that cannot take focus.
pub fn focus_without_scroll<D: Dom>(dom: &D, element: &D::Element) -> Result<(), DomError> {
    if !dom.is_focusable(element) {
        return Ok(());
    }

    match dom.focus(element, FocusOptions::NO_SCROLL) {
        Ok(()) => Ok(()),
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::trace!(error = %_err, "focus options rejected, using plain focus");
            dom.focus(element, FocusOptions::PLAIN)
        }
    }
}

/// Consume `memory` and return focus to the element it held.
///
/// Returns `true` when focus was moved.
pub fn restore_focus<D: Dom>(dom: &D, memory: &FocusMemory<D::Element>) -> bool {
    let Some(previous) = memory.take() else {
        return false;
    };

    if !dom.is_focusable(&previous) {
        return false;
    }

    match dom.focus(&previous, FocusOptions::PLAIN) {
        Ok(()) => true,
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %_err, "focus restoration failed");
            false
        }
    }
}
