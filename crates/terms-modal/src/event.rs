#![forbid(unsafe_code)]

//! Host-neutral event values handed to listeners.
//!
//! Hosts translate their native events into a [`DomEvent`], run the
//! listeners, and afterwards honour [`DomEvent::default_prevented`] on the
//! native event. Everything is synchronous, so the flag round-trips within
//! a single dispatch.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Event types the controller listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Pointer activation (`click`).
    Click,
    /// Key press (`keydown`).
    KeyDown,
    /// Native dialog dismissal request (`cancel`), e.g. from Escape.
    Cancel,
}

impl EventKind {
    /// Host event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::KeyDown => "keydown",
            Self::Cancel => "cancel",
        }
    }

    /// Whether events of this kind bubble to ancestors.
    #[must_use]
    pub const fn bubbles(self) -> bool {
        !matches!(self, Self::Cancel)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback registered against an element.
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct DomEvent {
    kind: EventKind,
    client_x: f64,
    client_y: f64,
    key: Option<String>,
    default_prevented: Cell<bool>,
}

impl DomEvent {
    /// Create an event with no coordinates and no key.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            client_x: 0.0,
            client_y: 0.0,
            key: None,
            default_prevented: Cell::new(false),
        }
    }

    /// A click at the given viewport coordinates.
    #[must_use]
    pub fn click(client_x: f64, client_y: f64) -> Self {
        Self {
            client_x,
            client_y,
            ..Self::new(EventKind::Click)
        }
    }

    /// A key-down carrying the host key identifier (e.g. `"Escape"`).
    #[must_use]
    pub fn key_down(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(EventKind::KeyDown)
        }
    }

    /// A native dialog cancel request.
    #[must_use]
    pub fn cancel() -> Self {
        Self::new(EventKind::Cancel)
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    pub fn client_x(&self) -> f64 {
        self.client_x
    }

    #[inline]
    pub fn client_y(&self) -> f64 {
        self.client_y
    }

    /// Key identifier for key events.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Whether this is an Escape key press. Accepts both the standard
    /// `"Escape"` identifier and the legacy `"Esc"`.
    #[must_use]
    pub fn is_escape(&self) -> bool {
        self.kind == EventKind::KeyDown && matches!(self.key(), Some("Escape" | "Esc"))
    }

    /// Suppress the host's default action for this event.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}
