#![forbid(unsafe_code)]

//! Host document abstraction.
//!
//! The controller never touches a concrete document. Everything it needs
//! (queries, attributes, the native dialog primitive, focus, geometry and
//! listener registration) goes through the [`Dom`] trait, so the same state
//! machine runs against a browser document on `wasm32` and against an
//! in-memory document in tests.
//!
//! # Invariants
//!
//! - `Dom` handles are cheap to clone and refer to the same document.
//! - Hosts must not hold internal borrows while invoking a [`Listener`];
//!   listeners re-enter the host.
//! - `Element` equality is identity: two handles compare equal iff they
//!   refer to the same node.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Invalid selector | Malformed query string | `Err(DomError::Host)` |
//! | Redundant `show_modal` | Dialog already open | `Err(DomError::InvalidState)` |
//! | Missing primitive | Host lacks native dialogs | `Err(DomError::Unsupported)` |
//! | Focus options | Element ignores `preventScroll` | `Err(DomError::Unsupported)` |

use std::fmt;

use crate::event::{EventKind, Listener};

/// Errors reported by a [`Dom`] host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The operation is not valid in the element's current state.
    InvalidState(String),
    /// The host does not support the requested operation or option.
    Unsupported(&'static str),
    /// Any other host-side failure, carrying the host's message.
    Host(String),
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::Unsupported(what) => write!(f, "unsupported: {what}"),
            Self::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for DomError {}

/// Inline `display` value applied to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    /// `display: none`.
    None,
    /// `display: block`.
    Block,
}

impl Display {
    /// CSS value for this display mode.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Block => "block",
        }
    }
}

/// Options passed to [`Dom::focus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusOptions {
    /// Ask the host not to scroll the element into view.
    pub prevent_scroll: bool,
}

impl FocusOptions {
    /// Plain focus, no options.
    pub const PLAIN: Self = Self {
        prevent_scroll: false,
    };

    /// Focus without scrolling.
    pub const NO_SCROLL: Self = Self {
        prevent_scroll: true,
    };
}

/// Document loading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// The document is still being parsed.
    Loading,
    /// Parsing finished; sub-resources may still be loading.
    Interactive,
    /// Fully loaded.
    Complete,
}

impl ReadyState {
    /// Parse the host's `document.readyState` string.
    ///
    /// Unknown values are treated as [`ReadyState::Complete`] so
    /// initialization is never deferred forever.
    #[must_use]
    pub fn from_host(value: &str) -> Self {
        match value {
            "loading" => Self::Loading,
            "interactive" => Self::Interactive,
            _ => Self::Complete,
        }
    }
}

/// Viewport-relative bounding rectangle of an element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientRect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl ClientRect {
    /// Build a rect from origin and size.
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            bottom: top + height,
            right: left + width,
        }
    }

    /// Whether the point lies inside the rect. Edges count as inside.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.top <= y && y <= self.bottom && self.left <= x && x <= self.right
    }
}

/// A document host the dialog controller can drive.
///
/// Implementations exist for browsers (`terms-modal-web`) and for tests
/// (`terms-modal-harness`).
pub trait Dom: Clone + 'static {
    /// Handle to an element of this document.
    type Element: Clone + PartialEq + fmt::Debug + 'static;

    /// First element in document order matching `selector`.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>, DomError>;

    /// Every element matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>, DomError>;

    /// First descendant of `root` matching `selector`.
    fn query_selector_in(
        &self,
        root: &Self::Element,
        selector: &str,
    ) -> Result<Option<Self::Element>, DomError>;

    /// Attribute value, `None` when absent.
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Whether the attribute is present (regardless of value).
    fn has_attribute(&self, element: &Self::Element, name: &str) -> bool {
        self.attribute(element, name).is_some()
    }

    fn set_attribute(&self, element: &Self::Element, name: &str, value: &str)
    -> Result<(), DomError>;

    fn remove_attribute(&self, element: &Self::Element, name: &str) -> Result<(), DomError>;

    /// Set the inline `display` style.
    fn set_display(&self, element: &Self::Element, display: Display) -> Result<(), DomError>;

    /// Create a detached element with the given tag name.
    fn create_element(&self, tag: &str) -> Result<Self::Element, DomError>;

    /// Append `element` as the last child of the document body.
    fn append_to_body(&self, element: &Self::Element) -> Result<(), DomError>;

    fn add_body_class(&self, class: &str) -> Result<(), DomError>;

    fn remove_body_class(&self, class: &str) -> Result<(), DomError>;

    /// Whether `element` exposes the native show-as-modal primitive.
    fn supports_modal_dialog(&self, element: &Self::Element) -> bool;

    /// Native open flag of a dialog element. `false` for anything else.
    fn is_dialog_open(&self, element: &Self::Element) -> bool;

    /// Invoke the native show-as-modal primitive.
    fn show_modal(&self, element: &Self::Element) -> Result<(), DomError>;

    /// Invoke the native dialog close primitive.
    fn close_dialog(&self, element: &Self::Element) -> Result<(), DomError>;

    /// Currently focused element, if any.
    fn active_element(&self) -> Option<Self::Element>;

    /// Whether `element` can receive programmatic focus.
    fn is_focusable(&self, element: &Self::Element) -> bool;

    /// Focus `element`. Hosts that cannot honour `options` return
    /// [`DomError::Unsupported`] without moving focus.
    fn focus(&self, element: &Self::Element, options: FocusOptions) -> Result<(), DomError>;

    fn bounding_client_rect(&self, element: &Self::Element) -> ClientRect;

    /// Whether `element` is still attached to the document.
    fn is_connected(&self, element: &Self::Element) -> bool;

    /// Register `listener` for `kind` events targeted at (or bubbling
    /// through) `element`. Listeners live as long as the element.
    fn add_listener(
        &self,
        element: &Self::Element,
        kind: EventKind,
        listener: Listener,
    ) -> Result<(), DomError>;

    fn ready_state(&self) -> ReadyState;

    /// Run `callback` once the document content has been parsed.
    fn on_content_loaded(&self, callback: Box<dyn FnOnce()>) -> Result<(), DomError>;
}
