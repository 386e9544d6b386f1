#![forbid(unsafe_code)]

//! Per-surface dialog state machine.
//!
//! A [`DialogController`] owns one surface and drives it between **Closed**
//! (initial) and **Open** through [`open`](DialogController::open) and
//! [`close`](DialogController::close). Which of the two strategies runs is
//! decided once, when the controller is created:
//!
//! - **Native**: the host exposes a show-as-modal primitive on the surface.
//!   The primitive provides top-layer rendering and the focus trap; the
//!   controller adds bookkeeping (attributes, body class, focus restore),
//!   turns the `cancel` signal into `close()`, and hit-tests clicks on the
//!   surface to detect clicks on the primitive's backdrop.
//! - **Fallback**: no primitive. The controller marks the surface with
//!   dialog semantics, toggles inline display, and owns a synthesized
//!   backdrop element appended to the body.
//!
//! # Invariants
//!
//! 1. The strategy never changes after construction.
//! 2. The native show/close primitives are only invoked when the open flag
//!    says they are needed; a redundant call never reaches the host.
//! 3. After `open()`: `aria-hidden="false"`, the surface is shown, the body
//!    class is present and focus is on the close affordance.
//! 4. After `close()`: `aria-hidden="true"`, `hidden` is present, the
//!    surface is hidden, the body class is gone, and the remembered focus
//!    has been consumed.
//! 5. Listeners hold weak references; a controller dropped from its
//!    registry turns its listeners into no-ops.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing close affordance | Markup lacks the close selector | Construction skipped |
//! | Host error during construction | Host rejected a step | Construction skipped, no backdrop appended |
//! | Host error during open/close | Host rejected a step | Step skipped, remaining steps run |
//! | Body class shared | Two dialogs open, one closes | Class removed while the other is open |

use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::ModalConfig;
use crate::dom::{Display, Dom, DomError};
use crate::event::{DomEvent, EventKind, Listener};
use crate::focus::{FocusMemory, focus_without_scroll, restore_focus};

/// Why a surface did not get a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitSkip {
    /// No element matches the surface selector for the key.
    SurfaceNotFound,
    /// The surface has no close affordance.
    MissingCloseAffordance,
    /// The host failed while querying or preparing the surface.
    Host(DomError),
}

impl fmt::Display for InitSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceNotFound => write!(f, "surface not found"),
            Self::MissingCloseAffordance => write!(f, "surface has no close affordance"),
            Self::Host(err) => write!(f, "surface initialization failed: {err}"),
        }
    }
}

impl std::error::Error for InitSkip {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DomError> for InitSkip {
    fn from(err: DomError) -> Self {
        Self::Host(err)
    }
}

/// Strategy selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Native,
    Fallback,
}

enum Strategy<E> {
    Native,
    Fallback { backdrop: E },
}

impl<E> Strategy<E> {
    fn kind(&self) -> StrategyKind {
        match self {
            Self::Native => StrategyKind::Native,
            Self::Fallback { .. } => StrategyKind::Fallback,
        }
    }
}

struct DialogInner<D: Dom> {
    dom: D,
    config: Rc<ModalConfig>,
    key: String,
    surface: D::Element,
    close_button: D::Element,
    strategy: Strategy<D::Element>,
    focus: FocusMemory<D::Element>,
}

/// Shared handle to one surface's dialog state.
pub struct DialogController<D: Dom> {
    inner: Rc<DialogInner<D>>,
}

impl<D: Dom> Clone for DialogController<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<D: Dom> fmt::Debug for DialogController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogController")
            .field("key", &self.inner.key)
            .field("strategy", &self.strategy_kind())
            .field("surface", &self.inner.surface)
            .finish()
    }
}

impl<D: Dom> DialogController<D> {
    /// Prepare `surface` and wire its dismiss affordances.
    ///
    /// # Errors
    ///
    /// [`InitSkip::MissingCloseAffordance`] when the surface has no element
    /// matching the configured close selector; [`InitSkip::Host`] when the
    /// host fails while preparing the surface.
    pub fn initialize(
        dom: D,
        config: Rc<ModalConfig>,
        key: impl Into<String>,
        surface: D::Element,
    ) -> Result<Self, InitSkip> {
        let close_button = dom
            .query_selector_in(&surface, &config.close_selector)?
            .ok_or(InitSkip::MissingCloseAffordance)?;

        let strategy = if dom.supports_modal_dialog(&surface) {
            Strategy::Native
        } else {
            dom.set_attribute(&surface, &config.fallback_attribute, "true")?;
            dom.set_attribute(&surface, "role", "dialog")?;
            dom.set_attribute(&surface, "aria-modal", "true")?;
            dom.set_display(&surface, Display::None)?;

            let backdrop = dom.create_element("div")?;
            dom.set_attribute(&backdrop, "class", &config.backdrop_class)?;
            dom.set_attribute(&backdrop, "aria-hidden", "true")?;
            dom.set_display(&backdrop, Display::None)?;
            Strategy::Fallback { backdrop }
        };

        dom.set_attribute(&surface, "hidden", "hidden")?;
        dom.set_attribute(&surface, "aria-hidden", "true")?;

        let controller = Self {
            inner: Rc::new(DialogInner {
                dom,
                config,
                key: key.into(),
                surface,
                close_button,
                strategy,
                focus: FocusMemory::new(),
            }),
        };
        controller.wire()?;

        // Last fallible step: a failed attempt leaves no backdrop behind.
        if let Strategy::Fallback { backdrop } = &controller.inner.strategy {
            controller.inner.dom.append_to_body(backdrop)?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            key = %controller.inner.key,
            strategy = ?controller.strategy_kind(),
            "dialog initialized"
        );

        Ok(controller)
    }

    fn wire(&self) -> Result<(), DomError> {
        let inner = &self.inner;
        let dom = &inner.dom;
        let weak = Rc::downgrade(inner);

        dom.add_listener(
            &inner.close_button,
            EventKind::Click,
            listener(&weak, |dialog, event| {
                event.prevent_default();
                dialog.close();
            }),
        )?;

        let close_on_escape = inner.config.close_on_escape;
        let close_on_backdrop = inner.config.close_on_backdrop;

        match &inner.strategy {
            Strategy::Native => {
                dom.add_listener(
                    &inner.surface,
                    EventKind::Cancel,
                    listener(&weak, move |dialog, event| {
                        event.prevent_default();
                        if close_on_escape {
                            dialog.close();
                        }
                    }),
                )?;

                if close_on_backdrop {
                    dom.add_listener(
                        &inner.surface,
                        EventKind::Click,
                        listener(&weak, |dialog, event| {
                            let inner = &dialog.inner;
                            let rect = inner.dom.bounding_client_rect(&inner.surface);
                            if !rect.contains(event.client_x(), event.client_y()) {
                                dialog.close();
                            }
                        }),
                    )?;
                }
            }
            Strategy::Fallback { backdrop } => {
                if close_on_escape {
                    dom.add_listener(
                        &inner.surface,
                        EventKind::KeyDown,
                        listener(&weak, |dialog, event| {
                            if event.is_escape() {
                                dialog.close();
                            }
                        }),
                    )?;
                }

                if close_on_backdrop {
                    dom.add_listener(
                        backdrop,
                        EventKind::Click,
                        listener(&weak, |dialog, _event| dialog.close()),
                    )?;
                }
            }
        }

        Ok(())
    }

    /// Listener that opens this dialog, for attaching to triggers.
    ///
    /// Holds a weak reference, like the dismiss listeners.
    pub fn activation_listener(&self) -> Listener {
        listener(&Rc::downgrade(&self.inner), |dialog, event| {
            dialog.open(Some(event));
        })
    }

    /// Show the dialog.
    ///
    /// `event` is the activation event, if any; its default action is
    /// suppressed.
    pub fn open(&self, event: Option<&DomEvent>) {
        if let Some(event) = event {
            event.prevent_default();
        }

        let inner = &*self.inner;
        let dom = &inner.dom;

        inner.focus.remember(dom.active_element());

        match &inner.strategy {
            Strategy::Native => {
                report(dom.remove_attribute(&inner.surface, "hidden"), "remove hidden");
                if !dom.is_dialog_open(&inner.surface) {
                    report(dom.show_modal(&inner.surface), "show modal");
                }
            }
            Strategy::Fallback { backdrop } => {
                report(dom.set_display(&inner.surface, Display::Block), "show surface");
                report(dom.set_display(backdrop, Display::Block), "show backdrop");
            }
        }

        report(
            dom.set_attribute(&inner.surface, "aria-hidden", "false"),
            "aria-hidden",
        );
        report(dom.add_body_class(&inner.config.body_class), "body class");
        report(
            focus_without_scroll(dom, &inner.close_button),
            "focus close affordance",
        );

        #[cfg(feature = "tracing")]
        tracing::trace!(key = %inner.key, "dialog opened");
    }

    /// Hide the dialog and return focus to where it was before `open`.
    pub fn close(&self) {
        let inner = &*self.inner;
        let dom = &inner.dom;

        match &inner.strategy {
            Strategy::Native => {
                if dom.is_dialog_open(&inner.surface) {
                    report(dom.close_dialog(&inner.surface), "close dialog");
                }
            }
            Strategy::Fallback { backdrop } => {
                report(dom.set_display(&inner.surface, Display::None), "hide surface");
                report(dom.set_display(backdrop, Display::None), "hide backdrop");
            }
        }

        report(
            dom.set_attribute(&inner.surface, "aria-hidden", "true"),
            "aria-hidden",
        );
        report(
            dom.set_attribute(&inner.surface, "hidden", "hidden"),
            "restore hidden",
        );
        report(dom.remove_body_class(&inner.config.body_class), "body class");

        restore_focus(dom, &inner.focus);

        #[cfg(feature = "tracing")]
        tracing::trace!(key = %inner.key, "dialog closed");
    }

    /// Whether the dialog is open, read back from the host.
    pub fn is_open(&self) -> bool {
        let inner = &self.inner;
        match inner.strategy {
            Strategy::Native => inner.dom.is_dialog_open(&inner.surface),
            Strategy::Fallback { .. } => {
                inner.dom.attribute(&inner.surface, "aria-hidden").as_deref() == Some("false")
            }
        }
    }

    #[inline]
    pub fn strategy_kind(&self) -> StrategyKind {
        self.inner.strategy.kind()
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn surface(&self) -> &D::Element {
        &self.inner.surface
    }

    pub fn close_affordance(&self) -> &D::Element {
        &self.inner.close_button
    }

    /// Synthesized backdrop; `None` for native dialogs.
    pub fn backdrop(&self) -> Option<&D::Element> {
        match &self.inner.strategy {
            Strategy::Native => None,
            Strategy::Fallback { backdrop } => Some(backdrop),
        }
    }

    /// Element focus will return to on the next `close()`.
    pub fn previously_focused(&self) -> Option<D::Element> {
        self.inner.focus.peek()
    }

    /// Whether `self` and `other` are the same dialog state.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.inner.dom.is_connected(&self.inner.surface)
    }
}

fn listener<D, F>(weak: &Weak<DialogInner<D>>, f: F) -> Listener
where
    D: Dom,
    F: Fn(&DialogController<D>, &DomEvent) + 'static,
{
    let weak = weak.clone();
    Rc::new(move |event: &DomEvent| {
        if let Some(inner) = weak.upgrade() {
            f(&DialogController { inner }, event);
        }
    })
}

fn report(result: Result<(), DomError>, _step: &'static str) {
    if let Err(_err) = result {
        #[cfg(feature = "tracing")]
        tracing::debug!(step = _step, error = %_err, "host rejected dialog step");
    }
}
