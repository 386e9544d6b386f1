#![forbid(unsafe_code)]

//! Modal dialogs for terms-of-service style surfaces.
//!
//! Triggers name a surface by key; clicking one opens the surface as a
//! modal. Surfaces use the host's native modal dialog when it has one and a
//! synthesized overlay otherwise. Escape, outside clicks and the surface's
//! close affordance dismiss it, and focus returns to where it was.
//!
//! The crate is host-neutral: it drives a document through the [`Dom`]
//! trait. `terms-modal-web` implements it for browsers and
//! `terms-modal-harness` for tests.

pub mod binding;
pub mod config;
pub mod controller;
pub mod dom;
pub mod event;
pub mod focus;
pub mod registry;
pub mod selector;

pub use binding::{BindOutcome, TermsModals, install};
pub use config::{ConfigError, ModalConfig};
pub use controller::{DialogController, InitSkip, StrategyKind};
pub use dom::{ClientRect, Display, Dom, DomError, FocusOptions, ReadyState};
pub use event::{DomEvent, EventKind, Listener};
pub use focus::FocusMemory;
pub use registry::DialogRegistry;
pub use selector::{CompoundSelector, SelectorError, escape_attribute_value, surface_selector};
