#![forbid(unsafe_code)]

//! Trigger binding and the document-level entry point.
//!
//! A trigger is any element carrying the configured trigger attribute; its
//! value names the surface key. Binding resolves the key through the
//! registry, attaches `open` to the trigger's click, and stamps the
//! trigger with the bound marker so a second pass skips it.
//!
//! The marker lives only as long as the controller it points at. Evicting
//! or pruning an entry, calling [`TermsModals::release`], or dropping the
//! last handle removes the marker from the affected triggers, and the next
//! [`bind_all`](TermsModals::bind_all) wires them again.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::config::ModalConfig;
use crate::controller::InitSkip;
use crate::dom::{Dom, ReadyState};
use crate::event::EventKind;
use crate::registry::DialogRegistry;

/// What [`TermsModals::bind`] did with a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// A click listener was attached and the trigger marked.
    Bound,
    /// The trigger already carries the bound marker.
    AlreadyBound,
    /// The trigger's key attribute is absent or empty.
    MissingKey,
    /// No controller exists for the key.
    Skipped(InitSkip),
}

impl BindOutcome {
    #[inline]
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound)
    }
}

impl fmt::Display for BindOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bound => write!(f, "bound"),
            Self::AlreadyBound => write!(f, "already bound"),
            Self::MissingKey => write!(f, "missing key"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Shared handle binding triggers in one document.
pub struct TermsModals<D: Dom> {
    dom: D,
    config: Rc<ModalConfig>,
    registry: Rc<RefCell<DialogRegistry<D>>>,
}

impl<D: Dom> Clone for TermsModals<D> {
    fn clone(&self) -> Self {
        Self {
            dom: self.dom.clone(),
            config: Rc::clone(&self.config),
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<D: Dom> fmt::Debug for TermsModals<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermsModals")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<D: Dom> TermsModals<D> {
    /// Create a handle with an empty registry. `config` is used as given;
    /// call [`ModalConfig::validate`] first for untrusted configs.
    pub fn new(dom: D, config: ModalConfig) -> Self {
        let config = Rc::new(config);
        let registry = DialogRegistry::new(dom.clone(), Rc::clone(&config));
        Self {
            dom,
            config,
            registry: Rc::new(RefCell::new(registry)),
        }
    }

    pub fn config(&self) -> &ModalConfig {
        &self.config
    }

    pub fn registry(&self) -> Ref<'_, DialogRegistry<D>> {
        self.registry.borrow()
    }

    /// Drop registry entries whose surface left the document.
    pub fn prune_detached(&self) -> usize {
        self.registry.borrow_mut().prune_detached()
    }

    /// Drop the registry entry for `key`.
    pub fn evict(&self, key: &str) -> bool {
        self.registry.borrow_mut().evict(key).is_some()
    }

    /// Drop every registry entry and unmark every trigger this handle
    /// bound, leaving the document free for another installation.
    pub fn release(&self) -> usize {
        self.registry.borrow_mut().clear()
    }

    /// Bind one trigger element.
    pub fn bind(&self, trigger: &D::Element) -> BindOutcome {
        let config = &self.config;

        if self.dom.attribute(trigger, &config.bound_attribute).as_deref() == Some("true") {
            return BindOutcome::AlreadyBound;
        }

        let key = match self.dom.attribute(trigger, &config.trigger_attribute) {
            Some(key) if !key.is_empty() => key,
            _ => return BindOutcome::MissingKey,
        };

        let resolved = self.registry.borrow_mut().resolve(&key);
        let controller = match resolved {
            Ok(controller) => controller,
            Err(skip) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %key, reason = %skip, "trigger skipped");
                return BindOutcome::Skipped(skip);
            }
        };

        if let Err(err) =
            self.dom
                .add_listener(trigger, EventKind::Click, controller.activation_listener())
        {
            return BindOutcome::Skipped(InitSkip::Host(err));
        }

        if let Err(_err) = self.dom.set_attribute(trigger, &config.bound_attribute, "true") {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, error = %_err, "could not mark trigger bound");
        }
        self.registry
            .borrow_mut()
            .record_trigger(&key, trigger.clone());

        #[cfg(feature = "tracing")]
        tracing::trace!(key = %key, "trigger bound");

        BindOutcome::Bound
    }

    /// Bind every trigger currently in the document.
    ///
    /// Returns the number of triggers newly bound.
    pub fn bind_all(&self) -> usize {
        let triggers = match self.dom.query_selector_all(&self.config.trigger_selector()) {
            Ok(triggers) => triggers,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "trigger query failed");
                return 0;
            }
        };

        let bound = triggers
            .iter()
            .filter(|trigger| self.bind(trigger).is_bound())
            .count();

        #[cfg(feature = "tracing")]
        tracing::debug!(found = triggers.len(), bound, "triggers bound");

        bound
    }
}

/// Bind all triggers in `dom`, deferring until the content-loaded signal
/// while the document is still loading.
///
/// The returned handle owns every dialog controller. Listeners only hold
/// weak references, so dropping the handle disables the bound triggers and
/// removes their bound marker; a later installation binds them afresh.
pub fn install<D: Dom>(dom: D, config: ModalConfig) -> TermsModals<D> {
    let modals = TermsModals::new(dom.clone(), config);

    if dom.ready_state() == ReadyState::Loading {
        let deferred = modals.clone();
        let scheduled = dom.on_content_loaded(Box::new(move || {
            deferred.bind_all();
        }));
        if let Err(_err) = scheduled {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %_err, "could not defer binding, binding now");
            modals.bind_all();
        }
    } else {
        modals.bind_all();
    }

    modals
}
