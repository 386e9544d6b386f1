#![forbid(unsafe_code)]

//! Key-indexed store of dialog controllers.
//!
//! At most one controller exists per key; every trigger naming the key
//! shares it. A surface whose close affordance is missing never gets an
//! entry, so a later lookup retries initialization.
//!
//! # Invariants
//!
//! - `get_or_create(k)` returns the same controller (by identity) for the
//!   lifetime of the entry.
//! - Lookups escape the key before building the surface selector, so keys
//!   containing quotes or backslashes resolve to exactly their surface.
//! - Entries whose surface left the document are only dropped by
//!   [`prune_detached`](DialogRegistry::prune_detached),
//!   [`evict`](DialogRegistry::evict) or [`clear`](DialogRegistry::clear).
//! - Dropping an entry releases the triggers recorded for its key: their
//!   bound marker is removed, so the next bind pass attaches them to a
//!   fresh controller instead of leaving them wired to a dead one. The same
//!   happens for every entry when the registry itself is dropped.

use std::rc::Rc;

use ahash::AHashMap;

use crate::config::ModalConfig;
use crate::controller::{DialogController, InitSkip};
use crate::dom::Dom;

/// Controllers indexed by surface key.
pub struct DialogRegistry<D: Dom> {
    dom: D,
    config: Rc<ModalConfig>,
    entries: AHashMap<String, DialogController<D>>,
    triggers: AHashMap<String, Vec<D::Element>>,
}

impl<D: Dom> std::fmt::Debug for DialogRegistry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<D: Dom> DialogRegistry<D> {
    pub fn new(dom: D, config: Rc<ModalConfig>) -> Self {
        Self {
            dom,
            config,
            entries: AHashMap::new(),
            triggers: AHashMap::new(),
        }
    }

    /// Existing controller for `key`, or a freshly initialized one.
    ///
    /// # Errors
    ///
    /// The reason no controller could be built. Nothing is stored in that
    /// case.
    pub fn resolve(&mut self, key: &str) -> Result<DialogController<D>, InitSkip> {
        if let Some(existing) = self.entries.get(key) {
            return Ok(existing.clone());
        }

        let selector = self.config.surface_selector(key);
        let surface = self
            .dom
            .query_selector(&selector)?
            .ok_or(InitSkip::SurfaceNotFound)?;

        let controller = DialogController::initialize(
            self.dom.clone(),
            Rc::clone(&self.config),
            key,
            surface,
        )?;
        self.entries.insert(key.to_owned(), controller.clone());
        Ok(controller)
    }

    /// Like [`resolve`](Self::resolve), but discarding the skip reason.
    pub fn get_or_create(&mut self, key: &str) -> Option<DialogController<D>> {
        match self.resolve(key) {
            Ok(controller) => Some(controller),
            Err(_skip) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(key, reason = %_skip, "dialog not initialized");
                None
            }
        }
    }

    /// Controller for `key` without initializing one.
    pub fn get(&self, key: &str) -> Option<DialogController<D>> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Remember that `trigger` was bound to the entry for `key`.
    pub(crate) fn record_trigger(&mut self, key: &str, trigger: D::Element) {
        self.triggers.entry(key.to_owned()).or_default().push(trigger);
    }

    /// Triggers currently bound to the entry for `key`.
    pub fn bound_triggers(&self, key: &str) -> &[D::Element] {
        self.triggers.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop the entry for `key` and release its triggers. Listeners
    /// already attached to its elements stop doing anything once the last
    /// handle is gone.
    pub fn evict(&mut self, key: &str) -> Option<DialogController<D>> {
        self.release_triggers(key);
        self.entries.remove(key)
    }

    /// Drop every entry and release every trigger.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        let keys: Vec<String> = self.triggers.keys().cloned().collect();
        for key in &keys {
            self.release_triggers(key);
        }
        self.entries.clear();
        removed
    }

    /// Drop entries whose surface is no longer in the document and release
    /// their triggers.
    ///
    /// Returns the number of entries removed.
    pub fn prune_detached(&mut self) -> usize {
        let detached: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, controller)| !controller.is_connected())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &detached {
            self.evict(key);
        }
        let removed = detached.len();

        #[cfg(feature = "tracing")]
        {
            if removed > 0 {
                tracing::debug!(removed, "pruned detached dialogs");
            }
        }

        removed
    }

    fn release_triggers(&mut self, key: &str) {
        let Some(triggers) = self.triggers.remove(key) else {
            return;
        };
        for trigger in &triggers {
            if let Err(_err) = self.dom.remove_attribute(trigger, &self.config.bound_attribute) {
                #[cfg(feature = "tracing")]
                tracing::debug!(key, error = %_err, "could not release trigger");
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(key, released = triggers.len(), "triggers released");
    }
}

impl<D: Dom> Drop for DialogRegistry<D> {
    fn drop(&mut self) {
        self.clear();
    }
}
