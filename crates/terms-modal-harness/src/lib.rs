#![forbid(unsafe_code)]

//! In-memory document host and reference fixtures for `terms-modal`.
//!
//! [`VirtualDocument`] implements [`Dom`] over a small node tree. It models
//! just enough of a browser to exercise the dialog controller:
//!
//! - attribute storage with lowercase names and compound-selector queries
//! - the native modal primitive on `<dialog>` nodes, including the
//!   "already open" error and default dismissal on an unprevented `cancel`
//! - focus, with per-node support for scroll-suppressing focus options
//! - synchronous event dispatch with bubbling for `click` and `keydown`
//! - a loading phase with content-loaded callbacks
//!
//! Listeners are cloned out of the tree before they run, so they may freely
//! call back into the document.
//!
//! # Example
//!
//! ```
//! use terms_modal::{ModalConfig, install};
//! use terms_modal_harness::VirtualDocument;
//!
//! let doc = VirtualDocument::new();
//! let page = doc.add_terms_fixture("terms");
//! let _modals = install(doc.clone(), ModalConfig::default());
//!
//! doc.click(page.trigger);
//! assert!(doc.dialog_open(page.surface));
//! assert_eq!(doc.active(), Some(page.close));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use terms_modal::{
    ClientRect, CompoundSelector, Display, Dom, DomError, DomEvent, EventKind, FocusOptions,
    Listener, ReadyState,
};

/// Handle to a node of a [`VirtualDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

bitflags! {
    /// Host capabilities of a node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Accepts programmatic focus.
        const FOCUSABLE     = 1 << 0;
        /// Honours scroll-suppressing focus options.
        const FOCUS_OPTIONS = 1 << 1;
        /// Exposes the native show-as-modal primitive.
        const MODAL_CAPABLE = 1 << 2;
    }
}

/// Native dialog primitive invocations, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogCall {
    ShowModal(NodeId),
    Close(NodeId),
}

const FOCUSABLE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];

struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    display: Option<Display>,
    dialog_open: bool,
    flags: NodeFlags,
    rect: ClientRect,
    listeners: Vec<(EventKind, Listener)>,
}

impl Node {
    fn new(tag: &str, flags: NodeFlags) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
            display: None,
            dialog_open: false,
            flags,
            rect: ClientRect::default(),
            listeners: Vec::new(),
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => value.clone_into(existing),
            None => self.attributes.push((name, value.to_owned())),
        }
    }

    fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }
}

struct DocState {
    nodes: Vec<Node>,
    body: NodeId,
    active: Option<NodeId>,
    ready: ReadyState,
    native_dialogs: bool,
    pending_loaded: Vec<Box<dyn FnOnce()>>,
    dialog_calls: Vec<DialogCall>,
    focus_log: Vec<(NodeId, FocusOptions)>,
    reject_listeners: bool,
}

impl DocState {
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn default_flags(&self, tag: &str) -> NodeFlags {
        let mut flags = NodeFlags::FOCUS_OPTIONS;
        if FOCUSABLE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            flags |= NodeFlags::FOCUSABLE;
        }
        if self.native_dialogs && tag.eq_ignore_ascii_case("dialog") {
            flags |= NodeFlags::MODAL_CAPABLE;
        }
        flags
    }

    fn create(&mut self, tag: &str) -> NodeId {
        let flags = self.default_flags(tag);
        self.nodes.push(Node::new(tag, flags));
        NodeId(self.nodes.len() - 1)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != id);
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.body {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    /// Descendants of `root` in document order, `root` excluded.
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(root).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    /// `id` followed by its ancestors, innermost first.
    fn propagation_path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = self.node(id).parent;
        while let Some(node) = current {
            path.push(node);
            current = self.node(node).parent;
        }
        path
    }

    fn matches(&self, id: NodeId, selector: &CompoundSelector) -> bool {
        let node = self.node(id);
        selector.matches(&node.tag, |name: &str| {
            node.attribute(name).map(str::to_owned)
        })
    }

    fn is_focusable(&self, id: NodeId) -> bool {
        self.node(id).flags.contains(NodeFlags::FOCUSABLE) && self.is_connected(id)
    }
}

/// Reference node ids of a page built by
/// [`VirtualDocument::add_terms_fixture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermsFixture {
    pub trigger: NodeId,
    pub surface: NodeId,
    pub close: NodeId,
}

/// In-memory document. Clones share the same tree.
#[derive(Clone)]
pub struct VirtualDocument {
    state: Rc<RefCell<DocState>>,
}

impl fmt::Debug for VirtualDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("VirtualDocument")
            .field("nodes", &state.nodes.len())
            .field("ready", &state.ready)
            .field("active", &state.active)
            .finish()
    }
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDocument {
    /// A fully loaded document whose `<dialog>` nodes support the native
    /// modal primitive.
    #[must_use]
    pub fn new() -> Self {
        Self::build(ReadyState::Complete, true)
    }

    /// A document still in its loading phase. See
    /// [`finish_loading`](Self::finish_loading).
    #[must_use]
    pub fn loading() -> Self {
        Self::build(ReadyState::Loading, true)
    }

    /// A loaded document without the native modal primitive.
    #[must_use]
    pub fn without_native_dialogs() -> Self {
        Self::build(ReadyState::Complete, false)
    }

    fn build(ready: ReadyState, native_dialogs: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(DocState {
                nodes: vec![Node::new("body", NodeFlags::FOCUS_OPTIONS)],
                body: NodeId(0),
                active: None,
                ready,
                native_dialogs,
                pending_loaded: Vec::new(),
                dialog_calls: Vec::new(),
                focus_log: Vec::new(),
                reject_listeners: false,
            })),
        }
    }

    pub fn body(&self) -> NodeId {
        self.state.borrow().body
    }

    // ------------------------------------------------------------------
    // Tree building
    // ------------------------------------------------------------------

    /// Create a detached node.
    pub fn create(&self, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let mut state = self.state.borrow_mut();
        let id = state.create(tag);
        let node = state.node_mut(id);
        for (name, value) in attributes {
            node.set_attribute(name, value);
        }
        id
    }

    /// Create a node and append it to `parent`.
    pub fn append(&self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.create(tag, attributes);
        self.append_child(parent, id);
        id
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.state.borrow_mut().append_child(parent, child);
    }

    /// Remove `id` (and its subtree) from the document.
    pub fn detach(&self, id: NodeId) {
        self.state.borrow_mut().detach(id);
    }

    pub fn set_rect(&self, id: NodeId, rect: ClientRect) {
        self.state.borrow_mut().node_mut(id).rect = rect;
    }

    pub fn set_flags(&self, id: NodeId, flags: NodeFlags, enabled: bool) {
        self.state.borrow_mut().node_mut(id).flags.set(flags, enabled);
    }

    pub fn set_focusable(&self, id: NodeId, focusable: bool) {
        self.set_flags(id, NodeFlags::FOCUSABLE, focusable);
    }

    pub fn set_focus_options_supported(&self, id: NodeId, supported: bool) {
        self.set_flags(id, NodeFlags::FOCUS_OPTIONS, supported);
    }

    /// Make every following `add_listener` call fail with a host error,
    /// until switched off again.
    pub fn reject_listeners(&self, reject: bool) {
        self.state.borrow_mut().reject_listeners = reject;
    }

    /// Trigger link, `<dialog>` surface and close button for `key`, laid
    /// out so the close button sits inside the surface's rect.
    pub fn add_terms_fixture(&self, key: &str) -> TermsFixture {
        let body = self.body();
        let trigger = self.append(
            body,
            "a",
            &[("href", "#"), ("data-kc-terms-trigger", key)],
        );
        let surface = self.append(body, "dialog", &[("data-kc-terms-modal", key)]);
        let close = self.append(
            surface,
            "button",
            &[("type", "button"), ("data-kc-terms-close", "")],
        );
        self.set_rect(trigger, ClientRect::new(10.0, 10.0, 80.0, 20.0));
        self.set_rect(surface, ClientRect::new(100.0, 100.0, 400.0, 300.0));
        self.set_rect(close, ClientRect::new(450.0, 110.0, 40.0, 20.0));
        TermsFixture {
            trigger,
            surface,
            close,
        }
    }

    // ------------------------------------------------------------------
    // User simulation
    // ------------------------------------------------------------------

    /// Move focus as a user would, bypassing focus options.
    pub fn focus_direct(&self, id: NodeId) {
        self.state.borrow_mut().active = Some(id);
    }

    pub fn blur(&self) {
        self.state.borrow_mut().active = None;
    }

    /// Deliver `event` to `target`, then to its ancestors for bubbling
    /// kinds.
    pub fn dispatch(&self, target: NodeId, event: &DomEvent) {
        let path = {
            let state = self.state.borrow();
            if event.kind().bubbles() {
                state.propagation_path(target)
            } else {
                vec![target]
            }
        };

        for node in path {
            let listeners: Vec<Listener> = self
                .state
                .borrow()
                .node(node)
                .listeners
                .iter()
                .filter(|(kind, _)| *kind == event.kind())
                .map(|(_, listener)| Rc::clone(listener))
                .collect();
            for listener in listeners {
                listener(event);
            }
        }
    }

    /// Click the center of `id`'s rect.
    pub fn click(&self, id: NodeId) -> DomEvent {
        let rect = self.state.borrow().node(id).rect;
        self.click_at(
            id,
            (rect.left + rect.right) / 2.0,
            (rect.top + rect.bottom) / 2.0,
        )
    }

    /// Click `id` at viewport coordinates `(x, y)`.
    pub fn click_at(&self, id: NodeId, x: f64, y: f64) -> DomEvent {
        let event = DomEvent::click(x, y);
        self.dispatch(id, &event);
        event
    }

    pub fn key_down(&self, id: NodeId, key: &str) -> DomEvent {
        let event = DomEvent::key_down(key);
        self.dispatch(id, &event);
        event
    }

    /// Send a native `cancel` to `id`. Unless a listener prevents it, an
    /// open dialog is dismissed by the host.
    pub fn cancel(&self, id: NodeId) -> DomEvent {
        let event = DomEvent::cancel();
        self.dispatch(id, &event);
        if !event.default_prevented() {
            let mut state = self.state.borrow_mut();
            let node = state.node_mut(id);
            if node.flags.contains(NodeFlags::MODAL_CAPABLE) {
                node.dialog_open = false;
            }
        }
        event
    }

    /// Leave the loading phase and run content-loaded callbacks.
    pub fn finish_loading(&self) {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            state.ready = ReadyState::Complete;
            std::mem::take(&mut state.pending_loaded)
        };
        for callback in callbacks {
            callback();
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn attr(&self, id: NodeId, name: &str) -> Option<String> {
        self.state.borrow().node(id).attribute(name).map(str::to_owned)
    }

    pub fn tag(&self, id: NodeId) -> String {
        self.state.borrow().node(id).tag.clone()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.state.borrow().node(id).children.clone()
    }

    /// Inline display, `None` when never set.
    pub fn display(&self, id: NodeId) -> Option<Display> {
        self.state.borrow().node(id).display
    }

    pub fn body_has_class(&self, class: &str) -> bool {
        let state = self.state.borrow();
        state
            .node(state.body)
            .attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn active(&self) -> Option<NodeId> {
        self.state.borrow().active
    }

    /// Native open flag.
    pub fn dialog_open(&self, id: NodeId) -> bool {
        self.state.borrow().node(id).dialog_open
    }

    pub fn listener_count(&self, id: NodeId, kind: EventKind) -> usize {
        self.state
            .borrow()
            .node(id)
            .listeners
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Whether `id` would be painted, ignoring ancestors.
    ///
    /// Inline display wins; otherwise `hidden` hides; otherwise a dialog
    /// renders only while open.
    pub fn is_rendered(&self, id: NodeId) -> bool {
        let state = self.state.borrow();
        let node = state.node(id);
        match node.display {
            Some(Display::Block) => true,
            Some(Display::None) => false,
            None if node.attribute("hidden").is_some() => false,
            None if node.flags.contains(NodeFlags::MODAL_CAPABLE) || node.tag == "dialog" => {
                node.dialog_open
            }
            None => true,
        }
    }

    pub fn dialog_calls(&self) -> Vec<DialogCall> {
        self.state.borrow().dialog_calls.clone()
    }

    pub fn focus_log(&self) -> Vec<(NodeId, FocusOptions)> {
        self.state.borrow().focus_log.clone()
    }

    pub fn pending_load_callbacks(&self) -> usize {
        self.state.borrow().pending_loaded.len()
    }

    fn query(&self, root: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector =
            CompoundSelector::parse(selector).map_err(|err| DomError::Host(err.to_string()))?;
        let state = self.state.borrow();
        let candidates = match root {
            Some(root) => state.descendants(root),
            None => {
                let mut all = vec![state.body];
                all.extend(state.descendants(state.body));
                all
            }
        };
        Ok(candidates
            .into_iter()
            .filter(|id| state.matches(*id, &selector))
            .collect())
    }
}

impl Dom for VirtualDocument {
    type Element = NodeId;

    fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query(None, selector)?.into_iter().next())
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.query(None, selector)
    }

    fn query_selector_in(&self, root: &NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query(Some(*root), selector)?.into_iter().next())
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        self.attr(*element, name)
    }

    fn set_attribute(&self, element: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.state
            .borrow_mut()
            .node_mut(*element)
            .set_attribute(name, value);
        Ok(())
    }

    fn remove_attribute(&self, element: &NodeId, name: &str) -> Result<(), DomError> {
        self.state
            .borrow_mut()
            .node_mut(*element)
            .remove_attribute(name);
        Ok(())
    }

    fn set_display(&self, element: &NodeId, display: Display) -> Result<(), DomError> {
        self.state.borrow_mut().node_mut(*element).display = Some(display);
        Ok(())
    }

    fn create_element(&self, tag: &str) -> Result<NodeId, DomError> {
        Ok(self.create(tag, &[]))
    }

    fn append_to_body(&self, element: &NodeId) -> Result<(), DomError> {
        let body = self.body();
        self.append_child(body, *element);
        Ok(())
    }

    fn add_body_class(&self, class: &str) -> Result<(), DomError> {
        let mut state = self.state.borrow_mut();
        let body = state.body;
        let node = state.node_mut(body);
        let mut classes: Vec<String> = node
            .attribute("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .map(str::to_owned)
            .collect();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_owned());
        }
        node.set_attribute("class", &classes.join(" "));
        Ok(())
    }

    fn remove_body_class(&self, class: &str) -> Result<(), DomError> {
        let mut state = self.state.borrow_mut();
        let body = state.body;
        let node = state.node_mut(body);
        let Some(current) = node.attribute("class") else {
            return Ok(());
        };
        let remaining = current
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        node.set_attribute("class", &remaining);
        Ok(())
    }

    fn supports_modal_dialog(&self, element: &NodeId) -> bool {
        self.state
            .borrow()
            .node(*element)
            .flags
            .contains(NodeFlags::MODAL_CAPABLE)
    }

    fn is_dialog_open(&self, element: &NodeId) -> bool {
        let state = self.state.borrow();
        let node = state.node(*element);
        node.flags.contains(NodeFlags::MODAL_CAPABLE) && node.dialog_open
    }

    fn show_modal(&self, element: &NodeId) -> Result<(), DomError> {
        let mut state = self.state.borrow_mut();
        state.dialog_calls.push(DialogCall::ShowModal(*element));
        if !state.node(*element).flags.contains(NodeFlags::MODAL_CAPABLE) {
            return Err(DomError::Unsupported("showModal"));
        }
        if !state.is_connected(*element) {
            return Err(DomError::InvalidState("dialog is not connected".into()));
        }
        let node = state.node_mut(*element);
        if node.dialog_open {
            return Err(DomError::InvalidState("dialog already open".into()));
        }
        node.dialog_open = true;
        Ok(())
    }

    fn close_dialog(&self, element: &NodeId) -> Result<(), DomError> {
        let mut state = self.state.borrow_mut();
        state.dialog_calls.push(DialogCall::Close(*element));
        let node = state.node_mut(*element);
        if !node.flags.contains(NodeFlags::MODAL_CAPABLE) {
            return Err(DomError::Unsupported("dialog close"));
        }
        node.dialog_open = false;
        Ok(())
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active()
    }

    fn is_focusable(&self, element: &NodeId) -> bool {
        self.state.borrow().is_focusable(*element)
    }

    fn focus(&self, element: &NodeId, options: FocusOptions) -> Result<(), DomError> {
        let mut state = self.state.borrow_mut();
        if !state.is_focusable(*element) {
            return Ok(());
        }
        if options.prevent_scroll
            && !state
                .node(*element)
                .flags
                .contains(NodeFlags::FOCUS_OPTIONS)
        {
            return Err(DomError::Unsupported("focus options"));
        }
        state.active = Some(*element);
        state.focus_log.push((*element, options));
        Ok(())
    }

    fn bounding_client_rect(&self, element: &NodeId) -> ClientRect {
        self.state.borrow().node(*element).rect
    }

    fn is_connected(&self, element: &NodeId) -> bool {
        self.state.borrow().is_connected(*element)
    }

    fn add_listener(
        &self,
        element: &NodeId,
        kind: EventKind,
        listener: Listener,
    ) -> Result<(), DomError> {
        let mut state = self.state.borrow_mut();
        if state.reject_listeners {
            return Err(DomError::Host(format!("listener rejected: {}", kind.as_str())));
        }
        state.node_mut(*element).listeners.push((kind, listener));
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        self.state.borrow().ready
    }

    fn on_content_loaded(&self, callback: Box<dyn FnOnce()>) -> Result<(), DomError> {
        {
            let mut state = self.state.borrow_mut();
            if state.ready == ReadyState::Loading {
                state.pending_loaded.push(callback);
                return Ok(());
            }
        }
        callback();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn queries_follow_document_order() {
        let doc = VirtualDocument::new();
        let body = doc.body();
        let outer = doc.append(body, "div", &[("data-x", "1")]);
        let inner = doc.append(outer, "span", &[("data-x", "2")]);
        let sibling = doc.append(body, "p", &[("data-x", "3")]);

        assert_eq!(
            doc.query_selector_all("[data-x]").unwrap(),
            vec![outer, inner, sibling]
        );
        assert_eq!(doc.query_selector("span[data-x]").unwrap(), Some(inner));
        assert_eq!(doc.query_selector("[data-x='3']").unwrap(), Some(sibling));
        assert_eq!(doc.query_selector_in(&outer, "[data-x]").unwrap(), Some(inner));
        assert_eq!(doc.query_selector_in(&inner, "[data-x]").unwrap(), None);
    }

    #[test]
    fn detached_nodes_are_not_queried() {
        let doc = VirtualDocument::new();
        let loose = doc.create("div", &[("data-x", "")]);
        assert_eq!(doc.query_selector("[data-x]").unwrap(), None);
        assert!(!doc.is_connected(&loose));

        doc.append_to_body(&loose).unwrap();
        assert_eq!(doc.query_selector("[data-x]").unwrap(), Some(loose));

        doc.detach(loose);
        assert!(!doc.is_connected(&loose));
    }

    #[test]
    fn invalid_selector_is_host_error() {
        let doc = VirtualDocument::new();
        assert!(matches!(
            doc.query_selector("a, b"),
            Err(DomError::Host(_))
        ));
    }

    #[test]
    fn attribute_names_are_case_insensitive() {
        let doc = VirtualDocument::new();
        let el = doc.append(doc.body(), "div", &[("Data-Key", "v")]);
        assert_eq!(doc.attr(el, "data-key").as_deref(), Some("v"));
        doc.set_attribute(&el, "DATA-KEY", "w").unwrap();
        assert_eq!(doc.attr(el, "data-key").as_deref(), Some("w"));
        doc.remove_attribute(&el, "data-key").unwrap();
        assert!(!doc.has_attribute(&el, "data-key"));
    }

    #[test]
    fn body_classes_are_tokens() {
        let doc = VirtualDocument::new();
        doc.add_body_class("a").unwrap();
        doc.add_body_class("b").unwrap();
        doc.add_body_class("a").unwrap();
        assert_eq!(doc.attr(doc.body(), "class").as_deref(), Some("a b"));

        doc.remove_body_class("a").unwrap();
        assert!(!doc.body_has_class("a"));
        assert!(doc.body_has_class("b"));
    }

    #[test]
    fn show_modal_state_errors() {
        let doc = VirtualDocument::new();
        let dialog = doc.append(doc.body(), "dialog", &[]);
        let div = doc.append(doc.body(), "div", &[]);

        assert!(doc.supports_modal_dialog(&dialog));
        assert!(!doc.supports_modal_dialog(&div));

        doc.show_modal(&dialog).unwrap();
        assert!(doc.is_dialog_open(&dialog));
        assert!(matches!(
            doc.show_modal(&dialog),
            Err(DomError::InvalidState(_))
        ));
        assert_eq!(
            doc.show_modal(&div),
            Err(DomError::Unsupported("showModal"))
        );

        doc.close_dialog(&dialog).unwrap();
        assert!(!doc.is_dialog_open(&dialog));
        assert_eq!(doc.dialog_calls().len(), 4);
    }

    #[test]
    fn no_native_dialogs_host() {
        let doc = VirtualDocument::without_native_dialogs();
        let dialog = doc.append(doc.body(), "dialog", &[]);
        assert!(!doc.supports_modal_dialog(&dialog));
        assert!(!doc.is_rendered(dialog));
    }

    #[test]
    fn focus_options_support_is_per_node() {
        let doc = VirtualDocument::new();
        let button = doc.append(doc.body(), "button", &[]);
        doc.set_focus_options_supported(button, false);

        assert_eq!(
            doc.focus(&button, FocusOptions::NO_SCROLL),
            Err(DomError::Unsupported("focus options"))
        );
        assert_eq!(doc.active(), None);

        doc.focus(&button, FocusOptions::PLAIN).unwrap();
        assert_eq!(doc.active(), Some(button));
    }

    #[test]
    fn focusing_inert_nodes_is_ignored() {
        let doc = VirtualDocument::new();
        let div = doc.append(doc.body(), "div", &[]);
        let loose = doc.create("button", &[]);

        doc.focus(&div, FocusOptions::PLAIN).unwrap();
        doc.focus(&loose, FocusOptions::PLAIN).unwrap();
        assert_eq!(doc.active(), None);
        assert!(doc.focus_log().is_empty());
    }

    #[test]
    fn click_bubbles_innermost_first() {
        let doc = VirtualDocument::new();
        let outer = doc.append(doc.body(), "div", &[]);
        let inner = doc.append(outer, "button", &[]);
        let order = Rc::new(RefCell::new(Vec::new()));

        for (id, name) in [(outer, "outer"), (inner, "inner")] {
            let order = Rc::clone(&order);
            doc.add_listener(
                &id,
                EventKind::Click,
                Rc::new(move |_: &DomEvent| order.borrow_mut().push(name)),
            )
            .unwrap();
        }

        doc.click(inner);
        assert_eq!(*order.borrow(), vec!["inner", "outer"]);
    }

    #[test]
    fn cancel_does_not_bubble_and_dismisses_by_default() {
        let doc = VirtualDocument::new();
        let dialog = doc.append(doc.body(), "dialog", &[]);
        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        doc.add_listener(
            &doc.body(),
            EventKind::Cancel,
            Rc::new(move |_: &DomEvent| flag.set(true)),
        )
        .unwrap();

        doc.show_modal(&dialog).unwrap();
        let event = doc.cancel(dialog);
        assert!(!event.default_prevented());
        assert!(!seen.get());
        assert!(!doc.dialog_open(dialog));
    }

    #[test]
    fn prevented_cancel_keeps_dialog_open() {
        let doc = VirtualDocument::new();
        let dialog = doc.append(doc.body(), "dialog", &[]);
        doc.add_listener(
            &dialog,
            EventKind::Cancel,
            Rc::new(|event: &DomEvent| event.prevent_default()),
        )
        .unwrap();

        doc.show_modal(&dialog).unwrap();
        assert!(doc.cancel(dialog).default_prevented());
        assert!(doc.dialog_open(dialog));
    }

    #[test]
    fn listeners_may_reenter_the_document() {
        let doc = VirtualDocument::new();
        let button = doc.append(doc.body(), "button", &[]);
        let handle = doc.clone();
        doc.add_listener(
            &button,
            EventKind::Click,
            Rc::new(move |_: &DomEvent| {
                handle.set_attribute(&button, "data-clicked", "yes").unwrap();
                handle.focus(&button, FocusOptions::NO_SCROLL).unwrap();
            }),
        )
        .unwrap();

        doc.click(button);
        assert_eq!(doc.attr(button, "data-clicked").as_deref(), Some("yes"));
        assert_eq!(doc.active(), Some(button));
    }

    #[test]
    fn rejected_listeners_are_not_attached() {
        let doc = VirtualDocument::new();
        let button = doc.append(doc.body(), "button", &[]);
        doc.reject_listeners(true);
        let err = doc
            .add_listener(&button, EventKind::Click, Rc::new(|_: &DomEvent| {}))
            .unwrap_err();
        assert_eq!(err, DomError::Host("listener rejected: click".into()));
        assert_eq!(doc.listener_count(button, EventKind::Click), 0);

        doc.reject_listeners(false);
        doc.add_listener(&button, EventKind::Click, Rc::new(|_: &DomEvent| {}))
            .unwrap();
        assert_eq!(doc.listener_count(button, EventKind::Click), 1);
    }

    #[test]
    fn content_loaded_callbacks_wait_for_loading() {
        let doc = VirtualDocument::loading();
        let ran = Rc::new(Cell::new(0));

        let counter = Rc::clone(&ran);
        doc.on_content_loaded(Box::new(move || counter.set(counter.get() + 1)))
            .unwrap();
        assert_eq!(doc.ready_state(), ReadyState::Loading);
        assert_eq!(doc.pending_load_callbacks(), 1);
        assert_eq!(ran.get(), 0);

        doc.finish_loading();
        assert_eq!(ran.get(), 1);
        assert_eq!(doc.pending_load_callbacks(), 0);

        let counter = Rc::clone(&ran);
        doc.on_content_loaded(Box::new(move || counter.set(counter.get() + 1)))
            .unwrap();
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn rendering_rules() {
        let doc = VirtualDocument::new();
        let div = doc.append(doc.body(), "div", &[]);
        assert!(doc.is_rendered(div));

        doc.set_attribute(&div, "hidden", "hidden").unwrap();
        assert!(!doc.is_rendered(div));

        doc.set_display(&div, Display::Block).unwrap();
        assert!(doc.is_rendered(div));

        let dialog = doc.append(doc.body(), "dialog", &[]);
        assert!(!doc.is_rendered(dialog));
        doc.show_modal(&dialog).unwrap();
        assert!(doc.is_rendered(dialog));
    }

    #[test]
    fn fixture_layout() {
        let doc = VirtualDocument::new();
        let page = doc.add_terms_fixture("terms");
        assert_eq!(doc.tag(page.surface), "dialog");
        assert_eq!(doc.children(page.surface), vec![page.close]);
        let surface = doc.bounding_client_rect(&page.surface);
        let close = doc.bounding_client_rect(&page.close);
        assert!(surface.contains(close.left, close.top));
        assert!(surface.contains(close.right, close.bottom));
    }
}
