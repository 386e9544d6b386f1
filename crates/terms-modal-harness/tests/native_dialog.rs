#![forbid(unsafe_code)]

//! Integration tests: dialogs on hosts with the native modal primitive.

use pretty_assertions::assert_eq;
use terms_modal::{
    DialogController, EventKind, FocusOptions, ModalConfig, StrategyKind, TermsModals, install,
};
use terms_modal_harness::{DialogCall, NodeFlags, TermsFixture, VirtualDocument};

fn setup(config: ModalConfig) -> (VirtualDocument, TermsFixture, TermsModals<VirtualDocument>) {
    let doc = VirtualDocument::new();
    let page = doc.add_terms_fixture("terms");
    let modals = install(doc.clone(), config);
    (doc, page, modals)
}

fn controller(modals: &TermsModals<VirtualDocument>) -> DialogController<VirtualDocument> {
    modals.registry().get("terms").expect("terms dialog registered")
}

/// Rendered state must agree with the accessibility attribute.
fn assert_visibility_consistent(doc: &VirtualDocument, page: &TermsFixture) {
    let aria_visible = doc.attr(page.surface, "aria-hidden").as_deref() == Some("false");
    assert_eq!(doc.is_rendered(page.surface), aria_visible);
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn initialization_hides_surface() {
    let (doc, page, modals) = setup(ModalConfig::default());

    assert_eq!(doc.attr(page.surface, "hidden").as_deref(), Some("hidden"));
    assert_eq!(doc.attr(page.surface, "aria-hidden").as_deref(), Some("true"));
    assert_eq!(doc.attr(page.surface, "data-dialog-fallback"), None);
    assert_eq!(doc.attr(page.surface, "role"), None);
    assert_eq!(doc.attr(page.trigger, "data-kc-terms-bound").as_deref(), Some("true"));

    let dialog = controller(&modals);
    assert_eq!(dialog.strategy_kind(), StrategyKind::Native);
    assert_eq!(dialog.key(), "terms");
    assert_eq!(*dialog.surface(), page.surface);
    assert_eq!(*dialog.close_affordance(), page.close);
    assert_eq!(dialog.backdrop(), None);
    assert!(!dialog.is_open());
    assert_visibility_consistent(&doc, &page);
}

#[test]
fn native_listeners_are_wired() {
    let (doc, page, _modals) = setup(ModalConfig::default());

    assert_eq!(doc.listener_count(page.trigger, EventKind::Click), 1);
    assert_eq!(doc.listener_count(page.close, EventKind::Click), 1);
    assert_eq!(doc.listener_count(page.surface, EventKind::Cancel), 1);
    assert_eq!(doc.listener_count(page.surface, EventKind::Click), 1);
    assert_eq!(doc.listener_count(page.surface, EventKind::KeyDown), 0);
}

// ============================================================================
// Open / close lifecycle
// ============================================================================

#[test]
fn trigger_opens_and_focuses_close_affordance() {
    let (doc, page, modals) = setup(ModalConfig::default());
    doc.focus_direct(page.trigger);

    let click = doc.click(page.trigger);

    assert!(click.default_prevented());
    assert!(doc.dialog_open(page.surface));
    assert_eq!(doc.attr(page.surface, "hidden"), None);
    assert_eq!(doc.attr(page.surface, "aria-hidden").as_deref(), Some("false"));
    assert!(doc.body_has_class("terms-modal-open"));
    assert_eq!(doc.active(), Some(page.close));
    assert_eq!(
        doc.focus_log().last().copied(),
        Some((page.close, FocusOptions::NO_SCROLL))
    );
    assert!(controller(&modals).is_open());
    assert_eq!(controller(&modals).previously_focused(), Some(page.trigger));
    assert_visibility_consistent(&doc, &page);
}

#[test]
fn close_affordance_restores_focus() {
    let (doc, page, modals) = setup(ModalConfig::default());
    doc.focus_direct(page.trigger);
    doc.click(page.trigger);

    let click = doc.click(page.close);

    assert!(click.default_prevented());
    assert!(!doc.dialog_open(page.surface));
    assert_eq!(doc.attr(page.surface, "hidden").as_deref(), Some("hidden"));
    assert_eq!(doc.attr(page.surface, "aria-hidden").as_deref(), Some("true"));
    assert!(!doc.body_has_class("terms-modal-open"));
    assert_eq!(doc.active(), Some(page.trigger));
    assert_eq!(
        doc.focus_log().last().copied(),
        Some((page.trigger, FocusOptions::PLAIN))
    );
    assert_eq!(controller(&modals).previously_focused(), None);
    assert_visibility_consistent(&doc, &page);
}

#[test]
fn primitive_is_never_invoked_redundantly() {
    let (doc, page, modals) = setup(ModalConfig::default());
    let dialog = controller(&modals);

    dialog.close();
    doc.click(page.trigger);
    dialog.open(None);
    doc.click(page.trigger);
    doc.click(page.close);
    dialog.close();

    assert_eq!(
        doc.dialog_calls(),
        vec![DialogCall::ShowModal(page.surface), DialogCall::Close(page.surface)]
    );
}

#[test]
fn repeated_cycles_keep_state_consistent() {
    let (doc, page, modals) = setup(ModalConfig::default());
    let dialog = controller(&modals);

    for _ in 0..3 {
        doc.focus_direct(page.trigger);
        doc.click(page.trigger);
        assert!(dialog.is_open());
        assert_visibility_consistent(&doc, &page);

        doc.click(page.close);
        assert!(!dialog.is_open());
        assert_eq!(doc.active(), Some(page.trigger));
        assert_visibility_consistent(&doc, &page);
    }
    assert_eq!(dialog.strategy_kind(), StrategyKind::Native);
}

// ============================================================================
// Dismissal paths
// ============================================================================

#[test]
fn cancel_signal_closes_through_controller() {
    let (doc, page, _modals) = setup(ModalConfig::default());
    doc.focus_direct(page.trigger);
    doc.click(page.trigger);

    let cancel = doc.cancel(page.surface);

    assert!(cancel.default_prevented());
    assert!(!doc.dialog_open(page.surface));
    assert_eq!(doc.attr(page.surface, "aria-hidden").as_deref(), Some("true"));
    assert!(!doc.body_has_class("terms-modal-open"));
    assert_eq!(doc.active(), Some(page.trigger));
}

#[test]
fn outside_click_closes() {
    let (doc, page, _modals) = setup(ModalConfig::default());
    doc.click(page.trigger);

    doc.click_at(page.surface, 50.0, 50.0);

    assert!(!doc.dialog_open(page.surface));
    assert!(!doc.body_has_class("terms-modal-open"));
}

#[test]
fn clicks_inside_or_on_the_edge_keep_dialog_open() {
    let (doc, page, _modals) = setup(ModalConfig::default());
    doc.click(page.trigger);

    // Surface rect spans (100, 100) to (500, 400).
    for (x, y) in [(300.0, 250.0), (100.0, 100.0), (500.0, 400.0), (100.0, 400.0)] {
        doc.click_at(page.surface, x, y);
        assert!(doc.dialog_open(page.surface), "click at ({x}, {y}) closed the dialog");
    }

    doc.click_at(page.surface, 500.5, 250.0);
    assert!(!doc.dialog_open(page.surface));
}

#[test]
fn escape_disabled_still_blocks_native_dismissal() {
    let (doc, page, _modals) = setup(ModalConfig::default().close_on_escape(false));
    doc.click(page.trigger);

    let cancel = doc.cancel(page.surface);

    assert!(cancel.default_prevented());
    assert!(doc.dialog_open(page.surface));
    assert!(doc.body_has_class("terms-modal-open"));
}

#[test]
fn backdrop_disabled_ignores_outside_clicks() {
    let (doc, page, _modals) = setup(ModalConfig::default().close_on_backdrop(false));
    assert_eq!(doc.listener_count(page.surface, EventKind::Click), 0);
    doc.click(page.trigger);

    doc.click_at(page.surface, 5.0, 5.0);

    assert!(doc.dialog_open(page.surface));
    doc.click(page.close);
    assert!(!doc.dialog_open(page.surface));
}

// ============================================================================
// Focus edge cases
// ============================================================================

#[test]
fn focus_options_rejection_falls_back_to_plain_focus() {
    let (doc, page, _modals) = setup(ModalConfig::default());
    doc.set_focus_options_supported(page.close, false);

    doc.click(page.trigger);

    assert_eq!(doc.active(), Some(page.close));
    assert_eq!(
        doc.focus_log().last().copied(),
        Some((page.close, FocusOptions::PLAIN))
    );
}

#[test]
fn nothing_focused_before_open_leaves_memory_empty() {
    let (doc, page, modals) = setup(ModalConfig::default());
    doc.blur();

    doc.click(page.trigger);
    assert_eq!(controller(&modals).previously_focused(), None);

    doc.click(page.close);
    assert_eq!(controller(&modals).previously_focused(), None);
    assert_eq!(doc.active(), Some(page.close));
}

#[test]
fn unfocusable_previous_element_is_skipped() {
    let (doc, page, modals) = setup(ModalConfig::default());
    doc.focus_direct(page.trigger);
    doc.click(page.trigger);

    doc.set_focusable(page.trigger, false);
    doc.click(page.close);

    assert_eq!(doc.active(), Some(page.close));
    assert_eq!(controller(&modals).previously_focused(), None);
}

// ============================================================================
// Strategy permanence
// ============================================================================

#[test]
fn strategy_survives_capability_changes() {
    let (doc, page, modals) = setup(ModalConfig::default());
    let dialog = controller(&modals);

    doc.set_flags(page.surface, NodeFlags::MODAL_CAPABLE, false);
    dialog.open(None);
    dialog.close();

    assert_eq!(dialog.strategy_kind(), StrategyKind::Native);
    assert_eq!(doc.attr(page.surface, "data-dialog-fallback"), None);
    assert!(controller(&modals).ptr_eq(&dialog));
}
