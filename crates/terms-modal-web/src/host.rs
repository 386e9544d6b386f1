#![forbid(unsafe_code)]

//! `web-sys` implementation of [`Dom`].
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No window or document | Worker or non-browser context | `start` returns an error |
//! | Exception from the browser | Invalid selector, dialog state | Mapped to `DomError` |
//! | Element is not an `HTMLElement` | SVG or MathML surface | Inline display and focus unsupported |

use std::cell::RefCell;

use js_sys::Reflect;
use terms_modal::{
    ClientRect, Display, Dom, DomError, DomEvent, EventKind, FocusOptions, Listener, ModalConfig,
    ReadyState, TermsModals, install,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, HtmlDialogElement, HtmlElement, KeyboardEvent, MouseEvent};

thread_local! {
    static INSTALLED: RefCell<Option<TermsModals<WebDom>>> = const { RefCell::new(None) };
}

/// Bind every terms trigger in `window.document` using the default markup
/// contract. Calling it again binds only triggers added since.
#[wasm_bindgen]
pub fn start() -> Result<(), JsValue> {
    start_with(ModalConfig::default())
}

/// Like [`start`], with a JSON-encoded `ModalConfig`. Missing fields keep
/// their defaults. A config different from the installed one replaces the
/// installation and rebinds every trigger under the new config.
#[cfg(feature = "config")]
#[wasm_bindgen(js_name = startWithConfig)]
pub fn start_with_config(json: &str) -> Result<(), JsValue> {
    let config = ModalConfig::from_json_str(json).map_err(|err| to_js(&err))?;
    start_with(config)
}

fn start_with(config: ModalConfig) -> Result<(), JsValue> {
    let existing = INSTALLED.with(|slot| slot.borrow().clone());
    if let Some(modals) = existing {
        if *modals.config() == config {
            modals.prune_detached();
            modals.bind_all();
            return Ok(());
        }
        // Unmark the old triggers before the new installation looks at them.
        modals.release();
        INSTALLED.with(|slot| slot.borrow_mut().take());
    }

    let dom = WebDom::from_window().map_err(|err| to_js(&err))?;
    let modals = install(dom, config);
    INSTALLED.with(|slot| *slot.borrow_mut() = Some(modals));
    Ok(())
}

fn to_js(err: &dyn std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn host_error(err: JsValue) -> DomError {
    if let Some(exception) = err.dyn_ref::<web_sys::DomException>() {
        if exception.name() == "InvalidStateError" {
            return DomError::InvalidState(exception.message());
        }
        return DomError::Host(format!("{}: {}", exception.name(), exception.message()));
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return DomError::Host(String::from(error.message()));
    }
    DomError::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn to_dom_event(kind: EventKind, event: &Event) -> DomEvent {
    match kind {
        EventKind::Click => event
            .dyn_ref::<MouseEvent>()
            .map(|mouse| DomEvent::click(f64::from(mouse.client_x()), f64::from(mouse.client_y())))
            .unwrap_or_else(|| DomEvent::new(kind)),
        EventKind::KeyDown => event
            .dyn_ref::<KeyboardEvent>()
            .map(|key| DomEvent::key_down(key.key()))
            .unwrap_or_else(|| DomEvent::new(kind)),
        EventKind::Cancel => DomEvent::cancel(),
    }
}

/// A browser document.
#[derive(Debug, Clone)]
pub struct WebDom {
    document: Document,
}

impl WebDom {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The document of the global `window`.
    ///
    /// # Errors
    ///
    /// [`DomError::Host`] outside a window context.
    pub fn from_window() -> Result<Self, DomError> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self::new)
            .ok_or_else(|| DomError::Host("no window document".into()))
    }

    fn body(&self) -> Result<HtmlElement, DomError> {
        self.document
            .body()
            .ok_or_else(|| DomError::Host("document has no body".into()))
    }
}

impl Dom for WebDom {
    type Element = Element;

    fn query_selector(&self, selector: &str) -> Result<Option<Element>, DomError> {
        self.document.query_selector(selector).map_err(host_error)
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
        let list = self
            .document
            .query_selector_all(selector)
            .map_err(host_error)?;
        Ok((0..list.length())
            .filter_map(|index| list.get(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }

    fn query_selector_in(&self, root: &Element, selector: &str) -> Result<Option<Element>, DomError> {
        root.query_selector(selector).map_err(host_error)
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn has_attribute(&self, element: &Element, name: &str) -> bool {
        element.has_attribute(name)
    }

    fn set_attribute(&self, element: &Element, name: &str, value: &str) -> Result<(), DomError> {
        element.set_attribute(name, value).map_err(host_error)
    }

    fn remove_attribute(&self, element: &Element, name: &str) -> Result<(), DomError> {
        element.remove_attribute(name).map_err(host_error)
    }

    fn set_display(&self, element: &Element, display: Display) -> Result<(), DomError> {
        let html = element
            .dyn_ref::<HtmlElement>()
            .ok_or(DomError::Unsupported("inline style on non-HTML element"))?;
        html.style()
            .set_property("display", display.as_css())
            .map_err(host_error)
    }

    fn create_element(&self, tag: &str) -> Result<Element, DomError> {
        self.document.create_element(tag).map_err(host_error)
    }

    fn append_to_body(&self, element: &Element) -> Result<(), DomError> {
        self.body()?
            .append_child(element)
            .map(drop)
            .map_err(host_error)
    }

    fn add_body_class(&self, class: &str) -> Result<(), DomError> {
        self.body()?.class_list().add_1(class).map_err(host_error)
    }

    fn remove_body_class(&self, class: &str) -> Result<(), DomError> {
        self.body()?.class_list().remove_1(class).map_err(host_error)
    }

    fn supports_modal_dialog(&self, element: &Element) -> bool {
        Reflect::get(element, &JsValue::from_str("showModal"))
            .map(|method| method.is_function())
            .unwrap_or(false)
    }

    fn is_dialog_open(&self, element: &Element) -> bool {
        element
            .dyn_ref::<HtmlDialogElement>()
            .is_some_and(HtmlDialogElement::open)
    }

    fn show_modal(&self, element: &Element) -> Result<(), DomError> {
        element
            .dyn_ref::<HtmlDialogElement>()
            .ok_or(DomError::Unsupported("showModal"))?
            .show_modal()
            .map_err(host_error)
    }

    fn close_dialog(&self, element: &Element) -> Result<(), DomError> {
        element
            .dyn_ref::<HtmlDialogElement>()
            .ok_or(DomError::Unsupported("dialog close"))?
            .close();
        Ok(())
    }

    fn active_element(&self) -> Option<Element> {
        self.document.active_element()
    }

    fn is_focusable(&self, element: &Element) -> bool {
        element.is_connected() && element.dyn_ref::<HtmlElement>().is_some()
    }

    fn focus(&self, element: &Element, options: FocusOptions) -> Result<(), DomError> {
        let html = element
            .dyn_ref::<HtmlElement>()
            .ok_or(DomError::Unsupported("focus on non-HTML element"))?;
        if options.prevent_scroll {
            let js_options = web_sys::FocusOptions::new();
            js_options.set_prevent_scroll(true);
            html.focus_with_options(&js_options).map_err(host_error)
        } else {
            html.focus().map_err(host_error)
        }
    }

    fn bounding_client_rect(&self, element: &Element) -> ClientRect {
        let rect = element.get_bounding_client_rect();
        ClientRect {
            top: rect.top(),
            left: rect.left(),
            bottom: rect.bottom(),
            right: rect.right(),
        }
    }

    fn is_connected(&self, element: &Element) -> bool {
        element.is_connected()
    }

    fn add_listener(
        &self,
        element: &Element,
        kind: EventKind,
        listener: Listener,
    ) -> Result<(), DomError> {
        let closure = Closure::wrap(Box::new(move |event: Event| {
            let translated = to_dom_event(kind, &event);
            listener(&translated);
            if translated.default_prevented() {
                event.prevent_default();
            }
        }) as Box<dyn FnMut(_)>);

        element
            .add_event_listener_with_callback(kind.as_str(), closure.as_ref().unchecked_ref())
            .map_err(host_error)?;

        // Listeners live as long as the element.
        closure.forget();
        Ok(())
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_host(&self.document.ready_state())
    }

    fn on_content_loaded(&self, callback: Box<dyn FnOnce()>) -> Result<(), DomError> {
        let closure = Closure::once_into_js(move || callback());
        self.document
            .add_event_listener_with_callback("DOMContentLoaded", closure.unchecked_ref())
            .map_err(host_error)
    }
}
