#![forbid(unsafe_code)]

//! Browser host for `terms-modal`.
//!
//! [`WebDom`] implements the controller's `Dom` trait over `web-sys`, and
//! [`start`] binds every trigger in `window.document`:
//!
//! ```js
//! import init, { start } from "./terms_modal_web.js";
//! await init();
//! start();
//! ```
//!
//! Everything here is only compiled for `wasm32`.

#[cfg(target_arch = "wasm32")]
mod host;

#[cfg(target_arch = "wasm32")]
pub use host::{WebDom, start};

#[cfg(all(target_arch = "wasm32", feature = "config"))]
pub use host::start_with_config;
