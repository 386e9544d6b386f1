#![forbid(unsafe_code)]

//! Markup contract and behavior switches.
//!
//! The defaults reproduce the theme markup the controller was written for:
//!
//! ```html
//! <a href="#" data-kc-terms-trigger="terms">Terms</a>
//! <dialog data-kc-terms-modal="terms">
//!   <button data-kc-terms-close>Close</button>
//! </dialog>
//! ```
//!
//! With the `config` feature a config can be loaded from TOML or JSON;
//! missing fields fall back to the defaults.

use std::fmt;

use crate::selector::{CompoundSelector, KEY_PLACEHOLDER, SelectorError, surface_selector};

/// Errors from config validation or loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The surface selector template has no key placeholder.
    MissingPlaceholder(String),
    /// A selector field does not parse.
    InvalidSelector {
        field: &'static str,
        source: SelectorError,
    },
    /// An attribute or class name is empty or contains whitespace.
    InvalidName { field: &'static str, value: String },
    /// The config document could not be deserialized.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPlaceholder(template) => {
                write!(f, "surface template '{template}' lacks {KEY_PLACEHOLDER}")
            }
            Self::InvalidSelector { field, source } => {
                write!(f, "invalid selector in '{field}': {source}")
            }
            Self::InvalidName { field, value } => {
                write!(f, "invalid name in '{field}': {value:?}")
            }
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidSelector { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Modal markup contract and dismissal switches.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ModalConfig {
    /// Attribute on triggers naming the target surface key.
    pub trigger_attribute: String,
    /// Surface lookup selector with a `%PREFIX%` placeholder for the key.
    pub surface_template: String,
    /// Selector for the close affordance, searched inside the surface.
    pub close_selector: String,
    /// Idempotency marker set on bound triggers.
    pub bound_attribute: String,
    /// Marker set on surfaces running the fallback strategy.
    pub fallback_attribute: String,
    /// Class of the synthesized fallback backdrop.
    pub backdrop_class: String,
    /// Class toggled on the body while a dialog is open.
    pub body_class: String,
    /// Escape (fallback) and the native cancel signal close the dialog.
    pub close_on_escape: bool,
    /// Outside clicks (native) and backdrop clicks (fallback) close the dialog.
    pub close_on_backdrop: bool,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            trigger_attribute: "data-kc-terms-trigger".into(),
            surface_template: "[data-kc-terms-modal='%PREFIX%']".into(),
            close_selector: "[data-kc-terms-close]".into(),
            bound_attribute: "data-kc-terms-bound".into(),
            fallback_attribute: "data-dialog-fallback".into(),
            backdrop_class: "terms-modal-fallback-backdrop".into(),
            body_class: "terms-modal-open".into(),
            close_on_escape: true,
            close_on_backdrop: true,
        }
    }
}

impl ModalConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger_attribute(mut self, name: impl Into<String>) -> Self {
        self.trigger_attribute = name.into();
        self
    }

    pub fn surface_template(mut self, template: impl Into<String>) -> Self {
        self.surface_template = template.into();
        self
    }

    pub fn close_selector(mut self, selector: impl Into<String>) -> Self {
        self.close_selector = selector.into();
        self
    }

    pub fn bound_attribute(mut self, name: impl Into<String>) -> Self {
        self.bound_attribute = name.into();
        self
    }

    pub fn fallback_attribute(mut self, name: impl Into<String>) -> Self {
        self.fallback_attribute = name.into();
        self
    }

    pub fn backdrop_class(mut self, class: impl Into<String>) -> Self {
        self.backdrop_class = class.into();
        self
    }

    pub fn body_class(mut self, class: impl Into<String>) -> Self {
        self.body_class = class.into();
        self
    }

    pub fn close_on_escape(mut self, close: bool) -> Self {
        self.close_on_escape = close;
        self
    }

    pub fn close_on_backdrop(mut self, close: bool) -> Self {
        self.close_on_backdrop = close;
        self
    }

    /// Selector matching every trigger element.
    #[must_use]
    pub fn trigger_selector(&self) -> String {
        format!("[{}]", self.trigger_attribute)
    }

    /// Lookup selector for the surface with `key`, key escaped.
    #[must_use]
    pub fn surface_selector(&self, key: &str) -> String {
        surface_selector(&self.surface_template, key)
    }

    /// Check names and selectors.
    ///
    /// # Errors
    ///
    /// The first offending field, in declaration order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("trigger_attribute", &self.trigger_attribute),
            ("bound_attribute", &self.bound_attribute),
            ("fallback_attribute", &self.fallback_attribute),
            ("backdrop_class", &self.backdrop_class),
            ("body_class", &self.body_class),
        ] {
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidName {
                    field,
                    value: value.clone(),
                });
            }
        }

        CompoundSelector::parse(&self.trigger_selector()).map_err(|source| {
            ConfigError::InvalidSelector {
                field: "trigger_attribute",
                source,
            }
        })?;

        if !self.surface_template.contains(KEY_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder(
                self.surface_template.clone(),
            ));
        }
        CompoundSelector::parse(&self.surface_selector("probe key'\"\\")).map_err(|source| {
            ConfigError::InvalidSelector {
                field: "surface_template",
                source,
            }
        })?;

        CompoundSelector::parse(&self.close_selector).map_err(|source| {
            ConfigError::InvalidSelector {
                field: "close_selector",
                source,
            }
        })?;

        Ok(())
    }

    /// Load and validate a TOML config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML, otherwise any
    /// [`validate`](Self::validate) failure.
    #[cfg(feature = "config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, otherwise any
    /// [`validate`](Self::validate) failure.
    #[cfg(feature = "config")]
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
