//! Email body templates.

use serde_json::Value;
use std::path::Path;
use tera::{Context, Tera};
use thiserror::Error;

/// Extension appended to logical template names.
const TEMPLATE_EXTENSION: &str = ".html";

/// Template rendering failures.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template is registered under this name.
    #[error("Template not found: {0}")]
    NotFound(String),

    /// The template exists but rendering failed.
    #[error("Failed to render {name}: {reason}")]
    Render {
        /// Template name.
        name: String,
        /// Renderer message.
        reason: String,
    },

    /// The template directory could not be loaded.
    #[error("Failed to load templates: {0}")]
    Load(String),
}

/// Turns a logical email name plus data into a finished body.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `name` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] if `name` cannot be resolved, so
    /// the caller can skip connecting entirely.
    fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError>;
}

/// Renderer backed by a [`Tera`] instance.
///
/// A logical name such as `emails/password-reset` resolves to the template
/// `emails/password-reset.html`.
#[derive(Debug)]
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Loads every `*.html` file below `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Load`] if a template fails to parse.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let pattern = format!("{}/**/*{TEMPLATE_EXTENSION}", dir.as_ref().display());
        let tera = Tera::new(&pattern).map_err(|e| TemplateError::Load(e.to_string()))?;
        tracing::debug!(
            templates = tera.get_template_names().count(),
            pattern = %pattern,
            "loaded email templates"
        );
        Ok(Self { tera })
    }

    /// Wraps an already configured Tera instance.
    #[must_use]
    pub const fn from_tera(tera: Tera) -> Self {
        Self { tera }
    }

    fn resolve(name: &str) -> String {
        if Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        {
            name.to_string()
        } else {
            format!("{name}{TEMPLATE_EXTENSION}")
        }
    }
}

impl TemplateRenderer for TeraRenderer {
    fn render(&self, name: &str, data: &Value) -> Result<String, TemplateError> {
        let resolved = Self::resolve(name);
        if !self.tera.get_template_names().any(|n| n == resolved) {
            return Err(TemplateError::NotFound(name.to_string()));
        }

        let context = match data {
            Value::Null => Context::new(),
            other => Context::from_value(other.clone()).map_err(|e| TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            })?,
        };

        self.tera
            .render(&resolved, &context)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}
