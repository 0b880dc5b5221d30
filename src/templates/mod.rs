//! HTML templates
//!
//! Pages are rendered with Tera. Templates are embedded in the binary from
//! the `templates/` folder and share `base.html` through inheritance. Every
//! page receives the same standard variables (site name, request path,
//! signed-in user, notice) so the layout can render the nav and the notice
//! banner uniformly.

mod error;


pub use error::TemplateError;

use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::error::Error as _;
use tera::{Context as TeraContext, Tera};

use crate::models::{Notice, Session};

pub const SITE_NAME: &str = "Ayunetra";

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct TemplateAssets;

/// Variables injected into every page
#[derive(Debug, Clone, Default, Serialize)]
pub struct StandardVars {
    pub request_path: String,
    /// Email of the signed-in user
    pub current_user: Option<String>,
    pub notice: Option<Notice>,
}

impl StandardVars {
    pub fn new(request_path: impl Into<String>, session: Option<&Session>) -> Self {
        Self {
            request_path: request_path.into(),
            current_user: session.map(|s| s.user.email.clone()),
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Option<Notice>) -> Self {
        self.notice = notice;
        self
    }
}

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load every embedded template
    pub fn new() -> Result<Self, TemplateError> {
        let mut templates = Vec::new();
        for name in TemplateAssets::iter() {
            let file = TemplateAssets::get(&name)
                .ok_or_else(|| TemplateError::Asset(format!("missing embedded template {}", name)))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|_| TemplateError::Asset(format!("{} is not valid UTF-8", name)))?;
            templates.push((name.to_string(), content));
        }

        Self::from_templates(templates)
    }

    /// Build an engine from in-memory `(name, source)` pairs
    pub fn from_templates(templates: Vec<(String, String)>) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        // add_raw_templates resolves `{% extends %}` across the whole batch
        tera.add_raw_templates(templates)
            .map_err(|e| TemplateError::Render(describe(&e)))?;

        tracing::debug!(
            "Loaded {} template(s)",
            tera.get_template_names().count()
        );
        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, TemplateError> {
        self.tera.render(template, context).map_err(|e| {
            TemplateError::Render(format!("Failed to render '{}': {}", template, describe(&e)))
        })
    }

    /// Render with the standard variables added to `context`
    pub fn render_page(
        &self,
        template: &str,
        context: &TeraContext,
        vars: &StandardVars,
    ) -> Result<String, TemplateError> {
        let mut full_context = context.clone();
        full_context.insert("site_name", SITE_NAME);
        full_context.insert("request_path", &vars.request_path);
        full_context.insert("current_user", &vars.current_user);
        full_context.insert("notice", &vars.notice);
        full_context.insert("year", &chrono::Utc::now().year());

        self.render(template, &full_context)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }
}

/// Flatten a Tera error and its causes into one line
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    message
}

/// Last-resort page when a template fails to render
pub fn simple_error_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{site} - Error</title>
</head>
<body>
    <h1>Something went wrong</h1>
    <p>{message}</p>
</body>
</html>"#,
        site = SITE_NAME,
        message = tera::escape_html(message),
    )
}
