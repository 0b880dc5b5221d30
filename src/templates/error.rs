//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// An embedded template is missing or not UTF-8
    #[error("Template asset error: {0}")]
    Asset(String),

    /// Template parsing or rendering error
    #[error("Template error: {0}")]
    Render(String),
}
