//! Response generation for chat messages
//!
//! Each stored chat row pairs the user's message with a generated reply. The
//! generator is a seam: the default implementation returns a configured
//! placeholder until a model backend is wired in.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Produces the reply half of a chat message/response pair
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn respond(&self, message: &str) -> Result<String>;
}

/// Replies with the same configured text to every message
pub struct PlaceholderResponder {
    reply: String,
}

impl PlaceholderResponder {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }

    pub fn boxed(reply: impl Into<String>) -> Arc<dyn ResponseGenerator> {
        Arc::new(Self::new(reply))
    }
}

#[async_trait]
impl ResponseGenerator for PlaceholderResponder {
    async fn respond(&self, _message: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placeholder_ignores_message() {
        let responder = PlaceholderResponder::new("Namaste");
        assert_eq!(responder.respond("What is Pitta?").await.unwrap(), "Namaste");
        assert_eq!(responder.respond("").await.unwrap(), "Namaste");
    }
}
