//! Chat view
//!
//! Per-request state machine behind the chat page and the messages API:
//!
//! ```text
//! Initializing ──no session──▶ UnauthenticatedRedirecting
//!      │
//!   session
//!      ▼
//! LoadingHistory ──▶ ReadyEmpty | ReadyWithHistory ──submit──▶ Sending
//!                          ▲                                     │
//!                          └──── failure ─────── success ────────┘
//!                                (prev. state)   (ReadyWithHistory)
//! ```
//!
//! A view is owned by one request. The session it holds is the one the route
//! guard resolved (and refreshed) for that request.

use std::sync::Arc;

use crate::models::{
    suggestion, ChatMessage, NewChatMessage, Notice, Session, SuggestedQuestion,
    SUGGESTED_QUESTIONS,
};
use crate::services::responder::ResponseGenerator;
use crate::stores::MessageStore;

const HISTORY_LOAD_FAILED: &str = "Could not load your chat history. Please try again later.";
const SEND_FAILED: &str = "Your message could not be sent. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Initializing,
    /// Terminal: no session on mount
    UnauthenticatedRedirecting,
    LoadingHistory,
    ReadyEmpty,
    ReadyWithHistory,
    Sending,
}

impl ChatState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::ReadyEmpty | Self::ReadyWithHistory)
    }
}

/// Result of a submit
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank composer, missing session or view not ready; nothing happened
    Ignored,
    /// The stored row, now at the head of the history
    Sent(ChatMessage),
    /// Reply generation or insert failed; state and composer unchanged
    Failed(String),
}

pub struct ChatView {
    store: Arc<dyn MessageStore>,
    responder: Arc<dyn ResponseGenerator>,
    session: Option<Session>,
    state: ChatState,
    history: Vec<ChatMessage>,
    composer: String,
    notice: Option<Notice>,
}

impl ChatView {
    pub fn new(store: Arc<dyn MessageStore>, responder: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            store,
            responder,
            session: None,
            state: ChatState::Initializing,
            history: Vec::new(),
            composer: String::new(),
            notice: None,
        }
    }

    /// Attach the request's session and load its history.
    pub async fn mount(&mut self, session: Option<Session>) -> ChatState {
        let Some(session) = session else {
            self.state = ChatState::UnauthenticatedRedirecting;
            return self.state;
        };

        self.state = ChatState::LoadingHistory;

        match self.store.list_for_user(&session).await {
            Ok(rows) => {
                tracing::debug!(user_id = %session.user.id, count = rows.len(), "Loaded chat history");
                self.history = rows;
            }
            Err(e) => {
                tracing::error!(user_id = %session.user.id, "Failed to load chat history: {}", e);
                self.history.clear();
                self.notice = Some(Notice::error(HISTORY_LOAD_FAILED));
            }
        }

        self.session = Some(session);
        self.state = self.ready_state();
        self.state
    }

    /// Prefill the composer with a suggested question. Never submits.
    pub fn select_suggestion(&mut self, index: usize) -> bool {
        match suggestion(index) {
            Some(question) => {
                self.composer = question.text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_composer(&mut self, text: impl Into<String>) {
        self.composer = text.into();
    }

    /// Send the composer text: generate the reply, insert the pair, and
    /// prepend the stored row. A single attempt; failures leave the
    /// composer and history untouched.
    pub async fn submit(&mut self) -> SendOutcome {
        if !self.state.is_ready() || self.composer.trim().is_empty() {
            return SendOutcome::Ignored;
        }
        let Some(session) = self.session.clone() else {
            return SendOutcome::Ignored;
        };

        let previous = self.state;
        self.state = ChatState::Sending;

        let response = match self.responder.respond(&self.composer).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(user_id = %session.user.id, "Failed to generate response: {:#}", e);
                return self.fail(previous, e.to_string());
            }
        };

        let new_message = NewChatMessage {
            message: self.composer.clone(),
            response,
            user_id: session.user.id,
        };

        match self.store.insert(&session, new_message).await {
            Ok(row) => {
                tracing::info!(user_id = %session.user.id, message_id = row.id, "Stored chat message");
                self.history.insert(0, row.clone());
                self.composer.clear();
                self.notice = None;
                self.state = ChatState::ReadyWithHistory;
                SendOutcome::Sent(row)
            }
            Err(e) => {
                tracing::error!(user_id = %session.user.id, "Failed to store chat message: {}", e);
                self.fail(previous, e.to_string())
            }
        }
    }

    fn fail(&mut self, previous: ChatState, reason: String) -> SendOutcome {
        self.state = previous;
        self.notice = Some(Notice::error(SEND_FAILED));
        SendOutcome::Failed(reason)
    }

    fn ready_state(&self) -> ChatState {
        if self.history.is_empty() {
            ChatState::ReadyEmpty
        } else {
            ChatState::ReadyWithHistory
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    /// Newest first
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn composer(&self) -> &str {
        &self.composer
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Offered in every ready state, alongside any history
    pub fn suggestions(&self) -> &'static [SuggestedQuestion] {
        match self.state {
            ChatState::ReadyEmpty | ChatState::ReadyWithHistory | ChatState::Sending => {
                &SUGGESTED_QUESTIONS
            }
            ChatState::Initializing
            | ChatState::UnauthenticatedRedirecting
            | ChatState::LoadingHistory => &[],
        }
    }
}
