//! Services layer
//!
//! View state machines and the local implementations behind the store
//! boundaries:
//! - `chat`: the chat view lifecycle
//! - `finder`: the location finder view
//! - `local_auth`: SQLite-backed session store
//! - `responder`: reply generation for chat messages

pub mod chat;
pub mod finder;
pub mod local_auth;
pub mod password;
pub mod responder;

pub use chat::{ChatState, ChatView, SendOutcome};
pub use finder::{GeolocationError, LocationFinder};
pub use local_auth::LocalSessionStore;
pub use password::{hash_password, verify_password};
pub use responder::{PlaceholderResponder, ResponseGenerator};
