//! Data models
//!
//! This module contains the data structures shared by the stores, the views
//! and the HTTP layer:
//! - Sessions and user identities
//! - Chat messages
//! - Places, coordinates and map pins
//! - Suggested questions and notices

mod message;
mod notice;
mod place;
mod session;
mod suggestion;
mod user;

pub use message::{ChatMessage, NewChatMessage};
pub use notice::{Notice, NoticeLevel};
pub use place::{Coordinate, MapPin, PinKind, PlaceResult};
pub use session::{Session, SessionTokens};
pub use suggestion::{suggestion, SuggestedQuestion, SuggestionAction, SUGGESTED_QUESTIONS};
pub use user::{normalize_email, User, UserIdentity};
