//! Database repositories
//!
//! Repository pattern implementations for the local store backend.
//! Each repository handles the queries for one table.

pub mod message;
pub mod session;
pub mod user;

pub use message::SqlxMessageRepository;
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

use anyhow::{Context, Result};
use uuid::Uuid;

/// User ids are stored as their hyphenated text form
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid user id in database: {}", value))
}
