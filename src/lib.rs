//! Ayunetra - marketing site and authenticated Ayurveda chat
//!
//! This library provides the server's building blocks: the session, message
//! and places boundaries with their hosted and local implementations, the
//! chat and hospital finder views, and the HTTP layer with its route guard.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod hosted;
pub mod models;
pub mod services;
pub mod stores;
pub mod templates;
