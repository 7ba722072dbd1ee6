//! HTTP handlers grouped by route prefix.

pub mod auth;
pub mod health;
pub mod user;
