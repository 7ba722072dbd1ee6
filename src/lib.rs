//! # Atesti (Email OTP Authentication)
//!
//! `atesti` is a small authentication service: email/password signup gated by a
//! one-time code sent over email, login issuing a signed bearer token, a
//! three-step forgot-password flow, OAuth login via Google and GitHub, and a
//! profile-picture upload endpoint.
//!
//! ## Verification flows (OTP)
//!
//! Signup and password reset both hinge on proving possession of the email
//! address: the service mails a 6-digit code and keeps the pending request in
//! an in-process, TTL-bound ledger (5 minutes). Codes are checked with exact
//! string equality; expired entries are evicted lazily on lookup.
//!
//! The ledgers live in process memory only. A restart discards every pending
//! signup and reset, which is an accepted limitation of this deployment shape:
//! affected users simply request a new code.
//!
//! ## Tokens
//!
//! Bearer tokens are HS256 JWTs carrying `{sub, email, name}` with a 7-day
//! default lifetime. Verification is stateless; there is no revocation list.
//!
//! ## OAuth accounts
//!
//! Accounts created through an OAuth provider store a hashed provider sentinel
//! instead of a user password. Password login against such accounts fails with
//! the same response as any bad credential, so the sentinel is never compared
//! against user input.

pub mod api;
pub mod cli;
pub mod mail;
pub mod oauth;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
