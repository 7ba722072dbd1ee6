//! Auth handlers and supporting modules.
//!
//! Signup and password reset are OTP-gated: account details or the reset
//! intent are parked in an in-process ledger keyed by email until the
//! mailed 6-digit code is verified. Entries live for five minutes and a
//! new request for the same email replaces the old one.
//!
//! The ledgers are process-local, so a restart drops pending signups and
//! resets. Completed accounts and issued tokens are unaffected; tokens
//! are stateless JWTs verified against the configured secret.

pub(crate) mod error;
pub(crate) mod login;
pub(crate) mod oauth;
mod otp;
pub(crate) mod reset;
pub(crate) mod signup;
pub(crate) mod state;
pub(crate) mod types;
mod utils;

pub use state::{AuthConfig, AuthState};
