//! Profile endpoints for authenticated and addressed users.

pub(crate) mod picture;
pub(crate) mod profile;
