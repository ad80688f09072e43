//! Bearer token values and their redacted secret wrapper.

pub mod record;
pub mod secret;
