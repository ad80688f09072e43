//! Auth-domain identifiers, credentials, bearer tokens, and typed claims.

pub mod claims;
pub mod credentials;
pub mod id;
pub mod token;

pub use claims::*;
pub use credentials::*;
pub use id::*;
pub use token::{record::*, secret::*};
