//! This crate provides common types for working with the Argus protocol
//! or the Argus server. It's used by the Argus client crates as well as
//! anything that processes the same wire format.
//!
//! Most notably this crate contains the [`Dsn`] type, the identifier
//! types used for distributed tracing, and the plain data schema of
//! events, breadcrumbs, users and requests under [`protocol`].
#![warn(missing_docs)]

mod auth;
mod dsn;
mod project_id;
mod random;

pub mod protocol;
pub mod utils;

pub use crate::auth::Auth;
pub use crate::dsn::{Dsn, ParseDsnError, Scheme};
pub use crate::project_id::{ParseProjectIdError, ProjectId};
pub use crate::random::{random_bytes, random_uuid};

pub use uuid::Uuid;
