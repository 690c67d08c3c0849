//! Backing services: collection storage, authentication and the typed catalog.
//!
//! - [`DataService`]: CRUD over named collections ([`MemoryDataService`],
//!   [`RestDataService`]).
//! - [`AuthService`]: email/password sessions ([`MemoryAuthService`],
//!   [`RestAuthService`]).
//! - [`Catalog`]: challenges, quiz questions and progress rows on top of a
//!   data service.

pub mod auth;
pub mod catalog;
pub mod data;
pub mod error;
pub mod memory;
pub mod rest;
pub mod rest_auth;

pub use auth::{AuthService, AuthSession, AuthUser, MemoryAuthService, SessionWatch};
pub use catalog::Catalog;
pub use data::{DataService, Query};
pub use error::ServiceError;
pub use memory::MemoryDataService;
pub use rest::RestDataService;
pub use rest_auth::RestAuthService;
