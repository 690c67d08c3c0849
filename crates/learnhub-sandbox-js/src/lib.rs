//! boa_engine backed realm for the playground.
//!
//! - [`document`] assembles the instrumented document from a source bundle
//! - [`host`] is the browser-like global environment every realm starts with
//! - [`realm`] runs documents on isolated contexts and reports back through
//!   the realm outbox
//! - [`syntax`] parses JavaScript without running it

pub mod document;
pub mod host;
pub mod realm;
pub mod syntax;

pub use document::{assemble, PlaygroundDocument};
pub use realm::{BoaExecutor, RealmConfig};
pub use syntax::BoaSyntaxChecker;

pub use boa_engine;
