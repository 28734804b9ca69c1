//! # Portico Core
//!
//! Domain types, traits, and error definitions for the Portico UI front door.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the page pipeline (token issuer,
//! preferences store) is a trait here. Implementations live in their
//! respective crates and are handed to the gateway explicitly, which keeps
//! the pipeline testable with stub implementations.

pub mod error;
pub mod net;
pub mod preferences;
pub mod principal;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use error::{
    AddressError, ComposeError, Error, FragmentError, PreferencesError, Result, TemplateError,
    TokenError,
};
pub use net::{InterfaceIpAddress, IpPrefix};
pub use preferences::{Preferences, PreferencesSource};
pub use principal::Principal;
pub use token::{SessionToken, TokenIssuer};
