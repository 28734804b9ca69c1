//! Security for Portico: session tokens, principal resolution, and audit logging.
//!
//! Provides:
//! - **Tokens**: Per-page session tokens with validation and revocation
//! - **Auth**: Resolving the requesting principal from HTTP headers
//! - **Audit logging**: Structured security event logging

pub mod audit;
pub mod auth;
pub mod tokens;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use auth::{
    BasicAuthResolver, PrincipalResolver, TrustedHeaderResolver, from_config, password_digest,
};
pub use tokens::{IssuedToken, TokenService};
