//! # Authentication Module
//!
//! Credentials, session tokens and caller identity for the clipboard sync core.
//!
//! ## Overview
//!
//! - [`CredentialEngine`] hashes and verifies passwords, and recognises
//!   records from the legacy unsalted scheme so they can be upgraded on login.
//! - [`TokenIssuer`] signs and verifies stateless session tokens and decides
//!   refresh eligibility.
//! - [`validation`] holds the account field rules applied at registration
//!   and password change.
//!
//! The crate never touches storage; persisting what it produces is the
//! service layer's job.

pub mod credentials;
pub mod error;
pub mod token;
pub mod types;
pub mod validation;

pub use credentials::{CredentialCheck, CredentialEngine, SaltedCredential};
pub use error::{AuthError, Result};
pub use token::{strip_bearer, Claims, IssuedToken, TokenIssuer};
pub use types::{AuthIdentity, UserId};
