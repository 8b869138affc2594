//! BloodHound Community Edition API access
//!
//! Signed requests, error classification, retry and paging live here. Tool
//! handlers in [`crate::adapters`] sit on top of [`BloodhoundClient`].

pub mod cache;
pub mod client;
pub mod cypher;
pub mod error;
pub mod signer;

pub use client::{BloodhoundClient, ClientOptions, Listing, PageCursor, QueryParams};
pub use cypher::{CypherResult, QueryCheck};
pub use error::{ApiError, ApiErrorKind};
pub use signer::{Credential, SignedHeaders, Signer};
