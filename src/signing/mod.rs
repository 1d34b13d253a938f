//! AWS Signature Version 4 request signing.
//!
//! [`RequestSigner`] combines an [`AuthContext`](crate::auth::AuthContext)
//! with a [`DraftRequest`](crate::client::DraftRequest) and produces the
//! headers SP-API expects: `Authorization`, `x-amz-date`,
//! `x-amz-access-token` and, for session credentials,
//! `x-amz-security-token`. The lower-level building blocks live in
//! [`sigv4`].

pub mod sigv4;
mod signer;

pub use signer::{RequestSigner, SERVICE};
