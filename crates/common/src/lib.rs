//! Shared-key request signing for the Framebase API.
//!
//! A client and server that share a secret key authenticate each request
//! with an HMAC over the request's identity, the second it was issued and a
//! random nonce. No session and no client certificate are involved.
//!
//! # Modules
//!
//! - [`constants`]: Wire-level names and default values
//! - [`error`]: Error types and error handling utilities
//! - [`inbound`]: Server-side verification of inbound requests
//! - [`outbound`]: Client-side construction of signed requests
//! - [`request_signing`]: Signable requests, tokens, signing and verification
//! - [`settings`]: Configuration management and validation

pub mod constants;
pub mod error;
pub mod inbound;
pub mod outbound;
pub mod request_signing;
pub mod settings;
