//! Request signing utilities for mutually authenticated API calls.
//!
//! This module provides HMAC-based signing and verification of HTTP-style
//! requests under a shared secret key, with timestamp and nonce binding to
//! bound replay.

pub mod algorithm;
pub mod signable;
pub mod signing;
pub mod token;

pub use algorithm::*;
pub use signable::*;
pub use signing::*;
pub use token::*;
