//! Samaan Kinam Core - Shared domain types.
//!
//! This crate provides the types the storefront works with:
//! - validated input (`Email`, `Quantity`)
//! - backend identifiers (`UserId`, `ProductId`, `ReviewId`)
//! - money (`Price`)
//! - the purchase cart and the order built from it at checkout
//! - user roles
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no session access. Everything here is deterministic and can be
//! tested without a running backend.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
