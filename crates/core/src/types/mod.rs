//! Core types for the storefront.
//!
//! This module provides type-safe wrappers for the domain concepts the
//! storefront exchanges with the backend and keeps in the visitor's session.

pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod role;

pub use cart::{Cart, CartError, CartLineItem, Quantity};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{PaymentStatus, PurchaseOrder};
pub use price::Price;
pub use role::Role;
