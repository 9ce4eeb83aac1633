//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Login flow, registration, password changes
//! - `cart` - Session-backed purchase cart
//! - `checkout` - Cart summary and payment outcome handling
//! - `payment` - Khalti widget configuration

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod payment;
