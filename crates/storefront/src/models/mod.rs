//! Models kept in the visitor's session.

pub mod session;

pub use session::{CurrentUser, Flash, FlashLevel, keys as session_keys};
