//! FxQuote Common Types
//!
//! This crate contains the types shared by the fxquote rate cache: currency
//! codes and currency specs, quotes, date tokens and validation errors.

pub mod monetary;
pub mod error;
pub mod time;

pub use monetary::*;
pub use error::*;
pub use time::*;
