//! like-monitor library crate.
//!
//! Finds completed orders whose delivered like count falls short of the
//! promised quantity, exports the shortfall per product and optionally files
//! refunds for it.

pub mod api;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod export;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod panic_hook;
pub mod refund;
pub mod scheduler;
pub mod utils;

pub use error::{Error, Result};
