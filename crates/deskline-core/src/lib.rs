//! # deskline-core
//!
//! Core crate for Deskline. Contains configuration schemas, typed
//! identifiers, and the unified error system shared by the realtime
//! engine and the terminal client.
//!
//! This crate has **no** internal dependencies on other Deskline crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
