//! Core type definitions used across the Deskline workspace.

pub mod id;

pub use id::*;
