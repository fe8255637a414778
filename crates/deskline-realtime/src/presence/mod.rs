//! Online-set mirror of other users' presence.

pub mod tracker;

pub use tracker::{OnlineUser, PresenceTracker};
