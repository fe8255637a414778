//! Connection lifecycle: identity, live handle, state, backoff, manager.

pub mod backoff;
pub mod handle;
pub mod identity;
pub mod manager;
pub mod state;

pub use handle::{ConnectionHandle, ConnectionInfo};
pub use identity::{AuthToken, SessionIdentity};
pub use manager::ConnectionManager;
pub use state::{ConnectionState, ConnectionStatus};
