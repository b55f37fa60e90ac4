//! Configuration and session management: decoding the runtime configuration,
//! holding the swappable state and producing per-invocation sessions.

pub mod decoder;
pub mod session;
pub mod state;

pub use decoder::{ConfigError, RuntimeConfig};
pub use session::{Session, SessionError, SessionFactory};
pub use state::{GatewayState, ReconfigureError, Snapshot};
