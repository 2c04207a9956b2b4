//! Keeping the remote display device in step with server state.
//!
//! Nothing here holds a connection open: the device reports telemetry and polls
//! for its config, and the server pushes to whatever address it last saw. Every
//! push is a single attempt; failures are logged and reported, never retried.

pub mod heartbeat;
pub mod locator;
pub mod pusher;
pub mod queue;
