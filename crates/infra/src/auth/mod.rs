//! Authentication provider adapters.
//!
//! - [`InMemoryAuthProvider`] issues and verifies its own signed tokens (dev, tests, single node).
//! - [`HostedAuthProvider`] talks to a hosted GoTrue-compatible REST API.

pub mod hosted;
pub mod in_memory;

pub use hosted::HostedAuthProvider;
pub use in_memory::InMemoryAuthProvider;

/// Capacity of the auth-change broadcast channel.
const EVENT_CAPACITY: usize = 64;
