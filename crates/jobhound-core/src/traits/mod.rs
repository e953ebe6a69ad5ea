//! Boundary traits defined in `jobhound-core` and implemented by other crates.

pub mod cache;
pub mod transport;

pub use cache::CacheProvider;
pub use transport::{MessageTransport, SendError};
