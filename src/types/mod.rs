//! Task enums and the job server's wire types.
//!
//! [`task`] holds the client-side enums ([`TaskKind`], [`TaskStatus`]) and
//! the server's own job state. [`wire`] holds the request and response
//! payloads exchanged with the job server.

pub mod task;
pub mod wire;

pub use task::*;
pub use wire::*;
