//! Domain types for the client-side task model.
//!
//! [`TaskId`] is the identifier shared with the server. [`TaskRecord`] is the
//! registry's view of one job: what it is, how far along it is and where its
//! output lives.

pub mod record;

pub use record::*;
