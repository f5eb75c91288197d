//! API representations of the system's data: what goes over the wire.

pub mod access;
pub mod auth;
pub mod ballot;
pub mod election;
pub mod invitation;
