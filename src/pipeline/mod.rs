//! Pipeline supervision
//!
//! Wires fetcher → broadcaster → {subscribers, replay cache}, runs every
//! component concurrently and owns the shutdown order.

mod supervisor;

pub use supervisor::{Pipeline, INBOUND_CAPACITY};
