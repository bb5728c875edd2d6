//! Resilience: the sole gateway for downstream calls.

pub mod invoker;

pub use invoker::{invoke, InvokerConfig};
