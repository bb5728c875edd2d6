//! Destination document API seam.
//!
//! The pipeline only ever talks to the downstream system through the
//! [`DestinationApi`] trait; production code plugs in a real client,
//! tests and local runs use [`InMemoryDestination`].

pub mod memory;
pub mod traits;

pub use memory::InMemoryDestination;
pub use traits::{ApiError, DestinationApi, SchemaInfo};
