//! # Contracts
//!
//! Shared interface contracts: the data model passed between crates, the
//! collaborator traits for the four input streams, the run configuration
//! and the unified error type. Business crates depend on this crate only,
//! never on each other in reverse.
//!
//! ## Time Model
//! - All timestamps are `f64` seconds on the common clock
//! - Video frames are addressed by index, dense samples by time range

mod blueprint;
mod composite;
mod error;
mod sink;
mod stream;

pub use blueprint::*;
pub use composite::*;
pub use error::*;
pub use sink::*;
pub use stream::*;
