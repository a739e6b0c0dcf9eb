//! Type definitions for suntrack

mod error;
mod period;
mod snapshot;
mod summary;

pub use error::*;
pub use period::*;
pub use snapshot::*;
pub use summary::*;
