//! Type definitions for wakastats

mod error;
mod summary;

pub use error::*;
pub use summary::*;
