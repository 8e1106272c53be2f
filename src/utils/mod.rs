//! Utility modules

pub mod calendar;
pub mod clock;
pub mod memory_storage;
pub mod money;
pub mod validation;

pub use calendar::*;
pub use clock::*;
pub use memory_storage::*;
pub use money::*;
pub use validation::*;
