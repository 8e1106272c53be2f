//! Transaction compliance rules

pub mod engine;

pub use engine::*;
