//! Ledger module containing account management, the transaction pipeline,
//! the audit trail and read-side aggregates

pub mod account;
pub mod aggregator;
pub mod audit;
pub mod core;
pub mod transaction;

pub use account::*;
pub use aggregator::*;
pub use audit::*;
pub use self::core::*;
pub use transaction::*;
