//! # Ledger Compliance Core
//!
//! Transaction compliance and tax calculation for ledgers regulated in
//! New Zealand (RBNZ record keeping, IRD GST and PAYE).
//!
//! ## Features
//!
//! - **Compliance rule engine**: validates candidate transactions, collecting every field error, and derives flags, risk score and category
//! - **Recording pipeline**: validate, classify, persist, audit and enqueue for regulatory reporting, serialized per account
//! - **Audit trail**: append-only entries with a seven year retention and explicit purge
//! - **Aggregates**: monthly summaries, statements, account flags and organisation compliance scores
//! - **GST and PAYE**: GST returns with exact half-up rounding in cents, PAYE summaries, tax compliance assessment and return submission
//! - **Storage abstraction**: async collaborator traits with an in-memory implementation
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_compliance_core::{Ledger, MemoryStorage};
//!
//! // Use your own LedgerStorage + AuditStore implementation in production
//! let ledger = Ledger::new(MemoryStorage::new()).unwrap();
//! assert_eq!(ledger.config().gst_rate_basis_points, 1500);
//! ```

pub mod compliance;
pub mod config;
pub mod ledger;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use compliance::*;
pub use config::*;
pub use ledger::*;
pub use tax::*;
pub use traits::*;
pub use types::*;

pub use utils::calendar::{HolidayStatus, NzBusinessCalendar};
pub use utils::clock::{Clock, FixedClock, SystemClock};
pub use utils::memory_storage::{MemoryPayroll, MemoryReportingQueue, MemoryStorage};
pub use utils::money::{Currency, Money};
