//! NZ tax: GST returns, PAYE, compliance assessment and submission

pub mod assessment;
pub mod gst;
pub mod paye;
pub mod submission;

pub use assessment::*;
pub use gst::*;
pub use paye::*;
pub use submission::*;
