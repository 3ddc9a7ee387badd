//! The leave engine: pure functions over already loaded records.

pub mod approval;
pub mod duration;
pub mod entitlement;
pub mod error;
pub mod overlap;
pub mod policy;
pub mod stats;
