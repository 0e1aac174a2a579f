//! Integration test support: shared context, payload fixtures, and store
//! doubles.

pub mod fixtures;
pub mod mocks;
pub mod setup;
