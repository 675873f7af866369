//! The two end-to-end training programs, one async function each.

pub mod boosted;
pub mod ensemble;

pub use boosted::BoostedOutcome;
pub use ensemble::EnsembleOutcome;
