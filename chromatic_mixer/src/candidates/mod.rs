//! Candidate mixture generation.
//!
//! - [`random_combination`] draws one random step-aligned mixture
//! - [`generate_diverse_candidates`] builds a deduplicated pool for the surrogate
//! - [`generate_diverse_covering_combinations`] builds the initial multi-dye batch

pub mod covering;
pub mod diverse;
pub mod random;

pub use covering::generate_diverse_covering_combinations;
pub use diverse::generate_diverse_candidates;
pub use random::random_combination;
