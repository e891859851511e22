//! Value types recorded by a mixing session.

pub mod experiment;
pub mod mixture;

pub use experiment::Experiment;
pub use mixture::Mixture;
