pub mod combinations;
pub mod evaluation;
pub mod parallel;
pub mod sampling;
pub mod stats;
