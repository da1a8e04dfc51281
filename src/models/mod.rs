pub mod base_model;
pub mod ensemble;
pub mod scorer;
pub mod subspace;
pub mod window;
