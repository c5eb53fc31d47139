pub mod account;
pub mod graph;
pub mod setup;
