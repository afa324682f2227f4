pub mod payload;
pub mod runner;
