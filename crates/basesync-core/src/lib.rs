pub mod config;
pub mod engine;
pub mod errors;
pub mod lookup;
pub mod merge;
pub mod model;
pub mod providers;
pub mod report;
