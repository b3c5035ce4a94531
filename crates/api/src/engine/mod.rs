//! Asynchronous generation engine.

pub mod runner;

pub use runner::GenerationRunner;
