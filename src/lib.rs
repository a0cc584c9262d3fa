pub mod ancestry;
pub mod batch;
pub mod cli;
pub mod config;
pub mod ctx;
pub mod error;
pub mod genotype;
pub mod io;
pub mod pipeline;
pub mod score;
pub mod tool;
