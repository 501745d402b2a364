pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod output;
pub mod participant;
pub mod remote;
pub mod scoring;
pub mod sync;
