//! Command implementations for the Vantage CLI

pub mod health;
pub mod run;
pub mod snapshot;
pub mod tables;
