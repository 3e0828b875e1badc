//! Core types and decision logic for the RootGuard irrigation controller.
//!
//! This crate has no HTTP or database dependencies. The
//! storage backend is reached only through [`store::IrrigationStore`]; the
//! REST layer and the periodic driver both go through [`controller::Controller`].

pub mod alert;
pub mod analytics;
pub mod control;
pub mod controller;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod health;
pub mod reading;
pub mod session;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod memory;
