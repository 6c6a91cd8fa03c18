//! HTTP front end for the batch multiplexer.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration and validation.
//! - [`handler`] - the reference echo item handler used by the binary.
//! - [`routes`] - axum router, the batch route, and encoding negotiation.
//! - [`telemetry`] - tracing subscriber setup.

pub mod config;
pub mod handler;
pub mod routes;
pub mod telemetry;
