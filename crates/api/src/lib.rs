//! HTTP API for the Release resource: server wiring, routing, and
//! request/response mapping.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod extract;
pub mod middleware;
