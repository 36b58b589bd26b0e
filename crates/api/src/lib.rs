//! HTTP API: server, routing, and request/response mapping for the stock ledger.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
