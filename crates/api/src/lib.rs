//! EasyWeb API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, the
//! lifecycle engine, and the WebSocket gateway) so integration tests and the
//! binary entrypoint share them.

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
