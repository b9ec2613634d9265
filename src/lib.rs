//! MCP stream server.
//!
//! Exposes ecosystem tools (CRM, accounting, domains, cloud) to AI agents over
//! a long-lived HTTP event stream carrying JSON-RPC 2.0. Clients authenticate
//! with an OAuth bearer token issued by this server or a static API key,
//! submit one or more requests in the request body, and receive correlated
//! responses interleaved with heartbeats.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod oauth;
pub mod protocol;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod stream;
pub mod tools;

pub mod schema;
