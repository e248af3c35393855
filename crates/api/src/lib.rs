//! HTTP surface for the job service.
//!
//! Exposed as a library so integration tests can build the exact router the
//! binary serves (see [`router::build_app_router`]).

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
