//! Ambient plumbing shared by garage console services: configuration,
//! tracing bootstrap, JSON error bodies, health handlers and middleware.

pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod tracing;
