pub mod config;
pub mod cookie;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod infra;
pub mod registry;
pub mod router;
pub mod state;
pub mod usecase;
