//! Domain types shared across the garage console.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; never in `infra/` or `handlers/`.

pub mod id;
pub mod principal;
pub mod profile;
pub mod role;
