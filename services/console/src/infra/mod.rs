pub mod gotrue;
pub mod rest;
