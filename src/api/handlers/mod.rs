//! Request handlers, one module per console surface.

pub mod auth;
pub mod docker;
pub mod files;
pub mod gpu;
pub mod packages;
pub mod python;
pub mod resources;
pub mod services;
pub mod system;
pub mod terminal;
pub mod users;
