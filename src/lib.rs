//! Opsdeck backend library.
//!
//! Core components for the web-based Ubuntu server administration console:
//! REST handlers over system utilities, WebSocket streaming endpoints, and
//! the interactive PTY terminal bridge.

pub mod api;
pub mod auth;
pub mod docker;
pub mod files;
pub mod system;
pub mod terminal;
