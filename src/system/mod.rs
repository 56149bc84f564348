//! System administration adapters.
//!
//! Each submodule wraps one family of system utilities (`systemctl`, `apt`,
//! `nvidia-smi`, `useradd`, `pip`, procfs readers) and reshapes their output into
//! serializable DTOs. All adapters are stateless; nothing here outlives a
//! single request.

pub mod command;
pub mod gpu;
pub mod info;
pub mod packages;
pub mod python;
pub mod resources;
pub mod services;
pub mod users;
