// Keyguard — Library root
//
// Re-exports the platform, store, gate, enclave, demo and CLI modules.

pub mod cli;
pub mod config;
pub mod demo;
pub mod dispatch;
pub mod enclave;
pub mod error;
pub mod gate;
pub mod platform;
pub mod store;

pub use error::{KeyguardError, Result};
