pub mod manager;
pub mod memory;
pub mod traits;

// Durable backends
#[cfg(not(target_arch = "wasm32"))]
pub mod file;
