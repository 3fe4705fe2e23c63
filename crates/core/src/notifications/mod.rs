pub mod log_sink;
pub mod permission;
pub mod recording;
pub mod traits;
