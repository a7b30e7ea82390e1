pub mod environment;
pub mod error;
pub mod executor;
pub mod launcher;
pub mod progress;
