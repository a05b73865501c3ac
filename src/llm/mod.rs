pub mod client;
pub mod coordinator;
pub mod prompts;
pub mod types;

pub use client::*;
pub use coordinator::*;
pub use types::*;
