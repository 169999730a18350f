pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Combine, Daemon, Health, Init, Split, Status, Unseal, Version};
