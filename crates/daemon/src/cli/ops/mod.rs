pub mod combine;
pub mod daemon;
pub mod health;
pub mod init;
pub mod split;
pub mod status;
pub mod unseal;
pub mod version;

pub use combine::Combine;
pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use split::Split;
pub use status::Status;
pub use unseal::Unseal;
pub use version::Version;
