//! CLI command implementations.

pub mod decode;
pub mod keygen;
pub mod nullifier;
pub mod pay;
pub mod route;
pub mod whoami;

// Re-export command handlers
pub use decode::decode;
pub use keygen::keygen;
pub use nullifier::nullifier;
pub use pay::pay;
pub use route::route;
pub use whoami::whoami;
