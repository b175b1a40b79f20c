pub mod bootstrap;
pub mod github;
pub mod identity;
pub mod token;

pub use bootstrap::BootstrapGate;
pub use github::{GithubClient, GithubError};
pub use identity::{derive_identity, Identity};
pub use token::{TokenCodec, TokenError};
