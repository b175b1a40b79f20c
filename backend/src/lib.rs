pub mod auth;
pub mod config;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod test_util;

pub use auth::{BootstrapGate, GithubClient, Identity, TokenCodec};
pub use config::Config;
pub use models::user::User;
pub use store::{ProviderProfile, UserStore};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub token_codec: TokenCodec,
    pub github_client: GithubClient,
    pub user_store: UserStore,
    pub bootstrap_gate: BootstrapGate,
}
