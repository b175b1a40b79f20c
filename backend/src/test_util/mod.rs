use std::sync::Arc;

use crate::store::ProviderProfile;
use crate::{AppState, BootstrapGate, Config, GithubClient, TokenCodec, UserStore};

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8080,
        github_client_id: "test-client-id".to_string(),
        github_client_secret: "test-client-secret".to_string(),
        jwt_secret: "test-jwt-secret-with-enough-length".to_string(),
        database_url: ":memory:".to_string(),
        log_level: "debug".to_string(),
        cors_origins: "*".to_string(),
    }
}

/// App state backed by an in-memory store and the real GitHub endpoints.
pub fn test_state() -> Arc<AppState> {
    let config = test_config();
    let github_client = GithubClient::new(&config.github_client_id, &config.github_client_secret);
    state_with_github(config, github_client)
}

/// App state whose GitHub client points at a mock server.
pub fn test_state_with_github(oauth_base_url: &str, api_base_url: &str) -> Arc<AppState> {
    let config = test_config();
    let github_client = GithubClient::with_base_urls(
        &config.github_client_id,
        &config.github_client_secret,
        oauth_base_url,
        api_base_url,
    );
    state_with_github(config, github_client)
}

fn state_with_github(config: Config, github_client: GithubClient) -> Arc<AppState> {
    let token_codec = TokenCodec::new(&config.jwt_secret);
    let user_store = UserStore::open(&config.database_url).expect("in-memory store");

    Arc::new(AppState {
        config,
        token_codec,
        github_client,
        user_store,
        bootstrap_gate: BootstrapGate::new(),
    })
}

pub fn test_profile(openid: &str, username: &str) -> ProviderProfile {
    ProviderProfile {
        openid: openid.to_string(),
        username: username.to_string(),
        avatar: Some(format!("https://avatars.example.com/{}", openid)),
    }
}
