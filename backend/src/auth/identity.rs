use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Facts derived about the caller, valid for a single request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub uid: i64,
    pub username: String,
    pub is_admin: bool,
}

/// Middleware deriving the request identity from the Authorization header.
///
/// Absence of valid credentials is a normal, non-exceptional state: a
/// missing header, a bad or expired token and an unknown user all leave the
/// request anonymous and let it proceed. Downstream handlers reject
/// anonymous access where they need to.
pub async fn derive_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(identity) = resolve(&state, request.headers()) {
        request.extensions_mut().insert(identity);
    }
    next.run(request).await
}

fn resolve(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let authorization = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = authorization.strip_prefix("Bearer ")?;

    let uid = match state.token_codec.verify(token) {
        Some(uid) => uid,
        None => {
            // Candidate for audit logging.
            tracing::debug!("Bearer token failed verification");
            return None;
        }
    };

    match state.user_store.find_by_id(uid) {
        Ok(Some(user)) => Some(Identity {
            uid: user.id,
            is_admin: user.is_admin(),
            username: user.username,
        }),
        Ok(None) => {
            tracing::debug!(uid, "Valid token for a user that no longer exists");
            None
        }
        Err(e) => {
            tracing::error!("User lookup failed during identity derivation: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{test_profile, test_state};
    use axum::http::HeaderValue;
    use crate::auth::bootstrap::BootstrapGate;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn no_authorization_header_is_anonymous() {
        let state = test_state();
        assert!(resolve(&state, &HeaderMap::new()).is_none());
        // Idempotent: same empty outcome on repeat.
        assert!(resolve(&state, &HeaderMap::new()).is_none());
    }

    #[test]
    fn non_bearer_authorization_is_anonymous() {
        let state = test_state();
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert!(resolve(&state, &headers).is_none());
    }

    #[test]
    fn garbage_token_is_anonymous() {
        let state = test_state();
        let headers = headers_with_auth("Bearer not-a-real-token");
        assert!(resolve(&state, &headers).is_none());
    }

    #[test]
    fn valid_token_for_unknown_user_is_anonymous() {
        let state = test_state();
        let token = state.token_codec.issue(999).unwrap();
        let headers = headers_with_auth(&format!("Bearer {}", token));
        assert!(resolve(&state, &headers).is_none());
    }

    #[test]
    fn valid_token_for_known_user_yields_identity() {
        let state = test_state();
        let gate = BootstrapGate::new();
        let user = state
            .user_store
            .upsert_from_provider(&test_profile("42", "octocat"), &gate)
            .unwrap();

        let token = state.token_codec.issue(user.id).unwrap();
        let headers = headers_with_auth(&format!("Bearer {}", token));

        let identity = resolve(&state, &headers).unwrap();
        assert_eq!(identity.uid, user.id);
        assert_eq!(identity.username, "octocat");
        // First registrant gets the admin grant.
        assert!(identity.is_admin);
    }
}
