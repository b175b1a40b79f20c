use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::identity::{derive_identity, Identity};
use crate::AppState;

/// Lifetime of the `token` cookie, matching the token's own validity.
const TOKEN_COOKIE_TTL: time::Duration = time::Duration::days(7);

/// The OAuth round trip should complete well within this.
const HANDSHAKE_COOKIE_TTL: time::Duration = time::Duration::minutes(10);

const REDIRECT_COOKIE: &str = "redirect_to";
const STATE_COOKIE: &str = "oauth_state";

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    state: String,
    code: String,
}

/// Sanitized view of a user's own record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    id: i64,
    username: String,
    avatar: Option<String>,
    permission: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// GET /user/github - redirect the browser to the GitHub consent screen.
///
/// The originating origin (from the Referer header) is kept in a
/// short-lived cookie so the callback knows where to send the browser back.
async fn github_redirect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, (StatusCode, String)> {
    let origin = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(referer_origin)
        .ok_or((StatusCode::BAD_REQUEST, "Referer not found".to_string()))?;

    let oauth_state = random_state();
    let consent_url = state.github_client.authorize_url(&oauth_state);

    let jar = jar
        .add(handshake_cookie(REDIRECT_COOKIE, origin))
        .add(handshake_cookie(STATE_COOKIE, oauth_state));

    Ok(found(jar, &consent_url))
}

/// GET /user/github/callback - complete the OAuth code exchange.
///
/// Missing `state` or `code` query parameters are rejected by the extractor
/// before any outbound call or store mutation happens.
async fn github_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, (StatusCode, String)> {
    if let Some(expected) = jar.get(STATE_COOKIE) {
        if expected.value() != query.state {
            return Err((StatusCode::BAD_REQUEST, "OAuth state mismatch".to_string()));
        }
    }

    let access_token = state
        .github_client
        .exchange_code(&query.code)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    let profile = state
        .github_client
        .fetch_profile(&access_token)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    let user = state
        .user_store
        .upsert_from_provider(&profile, &state.bootstrap_gate)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let token = state
        .token_codec
        .issue(user.id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    // Without a prior redirect step this degrades to a relative path.
    let redirect_host = jar
        .get(REDIRECT_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();
    let redirect_url = format!("{}/callback?token={}", redirect_host, token);

    let token_cookie = Cookie::build(("token", token))
        .path("/")
        .max_age(TOKEN_COOKIE_TTL)
        .same_site(SameSite::Lax)
        .build();

    // Removal cookies need the same path the originals were set with.
    let jar = jar
        .add(token_cookie)
        .remove(Cookie::build(REDIRECT_COOKIE).path("/"))
        .remove(Cookie::build(STATE_COOKIE).path("/"));

    Ok(found(jar, &redirect_url))
}

/// GET /user/profile - the authenticated user's own record.
async fn profile(
    State(state): State<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let Some(Extension(identity)) = identity else {
        return Err((StatusCode::FORBIDDEN, "Permission denied".to_string()));
    };

    if identity.uid <= 0 {
        return Err((StatusCode::BAD_REQUEST, "Invalid user ID".to_string()));
    }

    // Fresh lookup: the middleware's view may already be stale.
    let user = state
        .user_store
        .find_by_id(identity.uid)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        id: user.id,
        permission: user.is_admin(),
        username: user.username,
        avatar: user.avatar,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }))
}

/// Scheme + host (+ port) of the referring page, with path and query
/// stripped.
fn referer_origin(referer: &str) -> Option<String> {
    let url = Url::parse(referer).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// 302 redirect carrying cookie changes. `axum::response::Redirect` has no
/// 302 variant and browsers following the OAuth dance expect one.
fn found(jar: CookieJar, location: &str) -> Response {
    (
        StatusCode::FOUND,
        jar,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

fn handshake_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(HANDSHAKE_COOKIE_TTL)
        .same_site(SameSite::Lax)
        .build()
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/user/github", get(github_redirect))
        .route("/user/github/callback", get(github_callback))
        .route("/user/profile", get(profile))
        .layer(middleware::from_fn_with_state(state.clone(), derive_identity))
        .with_state(state)
}
