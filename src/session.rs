use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};

use crate::{AppState, entities::user, error::AppError, repository::Repository};

pub const SESSION_COOKIE: &str = "session";

/// Who is making the request.
#[derive(Clone, Debug)]
pub enum Identity {
    Anonymous,
    User(user::Model),
}

impl Identity {
    pub fn user(&self) -> Option<&user::Model> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }
}

/// Starts a session for `user`.
pub fn login(jar: SignedCookieJar, user: &user::Model) -> SignedCookieJar {
    tracing::info!(user_id = user.id, username = %user.username, "session started");
    jar.add(
        Cookie::build((SESSION_COOKIE, user.id.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/"),
    )
}

/// Ends the current session, if any.
pub fn logout(jar: SignedCookieJar) -> SignedCookieJar {
    if jar.get(SESSION_COOKIE).is_none() {
        return jar;
    }
    tracing::info!("session ended");
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Resolves the session cookie to a user. Unknown, malformed, or tampered
/// cookies all count as anonymous.
pub async fn current_identity(jar: &SignedCookieJar, repo: &Repository) -> Result<Identity, AppError> {
    let Some(user_id) = jar.get(SESSION_COOKIE).and_then(|c| c.value().parse::<i32>().ok()) else {
        return Ok(Identity::Anonymous);
    };
    Ok(match repo.find_user_by_id(user_id).await? {
        Some(user) => Identity::User(user),
        None => {
            tracing::debug!(user_id, "session refers to missing user");
            Identity::Anonymous
        }
    })
}

/// Only local paths are followed after login.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

pub fn login_redirect(parts: &Parts) -> Redirect {
    let requested = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Redirect::to(&format!("/login?next={}", urlencoding::encode(requested)))
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        current_identity(&jar, &state.repo).await
    }
}

/// Guard for routes that need a logged-in user; anonymous callers are sent
/// to the login page.
#[derive(Clone, Debug)]
pub struct RequireUser(pub user::Model);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await.map_err(IntoResponse::into_response)? {
            Identity::User(user) => Ok(Self(user)),
            Identity::Anonymous => Err(login_redirect(parts).into_response()),
        }
    }
}

/// Guard for admin routes; logged-in non-admins are sent home.
#[derive(Clone, Debug)]
pub struct RequireAdmin(pub user::Model);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.admin {
            tracing::debug!(user_id = user.id, path = %parts.uri.path(), "non-admin turned away");
            return Err(Redirect::to("/").into_response());
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::cookie::Key;

    use super::*;

    fn admin() -> user::Model {
        user::Model { id: 7, username: "root".into(), password: "pw".into(), admin: true }
    }

    #[test]
    fn login_sets_and_logout_clears_the_session_cookie() {
        let jar = SignedCookieJar::new(Key::generate());
        let jar = login(jar, &admin());
        assert_eq!(jar.get(SESSION_COOKIE).unwrap().value(), "7");

        let jar = logout(jar);
        assert!(jar.get(SESSION_COOKIE).is_none());
    }

    #[test]
    fn only_local_next_targets_are_followed() {
        assert_eq!(safe_next(Some("/movies")), Some("/movies"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }
}
