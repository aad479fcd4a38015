use super::error::*;
use super::handler;
use crate::application_port::{AuthError, AuthService};
use crate::domain_model::UserId;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::path!("auth" / "register")
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::path!("auth" / "log-in")
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    // refresh tokens travel in the same Authorization slot as access tokens;
    // only the verifying secret tells them apart
    let refresh = warp::path!("token" / "refresh")
        .and(warp::get())
        .and(with_bearer())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::path!("auth" / "log-out")
        .and(warp::post())
        .and(with_bearer())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_verification(server.auth_service.clone()))
        .and(with(server.user_service.clone()))
        .and_then(handler::me);

    register.or(login).or(refresh).or(logout).or(me)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Token from `Authorization: Bearer <token>`. Absent or malformed headers get the
/// same rejection as a bad token.
fn with_bearer() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_str()).and_then(
        |header: Option<String>| async move {
            bearer_token(header.as_deref())
                .map(str::to_string)
                .ok_or_else(|| reject::custom(ApiError::from(AuthError::Unauthorized)))
        },
    )
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    with_bearer().and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            auth_service
                .verify_access(&token)
                .await
                .map_err(ApiError::from)
                .map_err(reject::custom)
        }
    })
}

fn bearer_token(header: Option<&str>) -> Option<&str> {
    let (scheme, token) = header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}
