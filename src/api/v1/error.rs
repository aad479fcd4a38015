use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{error, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let error = if let Some(error) = err.find::<ApiError>() {
        error.clone()
    } else if err.is_not_found() {
        ApiError::from_code(ApiErrorCode::RouteNotFound)
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        ApiError {
            code: ApiErrorCode::InvalidRequest,
            message: e.to_string(),
        }
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiError::from_code(ApiErrorCode::MethodNotAllowed)
    } else {
        warn!("Unhandled rejection: {:?}", err);
        ApiError::from_code(ApiErrorCode::InternalError)
    };

    let status = error.code.status();
    let json = warp::reply::json(&ApiResponse::<()>::err(error));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn from_code(code: ApiErrorCode) -> Self {
        ApiError {
            message: code.to_string(),
            code,
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiError {
        error!("Internal error: {}", error);
        ApiError::from_code(ApiErrorCode::InternalError)
    }
}

impl reject::Reject for ApiError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("User already exists")]
    UserExists,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidCredentials,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Not found")]
    RouteNotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::UserExists => StatusCode::CONFLICT,
            ApiErrorCode::UserNotFound | ApiErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InvalidCredentials | ApiErrorCode::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthorized | AuthError::InvalidToken => {
                ApiError::from_code(ApiErrorCode::Unauthorized)
            }
            AuthError::Conflict => ApiError::from_code(ApiErrorCode::UserExists),
            AuthError::NotFound => ApiError::from_code(ApiErrorCode::UserNotFound),
            AuthError::InvalidCredentials => ApiError::from_code(ApiErrorCode::InvalidCredentials),
            AuthError::Validation(message) => ApiError {
                code: ApiErrorCode::InvalidRequest,
                message,
            },
            e @ (AuthError::Configuration(_) | AuthError::Store(_) | AuthError::InternalError(_)) => {
                ApiError::internal(e)
            }
        }
    }
}
