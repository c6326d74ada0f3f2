use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0} not found")]
    NotFound(Uri),

    #[error("No resource found")]
    NoResource,

    #[error("{0}")]
    DatabaseError(#[from] mongodb::error::Error),

    #[error("{0}")]
    JWTError(#[from] jsonwebtoken::errors::Error),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("Authorization token is required")]
    Unauthorized,

    #[error("You have no permission to access this resource")]
    Forbidden,

    #[error("{0}")]
    BSONSerError(#[from] bson::ser::Error),

    #[error("payment provider is unreachable")]
    PaymentUnavailable(#[source] reqwest::Error),

    #[error("payment provider rejected the request")]
    PaymentRejected(String),

    #[error("{1}")]
    CustomStr(StatusCode, &'static str),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<serde_json::Value>,
    r#type: String,
    message: String,
}

impl From<Error> for ErrorJson {
    fn from(err: Error) -> Self {
        let message = err.to_string();

        let r#type = err.to_string_variant();

        let errors = match err {
            Error::ValidationError(err) => serde_json::to_value(err).ok(),
            Error::NotFound(..)
            | Error::NoResource
            | Error::DatabaseError(..)
            | Error::JWTError(..)
            | Error::AlreadyExists(..)
            | Error::Unauthorized
            | Error::Forbidden
            | Error::BSONSerError(..)
            | Error::PaymentUnavailable(..)
            | Error::PaymentRejected(..)
            | Error::CustomStr(..) => None,
        };

        Self {
            errors,
            message,
            r#type,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("error: {:?}", self);
        let status = match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::ValidationError(..) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::AlreadyExists(..) => StatusCode::CONFLICT,
            Self::NotFound(..) | Self::NoResource => StatusCode::NOT_FOUND,
            Self::PaymentUnavailable(..) | Self::PaymentRejected(..) => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(..) | Self::JWTError(..) | Self::BSONSerError(..) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::CustomStr(code, ..) => code,
        };

        // store and processor detail stays server side, the client gets a generic message
        let error = match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::BAD_GATEWAY => ErrorJson {
                errors: None,
                r#type: self.to_string_variant(),
                message: "internal server error".to_string(),
            },
            _ => ErrorJson::from(self),
        };

        (status, Json(error)).into_response()
    }
}

impl Error {
    pub fn to_string_variant(&self) -> String {
        macro_rules! match_var {
            ($id:ident !) => {
                Self::$id
            };
            ($id:ident (..)) => {
                Self::$id(..)
            };
            ($id:ident {..}) => {
                Self::$id { .. }
            };
        }

        macro_rules! variant {
            ($($name:ident $tt:tt),+) => {
                match self {
                    $(
                        match_var!($name $tt) => {
                            stringify!($name)
                       }
                    )+
                }
            };
        }

        variant! {
            ValidationError(..),
            NotFound(..),
            NoResource!,
            DatabaseError(..),
            JWTError(..),
            AlreadyExists(..),
            Unauthorized!,
            Forbidden!,
            BSONSerError(..),
            PaymentUnavailable(..),
            PaymentRejected(..),
            CustomStr(..)
        }
        .to_string()
    }
}

impl From<axum::extract::rejection::PathRejection> for Error {
    fn from(_value: axum::extract::rejection::PathRejection) -> Self {
        Self::NoResource
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn variant_names_match_the_envelope_type_field() {
        assert_eq!(Error::Forbidden.to_string_variant(), "Forbidden");
        assert_eq!(
            Error::AlreadyExists("email").to_string_variant(),
            "AlreadyExists"
        );
        assert_eq!(
            Error::CustomStr(StatusCode::IM_A_TEAPOT, "nope").to_string_variant(),
            "CustomStr"
        );
    }

    #[test]
    fn conflict_keeps_its_message() {
        let json = ErrorJson::from(Error::AlreadyExists("booking"));
        assert_eq!(json.message, "booking already exists");
        assert_eq!(json.r#type, "AlreadyExists");
    }
}
