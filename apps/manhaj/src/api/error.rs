//! # API Errors
//!
//! Every failure leaves the API as
//! `{"success": false, "error": <localized>, "detail": <context>}`.
//! Internal errors are logged here and never expose their detail.

use crate::config::Locale;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use manhaj_core::{ErrorKind, ManhajError};
use serde::{Deserialize, Serialize};

/// Short user-facing messages, one per response category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Internal,
    Unauthorized,
    RateLimited,
}

impl Message {
    pub fn text(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::Validation, Locale::En) => "Invalid request",
            (Self::Validation, Locale::Ar) => "بيانات غير صالحة",
            (Self::NotFound, Locale::En) => "Not found",
            (Self::NotFound, Locale::Ar) => "العنصر غير موجود",
            (Self::Forbidden, Locale::En) => "You are not allowed to do this",
            (Self::Forbidden, Locale::Ar) => "غير مسموح لك بهذا الإجراء",
            (Self::Conflict, Locale::En) => "Conflicts with existing data",
            (Self::Conflict, Locale::Ar) => "يتعارض مع بيانات موجودة",
            (Self::Internal, Locale::En) => "Internal server error",
            (Self::Internal, Locale::Ar) => "حدث خطأ في الخادم",
            (Self::Unauthorized, Locale::En) => "Unauthorized",
            (Self::Unauthorized, Locale::Ar) => "يجب تسجيل الدخول",
            (Self::RateLimited, Locale::En) => "Too many requests",
            (Self::RateLimited, Locale::Ar) => "طلبات كثيرة جداً، حاول لاحقاً",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl From<ErrorKind> for Message {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => Self::Validation,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Forbidden => Self::Forbidden,
            ErrorKind::Conflict => Self::Conflict,
            ErrorKind::Internal => Self::Internal,
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
}

/// A failed request, ready to render in the caller's language.
#[derive(Debug)]
pub struct ApiError {
    message: Message,
    locale: Locale,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(message: Message, locale: Locale, detail: impl Into<String>) -> Self {
        Self {
            message,
            locale,
            detail: Some(detail.into()),
        }
    }

    /// Map an engine error. Internal errors are logged and their detail dropped.
    pub fn from_core(err: ManhajError, locale: Locale) -> Self {
        let message = Message::from(err.kind());
        let detail = if message == Message::Internal {
            tracing::error!(error = %err, "request failed");
            None
        } else {
            Some(err.to_string())
        };
        Self {
            message,
            locale,
            detail,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.message.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message.text(self.locale).to_string(),
            detail: self.detail,
        };
        (self.message.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manhaj_core::NodeId;

    #[test]
    fn internal_detail_is_hidden() {
        let err = ApiError::from_core(ManhajError::Storage("disk on fire".into()), Locale::En);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail.is_none());
    }

    #[test]
    fn not_found_keeps_detail() {
        let err = ApiError::from_core(ManhajError::NodeNotFound(NodeId::new("x")), Locale::Ar);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail.as_deref(), Some("Node not found: x"));
        assert_eq!(err.message.text(err.locale), "العنصر غير موجود");
    }

    #[test]
    fn conflicts_map_to_409() {
        let err = ApiError::from_core(
            ManhajError::VersionConflict {
                node_id: NodeId::new("x"),
                expected: 1,
                actual: 2,
            },
            Locale::En,
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
