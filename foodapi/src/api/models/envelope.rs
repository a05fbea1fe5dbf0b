//! The JSON envelope every endpoint answers with.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `{ "error": bool, "message": string, "data": any? }`
///
/// `data` is omitted when there is nothing to return.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub error: bool,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shapes() {
        assert_eq!(
            serde_json::to_value(ApiResponse::ok("success", vec![1, 2])).unwrap(),
            json!({ "error": false, "message": "success", "data": [1, 2] })
        );
        assert_eq!(
            serde_json::to_value(ApiResponse::<()>::message("logged out")).unwrap(),
            json!({ "error": false, "message": "logged out" })
        );
        assert_eq!(
            serde_json::to_value(ApiResponse::<()>::error("nope")).unwrap(),
            json!({ "error": true, "message": "nope" })
        );
    }

    #[test]
    fn test_error_body_parses_for_any_payload_type() {
        #[derive(Debug, Deserialize)]
        struct NoDefault {
            id: i32,
        }

        let body: ApiResponse<NoDefault> = serde_json::from_value(json!({ "error": true, "message": "nope" })).unwrap();
        assert!(body.error);
        assert!(body.data.is_none());

        let body: ApiResponse<NoDefault> = serde_json::from_value(json!({ "error": false, "message": "", "data": { "id": 4 } })).unwrap();
        assert_eq!(body.data.unwrap().id, 4);
    }

    #[test]
    fn test_false_payload_is_kept() {
        // A boolean `false` is data, not absence
        assert_eq!(
            serde_json::to_value(ApiResponse::ok("", false)).unwrap(),
            json!({ "error": false, "message": "", "data": false })
        );
    }
}
