use serde::Serialize;

const STATUS_OK: &str = "OK";
const STATUS_ERROR: &str = "Error";

/// Common `{status, error?}` envelope, flattened into richer responses
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR,
            error: Some(message.into()),
        }
    }
}
