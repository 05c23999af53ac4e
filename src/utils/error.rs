use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsdbError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Calculation object decode error: {message}")]
    CalcDecode { message: String },

    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing input: {what}")]
    MissingInput { what: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// 錯誤分類，對應呼叫端需要區分的失敗種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 缺少必要輸入，未發出任何請求
    Precondition,
    /// 連線失敗或伺服器回應非預期狀態碼
    Transport,
    /// 伺服器回應無法解析
    Decode,
    Configuration,
}

impl MsdbError {
    pub fn missing(what: impl Into<String>) -> Self {
        MsdbError::MissingInput { what: what.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MsdbError::MissingInput { .. } => ErrorCategory::Precondition,
            // 讀取本地結構檔失敗也屬於呼叫端的前置條件
            MsdbError::Io(_) => ErrorCategory::Precondition,
            MsdbError::Transport(_) | MsdbError::Status { .. } => ErrorCategory::Transport,
            MsdbError::Json(_)
            | MsdbError::CalcDecode { .. }
            | MsdbError::UnexpectedResponse { .. } => ErrorCategory::Decode,
            MsdbError::ConfigError { .. }
            | MsdbError::InvalidConfigValueError { .. }
            | MsdbError::MissingConfigError { .. }
            | MsdbError::TomlError(_) => ErrorCategory::Configuration,
        }
    }

    /// 失敗帶有 HTTP 狀態碼時回傳
    pub fn status(&self) -> Option<u16> {
        match self {
            MsdbError::Status { status, .. } => Some(*status),
            MsdbError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MsdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_carries_code_and_body() {
        let err = MsdbError::Status {
            status: 400,
            body: "bad request".to_string(),
        };
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.category(), ErrorCategory::Transport);
        let msg = err.to_string();
        assert!(msg.contains("400"));
        assert!(msg.contains("bad request"));
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            MsdbError::missing("structure file").category(),
            ErrorCategory::Precondition
        );
        assert_eq!(
            MsdbError::CalcDecode {
                message: "kind mismatch".to_string()
            }
            .category(),
            ErrorCategory::Decode
        );
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert_eq!(MsdbError::from(json_err).category(), ErrorCategory::Decode);
    }
}
