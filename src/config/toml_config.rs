use crate::utils::error::{MsdbError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_required_field, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "http://10.30.16.179/api/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 是否在整個執行期間重複使用同一個連線
    #[serde(default)]
    pub persistent: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl ClientConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${MSDB_PASSWORD})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MsdbError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 帳號與密碼都有設定時才回傳
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.server.username, &self.server.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        validate_url("server.base_url", &self.server.base_url)?;

        if let Some(token) = &self.server.token {
            validate_non_empty_string("server.token", token)?;
        }

        // 帳號密碼必須成對提供
        if let Some(user) = &self.server.username {
            validate_required_field("server.password", &self.server.password)?;
            validate_non_empty_string("server.username", user)?;
        } else if self.server.password.is_some() {
            return Err(MsdbError::MissingConfigError {
                field: "server.username".to_string(),
            });
        }

        Ok(())
    }
}
