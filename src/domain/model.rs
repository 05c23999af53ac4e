use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::utils::error::{ErrorCategory, MsdbError};

/// 呼叫端提供的原始欄位值
///
/// 列出正規化時可能遇到的所有型態，格式化時逐一對應
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    Text(String),
    Bool(bool),
    Float(f64),
    Structured(Map<String, Value>),
    /// 整數、陣列等無法明確傳送的值
    Other(Value),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            Value::String(s) => FieldValue::Text(s),
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Object(map) => FieldValue::Structured(map),
            // 只有真正的浮點數才視為 Float，整數一律歸類為 Other
            Value::Number(n) if n.is_f64() => match n.as_f64() {
                Some(f) => FieldValue::Float(f),
                None => FieldValue::Other(Value::Number(n)),
            },
            other => FieldValue::Other(other),
        }
    }
}

impl From<WireValue> for FieldValue {
    fn from(value: WireValue) -> Self {
        match value {
            WireValue::Absent => FieldValue::Absent,
            WireValue::Text(s) => FieldValue::Text(s),
            WireValue::Bool(b) => FieldValue::Bool(b),
            WireValue::Structured(map) => FieldValue::Structured(map),
        }
    }
}

/// 可以直接放進表單欄位的值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    Absent,
    Text(String),
    Bool(bool),
    Structured(Map<String, Value>),
}

impl WireValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, WireValue::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 表單編碼：缺值不送出，布林值轉成 `true`/`false`，結構化資料轉成緊湊 JSON
    pub fn to_form_value(&self) -> Option<String> {
        match self {
            WireValue::Absent => None,
            WireValue::Text(s) => Some(s.clone()),
            WireValue::Bool(b) => Some(b.to_string()),
            WireValue::Structured(map) => Some(Value::Object(map.clone()).to_string()),
        }
    }
}

/// 只包含可辨識欄位的記錄
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, WireValue>,
}

impl NormalizedRecord {
    pub(crate) fn from_fields(fields: BTreeMap<String, WireValue>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&WireValue> {
        self.fields.get(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WireValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut WireValue)> {
        self.fields.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 依欄位名稱排序，輸出有值的表單欄位
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.to_form_value().map(|value| (k.clone(), value)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// 只更新欄位，以外部資料庫識別碼為依據
    MetadataOnly,
    /// 上傳結構檔與欄位
    FileUpload,
    /// 上傳結構檔、欄位與序列化後的計算物件
    Calculation,
}

/// 單次上傳請求，每次呼叫建立，送出後即丟棄
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub strategy: UploadStrategy,
    pub record: NormalizedRecord,
    pub file: Option<PathBuf>,
    pub extra_info: Option<String>,
    pub siman_calc: Option<String>,
}

impl UploadRequest {
    /// 依上傳策略組出實際送出的表單欄位
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = self.record.form_fields();

        match self.strategy {
            UploadStrategy::MetadataOnly => {
                if let Some(mp_id) = self
                    .record
                    .get(crate::core::schema::IDENTIFIER_FIELD)
                    .and_then(WireValue::as_str)
                {
                    fields.push((
                        crate::core::schema::IDENTIFIER_ALIAS.to_string(),
                        mp_id.to_string(),
                    ));
                }
            }
            UploadStrategy::FileUpload => {
                if let Some(extra) = &self.extra_info {
                    fields.push(("extra_info".to_string(), extra.clone()));
                }
            }
            UploadStrategy::Calculation => {
                if let Some(extra) = &self.extra_info {
                    fields.push(("extra_info".to_string(), extra.clone()));
                }
                if let Some(calc) = &self.siman_calc {
                    fields.push(("siman_calc".to_string(), calc.clone()));
                }
            }
        }

        fields
    }
}

/// 原始的 HTTP 回應
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub category: ErrorCategory,
    pub status: Option<u16>,
    pub detail: String,
}

impl From<MsdbError> for UploadFailure {
    fn from(error: MsdbError) -> Self {
        let detail = match &error {
            MsdbError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        };
        Self {
            category: error.category(),
            status: error.status(),
            detail,
        }
    }
}

/// 上傳化學卡片的最終結果
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Created { id: String },
    Failed(UploadFailure),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Created { .. })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            UploadOutcome::Created { id } => Some(id),
            UploadOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        match self {
            UploadOutcome::Failed(failure) => Some(failure),
            UploadOutcome::Created { .. } => None,
        }
    }
}

impl From<crate::utils::error::Result<String>> for UploadOutcome {
    fn from(result: crate::utils::error::Result<String>) -> Self {
        match result {
            Ok(id) => UploadOutcome::Created { id },
            Err(e) => UploadOutcome::Failed(e.into()),
        }
    }
}

/// 取回計算物件的結果：解碼成功的物件，或沒有計算物件時的原始卡片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FetchedCalculation<C> {
    Calculation(C),
    RawRecord(Value),
}
