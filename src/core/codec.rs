//! Text codec for calculation objects attached to chemical cards.
//!
//! Only types implementing [`CalculationObject`] can be stored. The encoded
//! form is a JSON envelope:
//!
//! ```json
//! {"kind": "siman_calculation", "version": 1, "data": { ... }}
//! ```
//!
//! Decoding checks `kind` and `version` before deserializing `data`, so a
//! value always comes back as the type it was stored as.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{MsdbError, Result};

pub const CODEC_VERSION: u32 = 1;

/// A calculation type that can be attached to a card.
pub trait CalculationObject: Serialize + DeserializeOwned {
    /// Stable tag written into the envelope.
    const KIND: &'static str;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    kind: String,
    version: u32,
    data: Value,
}

pub fn encode<C: CalculationObject>(calc: &C) -> Result<String> {
    let envelope = Envelope {
        kind: C::KIND.to_string(),
        version: CODEC_VERSION,
        data: serde_json::to_value(calc)?,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// `None` when there is no calculation, rather than an empty encoding.
pub fn encode_optional<C: CalculationObject>(calc: Option<&C>) -> Result<Option<String>> {
    calc.map(encode::<C>).transpose()
}

pub fn decode<C: CalculationObject>(text: &str) -> Result<C> {
    let envelope: Envelope = serde_json::from_str(text).map_err(|e| MsdbError::CalcDecode {
        message: format!("not a calculation envelope: {}", e),
    })?;

    if envelope.kind != C::KIND {
        return Err(MsdbError::CalcDecode {
            message: format!(
                "stored kind '{}' does not match requested kind '{}'",
                envelope.kind,
                C::KIND
            ),
        });
    }
    if envelope.version != CODEC_VERSION {
        return Err(MsdbError::CalcDecode {
            message: format!("unsupported codec version {}", envelope.version),
        });
    }

    serde_json::from_value(envelope.data).map_err(|e| MsdbError::CalcDecode {
        message: format!("invalid '{}' payload: {}", C::KIND, e),
    })
}

/// Result of a single-point or relaxation run, as attached to a card.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimanCalculation {
    pub name: String,
    /// Name of the parameter set the run used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_sigma0: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e0: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natom: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl CalculationObject for SimanCalculation {
    const KIND: &'static str = "siman_calculation";
}
