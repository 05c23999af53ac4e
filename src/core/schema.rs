//! Recognized chemical-card fields and the rules that turn caller data into
//! a wire-ready [`NormalizedRecord`].

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::domain::model::{FieldValue, NormalizedRecord, WireValue};

/// Cross-reference key into the external materials database.
pub const IDENTIFIER_FIELD: &str = "mp_id";
/// Backend field that must carry the same value as [`IDENTIFIER_FIELD`].
pub const IDENTIFIER_ALIAS: &str = "matproject_id";
pub const SHARED_FIELD: &str = "shared";
/// Stand-in for absent reaction fields, which the backend rejects.
pub const REACTION_PLACEHOLDER: &str = "-";

const CARD_FIELDS: [&str; 21] = [
    "file",
    "total_energy_per_atom",
    "mp_id",
    "E_1D",
    "E_2D",
    "E_3D",
    "band_gap",
    "band_gap_mlhse",
    "band_gap_mlexp",
    "band_gap_exp",
    "e_above_hull",
    "reduction_limit",
    "oxidation_limit",
    "reduction_reaction",
    "oxidation_reaction",
    "reduction_limit_corrected",
    "oxidation_limit_corrected",
    "data",
    "siman_obj",
    "shared",
    "tag",
];

/// The fixed set of field names a chemical card accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    names: &'static [&'static str],
}

impl FieldSchema {
    pub fn chemical_card() -> Self {
        Self {
            names: &CARD_FIELDS,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| *n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn sorted_names(&self) -> Vec<&'static str> {
        let mut names = self.names.to_vec();
        names.sort_unstable();
        names
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::chemical_card()
    }
}

impl fmt::Display for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Valid keys:")?;
        for name in self.sorted_names() {
            write!(f, "\n - {}", name)?;
        }
        Ok(())
    }
}

/// Validates, defaults, formats and patches caller data against a [`FieldSchema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaNormalizer {
    schema: FieldSchema,
}

impl SchemaNormalizer {
    pub fn new(schema: FieldSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Picks exactly the schema fields out of `input`.
    ///
    /// Missing fields become [`FieldValue::Absent`], except the sharing flag
    /// which defaults to `false`. Unknown keys are dropped. An empty or absent
    /// input is logged and yields `None`.
    pub fn normalize(
        &self,
        input: Option<&Map<String, Value>>,
    ) -> Option<BTreeMap<String, FieldValue>> {
        let input = match input {
            Some(input) if !input.is_empty() => input,
            _ => {
                tracing::error!("❌ Empty input: no fields to normalize");
                return None;
            }
        };

        let selected = self
            .schema
            .names()
            .map(|name| {
                let value = match input.get(name) {
                    Some(value) => FieldValue::from(value.clone()),
                    None if name.contains(SHARED_FIELD) => FieldValue::Bool(false),
                    None => FieldValue::Absent,
                };
                (name.to_string(), value)
            })
            .collect();

        Some(selected)
    }

    /// Coerces one value into its wire form.
    pub fn format(value: FieldValue) -> WireValue {
        match value {
            FieldValue::Structured(map) => WireValue::Structured(map),
            FieldValue::Text(s) => WireValue::Text(s),
            FieldValue::Bool(b) => WireValue::Bool(b),
            FieldValue::Float(f) => WireValue::Text(float_text(f)),
            FieldValue::Absent | FieldValue::Other(_) => WireValue::Absent,
        }
    }

    /// Replaces absent `*reaction*` fields with [`REACTION_PLACEHOLDER`].
    pub fn patch_reaction_fields(mut record: NormalizedRecord) -> NormalizedRecord {
        for (name, value) in record.iter_mut() {
            if name.contains("reaction") && value.is_absent() {
                *value = WireValue::Text(REACTION_PLACEHOLDER.to_string());
            }
        }
        record
    }

    /// normalize → format → patch. `None` when the input is empty.
    pub fn prepare(&self, input: Option<&Map<String, Value>>) -> Option<NormalizedRecord> {
        self.normalize(input).map(|selected| self.finish(selected))
    }

    /// Like [`prepare`](Self::prepare), but an empty input yields the
    /// all-absent record instead of `None`.
    pub fn prepare_or_empty(&self, input: Option<&Map<String, Value>>) -> NormalizedRecord {
        match input {
            Some(input) if !input.is_empty() => self
                .prepare(Some(input))
                .unwrap_or_else(|| self.empty_record()),
            _ => self.empty_record(),
        }
    }

    /// Every schema field absent, reaction fields patched.
    pub fn empty_record(&self) -> NormalizedRecord {
        let selected = self
            .schema
            .names()
            .map(|name| (name.to_string(), FieldValue::Absent))
            .collect();
        self.finish(selected)
    }

    fn finish(&self, selected: BTreeMap<String, FieldValue>) -> NormalizedRecord {
        let fields = selected
            .into_iter()
            .map(|(name, value)| (name, Self::format(value)))
            .collect();
        Self::patch_reaction_fields(NormalizedRecord::from_fields(fields))
    }
}

/// Shortest round-trip text for a float, keeping a trailing `.0` on whole
/// numbers so the backend still sees a float literal. Magnitudes below 1e-4
/// or from 1e16 up use exponent form with a signed two-digit exponent
/// (`1e+16`, `1e-07`).
fn float_text(value: f64) -> String {
    let magnitude = value.abs();
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        exponent_text(value)
    } else if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn exponent_text(value: f64) -> String {
    let text = format!("{:e}", value);
    match text.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exp.abs())
            }
            Err(_) => text.clone(),
        },
        None => text.clone(),
    }
}
