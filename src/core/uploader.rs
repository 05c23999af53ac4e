use std::path::Path;

use serde_json::{Map, Value};

use crate::core::codec::{self, CalculationObject};
use crate::core::schema::{SchemaNormalizer, IDENTIFIER_FIELD};
use crate::domain::model::{
    HttpResponse, NormalizedRecord, UploadOutcome, UploadRequest, UploadStrategy, WireValue,
};
use crate::domain::ports::Transport;
use crate::utils::error::{MsdbError, Result};

pub const CARDS_ENDPOINT: &str = "chemicals_compounds/chemical_cards/";

/// Builds chemical-card submissions, picks the upload path and interprets
/// the server's answer.
pub struct RecordUploader<'a, T: Transport> {
    transport: &'a T,
    endpoint: String,
    token: Option<&'a str>,
    normalizer: SchemaNormalizer,
}

impl<'a, T: Transport> RecordUploader<'a, T> {
    pub fn new(transport: &'a T, endpoint: String, token: Option<&'a str>) -> Self {
        Self {
            transport,
            endpoint,
            token,
            normalizer: SchemaNormalizer::default(),
        }
    }

    /// Chooses the upload path for a card. No I/O happens here.
    ///
    /// A present `mp_id` wins over a file; with neither the request is refused.
    pub fn plan(
        &self,
        structure_file: Option<&Path>,
        main_info: Option<&Map<String, Value>>,
        extra_info: Option<&Value>,
    ) -> Result<UploadRequest> {
        let record = self.normalizer.prepare(main_info).ok_or_else(|| {
            MsdbError::missing("no info to post (main_info must contain at least one field)")
        })?;

        if has_identifier(&record) {
            // mp_id present: fields only, any file is ignored
            return Ok(UploadRequest {
                strategy: UploadStrategy::MetadataOnly,
                record,
                file: None,
                extra_info: None,
                siman_calc: None,
            });
        }

        match structure_file {
            Some(file) => Ok(UploadRequest {
                strategy: UploadStrategy::FileUpload,
                record,
                file: Some(file.to_path_buf()),
                extra_info: extra_text(extra_info)?,
                siman_calc: None,
            }),
            None => Err(MsdbError::missing("no valid mp_id or structure file supplied")),
        }
    }

    /// Builds a calculation submission. A structure file is always required.
    pub fn plan_calculation<C: CalculationObject>(
        &self,
        calc: Option<&C>,
        structure_file: Option<&Path>,
        extra_info: Option<&Value>,
        main_info: Option<&Map<String, Value>>,
    ) -> Result<UploadRequest> {
        let file = structure_file.ok_or_else(|| MsdbError::missing("no structure file provided"))?;

        Ok(UploadRequest {
            strategy: UploadStrategy::Calculation,
            record: self.normalizer.prepare_or_empty(main_info),
            file: Some(file.to_path_buf()),
            extra_info: extra_text(extra_info)?,
            siman_calc: codec::encode_optional(calc)?,
        })
    }

    /// Sends a planned request and returns the id the server assigned.
    pub fn submit(&self, request: &UploadRequest) -> Result<String> {
        let fields = request.form_fields();
        tracing::debug!(
            "📤 Submitting {:?} card with {} form fields to {}",
            request.strategy,
            fields.len(),
            self.endpoint
        );

        let response = match &request.file {
            Some(file) => {
                tracing::info!("📎 Attaching structure file: {}", file.display());
                self.transport
                    .post_multipart(&self.endpoint, self.token, &fields, file)?
            }
            None => self.transport.post_form(&self.endpoint, self.token, &fields)?,
        };

        created_id(&response)
    }

    pub fn post_structure(
        &self,
        structure_file: Option<&Path>,
        main_info: Option<&Map<String, Value>>,
        extra_info: Option<&Value>,
    ) -> UploadOutcome {
        let result = self
            .plan(structure_file, main_info, extra_info)
            .and_then(|request| self.submit(&request));
        report(result)
    }

    pub fn submit_calculation<C: CalculationObject>(
        &self,
        calc: Option<&C>,
        structure_file: Option<&Path>,
        extra_info: Option<&Value>,
        main_info: Option<&Map<String, Value>>,
    ) -> UploadOutcome {
        let result = self
            .plan_calculation(calc, structure_file, extra_info, main_info)
            .and_then(|request| {
                tracing::info!("Data being sent to DB");
                self.submit(&request)
            });
        report(result)
    }
}

fn has_identifier(record: &NormalizedRecord) -> bool {
    record
        .get(IDENTIFIER_FIELD)
        .and_then(WireValue::as_str)
        .is_some_and(|id| !id.is_empty())
}

/// Extra info as JSON text; falsy values (`false`, zero, empty) count as absent.
fn extra_text(extra_info: Option<&Value>) -> Result<Option<String>> {
    match extra_info {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => Ok(Some(serde_json::to_string(value)?)),
    }
}

/// 201 is the only success status for card creation.
fn created_id(response: &HttpResponse) -> Result<String> {
    if response.status != 201 {
        return Err(MsdbError::Status {
            status: response.status,
            body: response.body.clone(),
        });
    }

    let body = response.json()?;
    match body.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(MsdbError::UnexpectedResponse {
            message: format!("card created but response has no 'id': {}", response.body),
        }),
    }
}

fn report(result: Result<String>) -> UploadOutcome {
    match &result {
        Ok(id) => tracing::info!("✅ Chemical card created successfully with ID {}", id),
        Err(MsdbError::Status { status, body }) => tracing::error!(
            "❌ Failed to create chemical card. Status code: {}, Response: {}",
            status,
            body
        ),
        Err(e) => tracing::error!(
            "❌ Failed to create chemical card ({:?}): {}",
            e.category(),
            e
        ),
    }
    UploadOutcome::from(result)
}
