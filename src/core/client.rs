use std::path::Path;

use serde_json::{Map, Value};

use crate::adapters::http::{OneShotTransport, SessionTransport};
use crate::config::toml_config::ClientConfig;
use crate::core::codec::{self, CalculationObject};
use crate::core::uploader::{RecordUploader, CARDS_ENDPOINT};
use crate::domain::model::{FetchedCalculation, UploadOutcome};
use crate::domain::ports::Transport;
use crate::utils::error::{MsdbError, Result};

const TOKEN_ENDPOINT: &str = "token/";
const DATABASE_ENDPOINT: &str = "chemicals_compounds/database/";
const COMPOUNDS_ENDPOINT: &str = "chemicals_compounds/chemicals_compounds/";

/// Client for the materials database service.
///
/// The transport is fixed at construction: [`ApiClient::new`] opens a new
/// connection per call, [`ApiClient::session`] holds one pooled connection
/// for the duration of a closure.
pub struct ApiClient<T: Transport> {
    base_url: String,
    token: Option<String>,
    username: Option<String>,
    password: Option<String>,
    transport: T,
}

impl ApiClient<OneShotTransport> {
    pub fn new(config: &ClientConfig) -> Self {
        Self::from_config(config, OneShotTransport::new())
    }
}

impl ApiClient<SessionTransport> {
    /// Runs `f` with a session-backed client. The session is closed when
    /// this returns or unwinds.
    pub fn session<R>(config: &ClientConfig, f: impl FnOnce(&mut Self) -> R) -> Result<R> {
        let mut client = Self::from_config(config, SessionTransport::open()?);
        Ok(f(&mut client))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn from_config(config: &ClientConfig, transport: T) -> Self {
        Self {
            base_url: config.server.base_url.clone(),
            token: config.server.token.clone(),
            username: config.server.username.clone(),
            password: config.server.password.clone(),
            transport,
        }
    }

    pub fn with_transport(base_url: &str, token: Option<String>, transport: T) -> Self {
        Self {
            base_url: base_url.to_string(),
            token,
            username: None,
            password: None,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// `{base_url}/{path}` with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Fetches an access token and replaces the held one on success.
    ///
    /// Supplied credentials are remembered; without them the stored ones are used.
    pub fn get_token(&mut self, username: Option<&str>, password: Option<&str>) -> Option<String> {
        if let (Some(username), Some(password)) = (username, password) {
            self.username = Some(username.to_string());
            self.password = Some(password.to_string());
        }

        match self.request_token() {
            Ok(token) => {
                tracing::info!("🔑 Access token obtained");
                tracing::debug!("Access Token: {}", token);
                self.token = Some(token.clone());
                Some(token)
            }
            Err(MsdbError::Status { status, body }) => {
                tracing::error!(
                    "❌ Failed to obtain token. Status code: {}, Response: {}",
                    status,
                    body
                );
                None
            }
            Err(e) => {
                tracing::error!("❌ Failed to obtain token: {}", e);
                None
            }
        }
    }

    fn request_token(&self) -> Result<String> {
        let fields = vec![
            (
                "username".to_string(),
                self.username.clone().unwrap_or_default(),
            ),
            (
                "password".to_string(),
                self.password.clone().unwrap_or_default(),
            ),
        ];

        let response = self
            .transport
            .post_form(&self.url(TOKEN_ENDPOINT), None, &fields)?;
        if response.status != 200 {
            return Err(MsdbError::Status {
                status: response.status,
                body: response.body,
            });
        }

        match response.json()?.get("access") {
            Some(Value::String(token)) => Ok(token.clone()),
            _ => Err(MsdbError::UnexpectedResponse {
                message: "token response has no 'access' field".to_string(),
            }),
        }
    }

    fn get_json(&self, endpoint: &str) -> Result<Value> {
        let response = self
            .transport
            .get(&self.url(endpoint), self.token.as_deref())?;
        if response.status != 200 {
            return Err(MsdbError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response.json()?)
    }

    fn get_resource(&self, endpoint: &str) -> Option<Value> {
        match self.get_json(endpoint) {
            Ok(value) => Some(value),
            Err(MsdbError::Status { status, body }) => {
                tracing::error!(
                    "❌ Failed to access resource at {}. Status code: {}, Response: {}",
                    endpoint,
                    status,
                    body
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    "❌ Failed to access resource at {} ({:?}): {}",
                    endpoint,
                    e.category(),
                    e
                );
                None
            }
        }
    }

    /// The chemical compounds database listing.
    pub fn get_database(&self) -> Option<Value> {
        self.get_resource(DATABASE_ENDPOINT)
    }

    pub fn get_compound_by_id(&self, id: &str) -> Option<Value> {
        self.get_resource(&format!("{}{}/", COMPOUNDS_ENDPOINT, id))
    }

    pub fn get_chemical_card(&self, id: &str) -> Option<Value> {
        self.get_resource(&format!("{}{}/", CARDS_ENDPOINT, id))
    }

    /// Downloads a compound's structure file to `dest`, overwriting it.
    /// Returns the number of bytes written.
    pub fn download_structure_file(&self, id: &str, dest: &Path) -> Option<u64> {
        let compound = self.get_compound_by_id(id)?;

        let result = match compound.get("cif_file").and_then(Value::as_str) {
            Some(url) => self.transport.download(url, dest),
            None => Err(MsdbError::UnexpectedResponse {
                message: format!("compound {} has no 'cif_file' URL", id),
            }),
        };

        match result {
            Ok(bytes) => {
                tracing::info!("📁 File downloaded successfully: {}", dest.display());
                Some(bytes)
            }
            Err(MsdbError::Status { status, .. }) => {
                tracing::error!("❌ Failed to download file. Status code: {}", status);
                None
            }
            Err(e) => {
                tracing::error!("❌ An error occurred while downloading: {}", e);
                None
            }
        }
    }

    fn uploader(&self) -> RecordUploader<'_, T> {
        RecordUploader::new(&self.transport, self.url(CARDS_ENDPOINT), self.token.as_deref())
    }

    /// Creates a chemical card, either as a metadata update (`mp_id`
    /// present) or as a structure-file upload.
    pub fn post_structure(
        &self,
        structure_file: Option<&Path>,
        main_info: Option<&Map<String, Value>>,
        extra_info: Option<&Value>,
    ) -> UploadOutcome {
        self.uploader()
            .post_structure(structure_file, main_info, extra_info)
    }

    /// Creates a chemical card with an attached calculation object.
    pub fn submit_calculation<C: CalculationObject>(
        &self,
        calc: Option<&C>,
        structure_file: Option<&Path>,
        extra_info: Option<&Value>,
        main_info: Option<&Map<String, Value>>,
    ) -> UploadOutcome {
        self.uploader()
            .submit_calculation(calc, structure_file, extra_info, main_info)
    }

    /// Reconstructs the calculation object stored on a card.
    ///
    /// Returns the raw card when it carries no calculation, and `None` on
    /// any transport or decode failure.
    pub fn fetch_calculation<C: CalculationObject>(
        &self,
        card_id: &str,
    ) -> Option<FetchedCalculation<C>> {
        if card_id.is_empty() {
            return None;
        }

        let endpoint = format!("{}{}/", CARDS_ENDPOINT, card_id);
        let card = match self.get_json(&endpoint) {
            Ok(card) => card,
            Err(MsdbError::Json(e)) => {
                tracing::error!("❌ Error decoding JSON response: {}", e);
                return None;
            }
            Err(e) => {
                tracing::error!("❌ Error retrieving chemical card: {}", e);
                return None;
            }
        };

        let encoded = card
            .get("provided")
            .and_then(|provided| provided.get("siman_calc"))
            .cloned()
            .unwrap_or(Value::Null);

        match encoded {
            Value::String(text) if !text.is_empty() => match codec::decode::<C>(&text) {
                Ok(calc) => Some(FetchedCalculation::Calculation(calc)),
                Err(e) => {
                    tracing::error!("❌ Error decoding calculation object: {}", e);
                    None
                }
            },
            Value::Null | Value::String(_) => {
                tracing::info!("No 'siman_calc' found for chemical card ID: {}", card_id);
                Some(FetchedCalculation::RawRecord(card))
            }
            other => {
                tracing::error!(
                    "❌ Error decoding calculation object: expected text, found {}",
                    other
                );
                None
            }
        }
    }
}
