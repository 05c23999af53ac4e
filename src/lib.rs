pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{OneShotTransport, SessionTransport};
pub use config::ClientConfig;
pub use crate::core::client::ApiClient;
pub use crate::core::codec::{CalculationObject, SimanCalculation};
pub use crate::core::schema::{FieldSchema, SchemaNormalizer};
pub use crate::core::uploader::RecordUploader;
pub use domain::model::{FetchedCalculation, UploadFailure, UploadOutcome};
pub use domain::ports::Transport;
pub use utils::error::{ErrorCategory, MsdbError, Result};
