pub mod client;
pub mod codec;
pub mod schema;
pub mod uploader;

pub use crate::domain::model::{
    FetchedCalculation, FieldValue, NormalizedRecord, UploadOutcome, UploadRequest,
    UploadStrategy, WireValue,
};
pub use crate::domain::ports::Transport;
pub use crate::utils::error::Result;
