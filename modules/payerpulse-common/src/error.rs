use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayerPulseError {
    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Malformed record: missing or invalid field `{field}`")]
    MalformedRecord { field: String },

    #[error("Unreadable raw record at {position}: {reason}")]
    UnreadableRecord { position: String, reason: String },

    #[error("Raw store error: {0}")]
    RawStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PayerPulseError {
    /// Record-level errors cause the offending record to be skipped;
    /// everything else aborts the batch.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            PayerPulseError::Normalization(_)
                | PayerPulseError::MalformedRecord { .. }
                | PayerPulseError::UnreadableRecord { .. }
        )
    }
}
