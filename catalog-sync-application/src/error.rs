use catalog_sync_domain::error::DomainError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    /// 出站发布失败，需要让变更调用方感知
    #[error("transport: event={event_id}, reason={reason}")]
    Transport { event_id: String, reason: String },

    #[error("invalid envelope: envelope={envelope_id}, reason={reason}")]
    InvalidEnvelope { envelope_id: String, reason: String },
}

pub type SyncResult<T> = Result<T, SyncError>;

impl From<SyncError> for DomainError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Domain(inner) => inner,
            SyncError::Transport { reason, .. } => DomainError::event_bus(reason),
            SyncError::InvalidEnvelope {
                envelope_id,
                reason,
            } => DomainError::invalid_argument(format!("envelope {envelope_id}: {reason}")),
        }
    }
}
