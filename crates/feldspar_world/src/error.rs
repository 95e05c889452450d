use thiserror::Error;

/// Errors surfaced by the world store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WorldError {
    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse named-tag data: {0}")]
    Nbt(#[from] valence_nbt::binary::Error),
    #[error("tag file is not valid gzip data")]
    BadCompression,
    #[error("tag data is missing or mis-typing required fields")]
    MalformedTag,
    #[error("populator stage '{stage}' failed: {source}")]
    Populator {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl WorldError {
    /// Whether the on-disk data itself is unusable, as opposed to the disk
    /// failing. Unusable chunk files are regenerated and overwritten by the
    /// next save.
    pub(crate) fn is_corrupt(&self) -> bool {
        matches!(
            self,
            WorldError::Nbt(_) | WorldError::BadCompression | WorldError::MalformedTag
        )
    }
}
