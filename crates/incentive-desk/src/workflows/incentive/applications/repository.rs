use super::domain::{
    ApplicantDetails, Application, ApplicationId, Attachment, AttachmentCategory, ReviewDecision,
};
use crate::workflows::incentive::report::{
    compute_agency_summaries, compute_stats, AgencySummary, Stats,
};

/// Storage abstraction over submission records so the service can be exercised in isolation.
///
/// Implementations map their own row shapes onto [`Application`]; nothing past this
/// boundary sees backend naming.
pub trait ApplicationRepository: Send + Sync {
    /// Inserts a `pending` record with a generated id, server timestamp and the
    /// configured incentive amount. Attachment groups start empty.
    fn create(&self, details: ApplicantDetails) -> Result<Application, RepositoryError>;

    /// Appends attachment references to an existing record.
    fn save_attachments(
        &self,
        id: &ApplicationId,
        category: AttachmentCategory,
        attachments: Vec<Attachment>,
    ) -> Result<(), RepositoryError>;

    fn get_by_id(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;

    /// Every record, newest first. Without attachment data only name/type survive.
    fn list_all(&self, include_attachment_data: bool)
        -> Result<Vec<Application>, RepositoryError>;

    fn update_status(
        &self,
        id: &ApplicationId,
        decision: ReviewDecision,
    ) -> Result<Option<Application>, RepositoryError>;

    /// Returns `false` when no record carried the id.
    fn delete(&self, id: &ApplicationId) -> Result<bool, RepositoryError>;

    fn stats(&self) -> Result<Stats, RepositoryError> {
        let snapshot = self.list_all(false)?;
        Ok(compute_stats(&snapshot))
    }

    fn agency_summaries(&self) -> Result<Vec<AgencySummary>, RepositoryError> {
        let snapshot = self.list_all(false)?;
        Ok(compute_agency_summaries(&snapshot))
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Object storage holding uploaded attachment bytes.
pub trait AttachmentStore: Send + Sync {
    /// Removes every object owned by the application across all buckets and
    /// returns how many were removed.
    fn release(&self, id: &ApplicationId) -> Result<usize, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("attachment storage unavailable: {0}")]
    Unavailable(String),
}
