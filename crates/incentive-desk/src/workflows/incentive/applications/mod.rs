//! Incentive application intake, review, and storage contracts.

pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantDetails, Application, ApplicationId, ApplicationStatus, ApplicationSubmission,
    Attachment, AttachmentCategory, AttachmentData, InvalidStatus, ReviewDecision,
    ValidationError,
};
pub use memory::{InMemoryApplicationRepository, InMemoryAttachmentStore};
pub use repository::{ApplicationRepository, AttachmentStore, RepositoryError, StorageError};
pub use router::application_router;
pub use service::{ApplicationServiceError, IncentiveApplicationService, SubmissionReceipt};
