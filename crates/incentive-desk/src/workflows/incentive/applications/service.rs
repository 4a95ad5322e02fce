use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    Application, ApplicationId, ApplicationSubmission, Attachment, AttachmentCategory,
    InvalidStatus, ReviewDecision, ValidationError,
};
use super::repository::{ApplicationRepository, AttachmentStore, RepositoryError};
use crate::workflows::incentive::export::{
    build_report, ImageResolver, IncentiveReport, ReportError,
};
use crate::workflows::incentive::report::{store_directory, AgencySummary, Stats, StoreEntry};

/// Service composing the repository, attachment storage, and report export.
pub struct IncentiveApplicationService<R, S> {
    repository: Arc<R>,
    attachments: Arc<S>,
    resolver: ImageResolver,
    store_seeds: Vec<StoreEntry>,
}

/// Outcome of an accepted submission. Attachment groups that failed to save are
/// listed in `warnings`; the record itself exists either way.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub application: Application,
    pub warnings: Vec<String>,
}

impl<R, S> IncentiveApplicationService<R, S>
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    pub fn new(repository: Arc<R>, attachments: Arc<S>, resolver: ImageResolver) -> Self {
        Self {
            repository,
            attachments,
            resolver,
            store_seeds: Vec::new(),
        }
    }

    /// Stores always offered by the directory, even before anyone submits them.
    pub fn with_store_seeds(mut self, seeds: Vec<StoreEntry>) -> Self {
        self.store_seeds = seeds;
        self
    }

    /// Validate and persist a submission, then attach each non-empty group.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<SubmissionReceipt, ApplicationServiceError> {
        if let Err(err) = submission.details.validate() {
            let ValidationError::MissingField(field) = &err;
            info!(field, "submission rejected");
            return Err(err.into());
        }

        let ApplicationSubmission {
            details,
            product_photos,
            store_signboard,
            transaction_docs,
        } = submission;

        let mut application = self.repository.create(details)?;
        let mut warnings = Vec::new();

        let groups = [
            (AttachmentCategory::ProductPhotos, product_photos),
            (AttachmentCategory::StoreSignboard, store_signboard),
            (AttachmentCategory::TransactionDocs, transaction_docs),
        ];
        for (category, attachments) in groups {
            let attachments: Vec<Attachment> = attachments
                .into_iter()
                .filter(|attachment| {
                    attachment
                        .data
                        .as_ref()
                        .is_some_and(|data| !data.is_empty())
                })
                .collect();
            if attachments.is_empty() {
                continue;
            }

            match self
                .repository
                .save_attachments(&application.id, category, attachments.clone())
            {
                Ok(()) => application.attachments_mut(category).extend(attachments),
                Err(err) => {
                    warn!(
                        application_id = %application.id,
                        category = category.label(),
                        error = %err,
                        "attachments could not be saved"
                    );
                    warnings.push(format!("{} could not be saved", category.label()));
                }
            }
        }

        info!(
            application_id = %application.id,
            agency = %application.agency_name,
            "incentive application submitted"
        );

        Ok(SubmissionReceipt {
            application,
            warnings,
        })
    }

    /// Every application, newest first, with attachments reduced to name and type.
    pub fn list(&self) -> Result<Vec<Application>, ApplicationServiceError> {
        Ok(self.repository.list_all(false)?)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, ApplicationServiceError> {
        self.repository
            .get_by_id(id)?
            .ok_or(ApplicationServiceError::NotFound)
    }

    /// Apply an administrator decision. Only `approved` and `rejected` are accepted.
    /// Repeating the current decision returns the record without writing.
    pub fn transition(
        &self,
        id: &ApplicationId,
        raw_status: &str,
    ) -> Result<Application, ApplicationServiceError> {
        let decision = ReviewDecision::parse(raw_status)?;
        let current = self.get(id)?;
        if current.status == decision.status() {
            debug!(
                application_id = %id,
                status = current.status.label(),
                "review decision already applied"
            );
            return Ok(current);
        }

        let updated = self
            .repository
            .update_status(id, decision)?
            .ok_or(ApplicationServiceError::NotFound)?;

        info!(
            application_id = %id,
            status = updated.status.label(),
            "application reviewed"
        );
        Ok(updated)
    }

    /// Remove an application. Stored attachment bytes are released first, best effort.
    pub fn delete(&self, id: &ApplicationId) -> Result<(), ApplicationServiceError> {
        if self.repository.get_by_id(id)?.is_none() {
            return Err(ApplicationServiceError::NotFound);
        }

        match self.attachments.release(id) {
            Ok(released) => info!(application_id = %id, released, "attachment objects released"),
            Err(err) => warn!(
                application_id = %id,
                error = %err,
                "attachment objects could not be released"
            ),
        }

        if !self.repository.delete(id)? {
            return Err(ApplicationServiceError::NotFound);
        }

        info!(application_id = %id, "application deleted");
        Ok(())
    }

    pub fn stats(&self) -> Result<Stats, ApplicationServiceError> {
        Ok(self.repository.stats()?)
    }

    pub fn agency_summaries(&self) -> Result<Vec<AgencySummary>, ApplicationServiceError> {
        Ok(self.repository.agency_summaries()?)
    }

    /// Known stores for form autocompletion, sorted by name. The latest
    /// submission for a store name supplies its address.
    pub fn stores(&self) -> Result<Vec<StoreEntry>, ApplicationServiceError> {
        let mut snapshot = self.repository.list_all(false)?;
        snapshot.reverse();
        Ok(store_directory(&snapshot, &self.store_seeds))
    }

    /// Render the review workbook from a fresh snapshot.
    pub async fn export_report(
        &self,
        approved_only: bool,
    ) -> Result<IncentiveReport, ApplicationServiceError> {
        let snapshot = self.repository.list_all(true)?;
        let today = Utc::now().date_naive();
        let report = build_report(&snapshot, &self.resolver, approved_only, today).await?;
        Ok(report)
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatus),
    #[error("application not found")]
    NotFound,
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<RepositoryError> for ApplicationServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
