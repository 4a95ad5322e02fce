use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    ApplicantDetails, Application, ApplicationId, Attachment, AttachmentCategory, ReviewDecision,
};
use super::repository::{ApplicationRepository, AttachmentStore, RepositoryError, StorageError};
use crate::config::DEFAULT_INCENTIVE_AMOUNT;
use crate::workflows::incentive::report::{
    compute_agency_summaries, compute_stats, AgencySummary, Stats,
};

/// Process-local repository used when no hosted database is configured.
///
/// Records are kept in insertion order; aggregate queries walk that order, so
/// the last approved submission of an agency supplies its bank details.
#[derive(Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<Vec<Application>>>,
    incentive_amount: u64,
}

impl Default for InMemoryApplicationRepository {
    fn default() -> Self {
        Self::with_incentive_amount(DEFAULT_INCENTIVE_AMOUNT)
    }
}

impl InMemoryApplicationRepository {
    pub fn with_incentive_amount(incentive_amount: u64) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            incentive_amount,
        }
    }

    /// Stores a fully formed record as-is, e.g. when seeding fixtures.
    pub fn insert(&self, record: Application) -> Result<(), RepositoryError> {
        self.lock()?.push(record);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Application>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn create(&self, details: ApplicantDetails) -> Result<Application, RepositoryError> {
        let record = Application::new(
            ApplicationId::generate(),
            details,
            Utc::now(),
            self.incentive_amount,
        );
        self.lock()?.push(record.clone());
        Ok(record)
    }

    fn save_attachments(
        &self,
        id: &ApplicationId,
        category: AttachmentCategory,
        attachments: Vec<Attachment>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let record = guard
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        record.attachments_mut(category).extend(attachments);
        Ok(())
    }

    fn get_by_id(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn list_all(
        &self,
        include_attachment_data: bool,
    ) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.lock()?;
        // Reverse first so equal timestamps still list the latest insert first.
        let mut records: Vec<Application> = guard
            .iter()
            .rev()
            .map(|record| {
                if include_attachment_data {
                    record.clone()
                } else {
                    record.without_attachment_data()
                }
            })
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn update_status(
        &self,
        id: &ApplicationId,
        decision: ReviewDecision,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut guard = self.lock()?;
        Ok(guard.iter_mut().find(|record| &record.id == id).map(|record| {
            record.status = decision.status();
            record.clone()
        }))
    }

    fn delete(&self, id: &ApplicationId) -> Result<bool, RepositoryError> {
        let mut guard = self.lock()?;
        match guard.iter().position(|record| &record.id == id) {
            Some(index) => {
                guard.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn stats(&self) -> Result<Stats, RepositoryError> {
        let guard = self.lock()?;
        Ok(compute_stats(&guard))
    }

    fn agency_summaries(&self) -> Result<Vec<AgencySummary>, RepositoryError> {
        let guard = self.lock()?;
        Ok(compute_agency_summaries(&guard))
    }
}

type Buckets = BTreeMap<&'static str, BTreeMap<String, Vec<u8>>>;

/// Bucketed byte store standing in for hosted object storage.
///
/// Nothing in the intake path uploads here: the in-memory service keeps
/// attachment payloads on the record itself. Fixtures and upload adapters
/// populate it through `put`, and `release` clears whatever they stored.
#[derive(Default, Clone)]
pub struct InMemoryAttachmentStore {
    buckets: Arc<Mutex<Buckets>>,
}

impl InMemoryAttachmentStore {
    /// Stores bytes under `<application id>/<file name>` in the category's
    /// bucket and returns the object's URL, `memory://<bucket>/<id>/<name>`.
    pub fn put(
        &self,
        id: &ApplicationId,
        category: AttachmentCategory,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let bucket = category.bucket();
        let path = format!("{}/{}", id, file_name);
        let url = format!("memory://{}/{}", bucket, path);
        self.lock()?.entry(bucket).or_default().insert(path, bytes);
        Ok(url)
    }

    /// Number of objects currently owned by the application.
    pub fn object_count(&self, id: &ApplicationId) -> Result<usize, StorageError> {
        let prefix = format!("{}/", id);
        let guard = self.lock()?;
        Ok(guard
            .values()
            .flat_map(|objects| objects.keys())
            .filter(|path| path.starts_with(&prefix))
            .count())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Buckets>, StorageError> {
        self.buckets
            .lock()
            .map_err(|_| StorageError::Unavailable("attachment store mutex poisoned".to_string()))
    }
}

impl AttachmentStore for InMemoryAttachmentStore {
    fn release(&self, id: &ApplicationId) -> Result<usize, StorageError> {
        let prefix = format!("{}/", id);
        let mut guard = self.lock()?;
        let mut removed = 0;
        for category in AttachmentCategory::ordered() {
            if let Some(objects) = guard.get_mut(category.bucket()) {
                let before = objects.len();
                objects.retain(|path, _| !path.starts_with(&prefix));
                removed += before - objects.len();
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::incentive::applications::domain::{ApplicationStatus, AttachmentData};
    use chrono::Duration;

    fn details(agency: &str) -> ApplicantDetails {
        ApplicantDetails {
            agency_name: agency.to_string(),
            manager_name: "Kim".to_string(),
            employee_name: "Lee".to_string(),
            store_name: "Happy Mart".to_string(),
            store_address: "1 Main St".to_string(),
            bank_name: "Hana".to_string(),
            account_number: "123-456".to_string(),
        }
    }

    #[test]
    fn create_assigns_pending_status_and_rate() {
        let repository = InMemoryApplicationRepository::with_incentive_amount(9000);
        let record = repository.create(details("North")).expect("create succeeds");
        assert_eq!(record.status, ApplicationStatus::Pending);
        assert_eq!(record.incentive_amount, 9000);
        assert!(!record.id.as_str().is_empty());
    }

    #[test]
    fn list_all_orders_newest_first_and_strips_data() {
        let repository = InMemoryApplicationRepository::default();
        let now = Utc::now();
        let mut older = Application::new(
            ApplicationId("older".to_string()),
            details("North"),
            now - Duration::minutes(5),
            7000,
        );
        older.product_photos.push(Attachment {
            name: "shelf.png".to_string(),
            content_type: "image/png".to_string(),
            data: Some(AttachmentData::Inline("iVBORw0KGgo=".to_string())),
        });
        let newer = Application::new(
            ApplicationId("newer".to_string()),
            details("South"),
            now,
            7000,
        );
        repository.insert(older).expect("insert");
        repository.insert(newer).expect("insert");

        let listed = repository.list_all(false).expect("list");
        let ids: Vec<&str> = listed.iter().map(|app| app.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert_eq!(listed[1].product_photos[0].name, "shelf.png");
        assert!(listed[1].product_photos[0].data.is_none());

        let full = repository.list_all(true).expect("list");
        assert!(full[1].product_photos[0].data.is_some());
    }

    #[test]
    fn update_status_reports_missing_records() {
        let repository = InMemoryApplicationRepository::default();
        let outcome = repository
            .update_status(&ApplicationId("missing".to_string()), ReviewDecision::Approved)
            .expect("update runs");
        assert!(outcome.is_none());
    }

    #[test]
    fn release_only_touches_the_owning_application() {
        let store = InMemoryAttachmentStore::default();
        let first = ApplicationId("first".to_string());
        let second = ApplicationId("second".to_string());
        let url = store
            .put(&first, AttachmentCategory::ProductPhotos, "a.jpg", vec![1])
            .expect("put");
        assert_eq!(url, "memory://product-photos/first/a.jpg");
        store
            .put(&first, AttachmentCategory::TransactionDocs, "b.pdf", vec![2])
            .expect("put");
        store
            .put(&second, AttachmentCategory::ProductPhotos, "c.jpg", vec![3])
            .expect("put");

        assert_eq!(store.release(&first).expect("release"), 2);
        assert_eq!(store.object_count(&first).expect("count"), 0);
        assert_eq!(store.object_count(&second).expect("count"), 1);
    }
}
