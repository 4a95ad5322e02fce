use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::Value;

use crate::workflows::incentive::applications::domain::{
    ApplicantDetails, Application, ApplicationId, ApplicationSubmission, Attachment,
    AttachmentCategory, AttachmentData, ReviewDecision,
};
use crate::workflows::incentive::applications::repository::{
    ApplicationRepository, AttachmentStore, RepositoryError, StorageError,
};
use crate::workflows::incentive::applications::{
    application_router, IncentiveApplicationService, InMemoryApplicationRepository,
    InMemoryAttachmentStore,
};
use crate::workflows::incentive::export::ImageResolver;
use crate::workflows::incentive::report::StoreEntry;

pub(super) type MemoryService =
    IncentiveApplicationService<InMemoryApplicationRepository, InMemoryAttachmentStore>;

pub(super) fn details(agency: &str) -> ApplicantDetails {
    ApplicantDetails {
        agency_name: agency.to_string(),
        manager_name: "Kim Manager".to_string(),
        employee_name: "Lee Employee".to_string(),
        store_name: "Happy Mart".to_string(),
        store_address: "12 Market Rd".to_string(),
        bank_name: "Hana Bank".to_string(),
        account_number: "110-222-333".to_string(),
    }
}

pub(super) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("png encodes");
    buffer.into_inner()
}

pub(super) fn png_data_url(width: u32, height: u32) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(png_bytes(width, height));
    format!("data:image/png;base64,{payload}")
}

pub(super) fn attachment(name: &str, content_type: &str, data: Option<&str>) -> Attachment {
    Attachment {
        name: name.to_string(),
        content_type: content_type.to_string(),
        data: data.map(|raw| AttachmentData::from(raw.to_string())),
    }
}

/// Photo and signboard carry data; the transaction document was never uploaded.
pub(super) fn submission(agency: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        details: details(agency),
        product_photos: vec![attachment(
            "shelf.png",
            "image/png",
            Some(png_data_url(32, 16).as_str()),
        )],
        store_signboard: vec![attachment(
            "sign.jpg",
            "image/jpeg",
            Some("https://cdn.example.com/sign.jpg"),
        )],
        transaction_docs: vec![attachment("receipt.pdf", "application/pdf", None)],
    }
}

pub(super) fn resolver() -> ImageResolver {
    ImageResolver::new(Duration::from_secs(2)).expect("http client builds")
}

pub(super) fn seeds() -> Vec<StoreEntry> {
    vec![StoreEntry {
        name: "Corner Shop".to_string(),
        address: "7 Side St".to_string(),
    }]
}

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryApplicationRepository>,
    Arc<InMemoryAttachmentStore>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let store = Arc::new(InMemoryAttachmentStore::default());
    let service = IncentiveApplicationService::new(repository.clone(), store.clone(), resolver())
        .with_store_seeds(seeds());
    (service, repository, store)
}

pub(super) fn application_router_with_service<R, S>(
    service: IncentiveApplicationService<R, S>,
) -> axum::Router
where
    R: ApplicationRepository + 'static,
    S: AttachmentStore + 'static,
{
    application_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// In-memory repository whose signboard saves always fail.
#[derive(Default)]
pub(super) struct FlakySignboardRepository {
    inner: InMemoryApplicationRepository,
}

impl ApplicationRepository for FlakySignboardRepository {
    fn create(&self, details: ApplicantDetails) -> Result<Application, RepositoryError> {
        self.inner.create(details)
    }

    fn save_attachments(
        &self,
        id: &ApplicationId,
        category: AttachmentCategory,
        attachments: Vec<Attachment>,
    ) -> Result<(), RepositoryError> {
        if category == AttachmentCategory::StoreSignboard {
            return Err(RepositoryError::Unavailable(
                "signboard table offline".to_string(),
            ));
        }
        self.inner.save_attachments(id, category, attachments)
    }

    fn get_by_id(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.get_by_id(id)
    }

    fn list_all(
        &self,
        include_attachment_data: bool,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_all(include_attachment_data)
    }

    fn update_status(
        &self,
        id: &ApplicationId,
        decision: ReviewDecision,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner.update_status(id, decision)
    }

    fn delete(&self, id: &ApplicationId) -> Result<bool, RepositoryError> {
        self.inner.delete(id)
    }
}

/// In-memory repository that counts status writes.
#[derive(Default)]
pub(super) struct CountingRepository {
    inner: InMemoryApplicationRepository,
    status_writes: AtomicUsize,
}

impl CountingRepository {
    pub(super) fn status_writes(&self) -> usize {
        self.status_writes.load(Ordering::SeqCst)
    }
}

impl ApplicationRepository for CountingRepository {
    fn create(&self, details: ApplicantDetails) -> Result<Application, RepositoryError> {
        self.inner.create(details)
    }

    fn save_attachments(
        &self,
        id: &ApplicationId,
        category: AttachmentCategory,
        attachments: Vec<Attachment>,
    ) -> Result<(), RepositoryError> {
        self.inner.save_attachments(id, category, attachments)
    }

    fn get_by_id(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.get_by_id(id)
    }

    fn list_all(
        &self,
        include_attachment_data: bool,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_all(include_attachment_data)
    }

    fn update_status(
        &self,
        id: &ApplicationId,
        decision: ReviewDecision,
    ) -> Result<Option<Application>, RepositoryError> {
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_status(id, decision)
    }

    fn delete(&self, id: &ApplicationId) -> Result<bool, RepositoryError> {
        self.inner.delete(id)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn create(&self, _details: ApplicantDetails) -> Result<Application, RepositoryError> {
        Err(offline())
    }

    fn save_attachments(
        &self,
        _id: &ApplicationId,
        _category: AttachmentCategory,
        _attachments: Vec<Attachment>,
    ) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn get_by_id(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(offline())
    }

    fn list_all(
        &self,
        _include_attachment_data: bool,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(offline())
    }

    fn update_status(
        &self,
        _id: &ApplicationId,
        _decision: ReviewDecision,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(offline())
    }

    fn delete(&self, _id: &ApplicationId) -> Result<bool, RepositoryError> {
        Err(offline())
    }
}

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("connection refused".to_string())
}

pub(super) struct FailingStore;

impl AttachmentStore for FailingStore {
    fn release(&self, _id: &ApplicationId) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable("bucket offline".to_string()))
    }
}

/// Serves `/shelf.png` (64x32 PNG) and answers 404 for anything else.
pub(super) async fn spawn_image_server() -> SocketAddr {
    async fn shelf() -> Response {
        ([(header::CONTENT_TYPE, "image/png")], png_bytes(64, 32)).into_response()
    }

    let app = axum::Router::new()
        .route("/shelf.png", get(shelf))
        .fallback(|| async { StatusCode::NOT_FOUND });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind image server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("image server runs");
    });
    addr
}
