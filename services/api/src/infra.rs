use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use incentive_desk::config::AppConfig;
use incentive_desk::error::AppError;
use incentive_desk::workflows::incentive::{
    ImageResolver, InMemoryApplicationRepository, InMemoryAttachmentStore,
    IncentiveApplicationService, StoreEntry,
};

pub(crate) type MemoryApplicationService =
    IncentiveApplicationService<InMemoryApplicationRepository, InMemoryAttachmentStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stores offered for autocompletion before any agent has submitted them.
pub(crate) fn default_store_seeds() -> Vec<StoreEntry> {
    [
        ("Emart Seongsu", "46 Ttukseom-ro, Seongdong-gu, Seoul"),
        ("Homeplus Gangseo", "11 Gonghang-daero, Gangseo-gu, Seoul"),
        ("Lotte Mart Busan", "25 Jungang-daero, Dong-gu, Busan"),
    ]
    .into_iter()
    .map(|(name, address)| StoreEntry {
        name: name.to_string(),
        address: address.to_string(),
    })
    .collect()
}

/// Wires the in-memory backend, image resolver, and store seeds from configuration.
pub(crate) fn build_application_service(
    config: &AppConfig,
) -> Result<MemoryApplicationService, AppError> {
    let repository = Arc::new(InMemoryApplicationRepository::with_incentive_amount(
        config.program.incentive_amount,
    ));
    let attachments = Arc::new(InMemoryAttachmentStore::default());
    let resolver = ImageResolver::new(config.report.image_fetch_timeout)?;

    Ok(
        IncentiveApplicationService::new(repository, attachments, resolver)
            .with_store_seeds(default_store_seeds()),
    )
}
