//! Incentive program workflow: intake, review, aggregation, and reporting.

pub mod applications;
pub mod export;
pub mod report;

pub use applications::{
    application_router, ApplicationRepository, ApplicationServiceError, AttachmentStore,
    IncentiveApplicationService, InMemoryApplicationRepository, InMemoryAttachmentStore,
};
pub use export::{ImageResolver, IncentiveReport, ReportError};
pub use report::{AgencySummary, Stats, StoreEntry};
