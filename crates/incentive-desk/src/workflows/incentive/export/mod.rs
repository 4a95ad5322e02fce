//! Spreadsheet export of reviewed applications with embedded product photos.

pub mod images;
pub mod workbook;

use chrono::NaiveDate;
use tracing::info;

use crate::workflows::incentive::applications::domain::{
    Application, ApplicationStatus, AttachmentData,
};

pub use images::{AttachmentResolutionError, ImageKind, ImageResolver, ResolvedImage};
pub use workbook::{PAYOUT_SHEET, PHOTO_SHEET, PLACEHOLDER};

pub const SPREADSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Failure that aborts a whole export. Per-image problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unable to prepare worksheet '{sheet}': {reason}")]
    Sheet { sheet: &'static str, reason: String },
    #[error("unable to serialize workbook: {0}")]
    Write(String),
}

/// Finished workbook plus the metadata needed to serve it as a download.
#[derive(Debug, Clone)]
pub struct IncentiveReport {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub rows: usize,
    pub embedded_images: usize,
}

impl IncentiveReport {
    /// `Content-Disposition` value with an RFC 5987 encoded file name.
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename*=UTF-8''{}",
            urlencoding::encode(&self.file_name)
        )
    }
}

pub fn report_file_name(date: NaiveDate) -> String {
    format!("incentive_report_{}.xlsx", date.format("%Y-%m-%d"))
}

/// Builds the report for `applications`, keeping only approved rows when
/// `approved_only` is set. Row order follows the input.
pub async fn build_report(
    applications: &[Application],
    resolver: &ImageResolver,
    approved_only: bool,
    today: NaiveDate,
) -> Result<IncentiveReport, ReportError> {
    let rows: Vec<&Application> = applications
        .iter()
        .filter(|app| !approved_only || app.status == ApplicationStatus::Approved)
        .collect();

    let photos: Vec<Option<&AttachmentData>> =
        rows.iter().map(|app| app.first_product_photo()).collect();
    let images = resolver.resolve_all(&photos).await;

    let built = workbook::build_workbook(&rows, &images)?;
    let bytes = workbook::render(&built.book)?;

    info!(
        rows = rows.len(),
        embedded_images = built.embedded_images,
        approved_only,
        "incentive report generated"
    );

    Ok(IncentiveReport {
        file_name: report_file_name(today),
        content_type: SPREADSHEET_CONTENT_TYPE,
        bytes,
        rows: rows.len(),
        embedded_images: built.embedded_images,
    })
}
