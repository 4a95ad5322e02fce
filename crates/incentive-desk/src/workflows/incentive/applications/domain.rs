use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// Target of an administrator review. `pending` is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn parse(raw: &str) -> Result<Self, InvalidStatus> {
        match raw {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(InvalidStatus(other.to_string())),
        }
    }

    pub const fn status(self) -> ApplicationStatus {
        match self {
            ReviewDecision::Approved => ApplicationStatus::Approved,
            ReviewDecision::Rejected => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid review status (expected approved or rejected)")]
pub struct InvalidStatus(pub String);

/// Attachment groups collected by the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentCategory {
    ProductPhotos,
    StoreSignboard,
    TransactionDocs,
}

impl AttachmentCategory {
    pub const fn ordered() -> [Self; 3] {
        [
            AttachmentCategory::ProductPhotos,
            AttachmentCategory::StoreSignboard,
            AttachmentCategory::TransactionDocs,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            AttachmentCategory::ProductPhotos => "product_photos",
            AttachmentCategory::StoreSignboard => "store_signboard",
            AttachmentCategory::TransactionDocs => "transaction_docs",
        }
    }

    /// Object-store bucket holding uploaded bytes for the category.
    pub const fn bucket(self) -> &'static str {
        match self {
            AttachmentCategory::ProductPhotos => "product-photos",
            AttachmentCategory::StoreSignboard => "store-signboards",
            AttachmentCategory::TransactionDocs => "transaction-docs",
        }
    }
}

/// Where an attachment's bytes live. Serialized as a bare string: anything
/// starting with `http` is fetched, everything else is an encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttachmentData {
    Inline(String),
    Remote(String),
}

impl AttachmentData {
    pub fn is_empty(&self) -> bool {
        match self {
            AttachmentData::Inline(encoded) => encoded.is_empty(),
            AttachmentData::Remote(url) => url.is_empty(),
        }
    }
}

impl From<String> for AttachmentData {
    fn from(value: String) -> Self {
        if value.starts_with("http") {
            AttachmentData::Remote(value)
        } else {
            AttachmentData::Inline(value)
        }
    }
}

impl From<AttachmentData> for String {
    fn from(value: AttachmentData) -> Self {
        match value {
            AttachmentData::Inline(encoded) => encoded,
            AttachmentData::Remote(url) => url,
        }
    }
}

/// Uploaded file reference owned by an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AttachmentData>,
}

impl Attachment {
    /// Name and type only, for lightweight listings.
    pub fn summary(&self) -> Self {
        Self {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            data: None,
        }
    }
}

/// The text fields every submission must carry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDetails {
    #[serde(default, deserialize_with = "lenient_text")]
    pub agency_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub manager_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub store_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub store_address: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub bank_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub account_number: String,
}

impl ApplicantDetails {
    fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("agencyName", &self.agency_name),
            ("managerName", &self.manager_name),
            ("employeeName", &self.employee_name),
            ("storeName", &self.store_name),
            ("storeAddress", &self.store_address),
            ("bankName", &self.bank_name),
            ("accountNumber", &self.account_number),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self
            .fields()
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            Some((field, _)) => Err(ValidationError::MissingField(field)),
            None => Ok(()),
        }
    }
}

/// Rejected submission. The message is deliberately field-agnostic; the
/// offending field is kept for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("all required fields must be filled in")]
    MissingField(&'static str),
}

/// Form payload posted by field agents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    #[serde(flatten)]
    pub details: ApplicantDetails,
    #[serde(default)]
    pub product_photos: Vec<Attachment>,
    #[serde(default)]
    pub store_signboard: Vec<Attachment>,
    #[serde(default)]
    pub transaction_docs: Vec<Attachment>,
}

impl ApplicationSubmission {
    pub fn attachments(&self, category: AttachmentCategory) -> &[Attachment] {
        match category {
            AttachmentCategory::ProductPhotos => &self.product_photos,
            AttachmentCategory::StoreSignboard => &self.store_signboard,
            AttachmentCategory::TransactionDocs => &self.transaction_docs,
        }
    }
}

/// One incentive submission as stored and served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub agency_name: String,
    pub manager_name: String,
    pub employee_name: String,
    pub store_name: String,
    pub store_address: String,
    pub bank_name: String,
    pub account_number: String,
    #[serde(default)]
    pub product_photos: Vec<Attachment>,
    #[serde(default)]
    pub store_signboard: Vec<Attachment>,
    #[serde(default)]
    pub transaction_docs: Vec<Attachment>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub incentive_amount: u64,
}

impl Application {
    /// Builds a fresh `pending` record with empty attachment groups.
    pub fn new(
        id: ApplicationId,
        details: ApplicantDetails,
        created_at: DateTime<Utc>,
        incentive_amount: u64,
    ) -> Self {
        let ApplicantDetails {
            agency_name,
            manager_name,
            employee_name,
            store_name,
            store_address,
            bank_name,
            account_number,
        } = details;

        Self {
            id,
            agency_name,
            manager_name,
            employee_name,
            store_name,
            store_address,
            bank_name,
            account_number,
            product_photos: Vec::new(),
            store_signboard: Vec::new(),
            transaction_docs: Vec::new(),
            status: ApplicationStatus::Pending,
            created_at,
            incentive_amount,
        }
    }

    pub fn attachments(&self, category: AttachmentCategory) -> &[Attachment] {
        match category {
            AttachmentCategory::ProductPhotos => &self.product_photos,
            AttachmentCategory::StoreSignboard => &self.store_signboard,
            AttachmentCategory::TransactionDocs => &self.transaction_docs,
        }
    }

    pub fn attachments_mut(&mut self, category: AttachmentCategory) -> &mut Vec<Attachment> {
        match category {
            AttachmentCategory::ProductPhotos => &mut self.product_photos,
            AttachmentCategory::StoreSignboard => &mut self.store_signboard,
            AttachmentCategory::TransactionDocs => &mut self.transaction_docs,
        }
    }

    /// Data reference of the first product photo, if any.
    pub fn first_product_photo(&self) -> Option<&AttachmentData> {
        self.product_photos
            .first()
            .and_then(|photo| photo.data.as_ref())
            .filter(|data| !data.is_empty())
    }

    /// Copy with every attachment reduced to name and type.
    pub fn without_attachment_data(&self) -> Self {
        let mut stripped = self.clone();
        for category in AttachmentCategory::ordered() {
            for attachment in stripped.attachments_mut(category).iter_mut() {
                attachment.data = None;
            }
        }
        stripped
    }
}

/// Null or non-text values read as blank so validation rejects them. Numbers
/// keep their digits.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

/// Missing, null, negative, or non-numeric amounts count as zero.
fn lenient_amount<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let amount = match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|raw| raw.is_finite() && *raw > 0.0)
                    .map(|raw| raw as u64)
            })
            .unwrap_or(0),
        Some(Value::String(raw)) => raw.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(amount)
}
