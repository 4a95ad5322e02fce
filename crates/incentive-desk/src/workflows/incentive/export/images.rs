use std::io::Cursor;
use std::time::Duration;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use futures::future::join_all;
use image::ImageReader;
use reqwest::header::CONTENT_TYPE;
use tracing::warn;

use crate::workflows::incentive::applications::domain::AttachmentData;

/// Size assumed when the header of an image cannot be read.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (200, 150);

const DATA_URL_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Image encodings the workbook accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
}

impl ImageKind {
    /// Maps a MIME subtype (`png`, `jpg`, ...) onto a kind; unknown subtypes are JPEG.
    pub fn from_subtype(subtype: &str) -> Self {
        match subtype.trim().to_ascii_lowercase().as_str() {
            "png" => ImageKind::Png,
            "gif" => ImageKind::Gif,
            "webp" => ImageKind::Webp,
            "bmp" => ImageKind::Bmp,
            _ => ImageKind::Jpeg,
        }
    }

    /// Maps a full content type such as `image/png; charset=binary`.
    pub fn from_content_type(raw: &str) -> Self {
        match raw.trim().parse::<mime::Mime>() {
            Ok(parsed) if parsed.type_() == mime::IMAGE => {
                Self::from_subtype(parsed.subtype().as_str())
            }
            _ => ImageKind::Jpeg,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpeg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
            ImageKind::Bmp => "bmp",
        }
    }
}

/// Decoded attachment ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

impl ResolvedImage {
    fn from_bytes(bytes: Vec<u8>, kind: ImageKind) -> Result<Self, AttachmentResolutionError> {
        if bytes.is_empty() {
            return Err(AttachmentResolutionError::Empty);
        }
        let (width, height) = inspect_dimensions(&bytes);
        Ok(Self {
            bytes,
            kind,
            width,
            height,
        })
    }
}

/// Per-attachment failure. Never fatal for a report; the row gets a placeholder.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentResolutionError {
    #[error("inline payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("image fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("image fetch returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("image payload is empty")]
    Empty,
}

/// Turns attachment references into image bytes, format and pixel size.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    client: reqwest::Client,
}

impl ImageResolver {
    /// `timeout` bounds each remote fetch; hitting it counts as a failed fetch.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("incentive-desk/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub async fn resolve(
        &self,
        data: &AttachmentData,
    ) -> Result<ResolvedImage, AttachmentResolutionError> {
        match data {
            AttachmentData::Inline(encoded) => decode_inline(encoded),
            AttachmentData::Remote(url) => self.fetch(url).await,
        }
    }

    /// Resolves every reference concurrently. Output order matches input order;
    /// absent references and failures come back as `None`.
    pub async fn resolve_all(
        &self,
        refs: &[Option<&AttachmentData>],
    ) -> Vec<Option<ResolvedImage>> {
        let pending = refs.iter().map(|data| async move {
            let data = (*data)?;
            match self.resolve(data).await {
                Ok(image) => Some(image),
                Err(err) => {
                    warn!(error = %err, source = describe(data), "product photo unavailable");
                    None
                }
            }
        });
        join_all(pending).await
    }

    async fn fetch(&self, url: &str) -> Result<ResolvedImage, AttachmentResolutionError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttachmentResolutionError::Status(status));
        }

        let kind = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ImageKind::from_content_type)
            .unwrap_or(ImageKind::Jpeg);

        let bytes = response.bytes().await?;
        ResolvedImage::from_bytes(bytes.to_vec(), kind)
    }
}

/// Decodes `data:image/<subtype>;base64,<payload>` or a bare base64 payload.
pub fn decode_inline(encoded: &str) -> Result<ResolvedImage, AttachmentResolutionError> {
    let (kind, payload) = split_data_url(encoded);
    let cleaned: String = payload
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let bytes = LENIENT_BASE64.decode(cleaned.as_bytes())?;
    ResolvedImage::from_bytes(bytes, kind)
}

fn split_data_url(encoded: &str) -> (ImageKind, &str) {
    let Some(rest) = encoded.strip_prefix(DATA_URL_PREFIX) else {
        return (ImageKind::Jpeg, encoded);
    };
    match rest.split_once(BASE64_MARKER) {
        Some((subtype, payload))
            if !subtype.is_empty()
                && !payload.is_empty()
                && subtype
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_') =>
        {
            (ImageKind::from_subtype(subtype), payload)
        }
        _ => (ImageKind::Jpeg, encoded),
    }
}

/// Reads width and height from the image header, falling back to 200x150.
pub fn inspect_dimensions(bytes: &[u8]) -> (u32, u32) {
    let measured = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    match measured {
        Some((width, height)) => (
            if width == 0 { FALLBACK_DIMENSIONS.0 } else { width },
            if height == 0 { FALLBACK_DIMENSIONS.1 } else { height },
        ),
        None => FALLBACK_DIMENSIONS,
    }
}

fn describe(data: &AttachmentData) -> &str {
    match data {
        AttachmentData::Inline(_) => "inline",
        AttachmentData::Remote(url) => url.as_str(),
    }
}
