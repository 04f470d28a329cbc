//! `POST /upload_audio`: accept a recording and convert it.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use soundforged_common::{AudioFormat, Bitrate};

use super::error::ApiError;
use super::AppContext;
use crate::pipeline::{PipelineError, UploadReceipt, UploadRequest};

/// Raw multipart fields, before validation.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// `(file name, bytes)` of the `audio` field, if it carried a file name.
    pub audio: Option<(String, Bytes)>,
    pub format: Option<String>,
    pub quality: Option<String>,
}

impl UploadForm {
    /// Read the fields the recorder page sends; others are skipped.
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("audio") => {
                    // A part without a filename is a plain form value, not a file.
                    let Some(file_name) = field.file_name().map(str::to_string) else {
                        continue;
                    };
                    let bytes = field.bytes().await?;
                    form.audio = Some((file_name, bytes));
                }
                Some("format") => form.format = Some(field.text().await?),
                Some("quality") => form.quality = Some(field.text().await?),
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validate in the order clients expect errors to be reported.
    pub fn into_request(self, default_quality: Bitrate) -> Result<UploadRequest, PipelineError> {
        let (file_name, payload) = self
            .audio
            .ok_or_else(|| PipelineError::client("No audio file provided"))?;

        if file_name.is_empty() {
            return Err(PipelineError::client("No file selected"));
        }

        let format = match self.format.as_deref().map(str::trim) {
            None | Some("") => AudioFormat::Mp3,
            Some(raw) => raw
                .parse::<AudioFormat>()
                .map_err(|_| PipelineError::client("Invalid format. Use mp3 or wav"))?,
        };

        let quality = match self.quality.as_deref().map(str::trim) {
            None | Some("") => default_quality,
            Some(_) if !format.uses_bitrate() => default_quality,
            Some(raw) => raw.parse::<Bitrate>().map_err(|_| {
                PipelineError::client(format!(
                    "Invalid quality. Use a bitrate between {} and {} kbps",
                    Bitrate::MIN_KBPS,
                    Bitrate::MAX_KBPS
                ))
            })?,
        };

        tracing::info!(
            file_name = %file_name,
            size_bytes = payload.len(),
            format = %format,
            quality = quality.kbps(),
            "Received audio upload"
        );

        Ok(UploadRequest {
            payload,
            format,
            quality,
        })
    }
}

/// Successful upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    /// Human-readable size, e.g. `"1.25 MB"`.
    pub file_size: String,
    pub file_size_bytes: u64,
    pub download_url: String,
    /// `"MP3"` or `"WAV"`.
    pub format: String,
    /// `"128 kbps"` or `"Uncompressed"`.
    pub quality: String,
    pub expires_at: String,
}

impl From<&UploadReceipt> for UploadResponse {
    fn from(receipt: &UploadReceipt) -> Self {
        let artifact = &receipt.artifact;
        Self {
            success: true,
            filename: artifact.id.to_string(),
            file_size: format_megabytes(artifact.size),
            file_size_bytes: artifact.size,
            download_url: artifact.download_url(),
            format: artifact.format.label().to_string(),
            quality: receipt.quality_label(),
            expires_at: artifact.expires_at.to_rfc3339(),
        }
    }
}

/// Megabytes rounded to two places, without trailing zeros: `"1.25 MB"`,
/// `"1.5 MB"`, `"0.0 MB"`.
fn format_megabytes(bytes: u64) -> String {
    let rounded = format!("{:.2}", bytes as f64 / (1024.0 * 1024.0));
    let trimmed = rounded.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0 MB")
    } else {
        format!("{trimmed} MB")
    }
}

/// Handle an audio upload and conversion.
pub async fn upload_audio(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    ctx.service.ensure_transcoder().await?;

    let form = UploadForm::read(multipart?).await?;
    let request = form.into_request(ctx.default_quality)?;
    let receipt = ctx.service.process(request).await?;

    let response = UploadResponse::from(&receipt);
    tracing::info!(
        filename = %response.filename,
        file_size = %response.file_size,
        "Upload converted"
    );
    Ok(Json(response))
}
