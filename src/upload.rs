//! Multipart upload stage.
//!
//! [`PdfUpload`] runs before the upload handler: it pulls the `pdfFile`
//! field out of the form, checks that it is a PDF within the configured
//! size ceiling and hands the handler a validated [`NewFile`]. Any failure
//! short-circuits the request with an [`ApiError`].

use axum::{
    body::Bytes,
    extract::{FromRef, FromRequest, Multipart, Request, multipart::Field},
};
use mime::Mime;

use crate::errors::ApiError;
use crate::storage::{NewFile, StoreError};

/// Name of the form field carrying the document.
pub const FIELD_NAME: &str = "pdfFile";

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

#[derive(Debug)]
pub struct PdfUpload(pub NewFile);

impl<S> FromRequest<S> for PdfUpload
where
    S: Send + Sync,
    UploadLimits: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let limits = UploadLimits::from_ref(state);
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            if field.name() != Some(FIELD_NAME) {
                continue;
            }

            // browsers submit an empty, nameless part when no file was chosen
            let file_name = field.file_name().map(base_name).unwrap_or_default();
            if file_name.is_empty() {
                return Err(ApiError::MissingFile);
            }

            let content_type = pdf_content_type(field.content_type())?;
            let bytes = read_limited(&mut field, limits.max_bytes).await?;

            let file = NewFile::new(file_name, content_type, bytes).map_err(|e| match e {
                StoreError::DocumentTooLarge { .. } => ApiError::PayloadTooLarge {
                    limit: limits.max_bytes,
                },
                StoreError::InvalidRecord(reason) => ApiError::BadRequest(reason.to_string()),
                other => ApiError::Storage(other),
            })?;
            return Ok(PdfUpload(file));
        }

        Err(ApiError::MissingFile)
    }
}

/// Strips any client-side directory components from a submitted file name.
fn base_name(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim().to_string()
}

fn pdf_content_type(raw: Option<&str>) -> Result<Mime, ApiError> {
    let raw = raw.unwrap_or("none");
    match raw.parse::<Mime>() {
        Ok(mime) if mime.essence_str() == mime::APPLICATION_PDF.essence_str() => Ok(mime),
        _ => Err(ApiError::UnsupportedMediaType(raw.to_string())),
    }
}

async fn read_limited(field: &mut Field<'_>, limit: usize) -> Result<Bytes, ApiError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if buf.len() + chunk.len() > limit {
            tracing::warn!(limit, read = buf.len() + chunk.len(), "upload exceeds size limit");
            return Err(ApiError::PayloadTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}
