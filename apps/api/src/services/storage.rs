use aws_sdk_s3::primitives::ByteStream;
use tracing::info;
use uuid::Uuid;

use crate::services::{AudioUpload, CollaboratorError};

/// S3 bucket holding uploaded visit recordings.
#[derive(Clone)]
pub struct AudioStore {
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl AudioStore {
    pub fn new(s3: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            s3,
            bucket: bucket.into(),
        }
    }

    /// Uploads a recording and returns its object key.
    pub async fn put_audio(
        &self,
        ingest_id: Uuid,
        upload: &AudioUpload,
    ) -> Result<String, CollaboratorError> {
        let key = audio_key(ingest_id, &upload.filename);
        let content_type = upload
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(upload.bytes.clone()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| CollaboratorError::Storage(format!("S3 upload failed: {e}")))?;

        info!(
            "Uploaded {} bytes of audio to s3://{}/{}",
            upload.bytes.len(),
            self.bucket,
            key
        );
        Ok(key)
    }

    pub async fn delete_audio(&self, key: &str) -> Result<(), CollaboratorError> {
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CollaboratorError::Storage(format!("S3 delete failed: {e}")))?;
        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

/// Builds `ingests/{id}/{filename}` with the filename reduced to a safe charset.
pub fn audio_key(ingest_id: Uuid, filename: &str) -> String {
    let safe: String = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_start_matches('.');
    let safe = if safe.is_empty() { "audio" } else { safe };
    format!("ingests/{ingest_id}/{safe}")
}
