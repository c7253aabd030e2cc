use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::config::Settings;
use crate::model::ArtifactRef;

/// Durable home for uploaded artifacts. Implementations return a reference
/// carrying the display name and a retrieval URL; failures surface as-is
/// and the caller maps them to its storage error.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, file_name: &str) -> anyhow::Result<ArtifactRef>;
}

#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
    presign_expiry: Duration,
}

impl S3ArtifactStore {
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        if settings.s3().access_key.is_empty() || settings.s3().secret_key.is_empty() {
            return Ok(None);
        }

        let creds = Credentials::new(
            settings.s3().access_key.clone(),
            settings.s3().secret_key.clone(),
            None,
            None,
            "gradeflow-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(settings.s3().endpoint.clone())
            .region(aws_config::Region::new(settings.s3().region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let client = Client::new(&config);
        let presign_expiry =
            Duration::from_secs(settings.s3().presigned_url_expire_minutes * 60);

        Ok(Some(Self { client, bucket: settings.s3().bucket.clone(), presign_expiry }))
    }

    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> anyhow::Result<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn store(&self, bytes: Vec<u8>, file_name: &str) -> anyhow::Result<ArtifactRef> {
        let safe_name = sanitized_filename(file_name);
        let key = format!("artifacts/{}/{safe_name}", Uuid::new_v4());
        let size = bytes.len();
        let hash_hex = hex::encode(Sha256::digest(&bytes));

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type_for(&safe_name))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .context("Failed to upload artifact")?;

        let url = self.presign_get(&key, self.presign_expiry).await?;

        tracing::info!(key = %key, size, hash = %hash_hex, "Artifact stored");

        Ok(ArtifactRef { file_name: safe_name, url })
    }
}

pub(crate) fn sanitized_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name.rsplit('.').next().unwrap_or_default();
    match extension {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" | "md" => "text/plain",
        "rtf" => "application/rtf",
        "odt" => "application/vnd.oasis.opendocument.text",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::{content_type_for, sanitized_filename};

    #[test]
    fn sanitized_filename_filters_disallowed_chars() {
        assert_eq!(sanitized_filename("реферат (итог)!.pdf"), ".pdf");
        assert_eq!(sanitized_filename("essay (final)!.docx"), "essayfinal.docx");
    }

    #[test]
    fn sanitized_filename_falls_back_on_empty() {
        assert_eq!(sanitized_filename("###"), "upload");
    }

    #[test]
    fn content_type_matches_extension() {
        assert_eq!(content_type_for("essay.pdf"), "application/pdf");
        assert_eq!(content_type_for("notes.txt"), "text/plain");
        assert_eq!(content_type_for("unknown.bin"), "application/octet-stream");
    }
}
