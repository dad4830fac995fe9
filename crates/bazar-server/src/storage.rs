//! Object-storage gateway over S3 for product images and brand logos.

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;

use bazar_core::AppConfig;

/// Buckets the service owns; created at bootstrap with a public-read policy.
pub const S3_BUCKETS: [&str; 2] = ["product-images", "brand-logos"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage request failed: {0}")]
    Request(String),
}

/// S3 client plus the public base URL uploads are served from.
pub struct ObjectStorageGateway {
    client: aws_sdk_s3::Client,
    public_base_url: String,
}

impl ObjectStorageGateway {
    /// Builds the gateway from process configuration.
    ///
    /// With local AWS emulation enabled the client points at the emulator
    /// endpoint with path-style addressing, which is what MinIO-style
    /// emulators expect.
    pub async fn from_app_config(config: &AppConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.s3_region.clone()));

        if let (Some(key_id), Some(secret)) = (
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
        ) {
            loader =
                loader.credentials_provider(Credentials::new(key_id, secret, None, None, "bazar"));
        }

        let shared = loader.load().await;
        let endpoint = if config.enable_local_aws_emulation {
            config
                .emulated_s3_url
                .clone()
                .unwrap_or_else(|| config.s3_url.clone())
        } else {
            config.s3_url.clone()
        };
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            public_base_url: config.object_storage_public_url().trim_end_matches('/').to_string(),
        }
    }

    /// Ensures a bucket exists with the public-read policy attached.
    ///
    /// An already-existing bucket is a success; only the missing case
    /// creates and applies the policy.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Request`] when creation or the policy write
    /// fails.
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self
            .client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        tracing::info!(bucket, "creating object-storage bucket");
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(bucket_policy_read_public(bucket))
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(())
    }

    /// Uploads a file and returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Request`] when the put fails.
    pub async fn upload(
        &self,
        bucket: &str,
        file_key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(file_key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(format!("{}/{bucket}/{file_key}", self.public_base_url))
    }
}

/// Standard anonymous-read bucket policy.
#[must_use]
pub fn bucket_policy_read_public(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicRead",
            "Effect": "Allow",
            "Principal": "*",
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{bucket}/*")],
        }],
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_read_policy_targets_the_bucket_objects() {
        let policy = bucket_policy_read_public("product-images");
        let parsed: serde_json::Value = serde_json::from_str(&policy).expect("valid json");
        assert_eq!(
            parsed["Statement"][0]["Resource"][0],
            "arn:aws:s3:::product-images/*"
        );
        assert_eq!(parsed["Statement"][0]["Principal"], "*");
    }
}
