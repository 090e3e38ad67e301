//! S3-compatible backend built on aws-sdk-s3. Works against MinIO when
//! configured with a custom endpoint and path-style addressing.

use super::{ObjectBackend, SERVER_SIDE_ENCRYPTION, TransportOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

/// S3 backend configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom endpoint URL for S3-compatible services (e.g. MinIO).
    /// If None, uses the default AWS S3 endpoint.
    pub endpoint_url: Option<String>,

    /// Bucket holding the harness key namespace.
    pub bucket: String,

    /// AWS region. If None, resolution is left to the SDK's default chain.
    pub region: Option<String>,

    /// Use path-style URLs instead of virtual-hosted-style.
    /// Required for MinIO and some S3-compatible services.
    pub force_path_style: bool,
}

impl S3Config {
    /// Configuration for AWS S3 proper.
    pub fn aws(bucket: impl Into<String>) -> Self {
        Self {
            endpoint_url: None,
            bucket: bucket.into(),
            region: None,
            force_path_style: false,
        }
    }

    /// Configuration for an S3-compatible endpoint such as MinIO.
    pub fn compatible(endpoint_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            bucket: bucket.into(),
            region: Some("us-east-1".into()),
            force_path_style: true,
        }
    }
}

pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    pub async fn new(config: S3Config) -> Result<Self> {
        let client = build_client(&config).await?;
        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    fn md5_base64(data: &[u8]) -> String {
        let sum = md5::compute(data);
        B64.encode(sum.0)
    }
}

async fn build_client(config: &S3Config) -> Result<Client> {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = &config.region {
        loader = loader.region(aws_sdk_s3::config::Region::new(region.clone()));
    }
    let sdk_config = loader.load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    if let Some(endpoint) = &config.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }
    if config.force_path_style {
        builder = builder.force_path_style(true);
    }
    Ok(Client::from_conf(builder.build()))
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn put_object(&self, key: &str, data: &[u8], options: &TransportOptions) -> Result<()> {
        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_md5(Self::md5_base64(data))
            .body(ByteStream::from(data.to_vec()));
        if let Some(algorithm) = options.get(SERVER_SIDE_ENCRYPTION) {
            req = req.server_side_encryption(ServerSideEncryption::from(algorithm.as_str()));
        }
        req.send()
            .await
            .with_context(|| format!("put_object failed for key '{key}'"))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("get_object failed for key '{key}'"));
            }
        };
        let data = resp
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read body for key '{key}'"))?
            .into_bytes();
        Ok(Some(data.to_vec()))
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<()> {
        let mut continuation: Option<String> = None;
        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .with_context(|| format!("list_objects_v2 failed for prefix '{prefix}'"))?;
            for object in resp.contents() {
                if let Some(key) = object.key() {
                    self.client
                        .delete_object()
                        .bucket(&self.bucket)
                        .key(key)
                        .send()
                        .await
                        .with_context(|| format!("delete_object failed for key '{key}'"))?;
                }
            }
            match resp.next_continuation_token() {
                Some(token) => continuation = Some(token.to_string()),
                None => break,
            }
        }
        Ok(())
    }
}
