use anyhow::{Context, Result};
use object_store::{ObjectStore, aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory};
use std::sync::Arc;
use url::Url;

use crate::config::StorageConfig;

/// Create an object store from storage configuration.
///
/// A bucket containing `://` is treated as a storage URL, anything else as an
/// S3 bucket name in `region`.
pub fn create_object_store(storage_config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    if storage_config.bucket.is_empty() {
        anyhow::bail!("No bucket configured");
    }

    if storage_config.bucket.contains("://") {
        return create_object_store_from_url(&storage_config.bucket, storage_config);
    }

    let builder = create_s3_builder(&storage_config.bucket, storage_config)?;
    Ok(Arc::new(builder.build().with_context(|| {
        format!("Failed to build S3 store for bucket '{}'", storage_config.bucket)
    })?))
}

/// Create an object store from a storage URL
pub fn create_object_store_from_url(
    url: &str,
    storage_config: &StorageConfig,
) -> Result<Arc<dyn ObjectStore>> {
    let parsed =
        Url::parse(url).map_err(|e| anyhow::anyhow!("Invalid storage URL '{}': {}", url, e))?;

    match parsed.scheme() {
        "file" => {
            let path = parsed.path();
            if path.is_empty() || path == "/" {
                return Err(anyhow::anyhow!(
                    "File URL must specify a path: file:///path/to/bucket"
                ));
            }
            Ok(Arc::new(
                LocalFileSystem::new_with_prefix(path)?.with_automatic_cleanup(true),
            ))
        }
        "memory" => Ok(Arc::new(InMemory::new())),
        "s3" => {
            let bucket = parsed
                .host_str()
                .ok_or_else(|| anyhow::anyhow!("S3 URL must specify a bucket: s3://bucket"))?;
            let builder = create_s3_builder(bucket, storage_config)?;
            Ok(Arc::new(builder.build()?))
        }
        scheme => Err(anyhow::anyhow!(
            "Unsupported storage scheme: {}. Supported: file, memory, s3",
            scheme
        )),
    }
}

/// S3 builder for `bucket`. Credentials come from the standard `AWS_*`
/// environment variables.
pub fn create_s3_builder(bucket: &str, storage_config: &StorageConfig) -> Result<AmazonS3Builder> {
    if storage_config.region.is_empty() {
        anyhow::bail!("S3 bucket '{}' requires a region", bucket);
    }

    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(&storage_config.region);

    if let Some(endpoint) = &storage_config.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_allow_http(storage_config.allow_http)
            .with_virtual_hosted_style_request(false); // MinIO requires path-style URLs
    } else if storage_config.allow_http {
        builder = builder.with_allow_http(true);
    }

    Ok(builder)
}
