use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::primitives::ByteStream;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const S3_SCHEME: &str = "s3://";

/// A `s3://bucket/key` location. The key may be empty, meaning the bucket root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct S3Url {
    pub bucket: String,
    pub key: String,
}

impl S3Url {
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix(S3_SCHEME)
            .ok_or_else(|| Error::InvalidLocatorFormat(url.to_string()))?;

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Append a path segment to the key, e.g. a jar file name to a folder.
    ///
    /// Trailing separators of the key are dropped first, a key made of
    /// separators only counts as the bucket root.
    pub fn derive(&self, segment: &str) -> Self {
        let folder = self.key.trim_end_matches('/');
        let key = if folder.is_empty() {
            segment.to_string()
        } else {
            format!("{}/{}", folder, segment)
        };

        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }
}

impl fmt::Display for S3Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", S3_SCHEME, self.bucket, self.key)
    }
}

impl FromStr for S3Url {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for S3Url {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<S3Url> for String {
    fn from(url: S3Url) -> Self {
        url.to_string()
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_file(&self, dest: &S3Url, file: &Path) -> Result<()>;

    async fn get_bytes(&self, src: &S3Url) -> Result<Vec<u8>>;
}

/// [`ObjectStore`] backed by the AWS S3 SDK.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, dest: &S3Url, file: &Path) -> Result<()> {
        debug!("putting {} to {}", file.display(), dest);

        let body = ByteStream::from_path(file)
            .await
            .map_err(|e| Error::Artifact {
                path: file.to_path_buf(),
                reason: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(&dest.bucket)
            .key(&dest.key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::service("PutObject", e))?;

        Ok(())
    }

    async fn get_bytes(&self, src: &S3Url) -> Result<Vec<u8>> {
        debug!("getting {}", src);

        let output = self
            .client
            .get_object()
            .bucket(&src.bucket)
            .key(&src.key)
            .send()
            .await
            .map_err(|e| Error::service("GetObject", e))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::service("GetObject", e))?;

        Ok(bytes.into_bytes().to_vec())
    }
}
