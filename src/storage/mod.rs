use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use dyn_clone::DynClone;

use crate::types::ObjectRecord;

pub mod s3;

#[cfg(test)]
pub(crate) mod mock;

pub type Storage = Box<dyn ObjectStore + Send + Sync>;

/// One page of a bucket listing. `next_token` is `Some` while the key
/// space is not exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPage {
    pub objects: Vec<ObjectRecord>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub part_number: i32,
    pub e_tag: String,
}

/// Object store operations the migration engine consumes. The AWS SDK
/// client lives behind this trait so that the engine can be exercised
/// against an in-memory store in tests.
#[async_trait]
pub trait ObjectStore: DynClone {
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage>;

    /// Size of the object, or `None` if the key does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;
    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// `range` is an inclusive byte range.
    async fn get_object(&self, bucket: &str, key: &str, range: Option<(u64, u64)>)
    -> Result<Bytes>;
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;

    /// Returns the upload id.
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String>;
    /// Returns the ETag of the uploaded part.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String>;
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[MultipartPart],
    ) -> Result<()>;
    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str)
    -> Result<()>;
}
