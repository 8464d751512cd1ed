use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use super::{MultipartPart, ObjectPage, ObjectStore, Storage};
use crate::types::ObjectRecord;
use crate::types::error::StorageError;

/// In-memory object store used to exercise the migration engine
/// without a real backend. Records per-operation call counts and can
/// inject one queued failure per call.
#[derive(Clone)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    page_size: usize,
}

#[derive(Default)]
struct Inner {
    buckets: HashMap<String, BTreeMap<String, Bytes>>,
    uploads: HashMap<String, Upload>,
    next_upload_id: u64,
    calls: HashMap<String, u32>,
    failures: HashMap<String, VecDeque<StorageError>>,
}

struct Upload {
    bucket: String,
    key: String,
    parts: Vec<(i32, Bytes)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            page_size,
        }
    }

    pub fn boxed(&self) -> Storage {
        Box::new(self.clone())
    }

    pub fn insert_bucket(&self, bucket: &str) {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default();
    }

    pub fn insert_object(&self, bucket: &str, key: &str, body: Bytes) {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn calls(&self, operation: &str) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    pub fn active_uploads(&self) -> usize {
        self.inner.lock().unwrap().uploads.len()
    }

    /// Queues an error for the named operation. Each queued error fails
    /// exactly one call, in injection order.
    pub fn inject_failure(&self, operation: &str, error: StorageError) {
        self.inject_failures(operation, error, 1);
    }

    pub fn inject_failures(&self, operation: &str, error: StorageError, count: u32) {
        let mut inner = self.inner.lock().unwrap();
        let queue = inner.failures.entry(operation.to_string()).or_default();
        for _ in 0..count {
            queue.push_back(error.clone());
        }
    }

    fn begin(&self, operation: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        *inner.calls.entry(operation.to_string()).or_default() += 1;

        if let Some(error) = inner
            .failures
            .get_mut(operation)
            .and_then(|queue| queue.pop_front())
        {
            return Err(anyhow::Error::new(error));
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        self.begin("list_objects")?;

        let inner = self.inner.lock().unwrap();
        let objects = inner
            .buckets
            .get(bucket)
            .ok_or_else(|| anyhow::Error::new(StorageError::NotFound))?;

        let offset = continuation_token
            .as_deref()
            .map_or(0, |token| token.parse::<usize>().unwrap_or_default());
        let page: Vec<ObjectRecord> = objects
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|(key, body)| ObjectRecord {
                key: key.clone(),
                size: body.len() as u64,
            })
            .collect();

        let next_offset = offset + page.len();
        let next_token = if next_offset < objects.len() {
            Some(next_offset.to_string())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: page,
            next_token,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>> {
        self.begin("head_object")?;

        Ok(self.object(bucket, key).map(|body| body.len() as u64))
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.begin("bucket_exists")?;

        Ok(self.inner.lock().unwrap().buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.begin("create_bucket")?;

        self.insert_bucket(bucket);
        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Bytes> {
        self.begin("get_object")?;

        let body = self
            .object(bucket, key)
            .ok_or_else(|| anyhow::Error::new(StorageError::NotFound))?;

        match range {
            None => Ok(body),
            Some((start, end)) => {
                if start >= body.len() as u64 || end >= body.len() as u64 || end < start {
                    return Err(anyhow::Error::new(StorageError::Service {
                        code: "InvalidRange".to_string(),
                        message: format!("bytes={start}-{end}"),
                    }));
                }
                Ok(body.slice(start as usize..=end as usize))
            }
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.begin("put_object")?;

        self.insert_object(bucket, key, body);
        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        self.begin("create_multipart_upload")?;

        let mut inner = self.inner.lock().unwrap();
        inner.next_upload_id += 1;
        let upload_id = format!("upload-{}", inner.next_upload_id);
        inner.uploads.insert(
            upload_id.clone(),
            Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: Vec::new(),
            },
        );

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        self.begin("upload_part")?;

        let mut inner = self.inner.lock().unwrap();
        let upload = inner
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| anyhow!("unknown upload id: {upload_id}"))?;
        upload.parts.push((part_number, body));

        Ok(format!("etag-{part_number}"))
    }

    async fn complete_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        parts: &[MultipartPart],
    ) -> Result<()> {
        self.begin("complete_multipart_upload")?;

        let mut inner = self.inner.lock().unwrap();
        let upload = inner
            .uploads
            .remove(upload_id)
            .ok_or_else(|| anyhow!("unknown upload id: {upload_id}"))?;

        let mut body = BytesMut::new();
        for part in parts {
            let uploaded = upload
                .parts
                .iter()
                .find(|(part_number, _)| *part_number == part.part_number)
                .ok_or_else(|| anyhow!("part {} was not uploaded", part.part_number))?;
            body.extend_from_slice(&uploaded.1);
        }

        inner
            .buckets
            .entry(upload.bucket)
            .or_default()
            .insert(upload.key, body.freeze());

        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.begin("abort_multipart_upload")?;

        self.inner.lock().unwrap().uploads.remove(upload_id);
        Ok(())
    }
}
