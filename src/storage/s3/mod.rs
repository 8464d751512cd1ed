use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use bytes::Bytes;

use super::{MultipartPart, ObjectPage, ObjectStore, Storage};
use crate::types::ObjectRecord;
use crate::types::error::StorageError;

pub mod client_builder;

const NOT_FOUND_ERROR_CODES: [&str; 3] = ["NoSuchKey", "NoSuchBucket", "NotFound"];

/// `ObjectStore` backed by the AWS SDK. One instance per endpoint, shared
/// across workers through `Arc`.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Arc<Client>,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn boxed(client: Client) -> Storage {
        Box::new(Self::new(client))
    }
}

/// Collapses an SDK error into the crate's error taxonomy. Service
/// responses keep their error code so that retry classification can
/// inspect it; everything that never reached the service is a
/// connection error.
fn map_sdk_error<E>(error: SdkError<E, HttpResponse>) -> anyhow::Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &error {
        SdkError::ServiceError(context) => {
            let status = context.raw().status().as_u16();
            let code = context.err().code().unwrap_or("Unknown").to_string();
            if status == 404 || NOT_FOUND_ERROR_CODES.contains(&code.as_str()) {
                return anyhow::Error::new(StorageError::NotFound);
            }

            anyhow::Error::new(StorageError::Service {
                code,
                message: context.err().message().unwrap_or_default().to_string(),
            })
        }
        SdkError::ConstructionFailure(_) => anyhow::Error::new(StorageError::Service {
            code: "ConstructionFailure".to_string(),
            message: DisplayErrorContext(&error).to_string(),
        }),
        _ => anyhow::Error::new(StorageError::Connection {
            message: DisplayErrorContext(&error).to_string(),
        }),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| map_sdk_error(e).context("aws_sdk_s3::client::list_objects_v2() failed."))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| ObjectRecord {
                    key: key.to_string(),
                    size: object.size().unwrap_or_default().max(0) as u64,
                })
            })
            .collect();

        let next_token = if output.is_truncated().unwrap_or_default() {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_token,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>> {
        let result = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => Ok(Some(output.content_length().unwrap_or_default().max(0) as u64)),
            Err(error) => {
                // A HEAD without read permission surfaces as 403. Either way the
                // object is unreadable at the target, so report it as absent.
                if let SdkError::ServiceError(context) = &error {
                    let status = context.raw().status().as_u16();
                    if status == 404 || status == 403 {
                        return Ok(None);
                    }
                }

                Err(map_sdk_error(error).context("aws_sdk_s3::client::head_object() failed."))
            }
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let result = self.client.head_bucket().bucket(bucket).send().await;

        match result {
            Ok(_) => Ok(true),
            Err(error) => {
                let mapped =
                    map_sdk_error(error).context("aws_sdk_s3::client::head_bucket() failed.");
                if crate::types::error::is_not_found_error(&mapped) {
                    return Ok(false);
                }

                Err(mapped)
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e).context("aws_sdk_s3::client::create_bucket() failed."))?;

        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_range(range.map(|(start, end)| format!("bytes={start}-{end}")))
            .send()
            .await
            .map_err(|e| map_sdk_error(e).context("aws_sdk_s3::client::get_object() failed."))?;

        let body = output.body.collect().await.map_err(|e| {
            anyhow::Error::new(StorageError::Connection {
                message: DisplayErrorContext(&e).to_string(),
            })
            .context("collecting aws_sdk_s3::client::get_object() body failed.")
        })?;

        Ok(body.into_bytes())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error(e).context("aws_sdk_s3::client::put_object() failed."))?;

        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(e).context("aws_sdk_s3::client::create_multipart_upload() failed.")
            })?;

        Ok(output.upload_id().unwrap_or_default().to_string())
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| map_sdk_error(e).context("aws_sdk_s3::client::upload_part() failed."))?;

        Ok(output.e_tag().unwrap_or_default().to_string())
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[MultipartPart],
    ) -> Result<()> {
        let completed_parts = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.e_tag)
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(e).context("aws_sdk_s3::client::complete_multipart_upload() failed.")
            })?;

        Ok(())
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(e).context("aws_sdk_s3::client::abort_multipart_upload() failed.")
            })?;

        Ok(())
    }
}
