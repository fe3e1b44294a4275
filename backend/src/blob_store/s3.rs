//! S3-backed blob store

use std::sync::Arc;

use aws_sdk_s3::{
    error::SdkError,
    operation::get_object::GetObjectError,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier},
    Client as S3Client,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::DateTime;
use futures::StreamExt;

use super::{BlobStore, BlobStoreError, BlobStoreResult, BodyStream, ListPage, ObjectMeta, StoredObject};

/// Part size for streamed multipart writes
const PART_SIZE_BYTES: usize = 8 * 1024 * 1024;

/// Maximum keys per batch delete request
const DELETE_BATCH_SIZE: usize = 1000;

/// Blob store client over an S3 bucket
pub struct S3BlobStore {
    client: Arc<S3Client>,
    bucket_name: String,
}

impl S3BlobStore {
    /// Creates a new blob store client
    ///
    /// # Arguments
    ///
    /// * `client` - Pre-configured S3 client
    /// * `bucket_name` - S3 bucket holding the asset objects
    #[must_use]
    pub const fn new(client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> BlobStoreResult<CompletedPart> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket_name)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| BlobStoreError::Service(format!("Failed to upload part: {e}")))?;

        Ok(CompletedPart::builder()
            .part_number(part_number)
            .set_e_tag(output.e_tag().map(ToString::to_string))
            .build())
    }

    /// Drains the body into numbered parts and completes the upload
    async fn stream_parts(
        &self,
        key: &str,
        upload_id: &str,
        mut body: BodyStream,
    ) -> BlobStoreResult<u64> {
        let mut parts = Vec::new();
        let mut buffer = BytesMut::with_capacity(PART_SIZE_BYTES);
        let mut part_number = 1_i32;
        let mut total_bytes = 0_u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            total_bytes += chunk.len() as u64;
            buffer.extend_from_slice(&chunk);

            while buffer.len() >= PART_SIZE_BYTES {
                let part = buffer.split_to(PART_SIZE_BYTES).freeze();
                parts.push(self.upload_part(key, upload_id, part_number, part).await?);
                part_number += 1;
            }
        }

        // S3 requires at least one part, even for an empty object
        if !buffer.is_empty() || parts.is_empty() {
            parts.push(
                self.upload_part(key, upload_id, part_number, buffer.freeze())
                    .await?,
            );
        }

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket_name)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| BlobStoreError::Service(format!("Failed to complete upload: {e}")))?;

        Ok(total_bytes)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    /// Streams the body as a multipart upload
    ///
    /// The object only becomes visible when the upload completes; any body
    /// or part error aborts the multipart upload so no partial object
    /// remains under the key.
    async fn put(&self, key: &str, body: BodyStream, content_type: &str) -> BlobStoreResult<u64> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobStoreError::Service(format!("Failed to start upload: {e}")))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| BlobStoreError::Config("S3 returned no upload id".to_string()))?
            .to_string();

        match self.stream_parts(key, &upload_id, body).await {
            Ok(total_bytes) => Ok(total_bytes),
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket_name)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!("Failed to abort multipart upload for {key}: {abort_err}");
                }
                Err(e)
            }
        }
    }

    async fn get(&self, key: &str) -> BlobStoreResult<Option<StoredObject>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) =>
            {
                return Ok(None);
            }
            Err(SdkError::ServiceError(service_err))
                if service_err.raw().status().as_u16() >= 500 =>
            {
                return Err(BlobStoreError::Upstream(format!("{service_err:?}")));
            }
            Err(e) => return Err(BlobStoreError::Service(e.to_string())),
        };

        let content_type = output.content_type().map(ToString::to_string);
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| BlobStoreError::Service(format!("Failed to read object body: {e}")))?;

        Ok(Some(StoredObject {
            bytes: data.into_bytes(),
            content_type,
        }))
    }

    async fn delete(&self, key: &str) -> BlobStoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobStoreError::Service(format!("Failed to delete object: {e}")))?;

        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> BlobStoreResult<()> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let identifiers = batch
                .iter()
                .map(|key| {
                    ObjectIdentifier::builder()
                        .key(key)
                        .build()
                        .map_err(|e| BlobStoreError::Config(e.to_string()))
                })
                .collect::<BlobStoreResult<Vec<_>>>()?;

            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .build()
                .map_err(|e| BlobStoreError::Config(e.to_string()))?;

            self.client
                .delete_objects()
                .bucket(&self.bucket_name)
                .delete(delete)
                .send()
                .await
                .map_err(|e| BlobStoreError::Service(format!("Failed to delete batch: {e}")))?;
        }

        Ok(())
    }

    async fn list_page(&self, cursor: Option<&str>) -> BlobStoreResult<ListPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket_name)
            .set_continuation_token(cursor.map(ToString::to_string))
            .send()
            .await
            .map_err(|e| BlobStoreError::Service(format!("Failed to list objects: {e}")))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let size = object.size().unwrap_or(0).max(0) as u64;
                let uploaded_at = object
                    .last_modified()
                    .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()));
                Some(ObjectMeta {
                    key,
                    size,
                    uploaded_at,
                })
            })
            .collect();

        Ok(ListPage {
            objects,
            cursor: output.next_continuation_token().map(ToString::to_string),
        })
    }
}
