//! CRDT-backed metadata store
//!
//! Implements the `MetadataBackend` contract by issuing CRDT map/set
//! operations against the node that owns each bucket. A bucket's
//! attributes live in the map `{bucket}/md`, its object keys in the set
//! `{bucket}/objs`, and each object's metadata in a map named by the
//! object key, all inside the keyspace `storage/{bucket}` on the owning
//! node.
//!
//! Multi-step operations read first, then apply their mutations as one
//! atomic update batch on that single node. There is no cross-node
//! atomicity: an operation touching a reserved global bucket and a
//! ring-routed bucket commits the two steps independently.

use crate::backend::{BucketAndObject, MetadataBackend};
use crate::context::RequestContext;
use crate::error::{MetaError, Result};
use crate::listing::{self, ListObjectsParams, ListObjectsResult};
use crate::multipart::{MultipartListing, MultipartListingParams, MultipartUploadLister};
use crate::pool::NodePool;
use crate::NodeId;
use async_trait::async_trait;
use atoll_node::{CrdtOp, FieldMap};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

fn bucket_keyspace(bucket: &str) -> String {
    format!("storage/{bucket}")
}

fn attributes_map(bucket: &str) -> String {
    format!("{bucket}/md")
}

fn key_set(bucket: &str) -> String {
    format!("{bucket}/objs")
}

/// The CRDT metadata backend
pub struct CrdtMetadataStore {
    pool: Arc<NodePool>,
    multipart: Arc<dyn MultipartUploadLister>,
    list_concurrency: usize,
}

impl CrdtMetadataStore {
    /// Create a store over a connected node pool
    pub fn new(pool: Arc<NodePool>, multipart: Arc<dyn MultipartUploadLister>) -> Self {
        Self {
            pool,
            multipart,
            list_concurrency: 16,
        }
    }

    /// Override the listing fan-out concurrency
    pub fn with_list_concurrency(mut self, list_concurrency: usize) -> Self {
        self.list_concurrency = list_concurrency.max(1);
        self
    }

    /// Read a bucket's attributes at `node`; an empty map means the bucket
    /// does not exist.
    async fn read_bucket_attributes(&self, node: NodeId, bucket: &str) -> Result<FieldMap> {
        let attributes = self
            .pool
            .read_map(node, &bucket_keyspace(bucket), &attributes_map(bucket))
            .await?;
        if attributes.is_empty() {
            return Err(MetaError::NoSuchBucket(bucket.to_string()));
        }
        Ok(attributes)
    }

    fn attribute_writes(bucket: &str, attributes: FieldMap) -> Vec<CrdtOp> {
        let keyspace = bucket_keyspace(bucket);
        let map = attributes_map(bucket);
        attributes
            .into_iter()
            .map(|(field, value)| CrdtOp::SetRegister {
                keyspace: keyspace.clone(),
                map: map.clone(),
                field,
                value,
            })
            .collect()
    }
}

#[async_trait]
impl MetadataBackend for CrdtMetadataStore {
    #[instrument(skip(self, ctx, attributes), fields(request_id = %ctx.request_id()))]
    async fn create_bucket(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        attributes: FieldMap,
    ) -> Result<()> {
        let node = self.pool.route(bucket)?;
        match self.read_bucket_attributes(node, bucket).await {
            Ok(_) => return Err(MetaError::BucketAlreadyExists(bucket.to_string())),
            Err(MetaError::NoSuchBucket(_)) => {}
            Err(err) => return Err(err),
        }
        self.pool
            .update(node, Self::attribute_writes(bucket, attributes))
            .await
    }

    #[instrument(skip(self, ctx, attributes), fields(request_id = %ctx.request_id()))]
    async fn put_bucket_attributes(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        attributes: FieldMap,
    ) -> Result<()> {
        let node = self.pool.route(bucket)?;
        self.read_bucket_attributes(node, bucket).await?;
        self.pool
            .update(node, Self::attribute_writes(bucket, attributes))
            .await
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id()))]
    async fn get_bucket_attributes(&self, ctx: &RequestContext, bucket: &str) -> Result<FieldMap> {
        let node = self.pool.route(bucket)?;
        self.read_bucket_attributes(node, bucket).await
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id()))]
    async fn delete_bucket(&self, ctx: &RequestContext, bucket: &str) -> Result<()> {
        let node = self.pool.route(bucket)?;
        let attributes = self.read_bucket_attributes(node, bucket).await?;

        let keyspace = bucket_keyspace(bucket);
        let keys = self.pool.read_set(node, &keyspace, &key_set(bucket)).await?;
        if !keys.is_empty() {
            return Err(MetaError::BucketNotEmpty(bucket.to_string()));
        }

        let map = attributes_map(bucket);
        let batch = attributes
            .into_keys()
            .map(|field| CrdtOp::RemoveRegister {
                keyspace: keyspace.clone(),
                map: map.clone(),
                field,
            })
            .collect();
        self.pool.update(node, batch).await
    }

    #[instrument(skip(self, ctx, fields), fields(request_id = %ctx.request_id()))]
    async fn put_object(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        fields: FieldMap,
    ) -> Result<()> {
        let node = self.pool.route(bucket)?;
        self.read_bucket_attributes(node, bucket).await?;

        let keyspace = bucket_keyspace(bucket);
        let mut batch: Vec<CrdtOp> = fields
            .into_iter()
            .map(|(field, value)| CrdtOp::SetRegister {
                keyspace: keyspace.clone(),
                map: key.to_string(),
                field,
                value,
            })
            .collect();
        batch.push(CrdtOp::AddElement {
            keyspace,
            set: key_set(bucket),
            member: key.to_string(),
        });
        self.pool.update(node, batch).await
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id()))]
    async fn get_object(&self, ctx: &RequestContext, bucket: &str, key: &str) -> Result<FieldMap> {
        let node = self.pool.route(bucket)?;
        self.read_bucket_attributes(node, bucket).await?;

        let metadata = self
            .pool
            .read_map(node, &bucket_keyspace(bucket), key)
            .await?;
        if metadata.is_empty() {
            return Err(MetaError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(metadata)
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id()))]
    async fn get_bucket_and_object(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<BucketAndObject> {
        let node = self.pool.route(bucket)?;
        let attributes = self.read_bucket_attributes(node, bucket).await?;

        let metadata = self
            .pool
            .read_map(node, &bucket_keyspace(bucket), key)
            .await?;
        Ok(BucketAndObject {
            bucket: attributes,
            object: (!metadata.is_empty()).then_some(metadata),
        })
    }

    #[instrument(skip(self, ctx), fields(request_id = %ctx.request_id()))]
    async fn delete_object(&self, ctx: &RequestContext, bucket: &str, key: &str) -> Result<()> {
        let node = self.pool.route(bucket)?;
        self.read_bucket_attributes(node, bucket).await?;

        let keyspace = bucket_keyspace(bucket);
        let metadata = self.pool.read_map(node, &keyspace, key).await?;
        if metadata.is_empty() {
            return Err(MetaError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }

        let mut batch: Vec<CrdtOp> = metadata
            .into_keys()
            .map(|field| CrdtOp::RemoveRegister {
                keyspace: keyspace.clone(),
                map: key.to_string(),
                field,
            })
            .collect();
        batch.push(CrdtOp::RemoveElement {
            keyspace,
            set: key_set(bucket),
            member: key.to_string(),
        });
        self.pool.update(node, batch).await
    }

    #[instrument(skip(self, ctx, params), fields(request_id = %ctx.request_id()))]
    async fn list_objects(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        params: ListObjectsParams,
    ) -> Result<ListObjectsResult> {
        let max_keys = listing::validate(&params)?;

        let node = self.pool.route(bucket)?;
        self.read_bucket_attributes(node, bucket).await?;

        let keyspace = bucket_keyspace(bucket);
        let keys = self.pool.read_set(node, &keyspace, &key_set(bucket)).await?;

        // Fetch order does not matter; the output order is imposed by the
        // sort inside the assembly step.
        let metadata: HashMap<String, FieldMap> = stream::iter(keys.clone())
            .map(|key| {
                let keyspace = keyspace.clone();
                async move {
                    let fields = self.pool.read_map(node, &keyspace, &key).await?;
                    Ok::<(String, FieldMap), MetaError>((key, fields))
                }
            })
            .buffer_unordered(self.list_concurrency)
            .try_collect()
            .await?;

        Ok(listing::build_listing(keys, metadata, &params, max_keys))
    }

    #[instrument(skip(self, ctx, params), fields(request_id = %ctx.request_id()))]
    async fn list_multipart_uploads(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        params: MultipartListingParams,
    ) -> Result<MultipartListing> {
        let node = self.pool.route(bucket)?;
        let attributes = match self.read_bucket_attributes(node, bucket).await {
            Ok(attributes) => attributes,
            // No recorded attributes: no ongoing uploads, empty listing
            Err(MetaError::NoSuchBucket(_)) => return Ok(MultipartListing::empty()),
            Err(err) => return Err(err),
        };
        self.multipart.list_uploads(attributes, params).await
    }
}
