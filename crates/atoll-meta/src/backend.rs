//! Backend-agnostic metadata contract

use crate::context::RequestContext;
use crate::error::Result;
use crate::listing::{ListObjectsParams, ListObjectsResult};
use crate::multipart::{MultipartListing, MultipartListingParams};
use async_trait::async_trait;
use atoll_node::FieldMap;

/// A bucket read together with one of its objects.
///
/// The object is `None` when the key has no metadata; the combined call
/// leaves that distinction to the API layer instead of failing.
#[derive(Clone, Debug)]
pub struct BucketAndObject {
    /// Bucket attributes
    pub bucket: FieldMap,
    /// Object metadata, if the object exists
    pub object: Option<FieldMap>,
}

/// The contract every metadata backend implements, so the API layer stays
/// backend-agnostic.
///
/// Every operation is an asynchronous sequence of remote calls and resolves
/// exactly once, with a value or a typed error - including on node-failure
/// paths. `ctx` is an opaque diagnostic context, passed through and never
/// interpreted. Bucket names and object keys are non-empty strings.
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Create a bucket; fails `BucketAlreadyExists` when attributes are
    /// already recorded under the name.
    async fn create_bucket(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        attributes: FieldMap,
    ) -> Result<()>;

    /// Overwrite or merge a bucket's attribute registers; the bucket must
    /// exist.
    async fn put_bucket_attributes(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        attributes: FieldMap,
    ) -> Result<()>;

    /// Read a bucket's attributes; an empty attribute map reads as
    /// `NoSuchBucket`.
    async fn get_bucket_attributes(&self, ctx: &RequestContext, bucket: &str) -> Result<FieldMap>;

    /// Delete a bucket; fails `BucketNotEmpty` while its key set holds any
    /// object.
    async fn delete_bucket(&self, ctx: &RequestContext, bucket: &str) -> Result<()>;

    /// Write an object's metadata fields and record its key in the bucket's
    /// key set, as one atomic update.
    async fn put_object(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        fields: FieldMap,
    ) -> Result<()>;

    /// Read an object's metadata; an empty map reads as `NoSuchKey`.
    async fn get_object(&self, ctx: &RequestContext, bucket: &str, key: &str) -> Result<FieldMap>;

    /// Read a bucket's attributes and one object in a single operation.
    async fn get_bucket_and_object(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<BucketAndObject>;

    /// Remove an object's metadata and its key-set entry, as one atomic
    /// update.
    async fn delete_object(&self, ctx: &RequestContext, bucket: &str, key: &str) -> Result<()>;

    /// Build one page of the bucket's object listing.
    async fn list_objects(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        params: ListObjectsParams,
    ) -> Result<ListObjectsResult>;

    /// List in-progress multipart uploads; a bucket with no recorded
    /// attributes yields an empty, non-truncated listing.
    async fn list_multipart_uploads(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        params: MultipartListingParams,
    ) -> Result<MultipartListing>;
}
