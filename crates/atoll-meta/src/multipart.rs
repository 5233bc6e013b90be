//! Multipart-upload listing delegation
//!
//! Multipart bookkeeping lives outside this backend; the only obligation
//! here is the listing call, which hands the collaborator the bucket's
//! attributes and the caller's parameters.

use crate::error::Result;
use async_trait::async_trait;
use atoll_node::FieldMap;

/// Parameters forwarded to the multipart listing collaborator
#[derive(Clone, Debug, Default)]
pub struct MultipartListingParams {
    /// Only list uploads for keys starting with this prefix
    pub prefix: Option<String>,
    /// Resume after this key
    pub key_marker: Option<String>,
    /// Resume after this upload id (within `key_marker`)
    pub upload_id_marker: Option<String>,
    /// Group keys sharing a prefix up to this delimiter
    pub delimiter: Option<String>,
    /// Upload budget for this page
    pub max_uploads: Option<i64>,
}

/// One in-progress multipart upload
#[derive(Clone, Debug)]
pub struct MultipartUpload {
    /// Object key being uploaded
    pub key: String,
    /// Upload id
    pub upload_id: String,
    /// Upload metadata (initiator, storage class, initiated date, ...)
    pub metadata: FieldMap,
}

/// Result of a multipart-uploads listing
#[derive(Clone, Debug, Default)]
pub struct MultipartListing {
    /// Whether uploads remain past this page
    pub is_truncated: bool,
    /// Key marker to resume from when truncated
    pub next_key_marker: Option<String>,
    /// Upload-id marker to resume from when truncated
    pub next_upload_id_marker: Option<String>,
    /// Upload budget the page was built against
    pub max_uploads: i64,
    /// In-progress uploads
    pub uploads: Vec<MultipartUpload>,
    /// Grouped prefixes
    pub common_prefixes: Vec<String>,
}

impl MultipartListing {
    /// The empty, non-truncated listing returned for a bucket with no
    /// recorded attributes.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// External collaborator owning multipart-upload bookkeeping
#[async_trait]
pub trait MultipartUploadLister: Send + Sync {
    /// List in-progress uploads for a bucket, given its attributes
    async fn list_uploads(
        &self,
        bucket_attributes: FieldMap,
        params: MultipartListingParams,
    ) -> Result<MultipartListing>;
}
