//! Paginated bucket listings
//!
//! Assembles S3-style listing results from a bucket's key set and per-key
//! metadata: marker/prefix filtering, delimiter grouping into common
//! prefixes, and truncation against a key budget. The key set arrives
//! unordered from the CRDT node, so the engine sorts it first; the
//! pagination contract depends on that total order.

use crate::error::{MetaError, Result};
use atoll_node::FieldMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Number of keys returned when the caller does not set `max_keys`
pub const DEFAULT_MAX_KEYS: i64 = 1000;

/// Metadata field marking a key as a delete marker
const DELETE_MARKER_FIELD: &str = "x-amz-delete-marker";

/// Parameters of a `list_objects` call
#[derive(Clone, Debug, Default)]
pub struct ListObjectsParams {
    /// Only list keys starting with this prefix
    pub prefix: Option<String>,
    /// Only list keys strictly after this one
    pub marker: Option<String>,
    /// Group keys sharing a prefix up to this delimiter
    pub delimiter: Option<String>,
    /// Key budget for this page
    pub max_keys: Option<i64>,
}

impl ListObjectsParams {
    /// Set the prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the marker
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Set the delimiter
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the key budget
    pub fn with_max_keys(mut self, max_keys: i64) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

/// One content entry of a listing
#[derive(Clone, Debug)]
pub struct ListedObject {
    /// Object key
    pub key: String,
    /// Object metadata
    pub metadata: FieldMap,
}

/// Result of a `list_objects` call
#[derive(Clone, Debug, Default)]
pub struct ListObjectsResult {
    /// Echo of the requested prefix
    pub prefix: Option<String>,
    /// Echo of the requested marker
    pub marker: Option<String>,
    /// Echo of the requested delimiter
    pub delimiter: Option<String>,
    /// Key budget the page was built against
    pub max_keys: i64,
    /// Whether keys remain past this page
    pub is_truncated: bool,
    /// Marker to resume from when truncated
    pub next_marker: Option<String>,
    /// Grouped prefixes, deduplicated, in first-seen order
    pub common_prefixes: Vec<String>,
    /// Content entries in ascending key order
    pub contents: Vec<ListedObject>,
}

/// Validate listing parameters and resolve the effective key budget.
pub(crate) fn validate(params: &ListObjectsParams) -> Result<i64> {
    match params.max_keys {
        Some(n) if n < 0 => Err(MetaError::InvalidArgument(format!(
            "max-keys must be non-negative, got {n}"
        ))),
        Some(n) => Ok(n),
        None => Ok(DEFAULT_MAX_KEYS),
    }
}

/// Assemble a listing page from a bucket's key set and per-key metadata.
///
/// `keys` may arrive in any order; `metadata` holds one entry per key.
/// Content entries and distinct common prefixes share the `max_keys`
/// budget; a repeated common prefix consumes nothing.
pub(crate) fn build_listing(
    mut keys: Vec<String>,
    mut metadata: HashMap<String, FieldMap>,
    params: &ListObjectsParams,
    max_keys: i64,
) -> ListObjectsResult {
    keys.sort_unstable();

    let mut result = ListObjectsResult {
        prefix: params.prefix.clone(),
        marker: params.marker.clone(),
        delimiter: params.delimiter.clone(),
        max_keys,
        ..Default::default()
    };

    let prefix = params.prefix.as_deref().unwrap_or("");
    let mut seen_prefixes = HashSet::new();
    let mut count: i64 = 0;
    let mut previous_key: Option<&str> = None;

    for key in &keys {
        if let Some(marker) = params.marker.as_deref() {
            if key.as_str() <= marker {
                continue;
            }
        }
        if !key.starts_with(prefix) {
            continue;
        }

        let meta = metadata.remove(key).unwrap_or_default();

        // Seam for version-aware backends; this backend never writes one
        if has_delete_marker(&meta) {
            previous_key = Some(key);
            continue;
        }

        if count >= max_keys {
            result.is_truncated = true;
            result.next_marker = previous_key.map(String::from);
            break;
        }

        if let Some(delimiter) = params.delimiter.as_deref() {
            let after_prefix = &key[prefix.len()..];
            if let Some(index) = after_prefix.find(delimiter) {
                let group = &key[..prefix.len() + index + delimiter.len()];
                if seen_prefixes.insert(group.to_string()) {
                    result.common_prefixes.push(group.to_string());
                    count += 1;
                }
                previous_key = Some(key);
                continue;
            }
        }

        result.contents.push(ListedObject {
            key: key.clone(),
            metadata: meta,
        });
        count += 1;
        previous_key = Some(key);
    }

    result
}

fn has_delete_marker(metadata: &FieldMap) -> bool {
    match metadata.get(DELETE_MARKER_FIELD) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag == "true",
        _ => false,
    }
}
