//! The listing walk: S3 prefix/delimiter semantics over a directory tree.
//!
//! The prefix splits at its last `/` into a directory path (where to read)
//! and a name fragment (what entries must start with). With delimiter `/`
//! subdirectories collapse into common prefixes; with no delimiter the walk
//! recurses; any other delimiter degrades to a full recursive walk filtered
//! by the raw prefix string, with no grouping. Pagination is applied after
//! the walk over the merged, lexicographically ordered key space.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use davgate_s3_model::input::{Page, Prefix};
use davgate_s3_model::output::{ListBucketPage, ObjectList};
use davgate_s3_model::types::{CommonPrefix, ObjectInfo, StorageClass};

use crate::utils::{format_etag, url_encode_key};
use crate::vfs::{FsError, Vfs};

/// Collect every content and common prefix matching `prefix` under
/// `bucket`. A missing resolved path yields an empty listing, matching AWS.
///
/// # Errors
///
/// Propagates filesystem failures other than the resolved path being absent.
pub async fn list_objects(
    vfs: &Vfs,
    bucket: &str,
    prefix: &Prefix,
) -> Result<ObjectList, FsError> {
    let mut list = ObjectList::default();

    let result = if !prefix.delimiter.is_empty() && !prefix.grouped() {
        // Unusual delimiter: no grouping, recursive walk filtered by the
        // raw prefix string.
        walk_filtered(vfs, bucket, "", &prefix.prefix, &mut list).await
    } else {
        let (path, name) = prefix.split_path();
        entry_list(vfs, bucket, path, name, prefix.grouped(), &mut list).await
    };

    match result {
        Ok(()) => Ok(list),
        Err(err) if err.is_not_found() => Ok(ObjectList::default()),
        Err(err) => Err(err),
    }
}

/// One level of the prefix walk; recurses into subdirectories when grouping
/// is off.
fn entry_list<'a>(
    vfs: &'a Vfs,
    bucket: &'a str,
    fd_path: &'a str,
    name: &'a str,
    add_prefix: bool,
    list: &'a mut ObjectList,
) -> BoxFuture<'a, Result<(), FsError>> {
    async move {
        let full_path = join(bucket, fd_path);
        let entries = vfs.readdir(&full_path).await?;

        for entry in entries {
            if !entry.name.starts_with(name) {
                continue;
            }
            let object_path = join(fd_path, &entry.name);

            if entry.is_dir {
                if add_prefix {
                    list.add_prefix(format!("{}/", url_encode_key(&object_path)));
                } else {
                    entry_list(vfs, bucket, &object_path, "", false, list).await?;
                }
            } else {
                list.add(ObjectInfo {
                    key: url_encode_key(&object_path),
                    last_modified: entry.modified,
                    e_tag: format_etag(entry.hash.as_deref()),
                    size: entry.size,
                    storage_class: StorageClass::Standard,
                });
            }
        }
        Ok(())
    }
    .boxed()
}

/// Full recursive walk keeping only keys that start with `raw_prefix`.
fn walk_filtered<'a>(
    vfs: &'a Vfs,
    bucket: &'a str,
    fd_path: &'a str,
    raw_prefix: &'a str,
    list: &'a mut ObjectList,
) -> BoxFuture<'a, Result<(), FsError>> {
    async move {
        let full_path = join(bucket, fd_path);
        let entries = vfs.readdir(&full_path).await?;

        for entry in entries {
            let object_path = join(fd_path, &entry.name);
            if entry.is_dir {
                walk_filtered(vfs, bucket, &object_path, raw_prefix, list).await?;
            } else if object_path.starts_with(raw_prefix) {
                list.add(ObjectInfo {
                    key: url_encode_key(&object_path),
                    last_modified: entry.modified,
                    e_tag: format_etag(entry.hash.as_deref()),
                    size: entry.size,
                    storage_class: StorageClass::Standard,
                });
            }
        }
        Ok(())
    }
    .boxed()
}

/// Join two slash-separated path fragments.
fn join(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_owned(),
        (_, true) => base.to_owned(),
        _ => format!("{base}/{rest}"),
    }
}

/// Apply the pagination window to a collected listing.
///
/// Contents and common prefixes are merged into one key space, ordered
/// lexicographically by encoded key, filtered past the marker, and cut at
/// `max_keys`. The marker of a follow-up page is the last key returned.
#[must_use]
pub fn paginate(list: ObjectList, page: &Page) -> ListBucketPage {
    enum Item {
        Content(ObjectInfo),
        Prefix(CommonPrefix),
    }

    impl Item {
        fn key(&self) -> &str {
            match self {
                Self::Content(info) => &info.key,
                Self::Prefix(prefix) => &prefix.prefix,
            }
        }
    }

    let mut items: Vec<Item> = list
        .contents
        .into_iter()
        .map(Item::Content)
        .chain(list.common_prefixes.into_iter().map(Item::Prefix))
        .collect();
    items.sort_by(|a, b| a.key().cmp(b.key()));

    if let Some(marker) = page.marker.as_deref() {
        items.retain(|item| item.key() > marker);
    }

    let total = items.len() as u64;
    let truncated = page.max_keys < total;
    items.truncate(usize::try_from(page.max_keys).unwrap_or(usize::MAX));

    let next_marker = if truncated {
        items.last().map(|item| item.key().to_owned())
    } else {
        None
    };

    let mut result = ListBucketPage {
        is_truncated: truncated && page.max_keys > 0,
        next_marker: if page.max_keys > 0 { next_marker } else { None },
        ..ListBucketPage::default()
    };
    for item in items {
        match item {
            Item::Content(info) => result.contents.push(info),
            Item::Prefix(prefix) => result.common_prefixes.push(prefix),
        }
    }
    result
}
