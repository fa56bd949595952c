//! The S3-to-filesystem translation backend.
//!
//! Every operation resolves the caller's access-key to an identity-bound
//! filesystem view first, then speaks plain filesystem verbs against it.
//! Buckets are root directories, objects are files, user metadata lives in
//! the in-process overlay.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use md5::{Digest, Md5};
use tracing::{debug, warn};

use davgate_s3_model::input::{Page, Prefix, RangeRequest};
use davgate_s3_model::output::{
    CopyObjectOutput, GetObjectOutput, ListBucketPage, ListBucketsOutput, ObjectHead,
    PutObjectOutput,
};
use davgate_s3_model::types::{BucketInfo, Owner};
use davgate_s3_model::{S3Error, S3ErrorCode};

use crate::identity::VfsFactory;
use crate::list::{list_objects, paginate};
use crate::meta::MetaStore;
use crate::utils::{format_etag, parse_float_time, url_encode_key};
use crate::vfs::{FsError, Vfs, VfsNode};

/// The translation backend: S3 semantics over per-identity filesystem views.
#[derive(Debug)]
pub struct S3Backend {
    factory: VfsFactory,
    meta: MetaStore,
}

impl S3Backend {
    /// Create a backend over the given factory.
    #[must_use]
    pub fn new(factory: VfsFactory) -> Self {
        Self {
            factory,
            meta: MetaStore::new(),
        }
    }

    /// Resolve the filesystem view for this request's identity.
    fn vfs(&self, access_key: &str) -> Result<Arc<Vfs>, S3Error> {
        self.factory
            .get_or_create(access_key)
            .map_err(|e| S3Error::internal_error(e.to_string()))
    }

    /// List root directories as buckets. Plain files at the root are
    /// silently dropped.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when the remote rejects the bearer; `InternalError`
    /// for other failures.
    pub async fn list_buckets(&self, access_key: &str) -> Result<ListBucketsOutput, S3Error> {
        let vfs = self.vfs(access_key)?;
        let entries = vfs.readdir("").await.map_err(root_err)?;

        let buckets = entries
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| BucketInfo {
                name: url_encode_key(&entry.name),
                creation_date: entry.modified,
            })
            .collect();

        Ok(ListBucketsOutput {
            owner: Owner::default(),
            buckets,
        })
    }

    /// Create a bucket directory.
    ///
    /// # Errors
    ///
    /// `BucketAlreadyExists` when the directory is already there.
    pub async fn create_bucket(&self, access_key: &str, bucket: &str) -> Result<(), S3Error> {
        let vfs = self.vfs(access_key)?;

        match vfs.stat(bucket).await {
            Ok(_) => {
                return Err(S3Error::new(S3ErrorCode::BucketAlreadyExists).with_resource(bucket))
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(root_err(err)),
        }

        vfs.mkdir(bucket).await.map_err(|err| match err {
            FsError::AlreadyExists(_) => {
                S3Error::new(S3ErrorCode::BucketAlreadyExists).with_resource(bucket)
            }
            other => root_err(other),
        })
    }

    /// Delete an empty bucket directory.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` when absent, `BucketNotEmpty` when the directory still
    /// has children.
    pub async fn delete_bucket(&self, access_key: &str, bucket: &str) -> Result<(), S3Error> {
        let vfs = self.vfs(access_key)?;
        vfs.stat(bucket)
            .await
            .map_err(|err| bucket_err(err, bucket))?;

        vfs.remove_empty_dir(bucket)
            .await
            .map_err(|err| match err {
                FsError::Unauthorized(_) => S3Error::new(S3ErrorCode::AccessDenied),
                _ => S3Error::new(S3ErrorCode::BucketNotEmpty).with_resource(bucket),
            })
    }

    /// Whether the bucket directory exists.
    ///
    /// # Errors
    ///
    /// `AccessDenied` when the remote rejects the bearer.
    pub async fn bucket_exists(&self, access_key: &str, bucket: &str) -> Result<bool, S3Error> {
        let vfs = self.vfs(access_key)?;
        match vfs.stat(bucket).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(FsError::Unauthorized(_)) => Err(S3Error::new(S3ErrorCode::AccessDenied)),
            Err(err) => Err(S3Error::internal_error(err.to_string())),
        }
    }

    /// List objects under `prefix` and apply the pagination window.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` when the bucket is absent.
    pub async fn list_bucket(
        &self,
        access_key: &str,
        bucket: &str,
        prefix: &Prefix,
        page: &Page,
    ) -> Result<ListBucketPage, S3Error> {
        let vfs = self.vfs(access_key)?;
        vfs.stat(bucket)
            .await
            .map_err(|err| bucket_err(err, bucket))?;

        let list = list_objects(&vfs, bucket, prefix)
            .await
            .map_err(|err| object_err(err, prefix.prefix.as_str()))?;
        Ok(paginate(list, page))
    }

    /// Fetch object metadata.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` / `NoSuchKey` when absent.
    pub async fn head_object(
        &self,
        access_key: &str,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectHead, S3Error> {
        let vfs = self.vfs(access_key)?;
        let (_, head) = self.stat_object(&vfs, bucket, key).await?;
        Ok(head)
    }

    /// Fetch an object, optionally a byte range of it.
    ///
    /// # Errors
    ///
    /// `NoSuchKey` for missing objects, `InvalidRange` for unsatisfiable
    /// ranges.
    pub async fn get_object(
        &self,
        access_key: &str,
        bucket: &str,
        key: &str,
        range: Option<RangeRequest>,
    ) -> Result<GetObjectOutput, S3Error> {
        let vfs = self.vfs(access_key)?;
        let (node, head) = self.stat_object(&vfs, bucket, key).await?;

        let window = match range {
            Some(request) => Some(request.resolve(node.size)?),
            None => None,
        };

        let fp = join(bucket, key);
        let body = vfs
            .read(&fp, window)
            .await
            .map_err(|err| object_err(err, key))?;

        Ok(GetObjectOutput {
            head,
            body,
            range: window,
        })
    }

    /// Store an object: ensure the directory chain, verify Content-MD5,
    /// upload, record metadata, and apply a metadata-borne mtime.
    ///
    /// A zero-length body is a touch: the file is created when absent,
    /// existing content is left alone, metadata is always updated.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` when the bucket is absent, `BadDigest` on an MD5
    /// mismatch.
    pub async fn put_object(
        &self,
        access_key: &str,
        bucket: &str,
        key: &str,
        meta: HashMap<String, String>,
        body: Bytes,
        content_md5: Option<[u8; 16]>,
    ) -> Result<PutObjectOutput, S3Error> {
        let vfs = self.vfs(access_key)?;
        vfs.stat(bucket)
            .await
            .map_err(|err| bucket_err(err, bucket))?;

        let digest: [u8; 16] = Md5::digest(&body).into();
        if let Some(expected) = content_md5 {
            if digest != expected {
                return Err(S3Error::new(S3ErrorCode::BadDigest).with_resource(key));
            }
        }

        let fp = join(bucket, key);
        if let Some((dir, _)) = key.rsplit_once('/') {
            self.mkdir_chain(&vfs, bucket, dir).await?;
        }

        if body.is_empty() {
            self.touch(&vfs, &fp, meta).await?;
            return Ok(PutObjectOutput {
                e_tag: format_etag(Some(&digest)),
            });
        }

        if let Err(err) = vfs.write(&fp, body).await {
            // Never leave a half-written object behind.
            if let Err(cleanup) = vfs.remove(&fp).await {
                debug!(path = %fp, error = %cleanup, "failed to remove partial object");
            }
            return Err(object_err(err, key));
        }

        self.meta.store(&fp, meta.clone());
        self.apply_meta_mtime(&vfs, &fp, &meta).await;

        Ok(PutObjectOutput {
            e_tag: format_etag(Some(&digest)),
        })
    }

    /// Server-side copy.
    ///
    /// A copy onto the same path updates metadata (and possibly mtime) only.
    /// Otherwise the source is read, its metadata merged under the caller's
    /// (never overwriting, never carrying `X-Amz-Acl`), and written to the
    /// destination.
    ///
    /// # Errors
    ///
    /// `NoSuchKey` when the source is absent; destination failures as in
    /// [`S3Backend::put_object`].
    pub async fn copy_object(
        &self,
        access_key: &str,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        mut meta: HashMap<String, String>,
    ) -> Result<CopyObjectOutput, S3Error> {
        let vfs = self.vfs(access_key)?;
        let src_fp = join(src_bucket, src_key);

        if src_bucket == dst_bucket && src_key == dst_key {
            let node = vfs
                .stat(&src_fp)
                .await
                .map_err(|err| object_err(err, src_key))?;
            self.meta.store(&src_fp, meta.clone());
            self.apply_meta_mtime(&vfs, &src_fp, &meta).await;
            return Ok(CopyObjectOutput {
                e_tag: format_etag(node.hash.as_deref()),
                last_modified: node.modified,
            });
        }

        let (node, head) = self.stat_object(&vfs, src_bucket, src_key).await?;

        // Source metadata fills the gaps the caller left; ACL never travels.
        for (name, value) in &head.metadata {
            if name != "X-Amz-Acl" && !meta.contains_key(name) {
                meta.insert(name.clone(), value.clone());
            }
        }
        meta.entry("Content-Type".to_owned())
            .or_insert_with(|| head.content_type.clone());
        meta.entry("mtime".to_owned())
            .or_insert_with(|| crate::utils::time_to_float_string(&node.modified));

        let body = vfs
            .read(&src_fp, None)
            .await
            .map_err(|err| object_err(err, src_key))?
            .collect()
            .await
            .map_err(|err| S3Error::internal_error(format!("failed to read copy source: {err}")))?;

        self.put_object(access_key, dst_bucket, dst_key, meta, body, None)
            .await?;

        Ok(CopyObjectOutput {
            e_tag: format_etag(node.hash.as_deref()),
            last_modified: node.modified,
        })
    }

    /// Delete an object. Deleting a missing key succeeds, matching S3.
    /// Afterwards, now-empty parent directories up to (excluding) the bucket
    /// are pruned best-effort.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` when the bucket is absent.
    pub async fn delete_object(
        &self,
        access_key: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), S3Error> {
        let vfs = self.vfs(access_key)?;
        vfs.stat(bucket)
            .await
            .map_err(|err| bucket_err(err, bucket))?;

        let fp = join(bucket, key);
        match vfs.remove(&fp).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(object_err(err, key)),
        }
        self.meta.remove(&fp);

        self.prune_empty_parents(&vfs, bucket, key).await;
        Ok(())
    }

    /// Delete a batch of keys. Per-key failures are reported, not fatal.
    pub async fn delete_multi(
        &self,
        access_key: &str,
        bucket: &str,
        keys: impl IntoIterator<Item = String>,
    ) -> davgate_s3_model::output::DeleteObjectsOutput {
        use davgate_s3_model::types::{DeleteErrorEntry, DeletedObject};

        let mut output = davgate_s3_model::output::DeleteObjectsOutput::default();
        for key in keys {
            match self.delete_object(access_key, bucket, &key).await {
                Ok(()) => output.deleted.push(DeletedObject { key }),
                Err(err) => {
                    warn!(bucket, key, error = %err, "multi-delete entry failed");
                    output.errors.push(DeleteErrorEntry {
                        key,
                        code: S3ErrorCode::InternalError.as_str().to_owned(),
                        message: S3ErrorCode::InternalError.default_message().to_owned(),
                    });
                }
            }
        }
        output
    }

    /// Stat bucket and object, building the response head.
    async fn stat_object(
        &self,
        vfs: &Vfs,
        bucket: &str,
        key: &str,
    ) -> Result<(VfsNode, ObjectHead), S3Error> {
        vfs.stat(bucket)
            .await
            .map_err(|err| bucket_err(err, bucket))?;

        let fp = join(bucket, key);
        let node = vfs.stat(&fp).await.map_err(|err| object_err(err, key))?;
        if node.is_dir {
            return Err(S3Error::no_such_key(key));
        }

        let stored = self.meta.load(&fp).unwrap_or_default();
        let content_type = stored
            .get("Content-Type")
            .cloned()
            .or_else(|| node.content_type.clone())
            .unwrap_or_else(|| {
                mime_guess::from_path(&node.name)
                    .first_or_octet_stream()
                    .to_string()
            });

        let head = ObjectHead {
            content_length: node.size,
            content_type,
            last_modified: node.modified,
            e_tag: format_etag(node.hash.as_deref()),
            metadata: stored,
        };
        Ok((node, head))
    }

    /// Create every missing directory between the bucket and `dir`.
    async fn mkdir_chain(&self, vfs: &Vfs, bucket: &str, dir: &str) -> Result<(), S3Error> {
        let mut current = bucket.to_owned();
        for segment in dir.split('/').filter(|s| !s.is_empty()) {
            current = format!("{current}/{segment}");
            match vfs.mkdir(&current).await {
                Ok(()) | Err(FsError::AlreadyExists(_)) => {}
                Err(err) => return Err(object_err(err, &current)),
            }
        }
        Ok(())
    }

    /// Touch: create the file when absent, leave content alone otherwise,
    /// always refresh metadata.
    async fn touch(
        &self,
        vfs: &Vfs,
        fp: &str,
        meta: HashMap<String, String>,
    ) -> Result<(), S3Error> {
        match vfs.stat(fp).await {
            Ok(_) => {}
            Err(err) if err.is_not_found() => {
                vfs.write(fp, Bytes::new())
                    .await
                    .map_err(|err| object_err(err, fp))?;
            }
            Err(err) => return Err(object_err(err, fp)),
        }

        self.meta.store(fp, meta.clone());
        self.apply_meta_mtime(vfs, fp, &meta).await;
        Ok(())
    }

    /// Apply a metadata-borne modification time, tolerating failure: the
    /// object is already stored, a refused PROPPATCH must not fail the put.
    async fn apply_meta_mtime(&self, vfs: &Vfs, fp: &str, meta: &HashMap<String, String>) {
        let value = meta
            .get("X-Amz-Meta-Mtime")
            .or_else(|| meta.get("mtime"));
        let Some(mtime) = value.and_then(|v| parse_float_time(v)) else {
            return;
        };
        if let Err(err) = vfs.set_modified(fp, mtime).await {
            debug!(path = %fp, error = %err, "failed to apply metadata mtime");
        }
    }

    /// Remove now-empty parent directories of `key`, stopping at the bucket.
    /// Best-effort: concurrent writers may race a directory back into
    /// existence, and any failure simply ends the pruning.
    async fn prune_empty_parents(&self, vfs: &Vfs, bucket: &str, key: &str) {
        let mut dir = key;
        loop {
            let Some((parent, _)) = dir.rsplit_once('/') else {
                break;
            };
            dir = parent;
            let fp = join(bucket, dir);
            if let Err(err) = vfs.remove_empty_dir(&fp).await {
                debug!(path = %fp, error = %err, "stopping directory pruning");
                break;
            }
        }
    }
}

/// Join bucket and key into a full path.
fn join(bucket: &str, key: &str) -> String {
    let key = key.trim_matches('/');
    if key.is_empty() {
        bucket.to_owned()
    } else {
        format!("{bucket}/{key}")
    }
}

/// Failures touching the filesystem root (bucket listing).
fn root_err(err: FsError) -> S3Error {
    match err {
        FsError::Unauthorized(_) => S3Error::new(S3ErrorCode::AccessDenied),
        other => S3Error::internal_error(other.to_string()),
    }
}

/// Failures in bucket context: absence means `NoSuchBucket`.
fn bucket_err(err: FsError, bucket: &str) -> S3Error {
    match err {
        FsError::NotFound(_) => S3Error::no_such_bucket(bucket),
        FsError::Unauthorized(_) => S3Error::new(S3ErrorCode::AccessDenied),
        other => S3Error::internal_error(other.to_string()),
    }
}

/// Failures in object context: absence means `NoSuchKey`.
fn object_err(err: FsError, key: &str) -> S3Error {
    match err {
        FsError::NotFound(_) => S3Error::no_such_key(key),
        FsError::Unauthorized(_) => S3Error::new(S3ErrorCode::AccessDenied),
        other => S3Error::internal_error(other.to_string()),
    }
}
