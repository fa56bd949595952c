//! The gateway's `S3Handler` implementation: parse operation inputs, call
//! the backend, render outputs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use davgate_s3_http::request::{
    extract_metadata, parse_content_md5, parse_copy_source, parse_list_params, parse_range,
};
use davgate_s3_http::response::{created_bucket, no_content, ok_empty, IntoS3Response};
use davgate_s3_http::{RoutingContext, S3Handler, S3ResponseBody};
use davgate_s3_model::input::{ListDialect, Page};
use davgate_s3_model::output::{ListObjectsOutput, ListObjectsV2Output};
use davgate_s3_model::{S3Error, S3ErrorCode, S3Operation};
use davgate_s3_xml::parse_delete_request;

use crate::backend::S3Backend;
use crate::utils::{decode_continuation_token, encode_continuation_token, url_encode_key};

/// Handler wiring the HTTP layer to the translation backend.
#[derive(Debug, Clone)]
pub struct GatewayHandler {
    backend: Arc<S3Backend>,
}

impl GatewayHandler {
    /// Create a handler over the backend.
    #[must_use]
    pub fn new(backend: Arc<S3Backend>) -> Self {
        Self { backend }
    }

    async fn handle(
        backend: Arc<S3Backend>,
        access_key: String,
        op: S3Operation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let ak = access_key.as_str();
        match op {
            S3Operation::ListBuckets => {
                backend.list_buckets(ak).await?.into_s3_response()
            }
            S3Operation::CreateBucket => {
                let bucket = require_bucket(&ctx)?;
                backend.create_bucket(ak, bucket).await?;
                created_bucket(bucket)
            }
            S3Operation::DeleteBucket => {
                let bucket = require_bucket(&ctx)?;
                backend.delete_bucket(ak, bucket).await?;
                no_content()
            }
            S3Operation::HeadBucket => {
                let bucket = require_bucket(&ctx)?;
                if backend.bucket_exists(ak, bucket).await? {
                    ok_empty()
                } else {
                    Err(S3Error::no_such_bucket(bucket))
                }
            }
            S3Operation::ListObjects => {
                Self::list(backend, ak, &ctx, ListDialect::V1).await
            }
            S3Operation::ListObjectsV2 => {
                Self::list(backend, ak, &ctx, ListDialect::V2).await
            }
            S3Operation::HeadObject => {
                let (bucket, key) = require_object(&ctx)?;
                backend.head_object(ak, bucket, key).await?.into_s3_response()
            }
            S3Operation::GetObject => {
                let (bucket, key) = require_object(&ctx)?;
                let range = parse_range(&parts)?;
                backend
                    .get_object(ak, bucket, key, range)
                    .await?
                    .into_s3_response()
            }
            S3Operation::PutObject => {
                let (bucket, key) = require_object(&ctx)?;
                let meta = extract_metadata(&parts.headers);
                let content_md5 = parse_content_md5(&parts)?;
                backend
                    .put_object(ak, bucket, key, meta, body, content_md5)
                    .await?
                    .into_s3_response()
            }
            S3Operation::CopyObject => {
                let (dst_bucket, dst_key) = require_object(&ctx)?;
                let (src_bucket, src_key) = parse_copy_source(&parts)?;
                let meta = extract_metadata(&parts.headers);
                backend
                    .copy_object(ak, &src_bucket, &src_key, dst_bucket, dst_key, meta)
                    .await?
                    .into_s3_response()
            }
            S3Operation::DeleteObject => {
                let (bucket, key) = require_object(&ctx)?;
                backend.delete_object(ak, bucket, key).await?;
                no_content()
            }
            S3Operation::DeleteObjects => {
                let bucket = require_bucket(&ctx)?;
                let delete = parse_delete_request(&body)
                    .map_err(|_| S3Error::new(S3ErrorCode::MalformedXML))?;
                let mut output = backend
                    .delete_multi(
                        ak,
                        bucket,
                        delete.objects.into_iter().map(|obj| obj.key),
                    )
                    .await;
                if delete.quiet {
                    output.deleted.clear();
                }
                output.into_s3_response()
            }
        }
    }

    /// Shared listing path for both dialects.
    async fn list(
        backend: Arc<S3Backend>,
        ak: &str,
        ctx: &RoutingContext,
        dialect: ListDialect,
    ) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let bucket = require_bucket(ctx)?;
        let params = parse_list_params(ctx)?;
        let prefix = params.prefix();

        let marker = match dialect {
            ListDialect::V1 => params.marker.clone(),
            ListDialect::V2 => match &params.continuation_token {
                Some(token) => Some(decode_continuation_token(token)?),
                None => params.start_after.clone(),
            },
        };

        let page = Page {
            marker,
            max_keys: params.max_keys,
        };
        let result = backend.list_bucket(ak, bucket, &prefix, &page).await?;

        match dialect {
            ListDialect::V1 => ListObjectsOutput {
                name: url_encode_key(bucket),
                prefix: url_encode_key(&params.prefix),
                delimiter: params.delimiter.clone(),
                marker: params.marker.map(|m| url_encode_key(&m)).unwrap_or_default(),
                max_keys: params.max_keys,
                page: result,
            }
            .into_s3_response(),
            ListDialect::V2 => {
                let next_continuation_token = result
                    .next_marker
                    .as_deref()
                    .map(encode_continuation_token);
                ListObjectsV2Output {
                    name: url_encode_key(bucket),
                    prefix: url_encode_key(&params.prefix),
                    delimiter: params.delimiter.clone(),
                    continuation_token: params.continuation_token,
                    next_continuation_token,
                    start_after: params.start_after.map(|s| url_encode_key(&s)),
                    max_keys: params.max_keys,
                    page: result,
                }
                .into_s3_response()
            }
        }
    }
}

impl S3Handler for GatewayHandler {
    fn handle_operation(
        &self,
        access_key: String,
        op: S3Operation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<S3ResponseBody>, S3Error>> + Send>>
    {
        let backend = Arc::clone(&self.backend);
        Box::pin(Self::handle(backend, access_key, op, parts, body, ctx))
    }
}

fn require_bucket(ctx: &RoutingContext) -> Result<&str, S3Error> {
    ctx.bucket
        .as_deref()
        .ok_or_else(|| S3Error::with_message(S3ErrorCode::InvalidRequest, "missing bucket name"))
}

fn require_object(ctx: &RoutingContext) -> Result<(&str, &str), S3Error> {
    let bucket = require_bucket(ctx)?;
    let key = ctx
        .key
        .as_deref()
        .ok_or_else(|| S3Error::with_message(S3ErrorCode::InvalidRequest, "missing object key"))?;
    Ok((bucket, key))
}
