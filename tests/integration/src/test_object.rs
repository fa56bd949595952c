//! Object round-trip, range, and delete tests against a local-mode gateway.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::Method;

    use crate::{s3, send_s3_request, start_local_gateway, ACCESS_KEY, SECRET_KEY};

    async fn gateway_with_bucket() -> (crate::TestGateway, reqwest::Client) {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();
        let response = s3(
            &client,
            Method::PUT,
            &format!("{}/bucket", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 200);
        (gateway, client)
    }

    #[tokio::test]
    async fn test_should_round_trip_object_body() {
        let (gateway, client) = gateway_with_bucket().await;
        let url = format!("{}/bucket/dir/hello.txt", gateway.base_url);
        let body = Bytes::from("hello through the gateway");

        let response = s3(&client, Method::PUT, &url, body.clone()).await;
        assert_eq!(response.status(), 200);
        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned)
            .expect("etag header");
        assert!(etag.starts_with('"') && etag.ends_with('"'));

        let response = s3(&client, Method::GET, &url, Bytes::new()).await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok()),
            Some(body.len().to_string().as_str())
        );
        let data = response.bytes().await.expect("body");
        assert_eq!(data, body);
    }

    #[tokio::test]
    async fn test_should_serve_byte_range() {
        let (gateway, client) = gateway_with_bucket().await;
        let url = format!("{}/bucket/blob.bin", gateway.base_url);
        let body: Bytes = (0..1024u32).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into();

        let response = s3(&client, Method::PUT, &url, body.clone()).await;
        assert_eq!(response.status(), 200);

        let response = send_s3_request(
            &client,
            Method::GET,
            &url,
            Bytes::new(),
            &[("range", "bytes=100-199")],
            ACCESS_KEY,
            SECRET_KEY,
        )
        .await;
        assert_eq!(response.status(), 206);
        assert_eq!(
            response
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok()),
            Some("bytes 100-199/1024")
        );
        let data = response.bytes().await.expect("body");
        assert_eq!(data.len(), 100);
        assert_eq!(&data[..], &body[100..200]);
    }

    #[tokio::test]
    async fn test_should_reject_unsatisfiable_range() {
        let (gateway, client) = gateway_with_bucket().await;
        let url = format!("{}/bucket/small.txt", gateway.base_url);

        let response = s3(&client, Method::PUT, &url, Bytes::from("abc")).await;
        assert_eq!(response.status(), 200);

        let response = send_s3_request(
            &client,
            Method::GET,
            &url,
            Bytes::new(),
            &[("range", "bytes=100-")],
            ACCESS_KEY,
            SECRET_KEY,
        )
        .await;
        assert_eq!(response.status(), 416);
    }

    #[tokio::test]
    async fn test_should_succeed_deleting_missing_object_twice() {
        let (gateway, client) = gateway_with_bucket().await;
        let url = format!("{}/bucket/never-existed", gateway.base_url);

        for _ in 0..2 {
            let response = s3(&client, Method::DELETE, &url, Bytes::new()).await;
            assert_eq!(response.status(), 204);
        }
    }

    #[tokio::test]
    async fn test_should_return_no_such_key_for_missing_object() {
        let (gateway, client) = gateway_with_bucket().await;
        let response = s3(
            &client,
            Method::GET,
            &format!("{}/bucket/ghost", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 404);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>NoSuchKey</Code>"));
    }

    #[tokio::test]
    async fn test_should_reject_mismatched_content_md5() {
        let (gateway, client) = gateway_with_bucket().await;
        let url = format!("{}/bucket/file", gateway.base_url);

        // MD5 of a different payload.
        use base64::Engine;
        let wrong = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        let response = send_s3_request(
            &client,
            Method::PUT,
            &url,
            Bytes::from("real content"),
            &[("content-md5", wrong.as_str())],
            ACCESS_KEY,
            SECRET_KEY,
        )
        .await;
        assert_eq!(response.status(), 400);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>BadDigest</Code>"));

        // The failed put must not have created the object.
        let response = s3(&client, Method::GET, &url, Bytes::new()).await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_should_copy_object_between_keys() {
        let (gateway, client) = gateway_with_bucket().await;
        let src = format!("{}/bucket/src.txt", gateway.base_url);
        let dst = format!("{}/bucket/copies/dst.txt", gateway.base_url);

        let response = s3(&client, Method::PUT, &src, Bytes::from("copied payload")).await;
        assert_eq!(response.status(), 200);

        let response = send_s3_request(
            &client,
            Method::PUT,
            &dst,
            Bytes::new(),
            &[("x-amz-copy-source", "/bucket/src.txt")],
            ACCESS_KEY,
            SECRET_KEY,
        )
        .await;
        assert_eq!(response.status(), 200);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<CopyObjectResult"));

        let response = s3(&client, Method::GET, &dst, Bytes::new()).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.bytes().await.expect("body"), "copied payload");
    }

    #[tokio::test]
    async fn test_should_delete_multiple_objects_in_one_request() {
        let (gateway, client) = gateway_with_bucket().await;
        for name in ["one", "two"] {
            let response = s3(
                &client,
                Method::PUT,
                &format!("{}/bucket/{name}", gateway.base_url),
                Bytes::from("x"),
            )
            .await;
            assert_eq!(response.status(), 200);
        }

        let body = Bytes::from(
            "<Delete><Object><Key>one</Key></Object><Object><Key>two</Key></Object></Delete>",
        );
        let response = s3(
            &client,
            Method::POST,
            &format!("{}/bucket?delete", gateway.base_url),
            body,
        )
        .await;
        assert_eq!(response.status(), 200);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Deleted><Key>one</Key></Deleted>"));
        assert!(xml.contains("<Deleted><Key>two</Key></Deleted>"));

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/bucket/one", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_should_serve_user_metadata_on_head() {
        let (gateway, client) = gateway_with_bucket().await;
        let url = format!("{}/bucket/tagged.txt", gateway.base_url);

        let response = send_s3_request(
            &client,
            Method::PUT,
            &url,
            Bytes::from("x"),
            &[("x-amz-meta-color", "blue")],
            ACCESS_KEY,
            SECRET_KEY,
        )
        .await;
        assert_eq!(response.status(), 200);

        let response = s3(&client, Method::HEAD, &url, Bytes::new()).await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response
                .headers()
                .get("x-amz-meta-color")
                .and_then(|v| v.to_str().ok()),
            Some("blue")
        );
    }
}
