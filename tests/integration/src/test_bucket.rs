//! Bucket lifecycle tests against a local-mode gateway.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::Method;

    use crate::{s3, start_local_gateway};

    #[tokio::test]
    async fn test_should_create_head_and_delete_bucket() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();
        let url = format!("{}/bucket", gateway.base_url);

        let response = s3(&client, Method::PUT, &url, Bytes::new()).await;
        assert_eq!(response.status(), 200);

        let response = s3(&client, Method::HEAD, &url, Bytes::new()).await;
        assert_eq!(response.status(), 200);

        let response = s3(&client, Method::DELETE, &url, Bytes::new()).await;
        assert_eq!(response.status(), 204);

        let response = s3(&client, Method::HEAD, &url, Bytes::new()).await;
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_should_list_created_buckets() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        for name in ["alpha", "beta"] {
            let url = format!("{}/{name}", gateway.base_url);
            let response = s3(&client, Method::PUT, &url, Bytes::new()).await;
            assert_eq!(response.status(), 200);
        }

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Name>alpha</Name>"));
        assert!(xml.contains("<Name>beta</Name>"));
        assert!(xml.contains("ListAllMyBucketsResult"));
    }

    #[tokio::test]
    async fn test_should_return_conflict_for_existing_bucket() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();
        let url = format!("{}/bucket", gateway.base_url);

        let response = s3(&client, Method::PUT, &url, Bytes::new()).await;
        assert_eq!(response.status(), 200);

        let response = s3(&client, Method::PUT, &url, Bytes::new()).await;
        assert_eq!(response.status(), 409);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>BucketAlreadyExists</Code>"));
    }

    #[tokio::test]
    async fn test_should_refuse_deleting_non_empty_bucket() {
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

        let response = s3(
            &client,
            Method::PUT,
            &format!("{}/bucket/file.txt", gateway.base_url),
            Bytes::from("content"),
        )
        .await;
        assert_eq!(response.status(), 200);

        let response = s3(
            &client,
            Method::DELETE,
            &format!("{}/bucket", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 409);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>BucketNotEmpty</Code>"));
    }
}
