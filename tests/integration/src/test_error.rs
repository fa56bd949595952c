//! Authentication and protocol error responses.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::Method;

    use crate::{s3, send_s3_request, start_local_gateway, ACCESS_KEY};

    #[tokio::test]
    async fn test_should_reject_wrong_secret_with_signature_mismatch() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = send_s3_request(
            &client,
            Method::GET,
            &format!("{}/", gateway.base_url),
            Bytes::new(),
            &[],
            ACCESS_KEY,
            "WrongSecret",
        )
        .await;
        assert_eq!(response.status(), 403);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>SignatureDoesNotMatch</Code>"));
    }

    #[tokio::test]
    async fn test_should_reject_unknown_access_key() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = send_s3_request(
            &client,
            Method::GET,
            &format!("{}/", gateway.base_url),
            Bytes::new(),
            &[],
            "NobodyKnowsThisKey",
            "whatever",
        )
        .await;
        assert_eq!(response.status(), 403);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>InvalidAccessKeyId</Code>"));
    }

    #[tokio::test]
    async fn test_should_reject_unsigned_request_in_verified_mode() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/", gateway.base_url))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn test_should_answer_unserved_subresources_with_not_implemented() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/bucket?versioning", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 501);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>NotImplemented</Code>"));
    }

    #[tokio::test]
    async fn test_should_report_missing_bucket_on_listing() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/ghost-bucket", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 404);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Code>NoSuchBucket</Code>"));
    }

    #[tokio::test]
    async fn test_should_serve_health_endpoint_without_auth() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/health", gateway.base_url))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 200);
        let body = response.text().await.expect("body");
        assert!(body.contains("\"status\":\"running\""));
    }

    #[tokio::test]
    async fn test_should_tag_responses_with_request_id() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert!(response.headers().contains_key("x-amz-request-id"));
        assert_eq!(
            response
                .headers()
                .get("server")
                .and_then(|v| v.to_str().ok()),
            Some("DavGate")
        );
    }
}
