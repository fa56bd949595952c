//! Bearer-token forwarding against a mock WebDAV upstream.
//!
//! The defining property of the gateway: the S3 access-key of each request
//! must reach the WebDAV server verbatim as `Authorization: Bearer <key>`,
//! with zero cross-contamination between concurrent identities.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::Method;

    use crate::{send_s3_request, start_forwarding_gateway, start_mock_webdav};

    #[tokio::test]
    async fn test_should_forward_access_key_as_bearer_on_list_buckets() {
        let upstream = start_mock_webdav().await;
        let gateway = start_forwarding_gateway(&upstream.url).await;
        let client = reqwest::Client::new();

        let response = send_s3_request(
            &client,
            Method::GET,
            &format!("{}/", gateway.base_url),
            Bytes::new(),
            &[],
            "KeyOfAlice",
            "irrelevant-in-forwarding-mode",
        )
        .await;
        assert_eq!(response.status(), 200);
        let xml = response.text().await.expect("body");
        assert!(xml.contains("<Name>bucket</Name>"));
        assert!(xml.contains("<Name>bucket2</Name>"));

        let requests = upstream.requests();
        assert!(!requests.is_empty(), "upstream saw no requests");
        for request in &requests {
            assert_eq!(
                request.authorization.as_deref(),
                Some("Bearer KeyOfAlice"),
                "{} {} carried the wrong credential",
                request.method,
                request.path
            );
        }
        assert!(requests.iter().any(|r| r.method == "PROPFIND"));
    }

    #[tokio::test]
    async fn test_should_keep_bearers_isolated_across_concurrent_puts() {
        let upstream = start_mock_webdav().await;
        let gateway = start_forwarding_gateway(&upstream.url).await;

        let users = [
            "KeyOfUserAlice",
            "KeyOfUserBob",
            "KeyOfUserCarol",
            "KeyOfUserDavid",
        ];

        let mut handles = Vec::new();
        for user in users {
            let base_url = gateway.base_url.clone();
            handles.push(tokio::spawn(async move {
                let client = reqwest::Client::new();
                // Each user uploads an object named after their own key.
                let url = format!("{base_url}/bucket/{user}");
                let response = send_s3_request(
                    &client,
                    Method::PUT,
                    &url,
                    Bytes::from(format!("payload of {user}")),
                    &[],
                    user,
                    "irrelevant",
                )
                .await;
                assert_eq!(response.status(), 200, "put failed for {user}");
            }));
        }
        for handle in handles {
            handle.await.expect("task");
        }

        let requests = upstream.requests();
        for user in users {
            let path = format!("/bucket/{user}");
            let puts: Vec<_> = requests
                .iter()
                .filter(|r| r.method == "PUT" && r.path == path)
                .collect();
            assert_eq!(puts.len(), 1, "expected exactly one PUT for {user}");
            assert_eq!(
                puts[0].authorization.as_deref(),
                Some(format!("Bearer {user}").as_str()),
                "bearer cross-contamination for {user}"
            );
        }

        // Stronger: no request at all may carry a bearer that does not
        // belong to the path it touches.
        for request in requests.iter().filter(|r| r.method == "PUT") {
            let bearer = request
                .authorization
                .as_deref()
                .and_then(|a| a.strip_prefix("Bearer "))
                .expect("PUT without bearer");
            assert!(
                request.path.ends_with(bearer),
                "{} was written with {bearer}",
                request.path
            );
        }
    }

    #[tokio::test]
    async fn test_should_forward_distinct_bearers_for_sequential_callers() {
        let upstream = start_mock_webdav().await;
        let gateway = start_forwarding_gateway(&upstream.url).await;
        let client = reqwest::Client::new();

        for user in ["KeyOfAlice", "KeyOfBob"] {
            let response = send_s3_request(
                &client,
                Method::GET,
                &format!("{}/", gateway.base_url),
                Bytes::new(),
                &[],
                user,
                "irrelevant",
            )
            .await;
            assert_eq!(response.status(), 200);
        }

        let bearers: Vec<Option<String>> = upstream
            .requests()
            .iter()
            .map(|r| r.authorization.clone())
            .collect();
        assert!(bearers.contains(&Some("Bearer KeyOfAlice".to_owned())));
        assert!(bearers.contains(&Some("Bearer KeyOfBob".to_owned())));
    }
}
