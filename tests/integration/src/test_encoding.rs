//! Key-encoding round-trips with hostile file names.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::Method;

    use crate::{encode_key_path, s3, start_local_gateway};

    /// Pull the URL-encoded keys out of a listing document.
    fn extract_keys(xml: &str) -> Vec<String> {
        xml.split("<Key>")
            .skip(1)
            .filter_map(|rest| rest.split("</Key>").next())
            .map(ToOwned::to_owned)
            .collect()
    }

    #[tokio::test]
    async fn test_should_round_trip_weird_key_through_listing() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = s3(
            &client,
            Method::PUT,
            &format!("{}/mybucket", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 200);

        let key = "ä#/नेपाल&/?/ file with w€r^d ch@r \\#~+§4%&'. txt ";
        let url = format!(
            "{}/mybucket/{}",
            gateway.base_url,
            encode_key_path(key)
        );
        let response = s3(&client, Method::PUT, &url, Bytes::from("contents")).await;
        assert_eq!(response.status(), 200);

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/mybucket?list-type=2", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let xml = response.text().await.expect("body");

        let keys = extract_keys(&xml);
        assert_eq!(keys.len(), 1, "expected exactly one key in {xml}");
        let decoded = percent_encoding::percent_decode_str(&keys[0])
            .decode_utf8()
            .expect("utf8");
        assert_eq!(decoded, key);
    }

    #[tokio::test]
    async fn test_should_fetch_weird_key_back_byte_for_byte() {
        let gateway = start_local_gateway().await;
        let client = reqwest::Client::new();

        let response = s3(
            &client,
            Method::PUT,
            &format!("{}/mybucket", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 200);

        let key = " file with w€r^d ch@r \\#~+§4%&'. txt ";
        let url = format!("{}/mybucket/{}", gateway.base_url, encode_key_path(key));
        let body = Bytes::from("weird but intact");

        let response = s3(&client, Method::PUT, &url, body.clone()).await;
        assert_eq!(response.status(), 200);

        let response = s3(&client, Method::GET, &url, Bytes::new()).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.bytes().await.expect("body"), body);
    }

    #[tokio::test]
    async fn test_should_not_leak_nested_keys_in_delimited_listing() {
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

        for key in ["top.txt", "dir/nested.txt", "dir/deeper/leaf.txt"] {
            let url = format!("{}/bucket/{}", gateway.base_url, encode_key_path(key));
            let response = s3(&client, Method::PUT, &url, Bytes::from("x")).await;
            assert_eq!(response.status(), 200);
        }

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/bucket?delimiter=%2F", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let xml = response.text().await.expect("body");

        for key in extract_keys(&xml) {
            assert!(!key.contains('/'), "delimited listing leaked nested key {key}");
        }
        assert!(xml.contains("<CommonPrefixes><Prefix>dir/</Prefix></CommonPrefixes>"));
    }

    #[tokio::test]
    async fn test_should_list_recursively_with_prefix() {
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

        for key in ["photos/cat.jpg", "photos/2024/dog.jpg", "docs/readme.md"] {
            let url = format!("{}/bucket/{}", gateway.base_url, encode_key_path(key));
            let response = s3(&client, Method::PUT, &url, Bytes::from("x")).await;
            assert_eq!(response.status(), 200);
        }

        let response = s3(
            &client,
            Method::GET,
            &format!("{}/bucket?prefix=photos%2F", gateway.base_url),
            Bytes::new(),
        )
        .await;
        assert_eq!(response.status(), 200);
        let xml = response.text().await.expect("body");
        let mut keys = extract_keys(&xml);
        keys.sort();
        assert_eq!(keys, vec!["photos/2024/dog.jpg", "photos/cat.jpg"]);
    }
}
