fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use pcs_protocol::{
        ApiErrorBody, FileList, OAuthErrorBody, QuotaInfo, RemoteFile, TmpfileResponse,
        TokenResponse,
    };
    use pcs_transfer::{MemorySource, UploadDescriptor};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  Rust:   {reserialized}"
        );
        parsed
    }

    // --- Response bodies ---

    #[test]
    fn fixture_quota_info() {
        let quota: QuotaInfo = roundtrip_test("quota_info.json");
        assert_eq!(quota.free(), quota.quota - quota.used);
    }

    #[test]
    fn fixture_upload_response() {
        let file: RemoteFile = roundtrip_test("upload_response.json");
        assert_eq!(file.path, "/apps/test_sdk/test.txt");
    }

    #[test]
    fn fixture_tmpfile_response() {
        let resp: TmpfileResponse = roundtrip_test("tmpfile_response.json");
        assert_eq!(resp.md5.as_str(), "a7619410ef4c2f3e6ec1e0324209d8b1");
    }

    #[test]
    fn fixture_file_list() {
        let list: FileList = roundtrip_test("file_list.json");
        assert_eq!(list.list.len(), 2);
        assert!(list.list[0].is_dir());
        assert!(!list.list[1].is_dir());
    }

    #[test]
    fn fixture_api_error() {
        let err: ApiErrorBody = roundtrip_test("api_error.json");
        assert_eq!(err.error_code, pcs_protocol::constants::error_code::FILE_ALREADY_EXISTS);
    }

    #[test]
    fn fixture_token_response() {
        let token: TokenResponse = roundtrip_test("token_response.json");
        assert_eq!(token.expires_in, 2_592_000);
    }

    #[test]
    fn fixture_oauth_error() {
        let err: OAuthErrorBody = roundtrip_test("oauth_error.json");
        assert_eq!(err.error, "expired_token");
    }

    // --- Tolerance of extra and missing fields ---

    #[test]
    fn upload_response_ignores_request_id() {
        let json = r#"{
            "path": "/apps/test_sdk/test.txt",
            "size": 6,
            "md5": "e80b5017098950fc58aad83c8c14978e",
            "fs_id": 1,
            "request_id": 4043312669
        }"#;
        let file: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.ctime, 0, "missing field should default to 0");
    }

    #[test]
    fn token_response_without_refresh_token() {
        let json = r#"{"access_token": "1.abc", "expires_in": 3600}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(token.refresh_token.is_empty());
        assert!(token.scope.is_empty());
    }

    #[test]
    fn api_error_without_message() {
        let err: ApiErrorBody = serde_json::from_str(r#"{"error_code": 31066}"#).unwrap();
        assert!(err.error_msg.is_empty());
        assert_eq!(err.request_id, None);
    }

    // --- Rapid upload descriptors ---

    fn fixture_content(vector: &serde_json::Value) -> Vec<u8> {
        if let Some(content) = vector["content"].as_str() {
            return content.as_bytes().to_vec();
        }
        let size = vector["size"].as_u64().unwrap() as usize;
        match vector["pattern"].as_str() {
            Some("mod251") => (0..size).map(|i| (i % 251) as u8).collect(),
            other => panic!("unknown content pattern {other:?}"),
        }
    }

    #[test]
    fn fixture_rapid_descriptors() {
        let vectors = load_fixture("rapid_descriptors.json");
        for vector in vectors.as_array().unwrap() {
            let data = fixture_content(vector);
            let expected = UploadDescriptor {
                size: vector["size"].as_u64().unwrap(),
                content_md5: vector["content_md5"].as_str().unwrap().to_string(),
                content_crc32: vector["content_crc32"].as_str().unwrap().to_string(),
                slice_md5: vector["slice_md5"].as_str().unwrap().to_string(),
            };

            assert_eq!(UploadDescriptor::from_bytes(&data), expected);

            let mut source = MemorySource::new(data);
            let streamed = UploadDescriptor::compute(&mut source).unwrap();
            assert_eq!(streamed, expected, "streamed descriptor of {} bytes", expected.size);
        }
    }
}
