use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use url::Url;
use watch_core::digest;
use watch_engine::{
    FingerprintStore, FsObjectStore, HttpObjectStore, ObjectStore, StoreError, DEFAULT_STATE_KEY,
};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fs_state(dir: &TempDir) -> FingerprintStore {
    FingerprintStore::new(Arc::new(FsObjectStore::new(dir.path())), DEFAULT_STATE_KEY)
}

fn http_store(server: &MockServer) -> Arc<dyn ObjectStore> {
    let base = Url::parse(&format!("{}/bucket", server.uri())).unwrap();
    Arc::new(HttpObjectStore::new(base, Duration::from_secs(2)).unwrap())
}

#[tokio::test]
async fn missing_object_reads_as_absent() {
    let temp = TempDir::new().unwrap();
    let state = fs_state(&temp);

    assert_eq!(state.read_last_fingerprint().await.unwrap(), None);
}

#[tokio::test]
async fn written_fingerprint_reads_back() {
    let temp = TempDir::new().unwrap();
    let state = fs_state(&temp);

    state.write_fingerprint(&digest(b"hello")).await.unwrap();

    assert_eq!(
        fs::read_to_string(temp.path().join(DEFAULT_STATE_KEY)).unwrap(),
        digest(b"hello").as_str()
    );
    assert_eq!(
        state.read_last_fingerprint().await.unwrap(),
        Some(digest(b"hello"))
    );
}

#[tokio::test]
async fn repeated_write_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let state = fs_state(&temp);
    let path = temp.path().join(DEFAULT_STATE_KEY);

    state.write_fingerprint(&digest(b"hello")).await.unwrap();
    let first = fs::read(&path).unwrap();
    state.write_fingerprint(&digest(b"hello")).await.unwrap();

    assert_eq!(fs::read(&path).unwrap(), first);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn value_with_trailing_newline_is_accepted() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(DEFAULT_STATE_KEY),
        format!("{}\n", digest(b"hello")),
    )
    .unwrap();

    assert_eq!(
        fs_state(&temp).read_last_fingerprint().await.unwrap(),
        Some(digest(b"hello"))
    );
}

#[tokio::test]
async fn garbage_value_is_corrupt_not_absent() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(DEFAULT_STATE_KEY), "not a fingerprint").unwrap();

    let err = fs_state(&temp).read_last_fingerprint().await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }), "{err:?}");

    fs::write(temp.path().join(DEFAULT_STATE_KEY), [0xff, 0xfe, 0x00]).unwrap();
    let err = fs_state(&temp).read_last_fingerprint().await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }), "{err:?}");
}

#[tokio::test]
async fn unreadable_object_is_an_error() {
    let temp = TempDir::new().unwrap();
    // A directory where the object should be cannot be read as bytes.
    fs::create_dir(temp.path().join(DEFAULT_STATE_KEY)).unwrap();

    let err = fs_state(&temp).read_last_fingerprint().await.unwrap_err();
    assert!(!matches!(err, StoreError::Corrupt { .. }), "{err:?}");
}

#[tokio::test]
async fn staging_file_is_released_after_write() {
    let temp = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let state = fs_state(&temp).with_staging_dir(staging.path());

    state.write_fingerprint(&digest(b"world")).await.unwrap();

    assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn staging_failure_leaves_store_untouched() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("no-such-staging-dir");
    let state = fs_state(&temp).with_staging_dir(&missing);

    let err = state.write_fingerprint(&digest(b"world")).await.unwrap_err();

    assert!(matches!(err, StoreError::Staging(_)), "{err:?}");
    assert!(!temp.path().join(DEFAULT_STATE_KEY).exists());
}

#[tokio::test]
async fn http_store_maps_not_found_to_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bucket/last_website_hash.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let state = FingerprintStore::new(http_store(&server), DEFAULT_STATE_KEY);
    assert_eq!(state.read_last_fingerprint().await.unwrap(), None);
}

#[tokio::test]
async fn http_store_distinguishes_errors_from_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bucket/denied"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bucket/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = http_store(&server);
    assert!(matches!(
        store.get("denied").await,
        Err(StoreError::PermissionDenied { .. })
    ));
    assert!(matches!(
        store.get("broken").await,
        Err(StoreError::Unavailable(_))
    ));
}

#[tokio::test]
async fn http_store_reads_and_puts_fingerprint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bucket/last_website_hash.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(digest(b"hello").as_str()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/bucket/last_website_hash.txt"))
        .and(body_string(digest(b"world").as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let state = FingerprintStore::new(http_store(&server), DEFAULT_STATE_KEY);
    assert_eq!(
        state.read_last_fingerprint().await.unwrap(),
        Some(digest(b"hello"))
    );
    state.write_fingerprint(&digest(b"world")).await.unwrap();
}

#[tokio::test]
async fn http_put_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/bucket/last_website_hash.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let state = FingerprintStore::new(http_store(&server), DEFAULT_STATE_KEY);
    let err = state.write_fingerprint(&digest(b"world")).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "{err:?}");
}

#[tokio::test]
async fn fs_store_creates_missing_root_on_put() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("state");
    let store = FsObjectStore::new(&root);

    assert_eq!(store.get("hash.txt").await.unwrap(), None);
    assert!(!root.exists());

    store.put("hash.txt", b"hello").await.unwrap();
    assert!(root.is_dir());
    assert_eq!(fs::read_to_string(root.join("hash.txt")).unwrap(), "hello");
}

#[tokio::test]
async fn fs_put_replaces_existing_object() {
    let temp = TempDir::new().unwrap();
    let store = FsObjectStore::new(temp.path());

    store.put("hash.txt", b"hello").await.unwrap();
    store.put("hash.txt", b"world").await.unwrap();

    assert_eq!(store.get("hash.txt").await.unwrap(), Some(b"world".to_vec()));
    // Only the target remains; the staging file was renamed away.
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn fs_put_into_file_root_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let file_root = temp.path().join("not_a_dir");
    fs::write(&file_root, "x").unwrap();

    let store = FsObjectStore::new(&file_root);
    let err = store.put("hash.txt", b"data").await.unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)), "{err:?}");
    assert_eq!(fs::read_to_string(&file_root).unwrap(), "x");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn fs_store_rejects_oversized_object() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(DEFAULT_STATE_KEY), vec![b'a'; 4096]).unwrap();

    let err = fs_state(&temp).read_last_fingerprint().await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }), "{err:?}");

    let small = FsObjectStore::new(temp.path()).with_max_object_bytes(16);
    fs::write(temp.path().join("small.txt"), vec![b'a'; 17]).unwrap();
    assert!(matches!(
        small.get("small.txt").await,
        Err(StoreError::Corrupt { .. })
    ));
}

#[tokio::test]
async fn http_store_rejects_oversized_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bucket/last_website_hash.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; 1 << 20]))
        .mount(&server)
        .await;

    let state = FingerprintStore::new(http_store(&server), DEFAULT_STATE_KEY);
    let err = state.read_last_fingerprint().await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }), "{err:?}");
}

#[tokio::test]
async fn http_store_accepts_body_at_the_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bucket/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; 64]))
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/bucket", server.uri())).unwrap();
    let store = HttpObjectStore::new(base, Duration::from_secs(2))
        .unwrap()
        .with_max_object_bytes(64);
    assert_eq!(store.get("blob").await.unwrap(), Some(vec![b'a'; 64]));
}

#[tokio::test]
async fn uppercase_stored_value_is_normalised() {
    let temp = TempDir::new().unwrap();
    let upper = digest(b"hello").as_str().to_ascii_uppercase();
    fs::write(temp.path().join(DEFAULT_STATE_KEY), format!("{upper}\n")).unwrap();

    assert_eq!(
        fs_state(&temp).read_last_fingerprint().await.unwrap(),
        Some(digest(b"hello"))
    );
}
