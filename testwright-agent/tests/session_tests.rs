mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use common::MockBrowser;
use testwright::{BrowserEngine, Cookie, Page};
use testwright_agent::{Identity, SecretString, SessionStore};

fn identity() -> Identity {
    Identity::new("standard_user", SecretString::new("secret_sauce"), "https://shop.example/login")
}

fn live_cookie() -> Cookie {
    Cookie {
        name: "session".to_string(),
        value: "live".to_string(),
        domain: "shop.example".to_string(),
        path: "/".to_string(),
        expiry: None,
    }
}

fn store_in(dir: &TempDir) -> SessionStore {
    SessionStore::new(dir.path()).with_settle(Duration::from_millis(1))
}

#[tokio::test]
async fn live_artifact_validates_without_injection() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let identity = identity();
    store.save(&identity, vec![live_cookie()]);

    let engine = Arc::new(MockBrowser::new());
    let page = Page::open(engine.clone() as Arc<dyn BrowserEngine>).await.unwrap();

    assert!(store.validate(&page, &identity).await);
    assert_eq!(engine.fill_count(), 0, "validation must not drive the login form");
    assert!(store.cache_path(&identity).exists());
}

#[tokio::test]
async fn rejected_artifact_is_invalid_and_deleted() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let identity = identity();
    store.save(&identity, vec![live_cookie()]);

    let engine = Arc::new(MockBrowser::rejecting_restored_cookies());
    let page = Page::open(engine as Arc<dyn BrowserEngine>).await.unwrap();

    assert!(!store.validate(&page, &identity).await);
    assert!(!store.cache_path(&identity).exists(), "failed validation must self-heal");
}

#[tokio::test]
async fn absent_cache_is_simply_invalid() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let page = Page::open(Arc::new(MockBrowser::new()) as Arc<dyn BrowserEngine>).await.unwrap();

    assert!(!store.validate(&page, &identity()).await);
}

#[test]
fn malformed_cache_file_is_deleted_on_load() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let identity = identity();

    fs::create_dir_all(dir.path()).unwrap();
    fs::write(store.cache_path(&identity), "{ not json").unwrap();

    assert!(store.load(&identity).is_none());
    assert!(!store.cache_path(&identity).exists(), "corrupt file must be removed");
}

#[test]
fn artifact_roundtrips_and_never_holds_secrets() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let identity = identity();
    store.save(&identity, vec![live_cookie()]);

    let artifact = store.load(&identity).unwrap();
    assert_eq!(artifact.cookies, vec![live_cookie()]);

    let raw = fs::read_to_string(store.cache_path(&identity)).unwrap();
    assert!(!raw.contains("secret_sauce"));
    assert!(!raw.contains("standard_user"), "only the one-way hash names the identity");
}

#[cfg(unix)]
#[test]
fn cache_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let identity = identity();
    store.save(&identity, vec![live_cookie()]);

    let mode = fs::metadata(store.cache_path(&identity)).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn clear_removes_the_cache_file() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let identity = identity();
    store.save(&identity, vec![live_cookie()]);

    store.clear(&identity);
    assert!(store.load(&identity).is_none());
}
