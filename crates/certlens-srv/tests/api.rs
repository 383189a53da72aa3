//! Integration tests for the certificate API handlers.
//!
//! Uses `tower::ServiceExt::oneshot` to call the router without binding a
//! socket; every test gets its own temporary certificate tree.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use certlens::DomainErrorPolicy;
use certlens_srv::{build_router, AppState, ServerConfig};
use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt; // .oneshot()

// ── Helpers ──────────────────────────────────────────────────

struct Tree {
    dir: TempDir,
}

impl Tree {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("live")).unwrap();
        fs::create_dir_all(dir.path().join("archive")).unwrap();
        Self { dir }
    }

    fn config(&self, policy: DomainErrorPolicy) -> ServerConfig {
        ServerConfig {
            live_dir: self.dir.path().join("live"),
            archive_dir: self.dir.path().join("archive"),
            on_domain_error: policy,
            ..ServerConfig::default()
        }
    }

    fn app(&self, policy: DomainErrorPolicy) -> axum::Router {
        build_router(AppState::from_config(&self.config(policy)))
    }

    /// certbot-style layout: versioned files in archive/, symlinks in live/.
    fn install(&self, domain: &str, sans: &[&str], days: i64) {
        let root_key = KeyPair::generate().unwrap();
        let mut root_params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "Integration Root");
        root_params.distinguished_name = dn;
        root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let root = root_params.self_signed(&root_key).unwrap();

        let names: Vec<String> = sans.iter().map(|s| (*s).to_string()).collect();
        let mut params = CertificateParams::new(names).unwrap();
        params.not_before = OffsetDateTime::now_utc() - Duration::days(1);
        params.not_after = OffsetDateTime::now_utc() + Duration::days(days);
        let key = KeyPair::generate().unwrap();
        let leaf = params.signed_by(&key, &root, &root_key).unwrap();

        let archive = self.dir.path().join("archive").join(domain);
        let live = self.dir.path().join("live").join(domain);
        fs::create_dir_all(&archive).unwrap();
        fs::create_dir_all(&live).unwrap();

        let files = [
            ("privkey", key.serialize_pem()),
            ("fullchain", format!("{}{}", leaf.pem(), root.pem())),
            ("cert", leaf.pem()),
        ];
        for (stem, body) in files {
            let versioned = archive.join(format!("{stem}1.pem"));
            fs::write(&versioned, body).unwrap();
            symlink(&versioned, live.join(format!("{stem}.pem"))).unwrap();
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ── Listing ──────────────────────────────────────────────────

#[tokio::test]
async fn empty_tree_lists_nothing() {
    let tree = Tree::new();
    let resp = tree
        .app(DomainErrorPolicy::LogAndSkip)
        .oneshot(get_req("/certificates"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::json!([]));
}

#[tokio::test]
async fn verified_domain_is_listed_with_ui_fields() {
    let tree = Tree::new();
    tree.install("example.com", &["example.com", "www.example.com"], 45);

    let resp = tree
        .app(DomainErrorPolicy::LogAndSkip)
        .oneshot(get_req("/certificates"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["path"], "example.com");
    assert_eq!(record["valid"], true);
    assert_eq!(record["days_left"], 45);
    assert_eq!(record["domains"], serde_json::json!(["example.com", "www.example.com"]));
    assert!(record["expiry"].as_str().unwrap().ends_with(&format!(
        "UTC {}",
        (OffsetDateTime::now_utc() + Duration::days(45)).year()
    )));
    assert!(record["cert"].as_str().unwrap().ends_with("archive/example.com/cert1.pem"));
    assert!(record["chain"].as_str().unwrap().ends_with("archive/example.com/fullchain1.pem"));
    assert!(record["priv_key"].as_str().unwrap().ends_with("archive/example.com/privkey1.pem"));
}

#[tokio::test]
async fn broken_domain_does_not_fail_the_listing() {
    let tree = Tree::new();
    tree.install("good.example", &["good.example"], 30);
    fs::create_dir_all(tree.path().join("live/broken.example")).unwrap();

    let resp = tree
        .app(DomainErrorPolicy::LogAndSkip)
        .oneshot(get_req("/certificates"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let domains: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert_eq!(domains, ["good.example"]);
}

#[tokio::test]
async fn collect_policy_reports_invalid_domains() {
    let tree = Tree::new();
    fs::create_dir_all(tree.path().join("live/broken.example")).unwrap();

    let resp = tree
        .app(DomainErrorPolicy::CollectAsInvalid)
        .oneshot(get_req("/certificates"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        serde_json::json!([{ "path": "broken.example" }])
    );
}

#[tokio::test]
async fn abort_policy_answers_500() {
    let tree = Tree::new();
    fs::create_dir_all(tree.path().join("live/broken.example")).unwrap();

    let resp = tree
        .app(DomainErrorPolicy::Abort)
        .oneshot(get_req("/certificates"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(resp).await.as_str().unwrap().contains("privkey.pem"));
}

// ── Download ─────────────────────────────────────────────────

#[tokio::test]
async fn download_writes_zip_and_returns_path() {
    let tree = Tree::new();
    tree.install("example.com", &["example.com"], 30);

    let resp = tree
        .app(DomainErrorPolicy::LogAndSkip)
        .oneshot(get_req("/download/example.com"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let expected = tree.path().join("archive/example.com.zip");
    assert_eq!(
        body_json(resp).await,
        serde_json::json!({ "path": expected.display().to_string() })
    );

    let archive = zip::ZipArchive::new(fs::File::open(&expected).unwrap()).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        [
            "example.com/",
            "example.com/cert1.pem",
            "example.com/fullchain1.pem",
            "example.com/privkey1.pem",
        ]
    );
}

#[tokio::test]
async fn download_of_unknown_domain_is_500() {
    let tree = Tree::new();
    let resp = tree
        .app(DomainErrorPolicy::LogAndSkip)
        .oneshot(get_req("/download/nope.example"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(resp).await.as_str().unwrap().contains("nope.example"));
}

#[tokio::test]
async fn download_rejects_parent_directory() {
    let tree = Tree::new();
    let resp = tree
        .app(DomainErrorPolicy::LogAndSkip)
        .oneshot(get_req("/download/.."))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!tree.path().join("archive/...zip").exists());
}
