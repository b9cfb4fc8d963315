use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use tripdata_loader::download::Downloader;
use tripdata_loader::store;
use tripdata_loader::tasks::{ServiceKind, Task};

const YELLOW_BODY: &[u8] = b"VendorID,tpep_pickup_datetime\n1,2019-01-01 00:46:40\n";
const GREEN_BODY: &[u8] = b"VendorID,lpep_pickup_datetime\n2,2019-01-01 00:10:16\n";

async fn yellow() -> impl IntoResponse {
    (StatusCode::OK, YELLOW_BODY)
}

// release assets answer with a redirect to the storage host
async fn green_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/assets/green.csv.gz")])
}

async fn green_asset() -> impl IntoResponse {
    (StatusCode::OK, GREEN_BODY)
}

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route(
            "/releases/download/yellow/yellow_tripdata_2019-01.csv.gz",
            get(yellow),
        )
        .route(
            "/releases/download/green/green_tripdata_2019-01.csv.gz",
            get(green_redirect),
        )
        .route("/assets/green.csv.gz", get(green_asset));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn downloader(addr: SocketAddr, scratch: &std::path::Path) -> Downloader {
    let base_url = format!("http://{}/releases", addr);
    let source = store::http(&base_url).unwrap();
    Downloader::new(Arc::new(source), base_url, scratch)
}

#[tokio::test]
async fn fetches_asset_from_release_url() {
    let (addr, _server) = start_server().await;
    let scratch = tempfile::tempdir().unwrap();

    let result = downloader(addr, scratch.path())
        .fetch(Task::new(ServiceKind::Yellow, "2019", "01"))
        .await;

    let local = result.local_path.expect("download should succeed");
    assert_eq!(local, scratch.path().join("yellow_tripdata_2019-01.csv.gz"));
    assert_eq!(std::fs::read(&local).unwrap(), YELLOW_BODY);
}

#[tokio::test]
async fn follows_redirects() {
    let (addr, _server) = start_server().await;
    let scratch = tempfile::tempdir().unwrap();

    let result = downloader(addr, scratch.path())
        .fetch(Task::new(ServiceKind::Green, "2019", "01"))
        .await;

    let local = result.local_path.expect("redirected download should succeed");
    assert_eq!(std::fs::read(&local).unwrap(), GREEN_BODY);
}

#[tokio::test]
async fn unpublished_month_is_a_failed_result() {
    let (addr, _server) = start_server().await;
    let scratch = tempfile::tempdir().unwrap();
    let task = Task::new(ServiceKind::Yellow, "2019", "02");

    let result = downloader(addr, scratch.path()).fetch(task.clone()).await;

    assert_eq!(result.local_path, None);
    assert!(!scratch.path().join(task.file_name()).exists());
}
