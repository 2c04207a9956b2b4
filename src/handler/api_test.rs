use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode, header};
use base64::Engine as _;
use image::{Rgb, RgbImage};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::app_router;
use crate::config::AppConfig;
use crate::media::test_support::{gif_bytes, png_bytes};
use crate::media::{Content, encode_png};
use crate::panel::PanelId;
use crate::state::AppState;
use crate::state::test_support::test_state;

const BOUNDARY: &str = "matrix-test-boundary";
const DEVICE_PEER: &str = "10.0.0.7:50123";

struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    data: Vec<u8>,
}

fn text(name: &'static str, value: &str) -> Part<'static> {
    Part {
        name,
        filename: None,
        data: value.as_bytes().to_vec(),
    }
}

fn file<'a>(name: &'a str, filename: &'a str, data: Vec<u8>) -> Part<'a> {
    Part {
        name,
        filename: Some(filename),
        data,
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
            ),
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn setup(config: AppConfig) -> (Router, Arc<AppState>, tempfile::TempDir) {
    let (state, dir) = test_state(config).await;
    let peer: SocketAddr = DEVICE_PEER.parse().unwrap();
    let app = app_router(state.clone()).layer(MockConnectInfo(peer));
    (app, state, dir)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

// ------------------------------------------------------------------------
// Panels
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_read_panel_png() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/panel/A"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let image = image::load_from_memory(&body).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (64, 64));

    assert!(state.panels.connected(PanelId::A).await);
    assert!(!state.panels.connected(PanelId::B).await);
}

#[tokio::test]
async fn test_unknown_panel_is_bad_request() {
    let (app, _state, _dir) = setup(AppConfig::default()).await;
    let (status, body) = send_json(&app, empty_request("GET", "/panel/C")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("panel"));
}

// ------------------------------------------------------------------------
// Upload
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_upload_gif_both() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let request = multipart_request(
        "/upload",
        &[
            text("mode", "both"),
            file("file_a", "loop.gif", gif_bytes(&[100, 100, 100])),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    // no telemetry and nothing stored: the push has nowhere to go
    assert_eq!(body["push"]["status"], "skipped");

    for id in PanelId::ALL {
        match state.panels.content(id).await {
            Content::Animation(animation) => assert_eq!(animation.frames().len(), 3),
            Content::Static { .. } => panic!("panel {} should animate", id),
        }
    }

    let (status, body) = send_json(&app, empty_request("GET", "/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["panels"][0]["content"], "animation");
    assert_eq!(body["panels"][1]["frames"], 3);
    assert_eq!(body["sync"]["delivered"], 0);
}

#[tokio::test]
async fn test_upload_single_panel() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let request = multipart_request(
        "/upload",
        &[
            text("mode", "matrix_b"),
            file("file_a", "green.png", png_bytes(16, 16, [0, 200, 0])),
        ],
    );
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let b = state.panels.read(PanelId::B).await;
    assert_eq!(b.get_pixel(10, 10).0, [0, 200, 0]);
    let a = state.panels.read(PanelId::A).await;
    assert_eq!(a.get_pixel(10, 10).0, [0, 0, 0]);
}

#[tokio::test]
async fn test_upload_separate() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let request = multipart_request(
        "/upload",
        &[
            text("mode", "separate"),
            file("file_a", "red.png", png_bytes(8, 8, [255, 0, 0])),
            file("file_b", "blue.png", png_bytes(8, 8, [0, 0, 255])),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    assert_eq!(state.panels.read(PanelId::A).await.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(state.panels.read(PanelId::B).await.get_pixel(0, 0).0, [0, 0, 255]);
}

#[tokio::test]
async fn test_upload_rejects_bad_forms() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let png = || png_bytes(8, 8, [255, 255, 255]);

    let cases = vec![
        vec![file("file_a", "a.png", png())],
        vec![text("mode", "diagonal"), file("file_a", "a.png", png())],
        vec![text("mode", "both")],
        vec![text("mode", "separate"), file("file_a", "a.png", png())],
    ];
    for parts in cases {
        let (status, body) = send_json(&app, multipart_request("/upload", &parts)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert!(body["error"].is_string());
    }

    // nothing was applied
    assert_eq!(state.panels.content(PanelId::A).await.kind(), "static");
    assert_eq!(state.panels.read(PanelId::A).await.get_pixel(0, 0).0, [0, 0, 0]);
}

#[tokio::test]
async fn test_corrupt_media_leaves_panels_alone() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let request = multipart_request(
        "/upload",
        &[
            text("mode", "separate"),
            file("file_a", "a.png", png_bytes(8, 8, [255, 0, 0])),
            file("file_b", "b.png", b"definitely not an image".to_vec()),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unsupported or corrupt media"));
    assert_eq!(state.panels.read(PanelId::A).await.get_pixel(0, 0).0, [0, 0, 0]);
}

// ------------------------------------------------------------------------
// Draw and clear
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_draw_splits_across_panels() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let canvas = RgbImage::from_fn(128, 64, |x, _| {
        if x < 64 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
    });
    let encoded = base64::engine::general_purpose::STANDARD.encode(encode_png(&canvas).unwrap());
    let request = json_request(
        "POST",
        "/draw",
        json!({ "image": format!("data:image/png;base64,{}", encoded) }),
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    assert_eq!(state.panels.read(PanelId::A).await.get_pixel(32, 32).0, [255, 0, 0]);
    assert_eq!(state.panels.read(PanelId::B).await.get_pixel(32, 32).0, [0, 0, 255]);
}

#[tokio::test]
async fn test_draw_requires_image() {
    let (app, _state, _dir) = setup(AppConfig::default()).await;
    for body in [json!({}), json!({ "image": "" }), json!({ "image": "@@@" })] {
        let (status, _) = send_json(&app, json_request("POST", "/draw", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let request = Request::builder()
        .method("POST")
        .uri("/draw")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    let request = multipart_request(
        "/upload",
        &[
            text("mode", "both"),
            file("file_a", "loop.gif", gif_bytes(&[100, 100])),
        ],
    );
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    let (status, body) = send_json(&app, empty_request("POST", "/clear?panel=a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], json!(["A"]));
    assert_eq!(state.panels.content(PanelId::A).await.kind(), "static");
    assert_eq!(state.panels.content(PanelId::B).await.kind(), "animation");

    let (status, body) = send_json(&app, empty_request("POST", "/clear")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], json!(["A", "B"]));
    assert_eq!(state.panels.content(PanelId::B).await.kind(), "static");

    let (status, _) = send_json(&app, empty_request("POST", "/clear?panel=c")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ------------------------------------------------------------------------
// Device, telemetry and settings
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_telemetry_round_trip() {
    let (app, state, _dir) = setup(AppConfig::default()).await;

    let (status, body) = send_json(&app, empty_request("GET", "/telemetry")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["snapshot"].is_null());
    assert!(body["age_secs"].is_null());

    let request = json_request("POST", "/telemetry", json!({ "ssid": "shop", "temp_c": 41.5 }));
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    let (_, body) = send_json(&app, empty_request("GET", "/telemetry")).await;
    assert_eq!(body["snapshot"]["ssid"], "shop");
    assert_eq!(body["snapshot"]["ip"], "10.0.0.7");
    assert_eq!(body["snapshot"]["source_addr"], "10.0.0.7");
    assert!(body["age_secs"].is_number());
    assert_eq!(state.device_address().await.as_deref(), Some("10.0.0.7"));

    let request = json_request("POST", "/telemetry", json!([1, 2, 3]));
    assert_eq!(send(&app, request).await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_device_config_is_a_heartbeat() {
    let (app, state, _dir) = setup(AppConfig::default()).await;
    assert!(state.heartbeat.age().await.is_none());

    let (status, body) = send_json(&app, empty_request("GET", "/device/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brightness"], 80);
    assert!(state.heartbeat.age().await.is_some());
    assert_eq!(state.device_address().await.as_deref(), Some("10.0.0.7"));

    let (_, body) = send_json(&app, empty_request("GET", "/status")).await;
    assert_eq!(body["device"]["address"], "10.0.0.7");
}

#[tokio::test]
async fn test_settings_update() {
    let (app, _state, _dir) = setup(AppConfig::default()).await;

    let request = json_request("POST", "/settings", json!({ "brightness": 50, "rotation": 180 }));
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["push_queued"], true);

    let (_, body) = send_json(&app, empty_request("GET", "/settings")).await;
    assert_eq!(body["device"]["brightness"], 50);
    assert_eq!(body["device"]["rotation"], 180);

    let request = json_request("POST", "/settings", json!({ "rotation": 45 }));
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send_json(&app, empty_request("GET", "/device/config")).await;
    assert_eq!(body["rotation"], 180);
}

#[tokio::test]
async fn test_device_files_unreachable() {
    let (app, _state, _dir) = setup(AppConfig::default()).await;
    let (status, body) = send_json(&app, empty_request("GET", "/device/files")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("device unreachable"));

    let (status, body) = send_json(&app, empty_request("POST", "/device/stop")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "skipped");
}

// ------------------------------------------------------------------------
// Stored files
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_stored_files() {
    let (app, _state, _dir) = setup(AppConfig::default()).await;

    let request = multipart_request("/files", &[file("file", "clip.gif", gif_bytes(&[100, 100]))]);
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["name"], "clip.gif");
    assert_eq!(body["push"]["status"], "skipped");

    let (_, body) = send_json(&app, empty_request("GET", "/files")).await;
    assert_eq!(body, json!(["clip.gif"]));

    let (status, body) = send_json(&app, empty_request("POST", "/files/clip.gif/play")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "skipped");

    let (status, _) = send_json(&app, empty_request("POST", "/files/other.gif/play")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send_json(&app, empty_request("DELETE", "/files/clip.gif")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["local"], true);
    assert_eq!(body["remote"]["status"], "skipped");
    assert_eq!(body["summary"], "local_only");

    let (_, body) = send_json(&app, empty_request("DELETE", "/files/clip.gif")).await;
    assert_eq!(body["summary"], "neither");
}

#[tokio::test]
async fn test_failed_local_delete_still_reaches_device() {
    let (app, _state, dir) = setup(AppConfig::default()).await;
    // a directory where the file should be makes the local delete fail
    tokio::fs::create_dir_all(dir.path().join("media").join("clip.gif"))
        .await
        .unwrap();

    let (status, body) = send_json(&app, empty_request("DELETE", "/files/clip.gif")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["local"], false);
    assert!(body["local_error"].is_string());
    assert_eq!(body["remote"]["status"], "skipped");
    assert_eq!(body["summary"], "neither");

    // with a reachable device the remote side still goes through
    let device = Router::new().route(
        "/api/files/{name}",
        axum::routing::delete(|| async { StatusCode::OK }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let device_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, device).await.unwrap();
    });
    let request = json_request(
        "POST",
        "/telemetry",
        json!({ "ip": device_addr.to_string() }),
    );
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    let (status, body) = send_json(&app, empty_request("DELETE", "/files/clip.gif")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["local"], false);
    assert_eq!(body["remote"]["status"], "delivered");
    assert_eq!(body["summary"], "remote_only");
}

#[tokio::test]
async fn test_stored_file_needs_a_plain_name() {
    let (app, _state, _dir) = setup(AppConfig::default()).await;
    let request = multipart_request("/files", &[file("file", "../up.gif", gif_bytes(&[100]))]);
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ------------------------------------------------------------------------
// Identity gate
// ------------------------------------------------------------------------

#[tokio::test]
async fn test_operator_endpoints_need_token() {
    let config = AppConfig {
        api_token: Some("s3cret".to_string()),
        ..AppConfig::default()
    };
    let (app, _state, _dir) = setup(config).await;

    let (status, body) = send_json(&app, empty_request("POST", "/clear")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let request = Request::builder()
        .method("POST")
        .uri("/clear")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    // device-facing endpoints stay open
    assert_eq!(send(&app, empty_request("GET", "/panel/B")).await.0, StatusCode::OK);
    assert_eq!(send(&app, empty_request("GET", "/device/config")).await.0, StatusCode::OK);
}
