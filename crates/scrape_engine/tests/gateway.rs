use std::time::Duration;

use scrape_core::{validate, JobCandidate, JobRequest, LaunchError};
use scrape_engine::{GatewaySettings, HttpGateway, LaunchGateway};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PEOPLE_URL: &str = "https://www.linkedin.com/company/acme/people/";

fn request(limit: u32, delay: u32) -> JobRequest {
    validate(&JobCandidate::new(PEOPLE_URL, limit, delay)).expect("valid request")
}

fn gateway(server: &MockServer) -> HttpGateway {
    let settings = GatewaySettings::new(&server.uri()).expect("base url");
    HttpGateway::new(settings).expect("client")
}

async fn mount_start(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/start-scraping"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn success() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "success",
        "message": "Started scraping 25 profiles with 5s delay between profiles."
    }))
}

#[tokio::test]
async fn launch_posts_limit_and_delay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start-scraping"))
        .and(body_json(json!({"limit": 25, "delay": 5, "url": PEOPLE_URL})))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let launched = gateway.launch(&request(25, 5)).await.expect("launch ok");

    assert_eq!(launched.handle.id(), 1);
    assert_eq!(
        launched.message.as_deref(),
        Some("Started scraping 25 profiles with 5s delay between profiles.")
    );
    assert_eq!(gateway.active(), Some(launched.handle));
}

#[tokio::test]
async fn second_launch_while_active_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start-scraping"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let first = gateway.launch(&request(25, 5)).await.expect("first launch");
    let second = gateway.launch(&request(10, 3)).await;

    assert_eq!(second.unwrap_err(), LaunchError::AlreadyRunning);
    assert_eq!(gateway.active(), Some(first.handle));
}

#[tokio::test]
async fn launch_in_flight_blocks_concurrent_launch() {
    let server = MockServer::start().await;
    mount_start(&server, success().set_delay(Duration::from_millis(200))).await;

    let gateway = gateway(&server);
    let first_request = request(25, 5);
    let second_request = request(10, 3);
    let (first, second) = tokio::join!(gateway.launch(&first_request), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        gateway.launch(&second_request).await
    });

    assert!(first.is_ok());
    assert_eq!(second.unwrap_err(), LaunchError::AlreadyRunning);
}

#[tokio::test]
async fn release_frees_the_slot() {
    let server = MockServer::start().await;
    mount_start(&server, success()).await;

    let gateway = gateway(&server);
    let first = gateway.launch(&request(25, 5)).await.expect("first launch");
    gateway.release(first.handle);
    assert_eq!(gateway.active(), None);

    let second = gateway.launch(&request(25, 5)).await.expect("second launch");
    assert_ne!(second.handle, first.handle);
}

#[tokio::test]
async fn worker_error_is_rejected_and_frees_slot() {
    let server = MockServer::start().await;
    mount_start(
        &server,
        ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "playwright not installed"
        })),
    )
    .await;

    let gateway = gateway(&server);
    let err = gateway.launch(&request(25, 5)).await.unwrap_err();

    assert_eq!(
        err,
        LaunchError::Rejected("playwright not installed".to_string())
    );
    assert_eq!(gateway.active(), None);
    // Not AlreadyRunning: the failed launch released its reservation.
    let again = gateway.launch(&request(25, 5)).await.unwrap_err();
    assert!(matches!(again, LaunchError::Rejected(_)));
}

#[tokio::test]
async fn non_json_error_reports_status() {
    let server = MockServer::start().await;
    mount_start(&server, ResponseTemplate::new(502).set_body_string("Bad Gateway")).await;

    let err = gateway(&server)
        .launch(&request(25, 5))
        .await
        .unwrap_err();
    match err {
        LaunchError::Rejected(message) => assert!(message.contains("502")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_worker_is_reported() {
    // Bind then drop to get a local port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let settings = GatewaySettings {
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(1),
        ..GatewaySettings::new(&format!("http://127.0.0.1:{port}")).unwrap()
    };
    let gateway = HttpGateway::new(settings).unwrap();
    let err = gateway.launch(&request(25, 5)).await.unwrap_err();

    assert!(matches!(err, LaunchError::Unreachable(_)));
    assert_eq!(gateway.active(), None);
}

#[tokio::test]
async fn cancel_signals_stop_endpoint() {
    let server = MockServer::start().await;
    mount_start(&server, success()).await;
    Mock::given(method("POST"))
        .and(path("/stop-scraping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway(&server);
    let launched = gateway.launch(&request(25, 5)).await.unwrap();
    gateway.cancel(launched.handle).await.expect("stop signal");
}

#[tokio::test]
async fn open_artifact_relays_worker_answer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/open-excel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Excel file opened."
        })))
        .mount(&server)
        .await;

    let opened = gateway(&server).open_artifact().await.unwrap();
    assert_eq!(opened.as_deref(), Some("Excel file opened."));
}

#[tokio::test]
async fn open_artifact_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/open-excel"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "message": "[Errno 2] No such file or directory: 'jobs.xlsx'"
        })))
        .mount(&server)
        .await;

    let err = gateway(&server).open_artifact().await.unwrap_err();
    assert!(matches!(err, LaunchError::Rejected(m) if m.contains("jobs.xlsx")));
}

#[test]
fn base_url_with_path_keeps_prefix() {
    let settings = GatewaySettings::new("http://127.0.0.1:5000/scraper").unwrap();
    assert_eq!(settings.base_url.as_str(), "http://127.0.0.1:5000/scraper/");
}
