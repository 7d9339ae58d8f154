use std::time::Duration;

use index_getter::burst::{self, BurstConfig};
use index_getter::runner::{self, RunConfig};
use index_getter::{HttpAggregate, HttpMetric, HttpSession, IndexGetterUser, Swarm, Url};
use karga::Aggregate;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX: &str = "<html><body>hello</body></html>";

async fn index_server(status: u16) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(status).set_body_raw(INDEX, "text/html"))
        .mount(&mock_server)
        .await;
    mock_server
}

fn swarm(mock_server: &MockServer) -> Swarm<IndexGetterUser> {
    Swarm::new(HttpSession::new(&mock_server.uri()).unwrap()).unwrap()
}

#[tokio::test]
async fn should_issue_one_plain_get_to_the_root_path() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(INDEX, "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let metric = swarm(&mock_server).run_once().await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method.as_str(), "GET");
    assert_eq!(request.url.path(), "/");
    assert_eq!(request.url.query(), None);
    assert!(request.body.is_empty());
    for name in request.headers.keys() {
        assert!(
            ["host", "accept", "accept-encoding", "user-agent", "connection"]
                .contains(&name.as_str()),
            "unexpected header {name}"
        );
    }

    let HttpMetric::Success(response) = &metric else {
        panic!("expected a response, got {metric:?}");
    };
    assert_eq!(response.status_code, 200);
    assert_eq!(response.bytes_received, INDEX.len() as u64);
    assert_eq!(response.bytes_sent, 0);
}

#[tokio::test]
async fn should_not_forward_the_host_query() {
    let mock_server = index_server(200).await;

    let host = Url::parse(&format!("{}/?token=abc", mock_server.uri())).unwrap();
    let swarm: Swarm<IndexGetterUser> =
        Swarm::new(HttpSession::builder().host(host).build()).unwrap();
    swarm.run_once().await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/");
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn should_give_each_concurrent_run_its_own_user() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .mount(&mock_server)
        .await;

    let swarm = swarm(&mock_server);
    let other = swarm.clone();
    let (left, right) = tokio::join!(swarm.run_once(), other.run_once());

    assert_eq!(left.status_code(), Some(200));
    assert_eq!(right.status_code(), Some(200));
    assert_eq!(swarm.users_spawned(), 2);

    swarm.run_once().await;
    assert_eq!(swarm.users_spawned(), 2);
}

#[tokio::test]
async fn should_attribute_the_request_to_get_index() {
    let mock_server = index_server(200).await;

    let mut aggregate = HttpAggregate::new();
    aggregate.consume(&swarm(&mock_server).run_once().await);

    assert_eq!(aggregate.count, 1);
    assert_eq!(aggregate.failure_count, 0);
    let index = aggregate.endpoint("GET", "/").unwrap();
    assert_eq!(index.requests, 1);
    assert_eq!(index.status_count.get(&200), Some(&1));
    assert_eq!(aggregate.endpoints.len(), 1);
}

#[tokio::test]
async fn should_count_server_errors_as_failures() {
    let mock_server = index_server(500).await;

    let mut aggregate = HttpAggregate::new();
    aggregate.consume(&swarm(&mock_server).run_once().await);

    assert_eq!(aggregate.count, 1);
    assert_eq!(aggregate.failure_count, 1);
    let index = aggregate.endpoint("GET", "/").unwrap();
    assert_eq!(index.status_count.get(&500), Some(&1));
    assert_eq!(index.errors.get("HTTP 500"), Some(&1));
}

#[tokio::test]
async fn should_send_exactly_the_requested_burst() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(12)
        .mount(&mock_server)
        .await;

    let session = HttpSession::new(&mock_server.uri()).unwrap();
    let config = BurstConfig::builder().workers(3).requests(12).build();
    let report = burst::run::<IndexGetterUser>(session, &config)
        .await
        .unwrap();

    assert_eq!(report.workers, 3);
    assert_eq!(report.requests_planned, 12);
    assert_eq!(report.requests_completed, 12);
    assert!(!report.stopped_early);
    assert!(report.requests_per_second > 0.0);
    assert_eq!(report.http.reqs_total, 12);
    assert_eq!(report.http.req_failure_ratio, 0.0);
    assert_eq!(report.http.endpoints.len(), 1);
    assert_eq!(report.http.endpoints[0].name, "/");
}

#[tokio::test]
async fn should_stop_each_burst_worker_on_bad_status() {
    let mock_server = index_server(503).await;

    let session = HttpSession::new(&mock_server.uri()).unwrap();
    let config = BurstConfig::builder().workers(2).requests(10).build();
    let report = burst::run::<IndexGetterUser>(session, &config)
        .await
        .unwrap();

    assert!(report.stopped_early);
    assert_eq!(report.requests_completed, 2);
    assert_eq!(report.http.req_failure_ratio, 100.0);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn should_run_users_through_karga() {
    let mock_server = index_server(200).await;

    let session = HttpSession::new(&mock_server.uri()).unwrap();
    let config = RunConfig::builder()
        .users(2)
        .rate(20.0)
        .run_time(Duration::from_millis(500))
        .build();
    let report = runner::run::<IndexGetterUser>(session, &config)
        .await
        .unwrap();

    assert!(report.reqs_total > 0);
    assert_eq!(report.req_failure_ratio, 0.0);
    assert_eq!(report.status_codes.get(&200), Some(&report.reqs_total));
    assert!(report
        .endpoints
        .iter()
        .all(|endpoint| endpoint.method == "GET" && endpoint.name == "/"));
}
