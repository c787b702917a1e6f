mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::Code;
use tonic_reflection::pb::v1::server_reflection_client::ServerReflectionClient;
use tonic_reflection::pb::v1::server_reflection_request::MessageRequest;
use tonic_reflection::pb::v1::server_reflection_response::MessageResponse;
use tonic_reflection::pb::v1::ServerReflectionRequest;

use watchdog_registry::server::serve_with_listener;
use watchdog_registry::services::client::WatchdogClient;
use watchdog_registry::services::store::MemoryStore;
use watchdog_registry::watchdog::{ServiceType, UpdateServiceRequest};

use common::{RecordingAuditSink, registry_with};

struct TestServer {
    addr: SocketAddr,
    store: MemoryStore,
    _shutdown: oneshot::Sender<()>,
}

async fn start_server() -> TestServer {
    let store = MemoryStore::new();
    let registry = registry_with(
        Arc::new(store.clone()),
        Arc::new(RecordingAuditSink::default()),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        serve_with_listener(registry, listener, async {
            let _ = shutdown_rx.await;
        })
        .await
        .expect("server failed");
    });

    TestServer {
        addr,
        store,
        _shutdown: shutdown_tx,
    }
}

async fn connect(server: &TestServer) -> WatchdogClient {
    WatchdogClient::connect(&format!("http://{}", server.addr))
        .await
        .expect("Failed to connect to watchdog server")
}

#[tokio::test]
async fn test_service_lifecycle_over_grpc() {
    let server = start_server().await;
    let mut client = connect(&server).await;

    let registered = client
        .register_service("orders", "http://orders:8080/health", ServiceType::Http)
        .await
        .unwrap();
    assert_eq!(
        registered.message,
        format!(
            "Service orders registered successfully with ID {}",
            registered.service_id
        )
    );

    let info = client.get_service(&registered.service_id).await.unwrap();
    assert_eq!(info.name, "orders");
    assert_eq!(info.status, "active");
    assert_eq!(info.r#type(), ServiceType::Http);
    assert!(info.last_heartbeat > 0);

    client
        .heartbeat(&registered.service_id, "healthy")
        .await
        .unwrap();
    let services = client.list_services().await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].status, "healthy");
    assert_eq!(services[0].endpoint, "http://orders:8080/health");
    assert_eq!(services[0].r#type(), ServiceType::Http);

    let message = client
        .unregister_service(&registered.service_id)
        .await
        .unwrap();
    assert_eq!(message, "Service unregistered successfully");
    assert!(client.list_services().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unspecified_type_in_update_keeps_existing_type() {
    let server = start_server().await;
    let mut client = connect(&server).await;

    let id = client
        .register_service("jobs", "amqp://mq:5672", ServiceType::Queue)
        .await
        .unwrap()
        .service_id;

    client
        .update_service(UpdateServiceRequest {
            service_id: id.clone(),
            status: "degraded".to_string(),
            name: String::new(),
            endpoint: String::new(),
            r#type: ServiceType::Unspecified as i32,
        })
        .await
        .unwrap();

    let info = client.get_service(&id).await.unwrap();
    assert_eq!(info.r#type(), ServiceType::Queue);
    assert_eq!(info.name, "jobs");
    assert_eq!(info.endpoint, "amqp://mq:5672");
    assert_eq!(info.status, "degraded");
}

#[tokio::test]
async fn test_error_codes_over_grpc() {
    let server = start_server().await;
    let mut client = connect(&server).await;

    let err = client
        .register_service("", "http://x", ServiceType::Http)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(Code::InvalidArgument));

    client
        .register_service("dup", "http://dup", ServiceType::Http)
        .await
        .unwrap();
    let err = client
        .register_service("dup", "http://dup", ServiceType::Http)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(Code::Internal));

    let err = client.unregister_service("not-a-number").await.unwrap_err();
    assert_eq!(err.code(), Some(Code::InvalidArgument));

    let err = client.unregister_service("4242").await.unwrap_err();
    assert_eq!(err.code(), Some(Code::NotFound));

    let err = client.check_service_health("4242").await.unwrap_err();
    assert_eq!(err.code(), Some(Code::NotFound));

    let err = client.heartbeat("abc", "healthy").await.unwrap_err();
    assert_eq!(err.code(), Some(Code::InvalidArgument));
}

#[tokio::test]
async fn test_get_health_over_grpc() {
    let server = start_server().await;
    let mut client = connect(&server).await;

    client
        .register_service("cache", "redis://cache", ServiceType::Cache)
        .await
        .unwrap();

    let health = client.get_health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(
        health.message,
        "Watchdog service is running with 1 registered services"
    );

    server.store.set_available(false);
    let health = client.get_health().await.unwrap();
    assert_eq!(health.status, "unhealthy");
    assert_eq!(health.message, "Database connection failed");
}

#[tokio::test]
async fn test_grpc_probe_against_live_server() {
    let server = start_server().await;
    let mut client = connect(&server).await;

    // 用 watchdog 自己作为被探测的 gRPC 服务
    let id = client
        .register_service("self", &format!("http://{}", server.addr), ServiceType::Grpc)
        .await
        .unwrap()
        .service_id;

    let health = client.check_service_health(&id).await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.message, "Service health checked successfully");
}

#[tokio::test]
async fn test_reflection_lists_watchdog_service() {
    let server = start_server().await;
    let channel = tonic::transport::Channel::from_shared(format!("http://{}", server.addr))
        .unwrap()
        .connect()
        .await
        .expect("Failed to connect to reflection service");
    let mut reflection = ServerReflectionClient::new(channel);

    let request = ServerReflectionRequest {
        host: String::new(),
        message_request: Some(MessageRequest::ListServices(String::new())),
    };
    let mut responses = reflection
        .server_reflection_info(tokio_stream::iter(vec![request]))
        .await
        .unwrap()
        .into_inner();

    let response = responses.message().await.unwrap().expect("no reflection response");
    let list = match response.message_response {
        Some(MessageResponse::ListServicesResponse(list)) => list,
        other => panic!("unexpected reflection response: {other:?}"),
    };
    let names: Vec<String> = list.service.into_iter().map(|s| s.name).collect();
    assert!(
        names.iter().any(|name| name == "watchdog.WatchdogService"),
        "{names:?}"
    );
}
