use futures::StreamExt;
use mcp_github::{
    config::GithubConfig,
    github::GithubClient,
    server::{Server, ServerConfig},
    tools::Toolset,
    transport::sse::SSEServerTransport,
};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use tokio_util::io::StreamReader;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One parsed Server-Sent Event
#[derive(Debug)]
struct Event {
    event: String,
    data: String,
}

/// Start the GitHub tool server on an ephemeral port
async fn start_server(github_uri: &str) -> (String, JoinHandle<()>) {
    let transport = SSEServerTransport::new("http://127.0.0.1:0").unwrap();
    let probe = transport.clone();

    let client = GithubClient::new(&GithubConfig {
        token: "test-token".to_string(),
        base_url: github_uri.to_string(),
        ..GithubConfig::default()
    })
    .unwrap();

    let mut server = Server::new(ServerConfig::new().with_name("sse-test"));
    Toolset::register(&mut server, client).unwrap();

    let handle = tokio::spawn(async move {
        let _ = server.serve(transport).await;
    });

    // The clone shares the bound address once the server is listening
    let addr = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(addr) = probe.local_addr() {
                return addr;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("server did not start");

    (format!("http://{}", addr), handle)
}

/// Open an SSE stream and forward its events to a channel
async fn connect(uri: &str) -> mpsc::Receiver<Event> {
    let response = reqwest::Client::new()
        .get(format!("{}/sse", uri))
        .header(header::ACCEPT, "text/event-stream")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stream = response
        .bytes_stream()
        .map(|r| r.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)));
    let mut reader = BufReader::new(StreamReader::new(stream));
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut event = String::new();
        let mut data = String::new();
        let mut line = String::new();
        while let Ok(read) = reader.read_line(&mut line).await {
            if read == 0 {
                break;
            }
            let trimmed = line.trim_end();
            if let Some(value) = trimmed.strip_prefix("event:") {
                event = value.trim().to_string();
            } else if let Some(value) = trimmed.strip_prefix("data:") {
                data = value.trim().to_string();
            } else if trimmed.is_empty() && !data.is_empty() {
                let parsed = Event {
                    event: std::mem::take(&mut event),
                    data: std::mem::take(&mut data),
                };
                if tx.send(parsed).await.is_err() {
                    break;
                }
            }
            line.clear();
        }
    });

    rx
}

async fn next_event(events: &mut mpsc::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

async fn next_message(events: &mut mpsc::Receiver<Event>) -> Value {
    let event = next_event(events).await;
    assert_eq!(event.event, "message");
    serde_json::from_str(&event.data).unwrap()
}

async fn post(uri: &str, endpoint: &str, message: Value) -> StatusCode {
    reqwest::Client::new()
        .post(format!("{}{}", uri, endpoint))
        .json(&message)
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_tools_over_sse() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/issues/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1042,
            "number": 42,
            "title": "Answer",
            "state": "open"
        })))
        .expect(1)
        .mount(&github)
        .await;

    let (uri, handle) = start_server(&github.uri()).await;
    let mut events = connect(&uri).await;

    let endpoint = next_event(&mut events).await;
    assert_eq!(endpoint.event, "endpoint");
    assert!(endpoint.data.starts_with("/message?sessionId="));

    let status = post(
        &uri,
        &endpoint.data,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let init = next_message(&mut events).await;
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "sse-test");

    post(
        &uri,
        &endpoint.data,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await;
    let list = next_message(&mut events).await;
    assert_eq!(list["id"], 2);
    let names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["list_issues", "get_issue", "create_issue", "list_pull_requests"]
    );

    post(
        &uri,
        &endpoint.data,
        json!({
            "jsonrpc": "2.0",
            "id": "call-1",
            "method": "tools/call",
            "params": {
                "name": "get_issue",
                "arguments": {"owner": "octo", "repo": "hello", "issue_number": 42}
            }
        }),
    )
    .await;
    let call = next_message(&mut events).await;
    assert_eq!(call["id"], "call-1");
    assert_eq!(call["result"]["isError"], false);
    let issue: Value =
        serde_json::from_str(call["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(issue["title"], "Answer");

    post(
        &uri,
        &endpoint.data,
        json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "get_issue", "arguments": {"owner": "octo"}}
        }),
    )
    .await;
    let invalid = next_message(&mut events).await;
    assert_eq!(invalid["id"], 4);
    assert_eq!(invalid["error"]["code"], -32602);

    handle.abort();
}

#[tokio::test]
async fn test_sessions_with_same_request_id_get_their_own_responses() {
    let github = MockServer::start().await;
    let (uri, handle) = start_server(&github.uri()).await;

    let mut first = connect(&uri).await;
    let mut second = connect(&uri).await;
    let first_endpoint = next_event(&mut first).await.data;
    let second_endpoint = next_event(&mut second).await.data;
    assert_ne!(first_endpoint, second_endpoint);

    post(
        &uri,
        &first_endpoint,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
    )
    .await;
    post(
        &uri,
        &second_endpoint,
        json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}),
    )
    .await;

    let first_reply = next_message(&mut first).await;
    let second_reply = next_message(&mut second).await;

    assert_eq!(first_reply["id"], 1);
    assert!(first_reply["result"]["tools"].is_array());
    assert_eq!(second_reply["id"], 1);
    assert_eq!(second_reply["result"], json!({}));

    handle.abort();
}

#[tokio::test]
async fn test_message_endpoint_rejects_unknown_sessions() {
    let github = MockServer::start().await;
    let (uri, handle) = start_server(&github.uri()).await;
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    assert_eq!(
        post(&uri, "/message?sessionId=does-not-exist", ping.clone()).await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(post(&uri, "/message", ping).await, StatusCode::BAD_REQUEST);

    handle.abort();
}

#[tokio::test]
async fn test_shutdown_from_one_session_does_not_stop_the_others() {
    let github = MockServer::start().await;
    let (uri, handle) = start_server(&github.uri()).await;

    let mut first = connect(&uri).await;
    let mut second = connect(&uri).await;
    let first_endpoint = next_event(&mut first).await.data;
    let second_endpoint = next_event(&mut second).await.data;

    post(
        &uri,
        &first_endpoint,
        json!({"jsonrpc": "2.0", "id": 1, "method": "shutdown"}),
    )
    .await;
    let refused = next_message(&mut first).await;
    assert_eq!(refused["id"], 1);
    assert_eq!(refused["error"]["code"], -32601);

    let status = post(
        &uri,
        &second_endpoint,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let list = next_message(&mut second).await;
    assert_eq!(list["id"], 2);
    assert_eq!(list["result"]["tools"].as_array().unwrap().len(), 4);

    assert!(!handle.is_finished());
    handle.abort();
}
