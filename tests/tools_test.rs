use mcp_github::{
    config::GithubConfig,
    error::MCPError,
    github::GithubClient,
    tools::{invoke, CreateIssue, GetIssue, ListIssues, ListPullRequests},
};
use serde_json::{json, Value};
use wiremock::matchers::{any, body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GithubClient {
    GithubClient::new(&GithubConfig {
        token: "test-token".to_string(),
        base_url: server.uri(),
        ..GithubConfig::default()
    })
    .unwrap()
}

fn issue(number: u64, title: &str) -> Value {
    json!({
        "id": 1000 + number,
        "number": number,
        "title": title,
        "state": "open",
        "user": {"login": "octocat", "id": 1},
        "labels": [{"id": 7, "name": "bug", "color": "d73a4a"}],
        "created_at": "2024-01-15T09:00:00Z",
        "html_url": format!("https://github.com/octo/hello/issues/{}", number)
    })
}

/// Fails the test on drop if anything reaches the fake GitHub
async fn expect_no_requests(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_issues_translates_filters_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/issues"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("accept", "application/vnd.github+json"))
        .and(header("x-github-api-version", "2022-11-28"))
        .and(query_param("state", "open"))
        .and(query_param("labels", "bug,ui"))
        .and(query_param("since", "2024-01-15T00:00:00Z"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([issue(1, "First")])))
        .expect(1)
        .mount(&server)
        .await;

    let result = invoke::<ListIssues>(
        &client_for(&server),
        json!({
            "owner": "octo",
            "repo": "hello",
            "state": "open",
            "labels": ["bug", "ui"],
            "since": "2024-01-15",
            "page": 2,
            "perPage": 10.0
        }),
    )
    .await
    .unwrap();

    assert!(!result.is_error);
    let issues: Value = serde_json::from_str(&result.text()).unwrap();
    assert_eq!(issues[0]["number"], 1);
    assert_eq!(issues[0]["labels"][0]["name"], "bug");
}

#[tokio::test]
async fn test_list_issues_accepts_full_timestamp() {
    let server = MockServer::start().await;
    Mock::given(path("/repos/octo/hello/issues"))
        .and(query_param("since", "2024-01-15T08:30:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let result = invoke::<ListIssues>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "since": "2024-01-15T10:30:00+02:00"}),
    )
    .await
    .unwrap();

    assert!(!result.is_error);
    assert_eq!(result.text(), "[]");
}

#[tokio::test]
async fn test_list_issues_empty_since_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(path("/repos/octo/hello/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let result = invoke::<ListIssues>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "since": ""}),
    )
    .await
    .unwrap();
    assert!(!result.is_error);

    let requests = server.received_requests().await.unwrap();
    let sent: Vec<String> = requests[0].url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    assert!(sent.is_empty(), "unexpected query parameters: {:?}", sent);
}

#[tokio::test]
async fn test_bad_timestamp_never_reaches_github() {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;

    let result = invoke::<ListIssues>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "since": "bad"}),
    )
    .await;

    match result {
        Err(MCPError::InvalidParams(message)) => {
            assert!(message.contains("YYYY-MM-DDThh:mm:ssZ or YYYY-MM-DD"))
        }
        other => panic!("expected InvalidParams, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_required_fields_never_reach_github() {
    let server = MockServer::start().await;
    expect_no_requests(&server).await;
    let client = client_for(&server);

    let missing_owner = invoke::<ListIssues>(&client, json!({"repo": "hello"})).await;
    assert!(matches!(missing_owner, Err(MCPError::InvalidParams(_))));

    let missing_number = invoke::<GetIssue>(&client, json!({"owner": "o", "repo": "r"})).await;
    assert!(matches!(missing_number, Err(MCPError::InvalidParams(_))));

    let fractional = invoke::<GetIssue>(
        &client,
        json!({"owner": "o", "repo": "r", "issue_number": 4.5}),
    )
    .await;
    assert!(matches!(fractional, Err(MCPError::InvalidParams(_))));

    let missing_title = invoke::<CreateIssue>(&client, json!({"owner": "o", "repo": "r"})).await;
    assert!(matches!(missing_title, Err(MCPError::InvalidParams(_))));

    let missing_repo = invoke::<ListPullRequests>(&client, json!({"owner": "o"})).await;
    assert!(matches!(missing_repo, Err(MCPError::InvalidParams(_))));
}

#[tokio::test]
async fn test_get_issue_success_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/issues/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue(42, "Answer")))
        .expect(2)
        .mount(&server)
        .await;
    let client = client_for(&server);
    let params = json!({"owner": "octo", "repo": "hello", "issue_number": 42});

    let first = invoke::<GetIssue>(&client, params.clone()).await.unwrap();
    let second = invoke::<GetIssue>(&client, params).await.unwrap();

    assert!(!first.is_error);
    assert_eq!(first.text(), second.text());
    let decoded: Value = serde_json::from_str(&first.text()).unwrap();
    assert_eq!(decoded["title"], "Answer");
}

#[tokio::test]
async fn test_get_issue_not_found_is_soft_error_with_raw_body() {
    let server = MockServer::start().await;
    let body = r#"{"message":"Not Found","documentation_url":"https://docs.github.com/rest"}"#;
    Mock::given(path("/repos/octo/hello/issues/999"))
        .respond_with(ResponseTemplate::new(404).set_body_string(body))
        .mount(&server)
        .await;

    let result = invoke::<GetIssue>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "issue_number": 999}),
    )
    .await
    .unwrap();

    assert!(result.is_error);
    assert_eq!(result.text(), body);
}

#[tokio::test]
async fn test_create_issue_sends_body_and_expects_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/hello/issues"))
        .and(body_json(json!({
            "title": "Crash on start",
            "body": "Steps to reproduce",
            "assignees": ["octocat"],
            "labels": ["bug"],
            "milestone": 3
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(issue(7, "Crash on start")))
        .expect(1)
        .mount(&server)
        .await;

    let result = invoke::<CreateIssue>(
        &client_for(&server),
        json!({
            "owner": "octo",
            "repo": "hello",
            "title": "Crash on start",
            "body": "Steps to reproduce",
            "assignees": ["octocat"],
            "labels": ["bug"],
            "milestone": 3
        }),
    )
    .await
    .unwrap();

    assert!(!result.is_error);
    let created: Value = serde_json::from_str(&result.text()).unwrap();
    assert_eq!(created["number"], 7);
}

#[tokio::test]
async fn test_create_issue_milestone_zero_is_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/hello/issues"))
        .and(body_json(json!({"title": "No milestone"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(issue(8, "No milestone")))
        .expect(1)
        .mount(&server)
        .await;

    let result = invoke::<CreateIssue>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "title": "No milestone", "milestone": 0}),
    )
    .await
    .unwrap();
    assert!(!result.is_error);
}

#[tokio::test]
async fn test_create_issue_other_success_status_is_soft_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/octo/hello/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let result = invoke::<CreateIssue>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "title": "t"}),
    )
    .await
    .unwrap();

    assert!(result.is_error);
    assert_eq!(result.text(), "{}");
}

#[tokio::test]
async fn test_enum_values_are_forwarded_unchecked() {
    let server = MockServer::start().await;
    let body = r#"{"message":"Validation Failed"}"#;
    Mock::given(path("/repos/octo/hello/pulls"))
        .and(query_param("state", "sideways"))
        .respond_with(ResponseTemplate::new(422).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let result = invoke::<ListPullRequests>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "state": "sideways"}),
    )
    .await
    .unwrap();

    assert!(result.is_error);
    assert_eq!(result.text(), body);
}

#[tokio::test]
async fn test_list_pull_requests_translates_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/octo/hello/pulls"))
        .and(query_param("state", "closed"))
        .and(query_param("head", "octocat:feature"))
        .and(query_param("base", "main"))
        .and(query_param("sort", "popularity"))
        .and(query_param("direction", "asc"))
        .and(query_param("per_page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 55,
            "number": 12,
            "title": "Add feature",
            "state": "closed",
            "head": {"ref": "feature", "sha": "abc"},
            "base": {"ref": "main", "sha": "def"}
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let result = invoke::<ListPullRequests>(
        &client_for(&server),
        json!({
            "owner": "octo",
            "repo": "hello",
            "state": "closed",
            "head": "octocat:feature",
            "base": "main",
            "sort": "popularity",
            "direction": "asc",
            "perPage": 5
        }),
    )
    .await
    .unwrap();

    assert!(!result.is_error);
    let pulls: Value = serde_json::from_str(&result.text()).unwrap();
    assert_eq!(pulls[0]["head"]["ref"], "feature");
    assert_eq!(pulls[0]["number"], 12);
}

#[tokio::test]
async fn test_unexpected_success_body_is_hard_error() {
    let server = MockServer::start().await;
    Mock::given(path("/repos/octo/hello/issues/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = invoke::<GetIssue>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "issue_number": 1}),
    )
    .await;
    assert!(matches!(result, Err(MCPError::Deserialization(_))));
}

#[tokio::test]
async fn test_unreachable_github_is_hard_error() {
    let client = GithubClient::new(&GithubConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        ..GithubConfig::default()
    })
    .unwrap();

    let result = invoke::<GetIssue>(
        &client,
        json!({"owner": "octo", "repo": "hello", "issue_number": 1}),
    )
    .await;
    assert!(matches!(result, Err(MCPError::Http(_))));
}

#[tokio::test]
async fn test_empty_token_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(path("/repos/octo/hello/issues/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue(1, "Anon")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GithubClient::new(&GithubConfig {
        base_url: server.uri(),
        ..GithubConfig::default()
    })
    .unwrap();
    invoke::<GetIssue>(&client, json!({"owner": "octo", "repo": "hello", "issue_number": 1}))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_success_payload_keeps_fields_the_models_do_not_name() {
    let server = MockServer::start().await;
    let mut upstream = issue(5, "Full payload");
    upstream["reactions"] = json!({"total_count": 2, "+1": 2});
    upstream["repository_url"] = json!("https://api.github.com/repos/octo/hello");
    upstream["assignees"] = json!([]);
    Mock::given(path("/repos/octo/hello/issues/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
        .mount(&server)
        .await;

    let result = invoke::<GetIssue>(
        &client_for(&server),
        json!({"owner": "octo", "repo": "hello", "issue_number": 5}),
    )
    .await
    .unwrap();

    assert!(!result.is_error);
    let returned: Value = serde_json::from_str(&result.text()).unwrap();
    assert_eq!(returned, upstream);
}
