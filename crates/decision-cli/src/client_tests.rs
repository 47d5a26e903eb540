//! Tests for the queue client.

#[cfg(test)]
mod tests {
    use crate::client::QueueClient;
    use crate::config::DecisionConfig;
    use decision_core::ports::TaskQueue;
    use decision_core::task::{Priority, TaskExtra, TaskMetadata, TaskPayload, TaskRecord};
    use decision_core::{Error, TaskGroupId, TaskId};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> QueueClient {
        let config = DecisionConfig {
            queue_root_url: server.uri(),
            token: token.map(String::from),
            ..Default::default()
        };
        QueueClient::new(&config).unwrap()
    }

    fn record(name: &str) -> TaskRecord {
        TaskRecord {
            task_group_id: TaskGroupId::new(),
            created: "2024-05-01T12:00:00.000Z".to_string(),
            deadline: "2024-05-02T12:00:00.000Z".to_string(),
            provisioner_id: "aws-provisioner-v1".to_string(),
            worker_type: "github-worker".to_string(),
            priority: Priority::Lowest,
            metadata: TaskMetadata {
                name: name.to_string(),
                description: String::new(),
                owner: "octocat@users.noreply.github.com".to_string(),
                source: "https://github.com/o/r".to_string(),
            },
            payload: TaskPayload {
                artifacts: None,
                command: vec!["/bin/bash".to_string()],
                image: Some("harjgam/web-platform-tests:0.33".to_string()),
                max_run_time: Some(7200),
                env: BTreeMap::new(),
            },
            extra: TaskExtra {
                github_event: "{}".to_string(),
            },
            dependencies: Vec::new(),
            requires: None,
        }
    }

    #[tokio::test]
    async fn test_create_task_puts_record() {
        let server = MockServer::start().await;
        let task_id = TaskId::new();

        Mock::given(method("PUT"))
            .and(path(format!("/api/queue/v1/task/{}", task_id)))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "metadata": {"name": "lint"},
                "provisionerId": "aws-provisioner-v1",
                "priority": "lowest"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": {}})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, Some("secret"))
            .create_task(&task_id, &record("lint"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_task_rejected() {
        let server = MockServer::start().await;
        let task_id = TaskId::new();

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_string("task exists with different definition"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .create_task(&task_id, &record("lint"))
            .await
            .unwrap_err();
        match err {
            Error::Queue { task_id: id, status, message } => {
                assert_eq!(id, task_id.to_string());
                assert_eq!(status, 409);
                assert!(message.contains("different definition"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_event_from_string() {
        let server = MockServer::start().await;
        let event = json!({"ref": "refs/heads/master", "after": "abc"});

        Mock::given(method("GET"))
            .and(path("/api/queue/v1/task/decision"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "extra": {"github_event": event.to_string()}
            })))
            .mount(&server)
            .await;

        let fetched = client(&server, None)
            .fetch_task_event("decision")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.branch(), Some("master"));
        assert_eq!(fetched.after(), Some("abc"));
    }

    #[tokio::test]
    async fn test_fetch_event_from_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/queue/v1/task/decision"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "extra": {"github_event": {"pull_request": {"number": 7}}}
            })))
            .mount(&server)
            .await;

        let fetched = client(&server, None)
            .fetch_task_event("decision")
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.is_pull_request());
    }

    #[tokio::test]
    async fn test_fetch_event_absent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"extra": {}})))
            .mount(&server)
            .await;

        let fetched = client(&server, None).fetch_task_event("decision").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_fetch_event_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, None).fetch_task_event("decision").await.unwrap_err();
        assert!(matches!(err, Error::Queue { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_queue() {
        let config = DecisionConfig {
            queue_root_url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        };
        let err = QueueClient::new(&config)
            .unwrap()
            .fetch_task_event("decision")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
