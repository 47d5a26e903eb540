//! End-to-end tests for the decision handler.

#[cfg(test)]
mod tests {
    use crate::commands::{Cli, LogFormat};
    use crate::config::{DecisionConfig, Environment};
    use crate::handlers::{decide, failure_kind};
    use decision_core::TaskId;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CATALOG: &str = r#"
lint:
  command: [./wpt, lint]
  trigger:
    pull-request:
    branch: [master]

download-firefox:
  command: ./wpt install firefox browser

wpt-firefox-stable:
  command: [./tools/ci/taskcluster-run.py, firefox]
  require: [download-firefox]
  trigger:
    branch: [master]
  options:
    browser: [firefox]

release-notes:
  command: [./wpt, notes]
  trigger:
    branch: [release-*]
"#;

    fn push_event() -> Value {
        json!({
            "ref": "refs/heads/master",
            "before": "aaa",
            "after": "bbb",
            "sender": {"login": "octocat"},
            "repository": {
                "url": "https://github.com/web-platform-tests/wpt",
                "full_name": "web-platform-tests/wpt"
            },
            "commits": [{"message": "Update manifest"}]
        })
    }

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("catalog.yml"), CATALOG).unwrap();
            std::fs::write(dir.path().join("event.json"), push_event().to_string()).unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn cli(&self, event_path: Option<&str>, dry_run: bool) -> Cli {
            Cli {
                event_path: event_path.map(|name| self.path(name)),
                dry_run,
                tasks_path: Some(self.path("tasks.json")),
                catalog_path: self.path("catalog.yml"),
                jobs_path: None,
                repo_path: self.dir.path().to_path_buf(),
                config: None,
                log_format: LogFormat::Text,
            }
        }
    }

    fn config(server: &MockServer) -> DecisionConfig {
        DecisionConfig {
            queue_root_url: server.uri(),
            ..Default::default()
        }
    }

    fn written_names(path: &Path) -> Vec<String> {
        let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        let mut names: Vec<String> = written.as_object().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_dry_run_writes_graph_without_submitting() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ws = Workspace::new();
        let cli = ws.cli(Some("event.json"), true);
        decide(&cli, &config(&server), &Environment::default())
            .await
            .unwrap();

        assert_eq!(
            written_names(&ws.path("tasks.json")),
            vec!["download-firefox", "lint", "wpt-firefox-stable"]
        );
    }

    #[tokio::test]
    async fn test_submits_every_task() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/api/queue/v1/task/[A-Za-z0-9_-]{22}$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&server)
            .await;

        let ws = Workspace::new();
        let cli = ws.cli(Some("event.json"), false);
        decide(&cli, &config(&server), &Environment::default())
            .await
            .unwrap();

        assert!(ws.path("tasks.json").exists());
    }

    #[tokio::test]
    async fn test_event_from_environment() {
        let server = MockServer::start().await;
        let ws = Workspace::new();
        let mut event = push_event();
        event["ref"] = json!("refs/heads/release-7");
        let env = Environment {
            task_event: Some(event.to_string()),
            ..Default::default()
        };

        decide(&ws.cli(None, true), &config(&server), &env)
            .await
            .unwrap();

        assert_eq!(written_names(&ws.path("tasks.json")), vec!["release-notes"]);
    }

    #[tokio::test]
    async fn test_event_from_decision_task() {
        let server = MockServer::start().await;
        let task_id = TaskId::new();
        Mock::given(method("GET"))
            .and(path(format!("/api/queue/v1/task/{}", task_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "extra": {"github_event": push_event().to_string()}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ws = Workspace::new();
        let env = Environment {
            task_id: Some(task_id.to_string()),
            ..Default::default()
        };
        decide(&ws.cli(None, true), &config(&server), &env)
            .await
            .unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(ws.path("tasks.json")).unwrap()).unwrap();
        assert_eq!(
            written["lint"][1]["taskGroupId"].as_str().unwrap(),
            task_id.as_str()
        );
    }

    #[tokio::test]
    async fn test_missing_event_source() {
        let server = MockServer::start().await;
        let ws = Workspace::new();

        let err = decide(&ws.cli(None, true), &config(&server), &Environment::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--event-path"));
        assert!(!ws.path("tasks.json").exists());
    }

    #[tokio::test]
    async fn test_queue_rejection_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scopes"))
            .mount(&server)
            .await;

        let ws = Workspace::new();
        let err = decide(&ws.cli(Some("event.json"), false), &config(&server), &Environment::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(!ws.path("tasks.json").exists());
    }

    #[tokio::test]
    async fn test_failure_kinds() {
        let server = MockServer::start().await;
        let ws = Workspace::new();

        let err = decide(&ws.cli(None, true), &config(&server), &Environment::default())
            .await
            .unwrap_err();
        assert_eq!(failure_kind(err.as_ref()), "input");

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let err = decide(&ws.cli(Some("event.json"), false), &config(&server), &Environment::default())
            .await
            .unwrap_err();
        assert_eq!(failure_kind(err.as_ref()), "infrastructure");

        let env = Environment {
            task_id: Some("not-a-slug".to_string()),
            ..Default::default()
        };
        let err = decide(&ws.cli(Some("event.json"), true), &config(&server), &env)
            .await
            .unwrap_err();
        assert_eq!(failure_kind(err.as_ref()), "setup");
    }
}
