//! Inbound repository events.
//!
//! Events arrive as GitHub webhook payloads (push or pull request). Only a
//! handful of fields drive graph construction; the raw document is kept so it
//! can travel with every created task.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const REF_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone, Default, Deserialize)]
struct EventFields {
    #[serde(default, rename = "ref")]
    git_ref: Option<String>,
    #[serde(default)]
    before: Option<String>,
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    pull_request: Option<PullRequest>,
    #[serde(default, deserialize_with = "null_as_empty")]
    commits: Vec<Commit>,
    #[serde(default)]
    sender: Option<Sender>,
    #[serde(default)]
    repository: Option<Repository>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Commit>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Commit>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PullRequest {
    #[serde(default)]
    merge_commit_sha: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Commit {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Sender {
    login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Repository {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
}

/// A push or pull request event.
#[derive(Debug, Clone)]
pub struct Event {
    raw: Value,
    is_pull_request: bool,
    fields: EventFields,
}

impl Event {
    /// Wrap a parsed JSON document.
    pub fn from_value(raw: Value) -> Result<Self> {
        let object = raw
            .as_object()
            .ok_or_else(|| Error::InvalidEvent("event must be a JSON object".to_string()))?;
        let is_pull_request = object.contains_key("pull_request");
        let fields = EventFields::deserialize(&raw)
            .map_err(|e| Error::InvalidEvent(e.to_string()))?;
        Ok(Self {
            raw,
            is_pull_request,
            fields,
        })
    }

    /// Parse an event from its JSON text.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(s)
            .map_err(|e| Error::InvalidEvent(format!("Event was not valid JSON: {}", e)))?;
        Self::from_value(raw)
    }

    /// Compact JSON encoding of the original document.
    pub fn to_json_string(&self) -> String {
        self.raw.to_string()
    }

    pub fn is_pull_request(&self) -> bool {
        self.is_pull_request
    }

    /// Pushed branch, without the `refs/heads/` prefix. `None` for pull requests.
    pub fn branch(&self) -> Option<&str> {
        if self.is_pull_request {
            return None;
        }
        self.fields
            .git_ref
            .as_deref()
            .map(|r| r.strip_prefix(REF_PREFIX).unwrap_or(r))
    }

    pub fn before(&self) -> Option<&str> {
        self.fields.before.as_deref()
    }

    pub fn after(&self) -> Option<&str> {
        self.fields.after.as_deref()
    }

    /// Revision the task should check out.
    pub fn fetch_rev(&self) -> Result<&str> {
        if self.is_pull_request {
            self.fields
                .pull_request
                .as_ref()
                .and_then(|pr| pr.merge_commit_sha.as_deref())
                .ok_or_else(|| missing("pull_request.merge_commit_sha"))
        } else {
            self.after().ok_or_else(|| missing("after"))
        }
    }

    pub fn sender_login(&self) -> Result<&str> {
        self.fields
            .sender
            .as_ref()
            .map(|s| s.login.as_str())
            .ok_or_else(|| missing("sender.login"))
    }

    pub fn repository_url(&self) -> Result<&str> {
        self.fields
            .repository
            .as_ref()
            .and_then(|r| r.url.as_deref())
            .ok_or_else(|| missing("repository.url"))
    }

    pub fn repository_full_name(&self) -> Option<&str> {
        self.fields
            .repository
            .as_ref()
            .and_then(|r| r.full_name.as_deref())
    }

    /// Free text that may carry directives: the first commit message, or the
    /// pull request body when the event has no commits.
    pub fn message_body(&self) -> Option<&str> {
        if let Some(first) = self.fields.commits.first() {
            return first.message.as_deref();
        }
        if self.is_pull_request {
            return self
                .fields
                .pull_request
                .as_ref()
                .and_then(|pr| pr.body.as_deref());
        }
        None
    }
}

fn missing(field: &str) -> Error {
    Error::InvalidEvent(format!("event is missing {}", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_branch_strips_prefix() {
        let event = Event::from_value(json!({"ref": "refs/heads/release-42", "after": "abc"})).unwrap();
        assert!(!event.is_pull_request());
        assert_eq!(event.branch(), Some("release-42"));
        assert_eq!(event.fetch_rev().unwrap(), "abc");
    }

    #[test]
    fn test_tag_ref_kept_verbatim() {
        let event = Event::from_value(json!({"ref": "refs/tags/v1"})).unwrap();
        assert_eq!(event.branch(), Some("refs/tags/v1"));
    }

    #[test]
    fn test_pull_request_has_no_branch() {
        let event = Event::from_value(json!({
            "ref": "refs/heads/main",
            "pull_request": {"merge_commit_sha": "def", "body": "hello"}
        }))
        .unwrap();
        assert!(event.is_pull_request());
        assert_eq!(event.branch(), None);
        assert_eq!(event.fetch_rev().unwrap(), "def");
        assert_eq!(event.message_body(), Some("hello"));
    }

    #[test]
    fn test_message_prefers_first_commit() {
        let event = Event::from_value(json!({
            "commits": [{"message": "first"}, {"message": "second"}]
        }))
        .unwrap();
        assert_eq!(event.message_body(), Some("first"));
    }

    #[test]
    fn test_null_commits_fall_back_to_body() {
        let event = Event::from_value(json!({
            "commits": null,
            "pull_request": {"merge_commit_sha": "def", "body": "tc-jobs: lint"}
        }))
        .unwrap();
        assert_eq!(event.message_body(), Some("tc-jobs: lint"));

        let push = Event::from_value(json!({"ref": "refs/heads/master", "commits": null})).unwrap();
        assert_eq!(push.message_body(), None);
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            Event::from_value(json!([1, 2])),
            Err(Error::InvalidEvent(_))
        ));
        assert!(Event::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_missing_fields_reported() {
        let event = Event::from_value(json!({})).unwrap();
        let err = event.repository_url().unwrap_err();
        assert!(err.to_string().contains("repository.url"));
    }
}
