//! Typed client for the activity backend.
//!
//! The backend exposes bearer-authenticated CRUD endpoints for activity
//! records plus a team-wide read. Create/update bodies are form-encoded, as
//! the backend consumes them; reads are JSON.

use serde::Deserialize;
use tracing::debug;

/// Error type for backend API operations.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// An activity record as returned by the backend.
///
/// `username` is only present on the team-wide endpoint; coordinates and the
/// resolved location name are optional on every record.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Activity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub activity_type: String,
    pub location: String,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub date: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Fields for creating or updating an activity record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityDraft {
    pub activity_type: String,
    pub location: String,
    pub date: String,
    pub memo: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
}

impl ActivityDraft {
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("activity_type", self.activity_type.clone()),
            ("location", self.location.clone()),
            ("date", self.date.clone()),
            ("memo", self.memo.clone()),
        ];
        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            fields.push(("latitude", lat.to_string()));
            fields.push(("longitude", lon.to_string()));
        }
        if let Some(name) = &self.location_name {
            fields.push(("location_name", name.clone()));
        }
        fields
    }
}

#[derive(Debug, Deserialize)]
struct BackendDetail {
    detail: Option<String>,
}

pub struct ActivityClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl ActivityClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// The caller's own records.
    pub async fn list_mine(&self) -> Result<Vec<Activity>, ApiError> {
        self.read_list("/activities").await
    }

    /// Every team member's records, with usernames attached.
    pub async fn list_all(&self) -> Result<Vec<Activity>, ApiError> {
        self.read_list("/activities/all").await
    }

    async fn read_list(&self, path: &str) -> Result<Vec<Activity>, ApiError> {
        let resp = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::with_source("Activity request failed", e))?;

        let resp = check_status(resp).await?;
        resp.json::<Vec<Activity>>()
            .await
            .map_err(|e| ApiError::with_source("Malformed activity list", e))
    }

    pub async fn create(&self, draft: &ActivityDraft) -> Result<(), ApiError> {
        self.write(reqwest::Method::POST, "/activities", draft)
            .await
    }

    pub async fn update(&self, id: i64, draft: &ActivityDraft) -> Result<(), ApiError> {
        self.write(reqwest::Method::PUT, &format!("/activities/{id}"), draft)
            .await
    }

    async fn write(
        &self,
        method: reqwest::Method,
        path: &str,
        draft: &ActivityDraft,
    ) -> Result<(), ApiError> {
        debug!("{} {} ({})", method, path, draft.activity_type);
        let resp = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .form(&draft.form_fields())
            .send()
            .await
            .map_err(|e| ApiError::with_source("Activity request failed", e))?;

        check_status(resp).await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/activities/{id}")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::with_source("Activity request failed", e))?;

        check_status(resp).await?;
        Ok(())
    }
}

/// Surface the backend's `{"detail": ...}` message on a non-success status.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let detail = resp
        .json::<BackendDetail>()
        .await
        .ok()
        .and_then(|d| d.detail);

    Err(ApiError::new(match detail {
        Some(detail) => detail,
        None => format!("Backend HTTP {status}"),
    }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Activity, ActivityDraft};

    #[test]
    fn team_record_deserializes_with_username_and_coordinates() {
        let json = r#"{
            "id": 7,
            "username": "sato",
            "activity_type": "訪問",
            "location": "東岡崎駅周辺",
            "location_name": "東岡崎駅",
            "latitude": 34.9576,
            "longitude": 137.1656,
            "date": "2026-08-29T00:00:00",
            "memo": "定例訪問",
            "created_at": "2026-08-29T09:00:00"
        }"#;
        let activity: Activity = serde_json::from_str(json).expect("parse");
        assert_eq!(activity.username.as_deref(), Some("sato"));
        assert_eq!(activity.latitude, Some(34.9576));
        assert_eq!(activity.location_name.as_deref(), Some("東岡崎駅"));
    }

    #[test]
    fn own_record_tolerates_missing_optionals() {
        let json = r#"{
            "id": 1,
            "activity_type": "点検",
            "location": "倉庫",
            "date": "2026-08-01T00:00:00"
        }"#;
        let activity: Activity = serde_json::from_str(json).expect("parse");
        assert_eq!(activity.username, None);
        assert_eq!(activity.latitude, None);
        assert_eq!(activity.memo, None);
    }

    #[test]
    fn draft_form_omits_absent_coordinates_and_name() {
        let draft = ActivityDraft {
            activity_type: "訪問".to_string(),
            location: "倉庫".to_string(),
            date: "2026-08-29".to_string(),
            memo: String::new(),
            ..ActivityDraft::default()
        };
        let fields = draft.form_fields();
        assert_eq!(
            fields.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            vec!["activity_type", "location", "date", "memo"]
        );
    }

    #[test]
    fn draft_form_carries_coordinates_and_resolved_name() {
        let draft = ActivityDraft {
            activity_type: "訪問".to_string(),
            location: "東岡崎駅周辺".to_string(),
            date: "2026-08-29".to_string(),
            memo: "定例".to_string(),
            latitude: Some(34.9576),
            longitude: Some(137.1656),
            location_name: Some("東岡崎駅".to_string()),
        };
        let fields = draft.form_fields();
        assert!(fields.contains(&("latitude", "34.9576".to_string())));
        assert!(fields.contains(&("longitude", "137.1656".to_string())));
        assert!(fields.contains(&("location_name", "東岡崎駅".to_string())));
    }
}
