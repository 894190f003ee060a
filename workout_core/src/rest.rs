//! Hosted platform client over the auto-generated REST layer.
//!
//! Speaks the PostgREST dialect: `apikey` plus bearer headers, `eq.`/`in.`
//! filters, embedded selects and upserts with an explicit conflict target.

use crate::config::PlatformConfig;
use crate::platform::{AppointmentRow, DataPlatform, ScheduledSessionRow, SessionTemplateRow};
use crate::{Error, LogKey, Result, WorkoutLog, WorkoutTarget};
use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const TEMPLATE_SELECT: &str =
    "id,name,notes,session_exercises(*,exercise:exercises(*),group:exercise_groups(*))";

/// Blocking client for the hosted data platform
#[derive(Clone)]
pub struct RestPlatform {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl RestPlatform {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config(
                "no platform url configured; set [platform] url or use --offline".into(),
            ));
        }

        Ok(Self {
            client: Client::builder().build()?,
            base_url,
            anon_key: anon_key.into(),
            access_token,
        })
    }

    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        Self::new(
            config.url.clone(),
            config.anon_key.clone(),
            config.access_token.clone(),
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
    }

    fn get_rows<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let request = self.authorized(self.client.get(self.table_url(table)).query(query));
        let response = check(request.send()?)?;
        Ok(response.json()?)
    }

    fn get_one<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        Ok(self.get_rows(table, query)?.into_iter().next())
    }
}

/// Turn a non-success response into a platform error
fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(Error::Platform {
        status: status.as_u16(),
        body,
    })
}

fn eq(id: Uuid) -> String {
    format!("eq.{}", id)
}

fn in_list(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", joined)
}

/// `on_conflict` columns of a `workout_logs` upsert for the target
fn conflict_target(target: WorkoutTarget) -> String {
    format!("{},exercise_id,set_number", target.log_column())
}

fn key_filters(key: &LogKey) -> Vec<(&'static str, String)> {
    vec![
        (key.target.log_column(), eq(key.target.id())),
        ("exercise_id", eq(key.exercise_id)),
        ("set_number", format!("eq.{}", key.set_number)),
    ]
}

#[derive(Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: Uuid,
}

impl DataPlatform for RestPlatform {
    fn scheduled_session(&self, id: Uuid) -> Result<Option<ScheduledSessionRow>> {
        let select = format!("*,session:sessions({})", TEMPLATE_SELECT);
        self.get_one("scheduled_sessions", &[("id", eq(id)), ("select", select)])
    }

    fn session_template(&self, id: Uuid) -> Result<Option<SessionTemplateRow>> {
        self.get_one(
            "sessions",
            &[("id", eq(id)), ("select", TEMPLATE_SELECT.to_string())],
        )
    }

    fn appointment(&self, id: Uuid) -> Result<Option<AppointmentRow>> {
        self.get_one("appointments", &[("id", eq(id)), ("select", "*".to_string())])
    }

    fn is_registered(&self, client_id: Uuid, appointment_id: Uuid) -> Result<bool> {
        let rows: Vec<IdRow> = self.get_rows(
            "appointment_registrations",
            &[
                ("client_id", eq(client_id)),
                ("appointment_id", eq(appointment_id)),
                ("select", "id".to_string()),
            ],
        )?;
        Ok(!rows.is_empty())
    }

    fn exercise_history(
        &self,
        client_id: Uuid,
        exercise_ids: &[Uuid],
        limit: usize,
    ) -> Result<Vec<WorkoutLog>> {
        if exercise_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.get_rows(
            "workout_logs",
            &[
                ("client_id", eq(client_id)),
                ("exercise_id", in_list(exercise_ids)),
                ("order", "completed_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
    }

    fn target_logs(&self, client_id: Uuid, target: WorkoutTarget) -> Result<Vec<WorkoutLog>> {
        self.get_rows(
            "workout_logs",
            &[
                ("client_id", eq(client_id)),
                (target.log_column(), eq(target.id())),
            ],
        )
    }

    fn upsert_log(&self, log: &WorkoutLog) -> Result<()> {
        let target = log
            .target()
            .ok_or_else(|| Error::Persistence("log has no session or appointment".into()))?;

        let request = self
            .authorized(self.client.post(self.table_url("workout_logs")))
            .query(&[("on_conflict", conflict_target(target))])
            .header("Prefer", "resolution=merge-duplicates")
            .json(log);
        check(request.send()?)?;
        Ok(())
    }

    fn delete_log(&self, key: &LogKey) -> Result<()> {
        let request = self
            .authorized(self.client.delete(self.table_url("workout_logs")))
            .query(&key_filters(key));
        check(request.send()?)?;
        Ok(())
    }

    fn complete_scheduled_session(
        &self,
        id: Uuid,
        completed_at: DateTime<Utc>,
        duration_seconds: u32,
    ) -> Result<()> {
        let body = json!({
            "status": "completed",
            "completed_at": completed_at,
            "duration_seconds": duration_seconds,
        });
        let request = self
            .authorized(self.client.patch(self.table_url("scheduled_sessions")))
            .query(&[("id", eq(id))])
            .json(&body);
        check(request.send()?)?;
        Ok(())
    }
}
