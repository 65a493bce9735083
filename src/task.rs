// taskdesk/src/task.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

use crate::error::ApiError;
use crate::session::Role;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus { #[default] Pending, InProgress, Completed }

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Human label: "in-progress" reads as "in progress".
    pub fn label(&self) -> String { self.as_str().replace('-', " ") }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TaskStatus {
    type Err = ApiError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
            .ok_or_else(|| ApiError::Validation(format!("invalid status '{s}' (expected pending, in-progress or completed)")))
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority { Low, #[default] Medium, High }

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Low => "low", Self::Medium => "medium", Self::High => "high" }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Priority {
    type Err = ApiError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ApiError::Validation(format!("invalid priority '{s}' (expected low, medium or high)"))),
        }
    }
}

/// Owner details, present only when the API populated the reference.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Owner {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "user", deserialize_with = "de_owner")]
    pub owner: Option<Owner>,
}

// `user` is a bare id unless the server populated it; only the populated form is kept.
fn de_owner<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Owner>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OwnerRef { Populated(Owner), Id(serde::de::IgnoredAny) }

    Ok(match Option::<OwnerRef>::deserialize(d)? {
        Some(OwnerRef::Populated(owner)) => Some(owner),
        Some(OwnerRef::Id(_)) | None => None,
    })
}

// dueDate comes back as a full timestamp from the API but is sent as a plain date.
fn de_opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else { return Ok(None) };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) { return Ok(Some(ts.date_naive())); }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map(Some).map_err(serde::de::Error::custom)
}

/// Body of `GET /tasks`.
#[derive(Clone, Debug, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub data: Vec<Task>,
}

/// Form state for a new task. Defaults mirror the create form: pending, medium.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self { Self { title: title.into(), ..Self::default() } }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("Task title is required".into()));
        }
        Ok(())
    }

    /// Normalised copy for the wire: blank description dropped.
    pub fn to_request(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.trim().to_string(),
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
            ..self.clone()
        }
    }

    pub fn reset(&mut self) { *self = Self::default(); }
}

/// Partial update body for `PUT /tasks/:id`.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self { Self { status: Some(status), ..Self::default() } }
}

/// Ownership is only ever shown to admins, whatever the payload carries.
pub fn should_show_owner(role: Role) -> bool { role == Role::Admin }

/// What a front end renders for one task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskCard {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub status_label: String,
    pub priority: Priority,
    pub description: Option<String>,
    pub due: Option<NaiveDate>,
    pub created: NaiveDate,
    pub owner: Option<String>,
}

impl TaskCard {
    pub fn project(task: &Task, viewer: Role) -> Self {
        let owner = if should_show_owner(viewer) { task.owner.as_ref().map(|o| o.name.clone()) } else { None };
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
            status_label: task.status.label(),
            priority: task.priority,
            description: task.description.clone().filter(|d| !d.is_empty()),
            due: task.due_date,
            created: task.created_at.date_naive(),
            owner,
        }
    }
}
