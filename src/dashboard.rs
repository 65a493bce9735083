// taskdesk/src/dashboard.rs

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::TaskApi;
use crate::error::ApiError;
use crate::session::{Role, Session};
use crate::task::{Task, TaskCard, TaskDraft, TaskPatch, TaskStatus};

pub const FETCH_FAILED: &str = "Failed to fetch tasks";
pub const CREATE_FAILED: &str = "Failed to create task";
pub const DELETE_FAILED: &str = "Failed to delete task";
pub const UPDATE_FAILED: &str = "Failed to update task";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this task?";

/// Yes/no gate in front of destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool { self(prompt) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewPhase { Loading, Ready, Error }

/// How a mutation ended. Failures are already recorded in the board's message
/// region; this just tells the caller what happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome { Done, Cancelled, Failed }

/// One dashboard view: the task list, its load phase and the last error.
///
/// Every successful mutation is followed by a full refetch; the list is never
/// patched locally.
pub struct TaskBoard {
    api: Arc<dyn TaskApi>,
    viewer: Role,
    tasks: Vec<Task>,
    phase: ViewPhase,
    error: Option<String>,
}

impl TaskBoard {
    pub fn new(api: Arc<dyn TaskApi>, session: &Session) -> Self {
        Self { api, viewer: session.identity.role, tasks: Vec::new(), phase: ViewPhase::Loading, error: None }
    }

    /// Builds the board and performs the first fetch.
    pub async fn mount(api: Arc<dyn TaskApi>, session: &Session) -> Self {
        let mut board = Self::new(api, session);
        board.load_tasks().await;
        board
    }

    pub fn tasks(&self) -> &[Task] { &self.tasks }
    pub fn phase(&self) -> ViewPhase { self.phase }
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn viewer(&self) -> Role { self.viewer }

    /// `Failed` while the board shows an error, e.g. after a failed first fetch.
    pub fn outcome(&self) -> Outcome {
        if self.phase == ViewPhase::Error { Outcome::Failed } else { Outcome::Done }
    }

    pub fn cards(&self) -> Vec<TaskCard> {
        self.tasks.iter().map(|t| TaskCard::project(t, self.viewer)).collect()
    }

    /// Refetches the whole list. On failure the old list stays visible.
    pub async fn load_tasks(&mut self) -> Outcome {
        self.phase = ViewPhase::Loading;
        match self.api.list_tasks().await {
            Ok(tasks) => {
                debug!(count = tasks.len(), "tasks loaded");
                self.tasks = tasks;
                self.succeed();
                Outcome::Done
            }
            Err(e) => self.fail(e, FETCH_FAILED),
        }
    }

    /// Creates a task from the form. The form is reset only when the server
    /// accepted it, so a failed submit can be retried as-is.
    pub async fn create_task(&mut self, draft: &mut TaskDraft) -> Outcome {
        if let Err(e) = draft.validate() { return self.fail(e, CREATE_FAILED); }
        self.phase = ViewPhase::Loading;
        match self.api.create_task(draft).await {
            Ok(echo) => {
                info!(id = echo.as_ref().map(|t| t.id.as_str()), "task created");
                draft.reset();
                self.load_tasks().await
            }
            Err(e) => self.fail(e, CREATE_FAILED),
        }
    }

    pub async fn delete_task(&mut self, id: &str, gate: &dyn Confirm) -> Outcome {
        if !gate.confirm(DELETE_PROMPT) {
            debug!(id, "delete cancelled");
            return Outcome::Cancelled;
        }
        self.phase = ViewPhase::Loading;
        match self.api.delete_task(id).await {
            Ok(()) => {
                info!(id, "task deleted");
                self.load_tasks().await
            }
            Err(e) => self.fail(e, DELETE_FAILED),
        }
    }

    /// `status` is the raw value from the front end; anything other than
    /// pending, in-progress or completed is refused before any request.
    pub async fn update_status(&mut self, id: &str, status: &str) -> Outcome {
        match status.parse::<TaskStatus>() {
            Ok(s) => self.set_status(id, s).await,
            Err(e) => self.fail(e, UPDATE_FAILED),
        }
    }

    pub async fn set_status(&mut self, id: &str, status: TaskStatus) -> Outcome {
        self.phase = ViewPhase::Loading;
        match self.api.update_task(id, &TaskPatch::status(status)).await {
            Ok(_) => {
                info!(id, %status, "task status updated");
                self.load_tasks().await
            }
            Err(e) => self.fail(e, UPDATE_FAILED),
        }
    }

    fn succeed(&mut self) {
        self.phase = ViewPhase::Ready;
        self.error = None;
    }

    // The list is left alone: whatever was on screen stays on screen.
    fn fail(&mut self, e: ApiError, default: &str) -> Outcome {
        warn!(kind = ?e.kind(), error = %e, "{default}");
        self.error = Some(e.user_message(default));
        self.phase = ViewPhase::Error;
        Outcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Identity;
    use crate::task::{Owner, Priority};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::cell::Cell;

    /// In-memory backend that records every call.
    #[derive(Default)]
    struct FakeApi {
        tasks: Mutex<Vec<Task>>,
        calls: Mutex<Vec<String>>,
        fail_next: Mutex<Option<ApiError>>,
        next_id: Mutex<u32>,
        // reply to mutations without a decodable record
        bare_replies: bool,
    }

    impl FakeApi {
        fn with(tasks: Vec<Task>) -> Arc<Self> {
            Arc::new(Self { tasks: Mutex::new(tasks), ..Self::default() })
        }
        fn bare(tasks: Vec<Task>) -> Arc<Self> {
            Arc::new(Self { tasks: Mutex::new(tasks), bare_replies: true, ..Self::default() })
        }
        fn echo(&self, t: Task) -> Option<Task> { (!self.bare_replies).then_some(t) }
        fn fail_with(&self, e: ApiError) { *self.fail_next.lock() = Some(e); }
        fn calls(&self) -> Vec<String> { self.calls.lock().clone() }
        fn hit(&self, call: String) -> Result<(), ApiError> {
            self.calls.lock().push(call);
            match self.fail_next.lock().take() { Some(e) => Err(e), None => Ok(()) }
        }
    }

    #[async_trait]
    impl TaskApi for FakeApi {
        async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
            self.hit("GET /tasks".into())?;
            Ok(self.tasks.lock().clone())
        }
        async fn create_task(&self, draft: &TaskDraft) -> Result<Option<Task>, ApiError> {
            self.hit("POST /tasks".into())?;
            let n = { let mut n = self.next_id.lock(); *n += 1; *n };
            let t = Task {
                id: format!("new-{n}"), title: draft.title.clone(), description: draft.description.clone(),
                status: draft.status, priority: draft.priority, due_date: draft.due_date,
                created_at: Utc::now(), owner: None,
            };
            self.tasks.lock().push(t.clone());
            Ok(self.echo(t))
        }
        async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, ApiError> {
            self.hit(format!("PUT /tasks/{id}"))?;
            let mut tasks = self.tasks.lock();
            let t = tasks.iter_mut().find(|t| t.id == id)
                .ok_or(ApiError::Server { status: 404, message: Some("Task not found".into()) })?;
            if let Some(s) = patch.status { t.status = s; }
            Ok(self.echo(t.clone()))
        }
        async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
            self.hit(format!("DELETE /tasks/{id}"))?;
            self.tasks.lock().retain(|t| t.id != id);
            Ok(())
        }
    }

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.into(), title: title.into(), description: None, status: TaskStatus::Pending,
            priority: Priority::Low, due_date: None, created_at: Utc::now(),
            owner: Some(Owner { name: "Alice".into(), email: None }),
        }
    }

    fn session(role: Role) -> Session {
        Session { identity: Identity { name: "viewer".into(), role }, token: "t".into() }
    }

    // Nothing listens on port 1, so this is a genuine transport failure.
    async fn network_error() -> ApiError {
        let err = reqwest::get("http://127.0.0.1:1/tasks").await.expect_err("port 1 should refuse");
        ApiError::Network(err)
    }

    #[tokio::test]
    async fn mount_loads_and_becomes_ready() {
        let api = FakeApi::with(vec![task("1", "Buy milk")]);
        let board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        assert_eq!(board.phase(), ViewPhase::Ready);
        assert_eq!(board.tasks().len(), 1);
        assert_eq!(api.calls(), vec!["GET /tasks"]);
    }

    #[tokio::test]
    async fn failed_first_fetch_is_error_and_recovers() {
        let api = FakeApi::with(vec![task("1", "a")]);
        api.fail_with(ApiError::Server { status: 500, message: None });
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        assert_eq!(board.phase(), ViewPhase::Error);
        assert_eq!(board.error(), Some(FETCH_FAILED));
        assert_eq!(board.outcome(), Outcome::Failed);

        assert_eq!(board.load_tasks().await, Outcome::Done);
        assert_eq!(board.phase(), ViewPhase::Ready);
        assert_eq!(board.outcome(), Outcome::Done);
        assert_eq!(board.error(), None);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_stale_list() {
        let api = FakeApi::with(vec![task("1", "a"), task("2", "b")]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        api.fail_with(network_error().await);
        assert_eq!(board.load_tasks().await, Outcome::Failed);
        assert_eq!(board.tasks().len(), 2);
        assert_eq!(board.error(), Some(FETCH_FAILED));
        assert_eq!(board.phase(), ViewPhase::Error);
    }

    #[tokio::test]
    async fn create_then_list_contains_title_and_resets_form() {
        let api = FakeApi::with(vec![]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        let mut draft = TaskDraft::new("Write report");
        draft.priority = Priority::High;
        assert_eq!(board.create_task(&mut draft).await, Outcome::Done);
        assert!(board.tasks().iter().any(|t| t.title == "Write report"));
        assert_eq!(draft, TaskDraft::default());
        assert_eq!(api.calls(), vec!["GET /tasks", "POST /tasks", "GET /tasks"]);
    }

    #[tokio::test]
    async fn mutations_without_echoed_record_still_succeed() {
        let api = FakeApi::bare(vec![task("1", "a")]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        let mut draft = TaskDraft::new("Buy milk");
        assert_eq!(board.create_task(&mut draft).await, Outcome::Done);
        assert_eq!(draft, TaskDraft::default());
        assert!(board.tasks().iter().any(|t| t.title == "Buy milk"));

        assert_eq!(board.set_status("1", TaskStatus::Completed).await, Outcome::Done);
        assert_eq!(board.tasks()[0].status, TaskStatus::Completed);
        assert_eq!(board.error(), None);
        assert_eq!(api.calls(), vec!["GET /tasks", "POST /tasks", "GET /tasks", "PUT /tasks/1", "GET /tasks"]);
    }

    #[tokio::test]
    async fn create_failure_keeps_form_and_shows_server_message() {
        let api = FakeApi::with(vec![]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        api.fail_with(ApiError::Server { status: 400, message: Some("Title too long".into()) });
        let mut draft = TaskDraft::new("x".repeat(500));
        let before = draft.clone();
        assert_eq!(board.create_task(&mut draft).await, Outcome::Failed);
        assert_eq!(draft, before);
        assert_eq!(board.error(), Some("Title too long"));
    }

    #[tokio::test]
    async fn empty_title_never_reaches_api() {
        let api = FakeApi::with(vec![]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        let mut draft = TaskDraft::new("  ");
        assert_eq!(board.create_task(&mut draft).await, Outcome::Failed);
        assert_eq!(api.calls(), vec!["GET /tasks"]);
        assert_eq!(board.error(), Some("Task title is required"));
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let api = FakeApi::with(vec![task("1", "a")]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        let asked = Cell::new(0);
        let no = |prompt: &str| { assert_eq!(prompt, DELETE_PROMPT); asked.set(asked.get() + 1); false };
        assert_eq!(board.delete_task("1", &no).await, Outcome::Cancelled);
        assert_eq!(asked.get(), 1);
        assert_eq!(api.calls(), vec!["GET /tasks"]);
        assert_eq!(board.tasks().len(), 1);

        assert_eq!(board.delete_task("1", &|_: &str| true).await, Outcome::Done);
        assert!(board.tasks().is_empty());
        assert_eq!(api.calls(), vec!["GET /tasks", "DELETE /tasks/1", "GET /tasks"]);
    }

    #[tokio::test]
    async fn invalid_status_is_rejected_locally() {
        let api = FakeApi::with(vec![task("1", "a")]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        for bad in ["done", "archived", "", "PENDING"] {
            assert_eq!(board.update_status("1", bad).await, Outcome::Failed);
        }
        assert_eq!(api.calls(), vec!["GET /tasks"]);
        assert!(board.error().unwrap().contains("invalid status"));
    }

    #[tokio::test]
    async fn status_change_resyncs() {
        let api = FakeApi::with(vec![task("1", "a")]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        assert_eq!(board.update_status("1", "in-progress").await, Outcome::Done);
        assert_eq!(board.tasks()[0].status, TaskStatus::InProgress);
        assert_eq!(api.calls(), vec!["GET /tasks", "PUT /tasks/1", "GET /tasks"]);
    }

    #[tokio::test]
    async fn vanished_task_surfaces_server_error() {
        let api = FakeApi::with(vec![task("1", "a")]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        assert_eq!(board.set_status("gone", TaskStatus::Completed).await, Outcome::Failed);
        assert_eq!(board.error(), Some("Task not found"));
        assert_eq!(board.tasks().len(), 1);
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let api = FakeApi::with(vec![task("1", "a")]);
        let mut board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        api.fail_with(ApiError::Server { status: 500, message: None });
        board.update_status("1", "completed").await;
        assert_eq!(board.error(), Some(UPDATE_FAILED));
        board.update_status("1", "completed").await;
        assert_eq!(board.error(), None);
    }

    #[tokio::test]
    async fn owner_visibility_follows_viewer_role() {
        let api = FakeApi::with(vec![task("1", "Buy milk")]);
        let user_board = TaskBoard::mount(api.clone(), &session(Role::User)).await;
        assert!(user_board.cards().iter().all(|c| c.owner.is_none()));
        let admin_board = TaskBoard::mount(api.clone(), &session(Role::Admin)).await;
        assert_eq!(admin_board.cards()[0].owner.as_deref(), Some("Alice"));
    }
}
