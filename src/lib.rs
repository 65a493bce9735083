pub mod config;
pub mod error;
pub mod session;
pub mod api;
pub mod auth;
pub mod guard;
pub mod task;
pub mod dashboard;

pub use config::{ConfigManager, Config, Scope};
pub use error::{ApiError, ErrorKind};
pub use session::{Identity, Role, Session, SessionStore, Storage, FileStorage, MemoryStorage};
pub use api::{ApiClient, TaskApi};
pub use auth::{AuthService, Credentials, Registration};
pub use guard::{Access, AccessGuard, Route};
pub use task::{Task, TaskCard, TaskDraft, TaskPatch, TaskStatus, Priority, should_show_owner};
pub use dashboard::{TaskBoard, ViewPhase, Outcome, Confirm};
