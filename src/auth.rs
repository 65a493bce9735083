// taskdesk/src/auth.rs

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::{Identity, Role, Session, SessionStore};

#[derive(Clone, Debug, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    user: Identity,
}

/// Login, registration and logout: the only code that writes the session.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    fn store(&self) -> &SessionStore { self.api.session() }

    pub fn current_user(&self) -> Option<Identity> { self.store().identity() }

    pub async fn login(&self, creds: &Credentials) -> Result<Session, ApiError> {
        if creds.email.trim().is_empty() || creds.password.is_empty() {
            return Err(ApiError::Validation("Email and password are required".into()));
        }
        let resp: AuthResponse = self.api.post("auth/login", creds).await?;
        self.persist(resp)
    }

    pub async fn register(&self, reg: &Registration) -> Result<Session, ApiError> {
        if reg.name.trim().is_empty() || reg.email.trim().is_empty() || reg.password.is_empty() {
            return Err(ApiError::Validation("Name, email and password are required".into()));
        }
        let resp: AuthResponse = self.api.post("auth/register", reg).await?;
        self.persist(resp)
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        self.store().clear()?;
        info!("session cleared");
        Ok(())
    }

    fn persist(&self, resp: AuthResponse) -> Result<Session, ApiError> {
        let session = Session { identity: resp.user, token: resp.token };
        self.store().save(&session).map_err(ApiError::Storage)?;
        info!(user = %session.identity.name, role = %session.identity.role, "signed in");
        Ok(session)
    }
}
