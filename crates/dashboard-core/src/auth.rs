//! Dashboard sign-in against the user directory
//!
//! This is account selection for the dashboard, not a security boundary:
//! passwords are compared as stored and the session lives in memory.

use airtable_client::AirtableClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::users::{mock_users, normalize_user, UserRecord};

/// Where user records come from
pub enum UserDirectory {
    Airtable { client: AirtableClient, table: String },
    Mock(Vec<UserRecord>),
}

impl UserDirectory {
    /// Airtable when credentials are configured, demo users otherwise
    pub fn from_config(config: &DashboardConfig) -> Self {
        match config.airtable_credentials() {
            Some((base_id, api_key)) => Self::Airtable {
                client: AirtableClient::new(base_id, api_key),
                table: config.airtable_users_table.clone(),
            },
            None => {
                info!("Airtable not configured, using mock users");
                Self::Mock(mock_users())
            }
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock(_))
    }

    /// Find a user by email, ignoring case and surrounding whitespace
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.trim().to_lowercase();

        match self {
            Self::Mock(users) => Ok(users.iter().find(|u| u.email == email).cloned()),
            Self::Airtable { client, table } => {
                let records = client.list_records(table, None).await?;
                let user = records
                    .iter()
                    .filter_map(normalize_user)
                    .find(|u| u.email == email);
                debug!(table = %table, found = user.is_some(), "Looked up user");
                Ok(user)
            }
        }
    }
}

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: UserRecord,
    pub signed_in_at: DateTime<Utc>,
}

/// Holds the dashboard's single sign-in session
pub struct AuthService {
    directory: UserDirectory,
    session: RwLock<Option<Session>>,
}

impl AuthService {
    pub fn new(directory: UserDirectory) -> Self {
        Self {
            directory,
            session: RwLock::new(None),
        }
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    /// Sign in, replacing any current session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let user = match self.directory.find_by_email(email).await? {
            Some(user) if user.password.as_deref() == Some(password) => user,
            _ => {
                warn!(email = %email.trim(), "Rejected sign-in");
                return Err(DashboardError::InvalidCredentials);
            }
        };

        let session = Session {
            user,
            signed_in_at: Utc::now(),
        };
        *self.session.write().await = Some(session.clone());
        info!(user_id = %session.user.id, "User signed in");
        Ok(session)
    }

    pub async fn logout(&self) {
        if let Some(session) = self.session.write().await.take() {
            info!(user_id = %session.user.id, "User signed out");
        }
    }

    pub async fn current_user(&self) -> Option<UserRecord> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Workspace of the signed-in user
    pub async fn workspace_id(&self) -> Result<String> {
        self.current_user()
            .await
            .and_then(|u| u.workspace_id)
            .ok_or(DashboardError::MissingWorkspace)
    }
}
