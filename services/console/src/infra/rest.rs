//! PostgREST-backed profile store and employee directory.

use std::sync::Arc;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use garage_domain::id::FederatedUserId;
use garage_domain::profile::{DEFAULT_FULL_NAME, Profile, ShadowRecord};
use garage_domain::role::Role;
use garage_session::ProfileLookupError;
use garage_session::port::ProfileStore;

use crate::domain::repository::EmployeeDirectory;
use crate::error::ConsoleError;
use crate::infra::gotrue::GoTrueProvider;

/// Ask PostgREST for exactly one row; zero rows answer 406.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    full_name: Option<String>,
    role: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = ProfileLookupError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| ProfileLookupError::Rejected(e.to_string()))?;
        Ok(Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name.unwrap_or_else(|| DEFAULT_FULL_NAME.to_owned()),
            role,
        })
    }
}

/// Reads canonical profiles with the signed-in user's token so row-level
/// security applies; falls back to the anon key.
#[derive(Clone)]
pub struct RestProfileStore {
    client: Client,
    rest_url: String,
    api_key: String,
    table: String,
    tokens: Arc<GoTrueProvider>,
}

impl RestProfileStore {
    pub fn new(
        client: Client,
        backend_url: &str,
        api_key: impl Into<String>,
        table: impl Into<String>,
        tokens: Arc<GoTrueProvider>,
    ) -> Self {
        Self {
            client,
            rest_url: format!("{}/rest/v1", backend_url.trim_end_matches('/')),
            api_key: api_key.into(),
            table: table.into(),
            tokens,
        }
    }

    fn profile_url(&self, id: &FederatedUserId) -> Result<Url, ProfileLookupError> {
        let mut url = Url::parse(&format!("{}/{}", self.rest_url, self.table))
            .map_err(|e| ProfileLookupError::Transport(e.into()))?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("select", "id,email,full_name,role");
        Ok(url)
    }
}

impl ProfileStore for RestProfileStore {
    async fn find_profile(&self, id: &FederatedUserId) -> Result<Profile, ProfileLookupError> {
        let url = self.profile_url(id)?;
        let token = self.tokens.access_token().unwrap_or_else(|| self.api_key.clone());
        let resp = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProfileLookupError::Transport(e.into()))?;

        let status = resp.status();
        if status == StatusCode::NOT_ACCEPTABLE || status == StatusCode::NOT_FOUND {
            debug!(user_id = %id, "no profile row");
            return Err(ProfileLookupError::NotFound);
        }
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProfileLookupError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            return Err(ProfileLookupError::Transport(anyhow::anyhow!(
                "profile lookup returned {status}"
            )));
        }
        let row: ProfileRow = resp
            .json()
            .await
            .map_err(|e| ProfileLookupError::Rejected(e.to_string()))?;
        row.try_into()
    }
}

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    id: String,
    full_name: String,
    role: String,
}

/// Verifies staff credentials through a database function so password
/// hashes never leave the database.
#[derive(Clone)]
pub struct RestEmployeeDirectory {
    client: Client,
    rest_url: String,
    api_key: String,
    function: String,
}

impl RestEmployeeDirectory {
    pub fn new(client: Client, backend_url: &str, api_key: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            client,
            rest_url: format!("{}/rest/v1", backend_url.trim_end_matches('/')),
            api_key: api_key.into(),
            function: function.into(),
        }
    }
}

impl EmployeeDirectory for RestEmployeeDirectory {
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<ShadowRecord>, ConsoleError> {
        let url = format!("{}/rpc/{}", self.rest_url, self.function);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({ "p_email": email, "p_password": password }))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "employee directory unreachable");
                ConsoleError::Unavailable("employee directory unavailable".to_owned())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("{} returned {status}: {body}", self.function).into());
        }
        let rows: Vec<EmployeeRow> = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("decode {} response: {e}", self.function))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| anyhow::anyhow!("employee {} has {e}", row.id))?;
        Ok(Some(ShadowRecord {
            id: row.id.into(),
            full_name: row.full_name,
            role,
        }))
    }
}
