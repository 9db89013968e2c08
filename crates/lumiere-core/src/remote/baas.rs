//! Backend-as-a-service client (PostgREST tables + GoTrue auth)
//!
//! Tables:
//! - `climaxes(id, movie_slug, movie_title, content, author_id, created_at)`
//! - `votes(climax_id, user_id)` unique on the pair
//! - `profiles(id, display_name)`
//!
//! Reads go out with the anon key; writes require a [`Session`] and carry its
//! bearer token. Access control and uniqueness are enforced remotely.

use async_trait::async_trait;
use crate::auth::{friendly_auth_message, Session};
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::models::{Climax, ClimaxId, NewClimax, Profile, UserId, Vote, VoteRef};
use chrono::{Duration, Utc};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use super::VoteBackend;
use tracing::{debug, info, warn};

const CLIMAX_COLUMNS: &str = "id,movie_slug,movie_title,content,author_id,created_at";

/// HTTP client for the BaaS project
#[derive(Debug, Clone)]
pub struct BaasClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

/// GoTrue token response (subset)
#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    user: Option<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// GoTrue error bodies use several field names
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// PostgREST `in.(...)` filter with quoted members
fn in_filter<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let quoted: Vec<String> = values
        .into_iter()
        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

impl BaasClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, anon_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (url, key) = config.baas()?;
        Ok(Self::new(url, key))
    }

    fn table(
        &self,
        method: reqwest::Method,
        table: &str,
        session: Option<&Session>,
    ) -> RequestBuilder {
        let token = session
            .map(|s| s.access_token.as_str())
            .unwrap_or(self.anon_key.as_str());
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn expect_rows<T: DeserializeOwned>(
        operation: &str,
        response: Response,
    ) -> Result<Vec<T>> {
        let status = response.status();
        if !status.is_success() {
            warn!(operation, status = status.as_u16(), "BaaS call failed");
            return Err(CoreError::upstream(operation, status));
        }
        Ok(response.json::<Vec<T>>().await?)
    }

    async fn expect_ok(operation: &str, response: Response) -> Result<()> {
        let status = response.status();
        if !status.is_success() {
            warn!(operation, status = status.as_u16(), "BaaS call failed");
            return Err(CoreError::upstream(operation, status));
        }
        Ok(())
    }

    // ========================================================================
    // Auth
    // ========================================================================

    async fn auth_call(&self, path: &str, body: serde_json::Value) -> Result<Session> {
        let response = self
            .client
            .post(format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: AuthErrorBody = response.json().await.unwrap_or_default();
            let raw = body
                .error_description
                .or(body.msg)
                .or(body.message)
                .unwrap_or_else(|| format!("auth request failed with status {}", status.as_u16()));
            return Err(CoreError::Auth {
                message: friendly_auth_message(&raw),
            });
        }

        let auth: AuthResponse = response.json().await?;
        let (Some(access_token), Some(user)) = (auth.access_token, auth.user) else {
            return Err(CoreError::Auth {
                message: "Check your email to confirm your account, then sign in".to_string(),
            });
        };

        Ok(Session {
            user_id: UserId::new(user.id),
            email: user.email.unwrap_or_default(),
            access_token,
            expires_at: auth.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .auth_call(
                "token?grant_type=password",
                json!({ "email": email, "password": password }),
            )
            .await?;
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    /// Register; the profile row is created remotely from `display_name` metadata
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Session> {
        let session = self
            .auth_call(
                "signup",
                json!({
                    "email": email,
                    "password": password,
                    "data": { "display_name": display_name },
                }),
            )
            .await?;
        info!(user_id = %session.user_id, "Signed up");
        Ok(session)
    }

    // ========================================================================
    // Climaxes
    // ========================================================================

    pub async fn climaxes_for_movie(&self, movie_slug: &str) -> Result<Vec<Climax>> {
        let response = self
            .table(reqwest::Method::GET, "climaxes", None)
            .query(&[("select", CLIMAX_COLUMNS.to_string()), ("movie_slug", eq(movie_slug))])
            .send()
            .await?;
        Self::expect_rows("load climaxes", response).await
    }

    /// Newest first
    pub async fn climaxes_by_author(&self, author: &UserId) -> Result<Vec<Climax>> {
        let response = self
            .table(reqwest::Method::GET, "climaxes", None)
            .query(&[
                ("select", CLIMAX_COLUMNS.to_string()),
                ("author_id", eq(author)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        Self::expect_rows("load author climaxes", response).await
    }

    /// The `limit` newest climaxes across all movies
    pub async fn recent_climaxes(&self, limit: usize) -> Result<Vec<Climax>> {
        let response = self
            .table(reqwest::Method::GET, "climaxes", None)
            .query(&[
                ("select", CLIMAX_COLUMNS.to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        Self::expect_rows("load recent climaxes", response).await
    }

    /// Movie slug of every climax (one entry per climax)
    pub async fn climax_slugs(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct SlugRow {
            movie_slug: String,
        }

        let response = self
            .table(reqwest::Method::GET, "climaxes", None)
            .query(&[("select", "movie_slug")])
            .send()
            .await?;
        let rows: Vec<SlugRow> = Self::expect_rows("load climax slugs", response).await?;
        Ok(rows.into_iter().map(|r| r.movie_slug).collect())
    }

    pub async fn insert_climax(&self, session: &Session, climax: &NewClimax) -> Result<Climax> {
        let response = self
            .table(reqwest::Method::POST, "climaxes", Some(session))
            .header("Prefer", "return=representation")
            .json(climax)
            .send()
            .await?;
        let mut rows: Vec<Climax> = Self::expect_rows("publish climax", response).await?;
        let created = rows.pop().ok_or_else(|| CoreError::UpstreamUnavailable {
            operation: "publish climax".to_string(),
            status: 204,
        })?;
        info!(climax_id = %created.id, movie_slug = %created.movie_slug, "Climax published");
        Ok(created)
    }

    /// Delete one of the session user's climaxes
    pub async fn delete_climax(&self, session: &Session, id: &ClimaxId) -> Result<()> {
        let response = self
            .table(reqwest::Method::DELETE, "climaxes", Some(session))
            .query(&[("id", eq(id)), ("author_id", eq(&session.user_id))])
            .send()
            .await?;
        Self::expect_ok("delete climax", response).await?;
        info!(climax_id = %id, "Climax deleted");
        Ok(())
    }

    // ========================================================================
    // Votes
    // ========================================================================

    /// One row per vote on any of `climax_ids`
    pub async fn votes_for(&self, climax_ids: &[ClimaxId]) -> Result<Vec<VoteRef>> {
        if climax_ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .table(reqwest::Method::GET, "votes", None)
            .query(&[
                ("select", "climax_id".to_string()),
                ("climax_id", in_filter(climax_ids.iter().map(|c| c.as_str()))),
            ])
            .send()
            .await?;
        Self::expect_rows("load votes", response).await
    }

    /// The session user's votes among `climax_ids`
    pub async fn user_votes(
        &self,
        session: &Session,
        climax_ids: &[ClimaxId],
    ) -> Result<Vec<VoteRef>> {
        if climax_ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .table(reqwest::Method::GET, "votes", Some(session))
            .query(&[
                ("select", "climax_id".to_string()),
                ("user_id", eq(&session.user_id)),
                ("climax_id", in_filter(climax_ids.iter().map(|c| c.as_str()))),
            ])
            .send()
            .await?;
        Self::expect_rows("load user votes", response).await
    }

    // ========================================================================
    // Profiles
    // ========================================================================

    pub async fn profiles_for(&self, ids: &[UserId]) -> Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .table(reqwest::Method::GET, "profiles", None)
            .query(&[
                ("select", "id,display_name".to_string()),
                ("id", in_filter(ids.iter().map(|u| u.as_str()))),
            ])
            .send()
            .await?;
        Self::expect_rows("load profiles", response).await
    }

    pub async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let response = self
            .table(reqwest::Method::GET, "profiles", None)
            .query(&[("select", "id,display_name".to_string()), ("id", eq(user_id))])
            .send()
            .await?;
        let mut rows: Vec<Profile> = Self::expect_rows("load profile", response).await?;
        Ok(rows.pop())
    }

    pub async fn update_display_name(&self, session: &Session, display_name: &str) -> Result<()> {
        let response = self
            .table(reqwest::Method::PATCH, "profiles", Some(session))
            .query(&[("id", eq(&session.user_id))])
            .json(&json!({ "display_name": display_name }))
            .send()
            .await?;
        Self::expect_ok("update profile", response).await?;
        info!(user_id = %session.user_id, "Display name updated");
        Ok(())
    }
}

#[async_trait]
impl VoteBackend for BaasClient {
    async fn insert_vote(&self, session: &Session, climax_id: &ClimaxId) -> Result<()> {
        let vote = Vote {
            climax_id: climax_id.clone(),
            user_id: session.user_id.clone(),
        };
        let response = self
            .table(reqwest::Method::POST, "votes", Some(session))
            .json(&vote)
            .send()
            .await?;
        Self::expect_ok("cast vote", response).await?;
        debug!(climax_id = %climax_id, "Vote inserted");
        Ok(())
    }

    async fn delete_vote(&self, session: &Session, climax_id: &ClimaxId) -> Result<()> {
        let response = self
            .table(reqwest::Method::DELETE, "votes", Some(session))
            .query(&[("climax_id", eq(climax_id)), ("user_id", eq(&session.user_id))])
            .send()
            .await?;
        Self::expect_ok("retract vote", response).await?;
        debug!(climax_id = %climax_id, "Vote deleted");
        Ok(())
    }
}
