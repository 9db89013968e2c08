//! Movie metadata API client
//!
//! Endpoints: `/search/movie`, `/movie/popular`, `/movie/{id}`, `/discover/movie`.
//! The API key travels as the `api_key` query parameter.

use async_trait::async_trait;
use crate::config::{Config, DEFAULT_TMDB_BASE_URL};
use crate::error::{CoreError, Result};
use crate::models::{Movie, MovieId, MoviePage};
use reqwest::Response;
use serde::de::DeserializeOwned;
use super::MetadataSource;
use tracing::{debug, warn};

/// HTTP client for the metadata API
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MetadataClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_TMDB_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_key, base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool)
    pub fn with_client(
        client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::with_base_url(
            config.tmdb_api_key()?,
            config.tmdb_base_url.as_str(),
        ))
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Metadata request");
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            warn!(operation, status = status.as_u16(), "Metadata API call failed");
            return Err(CoreError::upstream(operation, status));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MetadataSource for MetadataClient {
    async fn search_movies(&self, query: &str, page: u32) -> Result<MoviePage> {
        if query.trim().is_empty() {
            return Ok(MoviePage::empty());
        }

        let response = self
            .get(
                "/search/movie",
                &[
                    ("query", query.to_string()),
                    ("page", page.to_string()),
                    ("include_adult", "false".to_string()),
                ],
            )
            .await?;
        Self::parse("search movies", response).await
    }

    async fn popular_movies(&self, page: u32) -> Result<MoviePage> {
        let response = self
            .get("/movie/popular", &[("page", page.to_string())])
            .await?;
        Self::parse("fetch popular movies", response).await
    }

    async fn movie_by_id(&self, id: MovieId) -> Result<Option<Movie>> {
        let response = self.get(&format!("/movie/{}", id), &[]).await?;
        if !response.status().is_success() {
            debug!(%id, status = response.status().as_u16(), "Movie lookup returned nothing");
            return Ok(None);
        }
        Ok(Some(response.json::<Movie>().await?))
    }

    async fn discover_movies(&self, page: u32, language: Option<&str>) -> Result<MoviePage> {
        let mut params = vec![
            ("page", page.to_string()),
            ("include_adult", "false".to_string()),
        ];
        if let Some(lang) = language.filter(|l| !l.is_empty()) {
            params.push(("with_original_language", lang.to_string()));
        }

        let response = self.get("/discover/movie", &params).await?;
        Self::parse("discover movies", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_search_skips_request() {
        // Unroutable base URL: any request would fail
        let client = MetadataClient::with_base_url("key", "http://127.0.0.1:9");
        let page = client.search_movies("   ", 3).await.unwrap();
        assert_eq!(page, MoviePage::empty());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = MetadataClient::with_base_url("key", "https://api.example.org/3/");
        assert_eq!(client.base_url, "https://api.example.org/3");
    }
}
