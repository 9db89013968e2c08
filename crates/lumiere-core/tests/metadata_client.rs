//! Metadata client against a mock HTTP server

use httpmock::prelude::*;
use lumiere_core::error::CoreError;
use lumiere_core::models::MovieId;
use lumiere_core::{MetadataClient, MetadataSource};
use serde_json::json;

const API_KEY: &str = "test-key";

fn page_body(titles: &[(u64, &str, &str)]) -> serde_json::Value {
    let results: Vec<_> = titles
        .iter()
        .map(|(id, title, lang)| {
            json!({
                "id": id,
                "title": title,
                "original_language": lang,
                "poster_path": "/poster.jpg",
                "release_date": "1999-03-31",
                "vote_average": 8.2
            })
        })
        .collect();
    json!({
        "page": 1,
        "results": results,
        "total_pages": 812,
        "total_results": results.len()
    })
}

#[tokio::test]
async fn search_sends_query_and_key() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/search/movie")
            .query_param("api_key", API_KEY)
            .query_param("query", "the matrix")
            .query_param("page", "2")
            .query_param("include_adult", "false");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(page_body(&[(603, "The Matrix", "en")]));
    });

    let client = MetadataClient::with_base_url(API_KEY, server.base_url());
    let page = client.search_movies("the matrix", 2).await.unwrap();

    mock.assert();
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, MovieId(603));
    assert_eq!(page.results[0].slug(), "603-the-matrix");
    assert_eq!(page.browsable_pages(), 500);
}

#[tokio::test]
async fn blank_search_never_hits_server() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/search/movie");
        then.status(200).json_body(page_body(&[]));
    });

    let client = MetadataClient::with_base_url(API_KEY, server.base_url());
    let page = client.search_movies("", 1).await.unwrap();

    assert!(page.results.is_empty());
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn popular_failure_is_upstream_unavailable() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/movie/popular");
        then.status(503);
    });

    let client = MetadataClient::with_base_url(API_KEY, server.base_url());
    let err = client.popular_movies(1).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::UpstreamUnavailable { status: 503, .. }
    ));
    assert!(err.is_upstream());
}

#[tokio::test]
async fn movie_by_id_found_and_missing() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/movie/27205");
        then.status(200).json_body(json!({
            "id": 27205,
            "title": "Inception",
            "original_language": "en",
            "poster_path": null,
            "release_date": "2010-07-15",
            "runtime": 148
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/movie/1");
        then.status(404).json_body(json!({
            "status_message": "The resource you requested could not be found."
        }));
    });

    let client = MetadataClient::with_base_url(API_KEY, server.base_url());

    let movie = client.movie_by_id(MovieId(27205)).await.unwrap().unwrap();
    assert_eq!(movie.title, "Inception");
    assert_eq!(movie.release_year(), Some(2010));
    assert!(movie.poster_path.is_none());

    assert!(client.movie_by_id(MovieId(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn discover_filters_by_original_language() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/discover/movie")
            .query_param("with_original_language", "ja")
            .query_param("page", "1");
        then.status(200)
            .json_body(page_body(&[(129, "Spirited Away", "ja")]));
    });

    let client = MetadataClient::with_base_url(API_KEY, server.base_url());
    let page = client.discover_movies(1, Some("ja")).await.unwrap();

    mock.assert();
    assert_eq!(page.results[0].original_language, "ja");
}
