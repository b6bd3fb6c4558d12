//! OMDb (Open Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] against the OMDb HTTP API.
//!
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - 30-second request timeout.
//! - OMDb reports misses as `{"Response":"False"}` with HTTP 200; those map
//!   to `None` or an empty result list.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use tracing::debug;

use crate::metadata::provider::{MetadataProvider, MovieResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REQUESTS_PER_SECOND: u32 = 4;

#[derive(Debug, Deserialize)]
struct OmdbMovie {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearch {
    #[serde(rename = "Search", default)]
    search: Vec<OmdbMovie>,
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

impl OmdbMovie {
    fn into_result(self) -> Option<MovieResult> {
        Some(MovieResult {
            title: self.title?,
            year: normalize_year(self.year.as_deref()?)?,
            imdb_id: self.imdb_id?,
        })
    }
}

/// `"1999"`, `"2010–2012"` and `"2010-"` all become the first four digits.
fn normalize_year(year: &str) -> Option<String> {
    let digits: String = year.chars().take_while(char::is_ascii_digit).collect();
    (digits.len() == 4).then_some(digits)
}

fn is_miss(response: Option<&str>) -> bool {
    response.is_some_and(|r| r.eq_ignore_ascii_case("false"))
}

pub struct OmdbProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl OmdbProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> anyhow::Result<T> {
        self.rate_limiter.until_ready().await;
        debug!("OMDb query {:?}", params);

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str()), ("type", "movie")])
            .query(params)
            .send()
            .await
            .context("OMDb request failed")?
            .error_for_status()
            .context("OMDb returned an error status")?;

        resp.json::<T>().await.context("failed to parse OMDb response")
    }

    async fn lookup(&self, params: &[(&str, &str)]) -> anyhow::Result<Option<MovieResult>> {
        let movie: OmdbMovie = self.get(params).await?;
        if is_miss(movie.response.as_deref()) {
            debug!("OMDb miss: {}", movie.error.as_deref().unwrap_or("no result"));
            return Ok(None);
        }
        Ok(movie.into_result())
    }
}

#[async_trait]
impl MetadataProvider for OmdbProvider {
    fn name(&self) -> &'static str {
        "omdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search(&self, title: &str) -> anyhow::Result<Vec<MovieResult>> {
        let found: OmdbSearch = self.get(&[("s", title)]).await?;
        if is_miss(found.response.as_deref()) {
            let error = found.error.unwrap_or_default();
            if error.contains("not found") {
                return Ok(Vec::new());
            }
            bail!("OMDb search failed: {}", error);
        }
        Ok(found
            .search
            .into_iter()
            .filter_map(OmdbMovie::into_result)
            .collect())
    }

    async fn by_title(&self, title: &str) -> anyhow::Result<Option<MovieResult>> {
        self.lookup(&[("t", title)]).await
    }

    async fn by_imdb_id(&self, imdb_id: &str) -> anyhow::Result<Option<MovieResult>> {
        self.lookup(&[("i", imdb_id)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider(server: &MockServer) -> OmdbProvider {
        OmdbProvider::new("test-key", format!("{}/", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_by_title() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("t", "The Matrix"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Title": "The Matrix",
                "Year": "1999",
                "imdbID": "tt0133093",
                "Type": "movie",
                "Response": "True"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let movie = provider(&server).await.by_title("The Matrix").await.unwrap();
        assert_eq!(
            movie,
            Some(MovieResult {
                title: "The Matrix".into(),
                year: "1999".into(),
                imdb_id: "tt0133093".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_miss_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": "False",
                "Error": "Movie not found!"
            })))
            .mount(&server)
            .await;

        let omdb = provider(&server).await;
        assert_eq!(omdb.by_imdb_id("tt0000000").await.unwrap(), None);
        assert!(omdb.search("zzzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("s", "Alien"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Search": [
                    {"Title": "Alien", "Year": "1979", "imdbID": "tt0078748", "Type": "movie"},
                    {"Title": "Aliens", "Year": "1986", "imdbID": "tt0090605", "Type": "movie"},
                    {"Title": "Broken", "Year": "N/A", "imdbID": "tt1", "Type": "movie"}
                ],
                "totalResults": "3",
                "Response": "True"
            })))
            .mount(&server)
            .await;

        let results = provider(&server).await.search("Alien").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].imdb_id, "tt0090605");
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(provider(&server).await.by_title("Alien").await.is_err());
    }

    #[test]
    fn test_normalize_year() {
        assert_eq!(normalize_year("1999"), Some("1999".into()));
        assert_eq!(normalize_year("2010–2012"), Some("2010".into()));
        assert_eq!(normalize_year("N/A"), None);
    }

    #[test]
    fn test_availability() {
        assert!(!OmdbProvider::new("", "http://localhost/").unwrap().is_available());
        assert!(OmdbProvider::new("k", "http://localhost/").unwrap().is_available());
    }
}
