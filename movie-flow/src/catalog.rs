//! Movie metadata lookups.
//!
//! [`MovieCatalog`] is the capability the rest of the engine talks to. Implementations fail
//! soft: a transport error, a timeout or a negative provider answer all come back as an empty
//! result set (or `None` for details), never as an error. Callers decide how to render
//! "unavailable".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Applied to every outbound provider request. There is no retry.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Number of results the provider returns per search page.
pub const PROVIDER_PAGE_SIZE: usize = 10;

pub const UNKNOWN_FIELD: &str = "Unknown";
pub const NO_PLOT: &str = "No plot available.";

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: String,
    pub title: String,
    pub year: String,
}

/// Full record returned by a detail lookup. Never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub year: String,
    pub genres: Vec<String>,
    pub director: String,
    pub cast: String,
    pub rating: String,
    pub runtime: String,
    pub plot: String,
    pub poster: Option<String>,
}

impl MovieDetail {
    /// Detail record with placeholder values for everything but the identity fields.
    pub fn new(id: impl Into<String>, title: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            year: year.into(),
            genres: Vec::new(),
            director: UNKNOWN_FIELD.to_string(),
            cast: UNKNOWN_FIELD.to_string(),
            rating: UNKNOWN_FIELD.to_string(),
            runtime: UNKNOWN_FIELD.to_string(),
            plot: NO_PLOT.to_string(),
            poster: None,
        }
    }

    pub fn with_genres(mut self, genres: &[&str]) -> Self {
        self.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn summary(&self) -> MovieSummary {
        MovieSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            year: self.year.clone(),
        }
    }

    /// Case-insensitive exact match against one of the record's genres.
    pub fn has_genre(&self, genre: &str) -> bool {
        let genre = genre.trim();
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }
}

/// Canonical provider page for a title.
pub fn imdb_url(id: &str) -> String {
    format!("https://www.imdb.com/title/{id}/")
}

/// Video-search query for the title's trailer.
pub fn trailer_url(title: &str) -> String {
    let terms: Vec<_> = title
        .split_whitespace()
        .chain(["trailer"])
        .map(urlencoding::encode)
        .collect();
    format!("https://www.youtube.com/results?search_query={}", terms.join("+"))
}

/// Lookup capability over an external metadata provider.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Free-text search. Pages are 1-based. Empty on any failure.
    async fn search(&self, query: &str, page: u32) -> Vec<MovieSummary>;

    /// Full record for an identifier, `None` when not found or unavailable.
    async fn detail(&self, id: &str) -> Option<MovieDetail>;
}

/// In-memory catalog over a fixed set of records.
///
/// Search is a case-insensitive substring match on the title, paged like the provider.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    movies: Vec<MovieDetail>,
}

impl InMemoryCatalog {
    pub fn new(movies: Vec<MovieDetail>) -> Self {
        Self { movies }
    }

    pub fn with_movie(mut self, movie: MovieDetail) -> Self {
        self.movies.push(movie);
        self
    }
}

#[async_trait]
impl MovieCatalog for InMemoryCatalog {
    async fn search(&self, query: &str, page: u32) -> Vec<MovieSummary> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let skip = (page.max(1) as usize - 1) * PROVIDER_PAGE_SIZE;
        self.movies
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .skip(skip)
            .take(PROVIDER_PAGE_SIZE)
            .map(MovieDetail::summary)
            .collect()
    }

    async fn detail(&self, id: &str) -> Option<MovieDetail> {
        self.movies.iter().find(|m| m.id == id).cloned()
    }
}

#[cfg(feature = "omdb")]
pub use omdb::{DEFAULT_OMDB_URL, OmdbCatalog};

#[cfg(feature = "omdb")]
mod omdb {
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde::de::DeserializeOwned;
    use tracing::{debug, warn};

    use super::{
        MovieCatalog, MovieDetail, MovieSummary, NO_PLOT, REQUEST_TIMEOUT, UNKNOWN_FIELD,
    };
    use crate::error::{FlowError, Result};

    pub const DEFAULT_OMDB_URL: &str = "https://www.omdbapi.com/";

    /// [`MovieCatalog`] backed by the OMDb HTTP API.
    #[derive(Clone)]
    pub struct OmdbCatalog {
        client: reqwest::Client,
        base_url: String,
        api_key: String,
    }

    impl OmdbCatalog {
        pub fn new(api_key: impl Into<String>) -> Result<Self> {
            Self::with_base_url(api_key, DEFAULT_OMDB_URL)
        }

        pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(|e| FlowError::CatalogError(e.to_string()))?;
            Ok(Self {
                client,
                base_url: base_url.into(),
                api_key: api_key.into(),
            })
        }

        async fn fetch<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> Result<T> {
            let response = self
                .client
                .get(&self.base_url)
                .query(&[("apikey", self.api_key.as_str())])
                .query(params)
                .send()
                .await
                .map_err(|e| FlowError::CatalogError(format!("request failed: {e}")))?
                .error_for_status()
                .map_err(|e| FlowError::CatalogError(format!("provider status: {e}")))?;

            response
                .json::<T>()
                .await
                .map_err(|e| FlowError::CatalogError(format!("malformed payload: {e}")))
        }
    }

    #[async_trait]
    impl MovieCatalog for OmdbCatalog {
        async fn search(&self, query: &str, page: u32) -> Vec<MovieSummary> {
            let params = [("s", query.to_string()), ("page", page.max(1).to_string())];
            match self.fetch::<SearchResponse>(&params).await {
                Ok(response) => {
                    let results = response.into_summaries();
                    debug!(query = %query, page, count = results.len(), "catalog search");
                    results
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "catalog search failed");
                    Vec::new()
                }
            }
        }

        async fn detail(&self, id: &str) -> Option<MovieDetail> {
            let params = [("i", id.to_string()), ("plot", "full".to_string())];
            match self.fetch::<DetailResponse>(&params).await {
                Ok(response) => response.into_detail(id),
                Err(e) => {
                    warn!(movie_id = %id, error = %e, "catalog detail lookup failed");
                    None
                }
            }
        }
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub(super) struct SearchResponse {
        #[serde(rename = "Response")]
        response: String,
        #[serde(rename = "Search")]
        search: Vec<SearchItem>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct SearchItem {
        #[serde(rename = "imdbID")]
        imdb_id: Option<String>,
        #[serde(rename = "Title")]
        title: Option<String>,
        #[serde(rename = "Year")]
        year: Option<String>,
    }

    impl SearchResponse {
        pub(super) fn into_summaries(self) -> Vec<MovieSummary> {
            if !self.response.eq_ignore_ascii_case("true") {
                return Vec::new();
            }
            self.search
                .into_iter()
                .filter_map(|item| {
                    let id = present(item.imdb_id)?;
                    Some(MovieSummary {
                        id,
                        title: present(item.title).unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
                        year: present(item.year).unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
                    })
                })
                .collect()
        }
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub(super) struct DetailResponse {
        #[serde(rename = "Response")]
        response: String,
        #[serde(rename = "imdbID")]
        imdb_id: Option<String>,
        #[serde(rename = "Title")]
        title: Option<String>,
        #[serde(rename = "Year")]
        year: Option<String>,
        #[serde(rename = "Genre")]
        genre: Option<String>,
        #[serde(rename = "Director")]
        director: Option<String>,
        #[serde(rename = "Actors")]
        actors: Option<String>,
        #[serde(rename = "imdbRating")]
        rating: Option<String>,
        #[serde(rename = "Runtime")]
        runtime: Option<String>,
        #[serde(rename = "Plot")]
        plot: Option<String>,
        #[serde(rename = "Poster")]
        poster: Option<String>,
    }

    impl DetailResponse {
        pub(super) fn into_detail(self, requested_id: &str) -> Option<MovieDetail> {
            if !self.response.eq_ignore_ascii_case("true") {
                return None;
            }
            let or_unknown = |v: Option<String>| present(v).unwrap_or_else(|| UNKNOWN_FIELD.to_string());
            Some(MovieDetail {
                id: present(self.imdb_id).unwrap_or_else(|| requested_id.to_string()),
                title: or_unknown(self.title),
                year: or_unknown(self.year),
                genres: present(self.genre)
                    .map(|g| {
                        g.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                director: or_unknown(self.director),
                cast: or_unknown(self.actors),
                rating: or_unknown(self.rating),
                runtime: or_unknown(self.runtime),
                plot: present(self.plot).unwrap_or_else(|| NO_PLOT.to_string()),
                poster: present(self.poster),
            })
        }
    }

    /// The provider reports missing values as "N/A".
    fn present(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "N/A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::default()
            .with_movie(MovieDetail::new("tt1375666", "Inception", "2010").with_genres(&["Action", "Sci-Fi"]))
            .with_movie(MovieDetail::new("tt0816692", "Interstellar", "2014"))
    }

    #[tokio::test]
    async fn test_in_memory_search_is_case_insensitive() {
        let results = catalog().search("inCEP", 1).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "tt1375666");
        assert!(catalog().search("   ", 1).await.is_empty());
        assert!(catalog().search("inception", 2).await.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_detail_absent_for_unknown_id() {
        assert!(catalog().detail("tt0000000").await.is_none());
        let detail = catalog().detail("tt0816692").await.unwrap();
        assert_eq!(detail.plot, NO_PLOT);
    }

    #[test]
    fn test_has_genre_matches_whole_names_only() {
        let movie = MovieDetail::new("tt1", "X", "2000").with_genres(&["Sci-Fi", "Drama"]);
        assert!(movie.has_genre("sci-fi"));
        assert!(movie.has_genre(" DRAMA "));
        assert!(!movie.has_genre("Dram"));
    }

    #[test]
    fn test_links() {
        assert_eq!(imdb_url("tt1375666"), "https://www.imdb.com/title/tt1375666/");
        assert_eq!(
            trailer_url("The  Dark Knight"),
            "https://www.youtube.com/results?search_query=The+Dark+Knight+trailer"
        );
    }

    #[cfg(feature = "omdb")]
    mod omdb_payloads {
        use super::super::omdb::{DetailResponse, SearchResponse};

        #[test]
        fn test_search_payload_skips_entries_without_id() {
            let raw = r#"{"Response":"True","totalResults":"2","Search":[
                {"Title":"Inception","Year":"2010","imdbID":"tt1375666","Type":"movie"},
                {"Title":"Broken","Year":"N/A"}
            ]}"#;
            let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
            let results = parsed.into_summaries();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].title, "Inception");
        }

        #[test]
        fn test_negative_search_payload_is_empty() {
            let raw = r#"{"Response":"False","Error":"Movie not found!"}"#;
            let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
            assert!(parsed.into_summaries().is_empty());
        }

        #[test]
        fn test_detail_payload_degrades_to_placeholders() {
            let raw = r#"{"Response":"True","Title":"Inception","Year":"2010",
                "Genre":"Action, Adventure, Sci-Fi","Director":"N/A","Plot":"",
                "Poster":"N/A","imdbRating":"8.8"}"#;
            let parsed: DetailResponse = serde_json::from_str(raw).unwrap();
            let detail = parsed.into_detail("tt1375666").unwrap();
            assert_eq!(detail.id, "tt1375666");
            assert_eq!(detail.genres, vec!["Action", "Adventure", "Sci-Fi"]);
            assert_eq!(detail.director, "Unknown");
            assert_eq!(detail.cast, "Unknown");
            assert_eq!(detail.plot, "No plot available.");
            assert_eq!(detail.poster, None);
            assert_eq!(detail.rating, "8.8");
        }

        #[test]
        fn test_negative_detail_payload_is_absent() {
            let raw = r#"{"Response":"False","Error":"Incorrect IMDb ID."}"#;
            let parsed: DetailResponse = serde_json::from_str(raw).unwrap();
            assert!(parsed.into_detail("tt0").is_none());
        }
    }
}
