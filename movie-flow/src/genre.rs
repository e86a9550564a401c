//! Genre browsing.
//!
//! The provider has no genre filter, so [`GenreResolver`] searches with the genre name as a
//! plain search term, keeps the hits whose detail record really lists the genre, and tops the
//! result up from a static table of well-known titles.

use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{MovieCatalog, MovieSummary};

/// Maximum number of titles returned for one genre.
pub const GENRE_RESULT_CAP: usize = 3;

const GENRE_CANDIDATES: &[(&str, &[&str])] = &[
    ("Action", &["Mad Max: Fury Road", "Die Hard", "The Dark Knight", "John Wick", "Gladiator"]),
    ("Comedy", &["Superbad", "The Grand Budapest Hotel", "Groundhog Day", "The Hangover", "Hot Fuzz"]),
    ("Drama", &["The Shawshank Redemption", "Forrest Gump", "Fight Club", "Whiplash", "The Godfather"]),
    ("Horror", &["The Shining", "Get Out", "Hereditary", "The Conjuring", "A Quiet Place"]),
    ("Sci-Fi", &["Inception", "Interstellar", "The Matrix", "Blade Runner 2049", "Arrival"]),
    ("Romance", &["La La Land", "Titanic", "The Notebook", "Before Sunrise", "Pride & Prejudice"]),
    ("Thriller", &["Se7en", "Gone Girl", "Prisoners", "Zodiac", "Shutter Island"]),
    ("Animation", &["Spirited Away", "Toy Story", "Up", "Coco", "WALL·E"]),
    ("Crime", &["Pulp Fiction", "Goodfellas", "The Departed", "Heat", "Reservoir Dogs"]),
    ("Adventure", &["Raiders of the Lost Ark", "Jurassic Park", "Back to the Future", "The Lord of the Rings: The Fellowship of the Ring", "Jaws"]),
];

/// Static genre → canonical titles mapping used to fill short genre results.
#[derive(Debug, Clone)]
pub struct GenreCandidateTable {
    entries: Vec<(String, Vec<String>)>,
}

impl GenreCandidateTable {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    /// Fill titles for `genre`, matched case-insensitively. Empty for unknown genres.
    pub fn candidates(&self, genre: &str) -> &[String] {
        let genre = genre.trim();
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(genre))
            .map(|(_, titles)| titles.as_slice())
            .unwrap_or_default()
    }

    /// Genre names in table order.
    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl Default for GenreCandidateTable {
    fn default() -> Self {
        Self::new(
            GENRE_CANDIDATES
                .iter()
                .map(|(genre, titles)| {
                    (
                        genre.to_string(),
                        titles.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}

pub struct GenreResolver {
    catalog: Arc<dyn MovieCatalog>,
    table: GenreCandidateTable,
}

impl GenreResolver {
    pub fn new(catalog: Arc<dyn MovieCatalog>, table: GenreCandidateTable) -> Self {
        Self { catalog, table }
    }

    pub fn table(&self) -> &GenreCandidateTable {
        &self.table
    }

    /// Up to [`GENRE_RESULT_CAP`] titles for `genre`, in discovery order, with distinct
    /// titles. Empty when nothing matches.
    pub async fn resolve(&self, genre: &str) -> Vec<MovieSummary> {
        let genre = genre.trim();
        let mut accepted: Vec<MovieSummary> = Vec::new();
        if genre.is_empty() {
            return accepted;
        }

        // Provider pass: the genre name as a plain search term, kept only when the
        // detail record lists the genre
        for hit in self.catalog.search(genre, 1).await {
            if accepted.len() >= GENRE_RESULT_CAP {
                break;
            }
            if is_represented(&accepted, &hit) {
                continue;
            }
            match self.catalog.detail(&hit.id).await {
                Some(detail) if detail.has_genre(genre) => accepted.push(hit),
                Some(_) => debug!(genre = %genre, movie_id = %hit.id, "search hit outside genre"),
                None => debug!(genre = %genre, movie_id = %hit.id, "no details for search hit"),
            }
        }
        let from_provider = accepted.len();

        // Fill pass: first hit for each canonical title of the genre

        for title in self.table.candidates(genre) {
            if accepted.len() >= GENRE_RESULT_CAP {
                break;
            }
            if accepted.iter().any(|m| m.title.eq_ignore_ascii_case(title)) {
                continue;
            }
            let Some(first) = self.catalog.search(title, 1).await.into_iter().next() else {
                debug!(genre = %genre, title = %title, "fill title not found");
                continue;
            };
            if !is_represented(&accepted, &first) {
                accepted.push(first);
            }
        }

        info!(
            genre = %genre,
            from_provider,
            from_table = accepted.len() - from_provider,
            "genre resolved"
        );
        accepted
    }
}

fn is_represented(accepted: &[MovieSummary], candidate: &MovieSummary) -> bool {
    accepted
        .iter()
        .any(|m| m.id == candidate.id || m.title.eq_ignore_ascii_case(&candidate.title))
}
