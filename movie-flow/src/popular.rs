use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::{MovieCatalog, MovieSummary};

pub const POPULAR_SAMPLE_SIZE: usize = 5;

pub const POPULAR_TITLES: [&str; 20] = [
    "The Shawshank Redemption",
    "The Godfather",
    "The Dark Knight",
    "Pulp Fiction",
    "Forrest Gump",
    "Inception",
    "Fight Club",
    "The Matrix",
    "Goodfellas",
    "Interstellar",
    "Parasite",
    "Gladiator",
    "The Lion King",
    "Spirited Away",
    "Back to the Future",
    "Whiplash",
    "The Prestige",
    "Alien",
    "Jurassic Park",
    "Titanic",
];

/// Fallback source for the popular list and random picks: a random sample of a fixed
/// reference list, each title resolved through a search.
pub struct PopularPool {
    catalog: Arc<dyn MovieCatalog>,
    titles: Vec<String>,
}

impl PopularPool {
    pub fn new(catalog: Arc<dyn MovieCatalog>) -> Self {
        Self::with_titles(catalog, POPULAR_TITLES.iter().map(|t| t.to_string()).collect())
    }

    pub fn with_titles(catalog: Arc<dyn MovieCatalog>, titles: Vec<String>) -> Self {
        Self { catalog, titles }
    }

    /// Samples up to [`POPULAR_SAMPLE_SIZE`] reference titles and keeps the first search hit
    /// of each. Titles the provider misses are skipped.
    pub async fn sample(&self) -> Vec<MovieSummary> {
        // ThreadRng is !Send, keep it out of the awaits below
        let picks: Vec<String> = {
            let mut rng = rand::rng();
            self.titles
                .choose_multiple(&mut rng, POPULAR_SAMPLE_SIZE)
                .cloned()
                .collect()
        };

        let mut pool: Vec<MovieSummary> = Vec::with_capacity(picks.len());
        for title in &picks {
            match self.catalog.search(title, 1).await.into_iter().next() {
                Some(hit) if !pool.iter().any(|m| m.id == hit.id) => pool.push(hit),
                Some(_) => {}
                None => debug!(title = %title, "popular title not found"),
            }
        }

        if pool.is_empty() {
            warn!(sampled = picks.len(), "no popular title could be resolved");
        }
        pool
    }

    /// One random entry of a fresh sample.
    pub async fn pick_one(&self) -> Option<MovieSummary> {
        let pool = self.sample().await;
        let mut rng = rand::rng();
        pool.choose(&mut rng).cloned()
    }
}
