use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    action::Action,
    catalog::MovieCatalog,
    error::Result,
    genre::{GenreCandidateTable, GenreResolver},
    popular::PopularPool,
    render,
    session::{Session, SessionStore, UserId},
    view::{Button, Reply, Screen},
};

/// Maximum number of entries rendered for a free-text search.
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Watchlist entries shown per page.
pub const WATCHLIST_PAGE_SIZE: usize = 10;

/// The menu state machine.
///
/// Maps an [`Action`] plus the user's [`Session`] to a [`Reply`] and performs any session
/// mutation the action implies. Navigation replies record the last rendered screen on the
/// session; notices leave it untouched.
pub struct MenuEngine {
    catalog: Arc<dyn MovieCatalog>,
    sessions: Arc<dyn SessionStore>,
    genres: GenreResolver,
    popular: PopularPool,
}

impl MenuEngine {
    pub fn new(catalog: Arc<dyn MovieCatalog>, sessions: Arc<dyn SessionStore>) -> Self {
        let genres = GenreResolver::new(catalog.clone(), GenreCandidateTable::default());
        let popular = PopularPool::new(catalog.clone());
        Self::with_parts(catalog, sessions, genres, popular)
    }

    pub fn with_parts(
        catalog: Arc<dyn MovieCatalog>,
        sessions: Arc<dyn SessionStore>,
        genres: GenreResolver,
        popular: PopularPool,
    ) -> Self {
        Self {
            catalog,
            sessions,
            genres,
            popular,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Handles one action for the owner of `session`.
    ///
    /// `session` is the snapshot taken when the event entered the dispatcher. Errors are
    /// session store failures only; every catalog-dependent branch renders its own
    /// "unavailable" answer.
    pub async fn handle(&self, session: &Session, action: Action) -> Result<Reply> {
        let user = session.user_id;
        info!(user_id = %user, action = ?action, "handling action");

        let reply = match action {
            Action::MainMenu => Reply::view(render::main_menu(None)),
            Action::Help => Reply::view(render::help()),
            Action::SearchPrompt => Reply::view(render::search_prompt()),
            Action::Search(query) => self.search(user, &query).await?,
            Action::Popular => Reply::view(render::popular_list(&self.popular.sample().await)),
            Action::GenreMenu => Reply::view(render::genre_menu(self.genres.table().genres())),
            Action::ShowGenre(genre) => self.genre_results(&genre).await,
            Action::Random => self.random().await,
            Action::Watchlist => self.watchlist(session, 0).await,
            Action::WatchlistPage(page) => self.watchlist(session, page).await,
            Action::ClearWatchlist => {
                self.sessions.clear_watchlist(user).await?;
                info!(user_id = %user, "watchlist cleared");
                Reply::view(render::main_menu(Some(render::WATCHLIST_CLEARED)))
            }
            Action::Preferences => Reply::view(render::preferences(session)),
            Action::ShowDetail(id) => self.details(&id).await,
            Action::SaveToWatchlist(id) => {
                let added = self.sessions.add_to_watchlist(user, &id).await?;
                debug!(user_id = %user, movie_id = %id, added, "watchlist save");
                Reply::notice(if added {
                    render::WATCHLIST_ADDED
                } else {
                    render::WATCHLIST_ALREADY_PRESENT
                })
            }
            Action::FavoriteGenre(genre) => {
                let genre = genre.trim();
                if self.sessions.add_favorite_genre(user, genre).await? {
                    Reply::notice(format!("⭐ {genre} added to your favorite genres."))
                } else {
                    Reply::notice(format!("ℹ️ {genre} is already one of your favorite genres."))
                }
            }
            Action::Unknown(raw) => {
                debug!(user_id = %user, input = %raw, "unrecognized input");
                Reply::notice(render::UNKNOWN_INPUT)
            }
        };

        // Notices are not navigation, only rendered views move the user
        if let Some(last) = reply.views().last() {
            self.sessions.set_screen(user, last.screen.clone()).await?;
        }
        Ok(reply)
    }

    async fn search(&self, user: UserId, query: &str) -> Result<Reply> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Reply::notice(render::EMPTY_QUERY));
        }
        self.sessions.set_last_query(user, query).await?;

        // The provider pages by 10, only the first page is shown
        let results: Vec<_> = self
            .catalog
            .search(query, 1)
            .await
            .into_iter()
            .take(SEARCH_RESULT_LIMIT)
            .collect();
        info!(user_id = %user, query = %query, results = results.len(), "search completed");

        if results.is_empty() {
            return Ok(Reply::view(render::no_results(query)));
        }
        let screen = Screen::SearchResults(query.to_string());
        Ok(Reply::Render(
            results
                .iter()
                .map(|movie| render::result_entry(screen.clone(), movie))
                .collect(),
        ))
    }

    async fn genre_results(&self, genre: &str) -> Reply {
        let genre = genre.trim();
        let results = self.genres.resolve(genre).await;
        if results.is_empty() {
            return Reply::view(render::genre_unavailable(genre));
        }

        let screen = Screen::GenreResults(genre.to_string());
        let mut views: Vec<_> = results
            .iter()
            .map(|movie| render::result_entry(screen.clone(), movie))
            .collect();
        views.push(render::genre_footer(genre, results.len()));
        Reply::Render(views)
    }

    async fn random(&self) -> Reply {
        let Some(pick) = self.popular.pick_one().await else {
            return Reply::view(render::random_unavailable());
        };
        // Summary came from a search, the view needs the full record
        match self.catalog.detail(&pick.id).await {
            Some(detail) => Reply::view(render::detail(
                Screen::RandomResult,
                &detail,
                vec![Button::callback("🎲 Another one", Action::Random)],
            )),
            None => {
                debug!(movie_id = %pick.id, "random pick has no details");
                Reply::view(render::random_unavailable())
            }
        }
    }

    async fn details(&self, id: &str) -> Reply {
        match self.catalog.detail(id).await {
            Some(detail) => Reply::view(render::detail(
                Screen::MovieDetailView(id.to_string()),
                &detail,
                Vec::new(),
            )),
            None => Reply::notice(render::DETAILS_UNAVAILABLE),
        }
    }

    async fn watchlist(&self, session: &Session, page: usize) -> Reply {
        let total = session.watchlist.len();
        // Out-of-range pages (stale buttons after a clear) clamp to the last one
        let last_page = total.saturating_sub(1) / WATCHLIST_PAGE_SIZE;
        let page = page.min(last_page);

        let ids: Vec<&String> = session
            .watchlist
            .iter()
            .skip(page * WATCHLIST_PAGE_SIZE)
            .take(WATCHLIST_PAGE_SIZE)
            .collect();

        // Only the visible page is resolved, all lookups in flight together
        let details = join_all(ids.iter().map(|id| self.catalog.detail(id))).await;

        let entries: Vec<(String, String)> = ids
            .into_iter()
            .zip(details)
            .map(|(id, detail)| {
                let label = match detail {
                    Some(detail) => format!("{} ({})", detail.title, detail.year),
                    None => id.clone(),
                };
                (id.clone(), label)
            })
            .collect();
        debug!(user_id = %session.user_id, page, total, "watchlist page rendered");

        Reply::view(render::watchlist(&entries, page, total))
    }
}
