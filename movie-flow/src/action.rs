use serde::{Deserialize, Serialize};

/// Everything a user can ask the engine to do.
///
/// Decoded once at the transport boundary, from either a button callback token or a text
/// message. Buttons carry an `Action` and are encoded back with [`Action::token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    MainMenu,
    Help,
    SearchPrompt,
    /// Free-text search. An empty query is answered with guidance.
    Search(String),
    Popular,
    GenreMenu,
    ShowGenre(String),
    Random,
    Watchlist,
    /// Zero-based page of the watchlist. Page 0 is what [`Action::Watchlist`] shows.
    WatchlistPage(usize),
    ClearWatchlist,
    Preferences,
    ShowDetail(String),
    SaveToWatchlist(String),
    FavoriteGenre(String),
    /// Unrecognized command or stale callback token, kept verbatim for logging.
    Unknown(String),
}

/// Telegram caps `callback_data` at 64 bytes.
pub const CALLBACK_TOKEN_LIMIT: usize = 64;

impl Action {
    pub fn from_callback(data: &str) -> Self {
        let data = data.trim();
        match data {
            "main_menu" => return Action::MainMenu,
            "help" => return Action::Help,
            "search_movie" => return Action::SearchPrompt,
            "popular_movies" => return Action::Popular,
            "browse_genres" => return Action::GenreMenu,
            "random_movie" => return Action::Random,
            "my_watchlist" => return Action::Watchlist,
            "clear_watchlist" => return Action::ClearWatchlist,
            "preferences" => return Action::Preferences,
            _ => {}
        }

        if let Some(page) = data.strip_prefix("my_watchlist_") {
            return match page.parse() {
                Ok(page) => Action::WatchlistPage(page),
                Err(_) => Action::Unknown(data.to_string()),
            };
        }

        let tagged: [(&str, fn(String) -> Action); 5] = [
            ("genre_", Action::ShowGenre),
            ("details_", Action::ShowDetail),
            ("save_", Action::SaveToWatchlist),
            ("fav_", Action::FavoriteGenre),
            ("query_", Action::Search),
        ];
        for (prefix, build) in tagged {
            if let Some(rest) = data.strip_prefix(prefix) {
                if !rest.is_empty() {
                    return build(rest.to_string());
                }
            }
        }

        Action::Unknown(data.to_string())
    }

    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        let Some(command_line) = text.strip_prefix('/') else {
            return Action::Search(text.to_string());
        };

        let (command, args) = match command_line.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (command_line, ""),
        };
        // "/start@SomeBot" in group chats
        let command = command.split('@').next().unwrap_or_default().to_lowercase();

        match command.as_str() {
            "start" | "menu" => Action::MainMenu,
            "help" => Action::Help,
            "search" if args.is_empty() => Action::SearchPrompt,
            "search" => Action::Search(args.to_string()),
            "popular" => Action::Popular,
            "genres" | "genre" if args.is_empty() => Action::GenreMenu,
            "genres" | "genre" => {
                // Genre names travel inside button tokens, so they must fit one.
                let action = Action::ShowGenre(args.to_string());
                if action.fits_callback() {
                    action
                } else {
                    Action::Unknown(text.to_string())
                }
            }
            "random" => Action::Random,
            "watchlist" => Action::Watchlist,
            "preferences" | "settings" => Action::Preferences,
            _ => Action::Unknown(text.to_string()),
        }
    }

    /// Callback token for this action, the inverse of [`Action::from_callback`].
    pub fn token(&self) -> String {
        match self {
            Action::MainMenu => "main_menu".to_string(),
            Action::Help => "help".to_string(),
            Action::SearchPrompt => "search_movie".to_string(),
            Action::Search(query) => format!("query_{query}"),
            Action::Popular => "popular_movies".to_string(),
            Action::GenreMenu => "browse_genres".to_string(),
            Action::ShowGenre(genre) => format!("genre_{genre}"),
            Action::Random => "random_movie".to_string(),
            Action::Watchlist => "my_watchlist".to_string(),
            Action::WatchlistPage(page) => format!("my_watchlist_{page}"),
            Action::ClearWatchlist => "clear_watchlist".to_string(),
            Action::Preferences => "preferences".to_string(),
            Action::ShowDetail(id) => format!("details_{id}"),
            Action::SaveToWatchlist(id) => format!("save_{id}"),
            Action::FavoriteGenre(genre) => format!("fav_{genre}"),
            Action::Unknown(raw) => raw.clone(),
        }
    }

    /// Whether [`Action::token`] fits the transport's callback payload.
    pub fn fits_callback(&self) -> bool {
        self.token().len() <= CALLBACK_TOKEN_LIMIT
    }
}
