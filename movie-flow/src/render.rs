//! Text and button layouts for every view the engine produces.

use crate::action::Action;
use crate::catalog::{MovieDetail, MovieSummary, UNKNOWN_FIELD, imdb_url, trailer_url};
use crate::menu::WATCHLIST_PAGE_SIZE;
use crate::session::Session;
use crate::view::{Button, MenuView, Screen};

pub(crate) const EMPTY_QUERY: &str = "✏️ Please send me the name of a movie to search for.";
pub(crate) const UNKNOWN_INPUT: &str =
    "🤔 I didn't understand that. Send me a movie name, or use /start to open the menu.";
pub(crate) const DETAILS_UNAVAILABLE: &str =
    "😕 Details for this movie are unavailable right now. Please try again later.";
pub(crate) const WATCHLIST_ADDED: &str = "✅ Added to your watchlist!";
pub(crate) const WATCHLIST_ALREADY_PRESENT: &str = "ℹ️ This movie is already in your watchlist.";
pub(crate) const WATCHLIST_CLEARED: &str = "🗑 Your watchlist has been cleared.";

const GENRES_PER_ROW: usize = 2;

pub(crate) fn main_menu(banner: Option<&str>) -> MenuView {
    let mut text = String::new();
    if let Some(banner) = banner {
        text.push_str(banner);
        text.push_str("\n\n");
    }
    text.push_str("🎬 Welcome to the Movie Bot!\n\nSend me the name of a movie, or pick an option below.");

    MenuView::new(Screen::MainMenu, text)
        .row(vec![
            Button::callback("🔍 Search", Action::SearchPrompt),
            Button::callback("🔥 Popular", Action::Popular),
        ])
        .row(vec![
            Button::callback("🎭 Genres", Action::GenreMenu),
            Button::callback("🎲 Random", Action::Random),
        ])
        .row(vec![
            Button::callback("📋 My watchlist", Action::Watchlist),
            Button::callback("⚙️ Preferences", Action::Preferences),
        ])
        .row(vec![Button::callback("❓ Help", Action::Help)])
}

pub(crate) fn help() -> MenuView {
    MenuView::new(
        Screen::Help,
        "❓ How to use this bot\n\n\
         Send any movie name to search for it.\n\n\
         /start - open the main menu\n\
         /search <name> - search for a movie\n\
         /popular - popular movies\n\
         /genres - browse by genre\n\
         /random - a random popular movie\n\
         /watchlist - your saved movies\n\
         /preferences - your preferences",
    )
    .row(vec![Button::back_to_menu()])
}

pub(crate) fn search_prompt() -> MenuView {
    MenuView::new(
        Screen::SearchPrompt,
        "🔍 Send me the name of a movie and I'll look it up.\n\nExample: Inception",
    )
    .row(vec![Button::back_to_menu()])
}

pub(crate) fn no_results(query: &str) -> MenuView {
    MenuView::new(
        Screen::SearchResults(query.to_string()),
        format!("❌ No results found for \"{query}\". Try another movie name."),
    )
    .row(vec![
        Button::callback("🔍 Search again", Action::SearchPrompt),
        Button::back_to_menu(),
    ])
}

/// One search or genre hit as its own message.
pub(crate) fn result_entry(screen: Screen, movie: &MovieSummary) -> MenuView {
    MenuView::new(screen, format!("🎬 {} ({})", movie.title, movie.year))
        .row(links(&movie.id, &movie.title))
        .row(vec![
            Button::callback("ℹ️ Details", Action::ShowDetail(movie.id.clone())),
            Button::callback("➕ Save", Action::SaveToWatchlist(movie.id.clone())),
        ])
        .row(vec![Button::back_to_menu()])
}

pub(crate) fn detail(screen: Screen, movie: &MovieDetail, extra: Vec<Button>) -> MenuView {
    let genres = if movie.genres.is_empty() {
        UNKNOWN_FIELD.to_string()
    } else {
        movie.genres.join(", ")
    };
    let text = format!(
        "🎬 {} ({})\n\n\
         🎭 Genre: {}\n\
         🎬 Director: {}\n\
         👥 Cast: {}\n\
         ⭐ IMDb rating: {}\n\
         ⏱ Runtime: {}\n\n\
         📝 {}",
        movie.title, movie.year, genres, movie.director, movie.cast, movie.rating, movie.runtime, movie.plot
    );

    MenuView::new(screen, text)
        .with_poster(movie.poster.clone())
        .row(links(&movie.id, &movie.title))
        .row(vec![Button::callback(
            "➕ Save to watchlist",
            Action::SaveToWatchlist(movie.id.clone()),
        )])
        .row(extra)
        .row(vec![Button::back_to_menu()])
}

pub(crate) fn random_unavailable() -> MenuView {
    MenuView::new(
        Screen::RandomResult,
        "😕 I couldn't pick a random movie right now. Please try again in a moment.",
    )
    .row(vec![
        Button::callback("🎲 Try again", Action::Random),
        Button::back_to_menu(),
    ])
}

pub(crate) fn popular_list(movies: &[MovieSummary]) -> MenuView {
    if movies.is_empty() {
        return MenuView::new(
            Screen::PopularList,
            "😕 Popular movies are unavailable right now. Please try again later.",
        )
        .row(vec![
            Button::callback("🔄 Try again", Action::Popular),
            Button::back_to_menu(),
        ]);
    }

    let mut text = String::from("🔥 Popular movies right now:\n");
    for (i, movie) in movies.iter().enumerate() {
        text.push_str(&format!("\n{}. {} ({})", i + 1, movie.title, movie.year));
    }

    let mut view = MenuView::new(Screen::PopularList, text);
    for movie in movies {
        view = view.row(vec![Button::callback(
            format!("🎬 {} ({})", movie.title, movie.year),
            Action::ShowDetail(movie.id.clone()),
        )]);
    }
    view.row(vec![
        Button::callback("🎲 Random pick", Action::Random),
        Button::back_to_menu(),
    ])
}

pub(crate) fn genre_menu<'a>(genres: impl Iterator<Item = &'a str>) -> MenuView {
    let genres: Vec<&str> = genres.collect();
    let mut view = MenuView::new(Screen::GenreMenu, "🎭 Pick a genre:");
    for chunk in genres.chunks(GENRES_PER_ROW) {
        view = view.row(
            chunk
                .iter()
                .map(|g| Button::callback(*g, Action::ShowGenre(g.to_string())))
                .collect(),
        );
    }
    view.row(vec![Button::back_to_menu()])
}

pub(crate) fn genre_unavailable(genre: &str) -> MenuView {
    MenuView::new(
        Screen::GenreResults(genre.to_string()),
        format!("😕 No {genre} movies are available right now. Try another genre."),
    )
    .row(vec![
        Button::callback("🎭 Other genres", Action::GenreMenu),
        Button::back_to_menu(),
    ])
}

/// Closes a list of genre results.
pub(crate) fn genre_footer(genre: &str, count: usize) -> MenuView {
    MenuView::new(
        Screen::GenreResults(genre.to_string()),
        format!("🎭 Top {count} {genre} picks for you."),
    )
    .row(
        Some(Action::FavoriteGenre(genre.to_string()))
            .filter(Action::fits_callback)
            .map(|fav| Button::callback(format!("⭐ Add {genre} to favorites"), fav))
            .into_iter()
            .collect(),
    )
    .row(vec![
        Button::callback("🎭 Other genres", Action::GenreMenu),
        Button::back_to_menu(),
    ])
}

/// One page of the watchlist. `entries` pairs each saved identifier on `page` with its
/// display label, `total` is the size of the whole watchlist.
pub(crate) fn watchlist(entries: &[(String, String)], page: usize, total: usize) -> MenuView {
    if total == 0 {
        return MenuView::new(
            Screen::WatchlistView,
            "📋 Your watchlist is empty.\n\nTap ➕ Save on any movie to keep it here.",
        )
        .row(vec![
            Button::callback("🔍 Search", Action::SearchPrompt),
            Button::back_to_menu(),
        ]);
    }

    let pages = total.div_ceil(WATCHLIST_PAGE_SIZE);
    let first = page * WATCHLIST_PAGE_SIZE;
    let mut text = format!("📋 Your watchlist ({total}):\n");
    for (i, (_, label)) in entries.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", first + i + 1, label));
    }
    if pages > 1 {
        text.push_str(&format!("\n\nPage {} of {pages}", page + 1));
    }

    let mut view = MenuView::new(Screen::WatchlistView, text);
    for (id, label) in entries {
        view = view.row(vec![Button::callback(
            format!("🎬 {label}"),
            Action::ShowDetail(id.clone()),
        )]);
    }

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(Button::callback("⬅️ Previous", Action::WatchlistPage(page - 1)));
    }
    if page + 1 < pages {
        nav.push(Button::callback("Next ➡️", Action::WatchlistPage(page + 1)));
    }
    view.row(nav).row(vec![
        Button::callback("🗑 Clear watchlist", Action::ClearWatchlist),
        Button::back_to_menu(),
    ])
}

pub(crate) fn preferences(session: &Session) -> MenuView {
    let favorites = if session.favorite_genres.is_empty() {
        "none yet".to_string()
    } else {
        session.favorite_genres.join(", ")
    };
    let last_query = session.last_query.as_deref().unwrap_or("none yet");

    MenuView::new(
        Screen::PreferencesView,
        format!(
            "⚙️ Preferences\n\n\
             ⭐ Favorite genres: {favorites}\n\
             🔍 Last search: {last_query}\n\
             📋 Watchlist: {} movie(s)\n\n\
             Add favorite genres from any genre page.",
            session.watchlist.len()
        ),
    )
    .row(vec![
        Button::callback("🎭 Browse genres", Action::GenreMenu),
        Button::back_to_menu(),
    ])
}

fn links(id: &str, title: &str) -> Vec<Button> {
    vec![
        Button::url("🎬 IMDb Page", imdb_url(id)),
        Button::url("▶️ Trailer (YouTube)", trailer_url(title)),
    ]
}
