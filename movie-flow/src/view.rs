use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Named views of the menu state machine. `MainMenu` is the initial state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Screen {
    #[default]
    MainMenu,
    Help,
    SearchPrompt,
    SearchResults(String),
    PopularList,
    GenreMenu,
    GenreResults(String),
    RandomResult,
    WatchlistView,
    PreferencesView,
    MovieDetailView(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonTarget {
    /// External hyperlink opened by the client.
    Url(String),
    /// Fed back to the engine as the next inbound event.
    Callback(Action),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub target: ButtonTarget,
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Url(url.into()),
        }
    }

    pub fn callback(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            target: ButtonTarget::Callback(action),
        }
    }

    pub fn back_to_menu() -> Self {
        Self::callback("🏠 Main menu", Action::MainMenu)
    }
}

/// A renderable message: text plus rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuView {
    pub screen: Screen,
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
    /// Poster reference shown alongside the text when the transport supports it.
    pub poster: Option<String>,
}

impl MenuView {
    pub fn new(screen: Screen, text: impl Into<String>) -> Self {
        Self {
            screen,
            text: text.into(),
            buttons: Vec::new(),
            poster: None,
        }
    }

    pub fn row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.buttons.push(row);
        }
        self
    }

    pub fn with_poster(mut self, poster: Option<String>) -> Self {
        self.poster = poster;
        self
    }

    /// Callback actions reachable from this view, in layout order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.buttons.iter().flatten().filter_map(|b| match &b.target {
            ButtonTarget::Callback(action) => Some(action),
            ButtonTarget::Url(_) => None,
        })
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.buttons.iter().flatten().filter_map(|b| match &b.target {
            ButtonTarget::Url(url) => Some(url.as_str()),
            ButtonTarget::Callback(_) => None,
        })
    }
}

/// What the engine answers with for one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Navigation: one or more views replace what the user is looking at.
    Render(Vec<MenuView>),
    /// Lightweight acknowledgement. The current view is left unchanged.
    Notice(String),
}

impl Reply {
    pub fn view(view: MenuView) -> Self {
        Reply::Render(vec![view])
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Reply::Notice(text.into())
    }

    pub fn views(&self) -> &[MenuView] {
        match self {
            Reply::Render(views) => views,
            Reply::Notice(_) => &[],
        }
    }
}
