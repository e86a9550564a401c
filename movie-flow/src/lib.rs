pub mod action;
pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod genre;
pub mod menu;
pub mod popular;
mod render;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use action::Action;
pub use catalog::{InMemoryCatalog, MovieCatalog, MovieDetail, MovieSummary};
#[cfg(feature = "omdb")]
pub use catalog::OmdbCatalog;
pub use dispatcher::{ChatId, Delivery, EventDispatcher, InboundEvent, Origin};
pub use error::{FlowError, Result};
pub use genre::{GenreCandidateTable, GenreResolver};
pub use menu::MenuEngine;
pub use popular::PopularPool;
pub use session::{InMemorySessionStore, Session, SessionStore, UserId};
pub use view::{Button, ButtonTarget, MenuView, Reply, Screen};
