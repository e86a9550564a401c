//! Telegram transport: webhook updates into engine events, views out through a teloxide [`Bot`].

use async_trait::async_trait;
use movie_flow::{
    Action, ButtonTarget, ChatId, Delivery, FlowError, InboundEvent, MenuView, Origin, UserId,
};
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Update, UpdateKind};
use tracing::{debug, warn};

/// Telegram rejects photo captions longer than this.
pub const CAPTION_LIMIT: usize = 1024;

/// Decodes an update into an engine event. `None` for updates the bot does not react to,
/// such as edits, stickers or channel posts.
pub fn into_event(update: Update) -> Option<InboundEvent> {
    match update.kind {
        UpdateKind::CallbackQuery(query) => {
            let chat = query
                .message
                .as_ref()
                .map(|m| m.chat.id.0)
                .unwrap_or(query.from.id.0 as i64);
            Some(InboundEvent {
                user: UserId(query.from.id.0 as i64),
                chat: ChatId(chat),
                action: Action::from_callback(query.data.as_deref().unwrap_or_default()),
                origin: Origin::Callback { query_id: query.id },
            })
        }
        UpdateKind::Message(message) => {
            let text = message.text()?;
            let user = message
                .from()
                .map(|u| u.id.0 as i64)
                .unwrap_or(message.chat.id.0);
            Some(InboundEvent {
                user: UserId(user),
                chat: ChatId(message.chat.id.0),
                origin: Origin::Message,
                action: Action::from_text(text),
            })
        }
        _ => None,
    }
}

/// [`Delivery`] over the Bot API.
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    pub fn new(token: &str, api_url: &str) -> movie_flow::Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| FlowError::DeliveryError(format!("invalid Bot API url {api_url}: {e}")))?;
        Ok(Self {
            bot: Bot::new(token).set_api_url(api_url),
        })
    }

    pub async fn set_webhook(&self, url: &str) -> movie_flow::Result<()> {
        let url = Url::parse(url)
            .map_err(|e| FlowError::DeliveryError(format!("invalid webhook url {url}: {e}")))?;
        self.bot.set_webhook(url).await.map_err(delivery_error)?;
        Ok(())
    }
}

fn delivery_error(e: teloxide::RequestError) -> FlowError {
    FlowError::DeliveryError(e.to_string())
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn send_view(&self, chat: ChatId, view: &MenuView) -> movie_flow::Result<()> {
        let chat_id = teloxide::types::ChatId(chat.0);
        let keyboard = inline_keyboard(view);

        if let Some(poster) = poster_url(view) {
            let mut request = self
                .bot
                .send_photo(chat_id, InputFile::url(poster))
                .caption(view.text.clone());
            if let Some(keyboard) = keyboard.clone() {
                request = request.reply_markup(keyboard);
            }
            match request.await {
                Ok(_) => return Ok(()),
                // Fall back to text so a bad poster never loses the reply
                Err(e) => warn!(chat_id = %chat, error = %e, "poster rejected, sending text only"),
            }
        }

        let mut request = self.bot.send_message(chat_id, view.text.clone());
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await.map_err(delivery_error)?;
        debug!(chat_id = %chat, "view sent");
        Ok(())
    }

    async fn answer(&self, chat: ChatId, origin: &Origin, notice: Option<&str>) -> movie_flow::Result<()> {
        match (origin, notice) {
            (Origin::Callback { query_id }, notice) => {
                let mut request = self.bot.answer_callback_query(query_id.clone());
                if let Some(text) = notice {
                    request = request.text(text);
                }
                request.await.map_err(delivery_error)?;
            }
            (Origin::Message, Some(text)) => {
                self.bot
                    .send_message(teloxide::types::ChatId(chat.0), text)
                    .await
                    .map_err(delivery_error)?;
            }
            (Origin::Message, None) => {}
        }
        Ok(())
    }
}

/// Keyboard for a view. Buttons the Bot API would reject (bad link, oversized token) are
/// dropped with a warning.
fn inline_keyboard(view: &MenuView) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = view
        .buttons
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|button| match &button.target {
                    ButtonTarget::Url(url) => match Url::parse(url) {
                        Ok(url) => Some(InlineKeyboardButton::url(button.label.clone(), url)),
                        Err(e) => {
                            warn!(url = %url, error = %e, "dropping link button");
                            None
                        }
                    },
                    ButtonTarget::Callback(action) if action.fits_callback() => Some(
                        InlineKeyboardButton::callback(button.label.clone(), action.token()),
                    ),
                    ButtonTarget::Callback(action) => {
                        warn!(action = ?action, "dropping button with oversized token");
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(rows))
    }
}

/// Poster to send as a photo. `None` when there is none, it is not a URL, or the text does
/// not fit a caption.
fn poster_url(view: &MenuView) -> Option<Url> {
    let poster = view.poster.as_deref()?;
    if view.text.chars().count() > CAPTION_LIMIT {
        return None;
    }
    Url::parse(poster).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_flow::{Button, Screen};
    use serde_json::{Value, json};
    use teloxide::types::InlineKeyboardButtonKind;

    fn update(raw: Value) -> Update {
        // Decode from bytes like the webhook does; teloxide's UpdateKind needs borrowed keys
        serde_json::from_slice(raw.to_string().as_bytes()).unwrap()
    }

    fn message(chat: i64, from: i64, text: &str) -> Value {
        json!({
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": { "id": chat, "type": "private", "first_name": "Sam" },
            "from": { "id": from, "is_bot": false, "first_name": "Sam" },
            "text": text
        })
    }

    #[test]
    fn test_text_message_becomes_event() {
        let event = into_event(update(json!({
            "update_id": 1,
            "message": message(555, 777, "Inception")
        })))
        .unwrap();

        assert_eq!(event.user, UserId(777));
        assert_eq!(event.chat, ChatId(555));
        assert_eq!(event.origin, Origin::Message);
        assert_eq!(event.action, Action::Search("Inception".into()));
    }

    #[test]
    fn test_callback_becomes_event() {
        let event = into_event(update(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cbq-1",
                "from": { "id": 777, "is_bot": false, "first_name": "Sam" },
                "message": message(555, 999, "🎬 Inception (2010)"),
                "chat_instance": "ci-1",
                "data": "save_tt1375666"
            }
        })))
        .unwrap();

        assert_eq!(event.user, UserId(777));
        assert_eq!(event.chat, ChatId(555));
        assert_eq!(event.origin, Origin::Callback { query_id: "cbq-1".into() });
        assert_eq!(event.action, Action::SaveToWatchlist("tt1375666".into()));
    }

    #[test]
    fn test_edits_are_ignored() {
        let edited = update(json!({
            "update_id": 3,
            "edited_message": message(1, 1, "Inceptoin")
        }));
        assert!(into_event(edited).is_none());
    }

    fn detail_view(text: &str) -> MenuView {
        MenuView::new(Screen::MovieDetailView("tt1".into()), text)
            .with_poster(Some("https://img.example/p.jpg".into()))
            .row(vec![
                Button::url("IMDb", "https://www.imdb.com/title/tt1/"),
                Button::callback("Save", Action::SaveToWatchlist("tt1".into())),
            ])
            .row(vec![Button::back_to_menu()])
    }

    #[test]
    fn test_keyboard_carries_links_and_tokens() {
        let keyboard = inline_keyboard(&detail_view("hello")).unwrap();
        let rows = &keyboard.inline_keyboard;
        assert_eq!(rows.len(), 2);
        assert!(matches!(
            &rows[0][0].kind,
            InlineKeyboardButtonKind::Url(url) if url.as_str() == "https://www.imdb.com/title/tt1/"
        ));
        assert!(matches!(
            &rows[0][1].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "save_tt1"
        ));
        assert!(matches!(
            &rows[1][0].kind,
            InlineKeyboardButtonKind::CallbackData(data) if data == "main_menu"
        ));
    }

    #[test]
    fn test_unsendable_buttons_are_dropped() {
        let view = MenuView::new(Screen::Help, "x")
            .row(vec![
                Button::url("broken", "not a url"),
                Button::callback("long", Action::ShowDetail("t".repeat(80))),
            ])
            .row(vec![Button::back_to_menu()]);
        let keyboard = inline_keyboard(&view).unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert!(inline_keyboard(&MenuView::new(Screen::Help, "plain")).is_none());
    }

    #[test]
    fn test_photo_only_when_caption_fits() {
        assert_eq!(
            poster_url(&detail_view("short")).map(|u| u.to_string()).as_deref(),
            Some("https://img.example/p.jpg")
        );
        let long = "x".repeat(CAPTION_LIMIT + 1);
        assert!(poster_url(&detail_view(&long)).is_none());
        assert!(poster_url(&MenuView::new(Screen::Help, "no poster")).is_none());
    }
}
