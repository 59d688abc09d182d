//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates`, spawns one task per update, and replies with
//! `sendMessage`. Shared locations and the refresh button go through the
//! [`QueryPipeline`]; `/start` and `/help` are answered here.

use crate::config::TelegramConfig;
use crate::memory::Coordinates;
use crate::pipeline::{QueryPipeline, ACCESS_DENIED_NOTICE};
use crate::reply::{Reply, REFRESH_CALLBACK};
use crate::Identity;
use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Pause after a failed `getUpdates` before polling again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub const LOCATION_BUTTON: &str = "📍 Отправить геолокацию";

pub const START_TEXT: &str = "👋 Привет! Я подскажу текущую погоду.\n\n\
     Нажмите кнопку «📍 Отправить геолокацию» или прикрепите геопозицию, \
     и я пришлю прогноз для этого места.";

pub const HELP_TEXT: &str = "ℹ️ Как пользоваться ботом:\n\
     1. Отправьте геолокацию (кнопка внизу или скрепка → Геопозиция).\n\
     2. Получите текущую погоду для этой точки.\n\
     3. Кнопка «🔄 Получить новый прогноз» обновит данные для последней локации.";

pub const TEXT_HINT: &str = "📍 Отправьте геолокацию, чтобы узнать погоду. Подробнее: /help";

// ── Bot API types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: Identity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// Bot commands the channel answers itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
}

/// What an update asks the bot to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Location {
        identity: Identity,
        chat_id: i64,
        coordinates: Coordinates,
    },
    Refresh {
        identity: Identity,
        chat_id: i64,
        callback_id: String,
    },
    Command {
        identity: Identity,
        chat_id: i64,
        command: Command,
    },
    Text {
        identity: Identity,
        chat_id: i64,
    },
    Ignored,
}

impl Inbound {
    pub fn classify(update: &Update) -> Self {
        if let Some(callback) = &update.callback_query {
            return match (&callback.message, callback.data.as_deref()) {
                (Some(message), Some(REFRESH_CALLBACK)) => Self::Refresh {
                    identity: callback.from.id,
                    chat_id: message.chat.id,
                    callback_id: callback.id.clone(),
                },
                _ => Self::Ignored,
            };
        }

        let Some(message) = &update.message else {
            return Self::Ignored;
        };
        let Some(identity) = message.from.as_ref().map(|user| user.id) else {
            return Self::Ignored;
        };
        let chat_id = message.chat.id;

        if let Some(location) = message.location {
            return Self::Location {
                identity,
                chat_id,
                coordinates: Coordinates::new(location.latitude, location.longitude),
            };
        }

        match message.text.as_deref().map(parse_command) {
            Some(Some(command)) => Self::Command {
                identity,
                chat_id,
                command,
            },
            Some(None) => Self::Text { identity, chat_id },
            None => Self::Ignored,
        }
    }
}

/// `/start`, `/help`, with or without a `@botname` suffix.
fn parse_command(text: &str) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    let name = word.strip_prefix('/')?.split('@').next()?;
    match name {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        _ => None,
    }
}

/// `sendMessage` body for a pipeline reply.
pub fn message_body(chat_id: i64, reply: &Reply) -> Value {
    let mut body = json!({ "chat_id": chat_id, "text": reply.text });
    if let Some(control) = reply.refresh {
        body["reply_markup"] = json!({
            "inline_keyboard": [[{
                "text": control.label,
                "callback_data": control.callback_data,
            }]]
        });
    }
    body
}

fn location_keyboard() -> Value {
    json!({
        "keyboard": [[{ "text": LOCATION_BUTTON, "request_location": true }]],
        "resize_keyboard": true,
    })
}

// ── Channel ────────────────────────────────────────────────────────────────────

pub struct TelegramChannel {
    api_base: String,
    bot_token: String,
    poll_timeout: Duration,
    http: reqwest::Client,
    pipeline: Arc<QueryPipeline>,
}

impl TelegramChannel {
    pub fn new(
        bot_token: impl Into<String>,
        config: &TelegramConfig,
        pipeline: Arc<QueryPipeline>,
    ) -> anyhow::Result<Self> {
        let poll_timeout = Duration::from_secs(config.poll_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            poll_timeout,
            http,
            pipeline,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// POST a Bot API method and unwrap the `{ok, result}` envelope.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> anyhow::Result<T> {
        let resp = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Telegram {method} request failed"))?;

        let status = resp.status();
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram {method} response ({status})"))?;

        if !parsed.ok {
            anyhow::bail!(
                "Telegram {method} returned {status}: {}",
                parsed.description.as_deref().unwrap_or("no description")
            );
        }
        parsed
            .result
            .ok_or_else(|| anyhow::anyhow!("Telegram {method} returned no result"))
    }

    pub async fn get_updates(&self, offset: i64) -> anyhow::Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": self.poll_timeout.as_secs(),
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
        let _: Value = self.call("sendMessage", &message_body(chat_id, reply)).await?;
        Ok(())
    }

    async fn send_with_location_keyboard(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": location_keyboard(),
        });
        let _: Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> anyhow::Result<()> {
        let _: Value = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }

    /// Handle one update end to end.
    pub async fn handle_update(&self, update: Update) -> anyhow::Result<()> {
        match Inbound::classify(&update) {
            Inbound::Location {
                identity,
                chat_id,
                coordinates,
            } => {
                tracing::info!("Location from user_id={identity}");
                let reply = self
                    .pipeline
                    .handle_location(identity, coordinates)
                    .await
                    .into_reply();
                self.send_reply(chat_id, &reply).await
            }
            Inbound::Refresh {
                identity,
                chat_id,
                callback_id,
            } => {
                tracing::info!("Refresh requested by user_id={identity}");
                // Stop the button spinner first; a failure here is cosmetic.
                if let Err(e) = self.answer_callback(&callback_id).await {
                    tracing::warn!("answerCallbackQuery failed: {e:#}");
                }
                let reply = self.pipeline.handle_refresh(identity).await.into_reply();
                self.send_reply(chat_id, &reply).await
            }
            Inbound::Command {
                identity,
                chat_id,
                command,
            } => {
                if !self.pipeline.gate().is_allowed(identity) {
                    tracing::warn!("Command from user_id={identity} denied");
                    return self
                        .send_reply(chat_id, &Reply::notice(ACCESS_DENIED_NOTICE))
                        .await;
                }
                match command {
                    Command::Start => self.send_with_location_keyboard(chat_id, START_TEXT).await,
                    Command::Help => self.send_reply(chat_id, &Reply::notice(HELP_TEXT)).await,
                }
            }
            Inbound::Text { identity, chat_id } => {
                let text = if self.pipeline.gate().is_allowed(identity) {
                    TEXT_HINT
                } else {
                    ACCESS_DENIED_NOTICE
                };
                self.send_reply(chat_id, &Reply::notice(text)).await
            }
            Inbound::Ignored => Ok(()),
        }
    }

    /// Poll forever, handling each update on its own task.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        tracing::info!("Telegram channel polling started");
        let mut offset = 0;
        loop {
            let updates = match self.get_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::error!("getUpdates failed: {e:#}");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let channel = Arc::clone(&self);
                tokio::spawn(async move {
                    let update_id = update.update_id;
                    if let Err(e) = channel.handle_update(update).await {
                        tracing::error!("Failed to handle update {update_id}: {e:#}");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessGate;
    use crate::memory::LocationCache;
    use crate::weather::{Fact, ForecastError, ForecastProvider, Snapshot};
    use async_trait::async_trait;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SunnyProvider;

    #[async_trait]
    impl ForecastProvider for SunnyProvider {
        fn name(&self) -> &str {
            "sunny"
        }

        async fn fetch(&self, _coordinates: Coordinates) -> Result<Snapshot, ForecastError> {
            Ok(Snapshot {
                fact: Some(Fact {
                    temp: Some(20.0),
                    condition: Some("clear".into()),
                    ..Fact::default()
                }),
            })
        }
    }

    fn update(value: Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    fn channel(server: &MockServer, gate: AccessGate) -> TelegramChannel {
        let pipeline = QueryPipeline::new(
            gate,
            Arc::new(LocationCache::new()),
            Arc::new(SunnyProvider),
        );
        let config = TelegramConfig {
            api_base: server.uri(),
            poll_timeout_secs: 0,
        };
        TelegramChannel::new("TOKEN", &config, Arc::new(pipeline)).unwrap()
    }

    fn ok_result() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} }))
    }

    #[test]
    fn classify_location_message() {
        let inbound = Inbound::classify(&update(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": { "id": 42, "is_bot": false, "first_name": "A" },
                "chat": { "id": 420, "type": "private" },
                "location": { "latitude": 55.75, "longitude": 37.62 }
            }
        })));
        assert_eq!(
            inbound,
            Inbound::Location {
                identity: 42,
                chat_id: 420,
                coordinates: Coordinates::new(55.75, 37.62),
            }
        );
    }

    #[test]
    fn classify_refresh_callback() {
        let inbound = Inbound::classify(&update(json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 42 },
                "message": { "message_id": 11, "chat": { "id": 420 } },
                "data": "refresh_weather"
            }
        })));
        assert_eq!(
            inbound,
            Inbound::Refresh {
                identity: 42,
                chat_id: 420,
                callback_id: "cb-1".into(),
            }
        );
    }

    #[test]
    fn classify_commands_text_and_noise() {
        let message = |text: &str| {
            update(json!({
                "update_id": 3,
                "message": {
                    "message_id": 12,
                    "from": { "id": 5 },
                    "chat": { "id": 50 },
                    "text": text
                }
            }))
        };

        assert!(matches!(
            Inbound::classify(&message("/start")),
            Inbound::Command { command: Command::Start, .. }
        ));
        assert!(matches!(
            Inbound::classify(&message("/help@weather_bot")),
            Inbound::Command { command: Command::Help, .. }
        ));
        assert!(matches!(
            Inbound::classify(&message("какая погода?")),
            Inbound::Text { identity: 5, chat_id: 50 }
        ));
        assert_eq!(
            Inbound::classify(&update(json!({ "update_id": 4 }))),
            Inbound::Ignored
        );
    }

    #[test]
    fn reply_with_refresh_gets_inline_keyboard() {
        let body = message_body(7, &Reply::notice("hi").with_refresh());
        assert_eq!(body["chat_id"], 7);
        assert_eq!(
            body["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            REFRESH_CALLBACK
        );

        let plain = message_body(7, &Reply::notice("hi"));
        assert!(plain.get("reply_markup").is_none());
    }

    #[tokio::test]
    async fn location_update_sends_forecast_with_refresh_button() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": 420,
                "reply_markup": { "inline_keyboard": [[{ "callback_data": "refresh_weather" }]] }
            })))
            .respond_with(ok_result())
            .expect(1)
            .mount(&server)
            .await;

        let channel = channel(&server, AccessGate::open());
        channel
            .handle_update(update(json!({
                "update_id": 1,
                "message": {
                    "message_id": 10,
                    "from": { "id": 42 },
                    "chat": { "id": 420 },
                    "location": { "latitude": 55.75, "longitude": 37.62 }
                }
            })))
            .await
            .unwrap();

        assert_eq!(
            channel.pipeline.cache().get(42),
            Some(Coordinates::new(55.75, 37.62))
        );
    }

    #[tokio::test]
    async fn refresh_callback_is_answered_then_replied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/answerCallbackQuery"))
            .and(body_partial_json(json!({ "callback_query_id": "cb-9" })))
            .respond_with(ok_result())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ok_result())
            .expect(1)
            .mount(&server)
            .await;

        let channel = channel(&server, AccessGate::open());
        channel
            .handle_update(update(json!({
                "update_id": 2,
                "callback_query": {
                    "id": "cb-9",
                    "from": { "id": 9 },
                    "message": { "message_id": 11, "chat": { "id": 90 } },
                    "data": "refresh_weather"
                }
            })))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn start_from_denied_user_gets_notice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(json!({ "text": ACCESS_DENIED_NOTICE })))
            .respond_with(ok_result())
            .expect(1)
            .mount(&server)
            .await;

        let channel = channel(&server, AccessGate::new([1]));
        channel
            .handle_update(update(json!({
                "update_id": 3,
                "message": {
                    "message_id": 12,
                    "from": { "id": 7 },
                    "chat": { "id": 70 },
                    "text": "/start"
                }
            })))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn get_updates_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/getUpdates"))
            .and(body_partial_json(json!({ "offset": 5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{ "update_id": 5 }, { "update_id": 6 }]
            })))
            .mount(&server)
            .await;

        let updates = channel(&server, AccessGate::open())
            .get_updates(5)
            .await
            .unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].update_id, 6);
    }

    #[tokio::test]
    async fn api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let err = channel(&server, AccessGate::open())
            .send_reply(1, &Reply::notice("x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }
}
