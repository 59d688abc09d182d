//! Everything the bot sends back: rendered forecasts, notices and the
//! "refresh" control.

pub mod conditions;
pub mod formatter;

pub use formatter::render;

/// Callback payload of the refresh button.
pub const REFRESH_CALLBACK: &str = "refresh_weather";

pub const REFRESH_LABEL: &str = "🔄 Получить новый прогноз";

/// Shown instead of a forecast when the snapshot cannot be rendered.
pub const FORMAT_FALLBACK: &str = "⚠️ Не удалось отформатировать данные о погоде";

/// Interactive control that re-runs the last successful query for the user
/// who activates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshControl {
    pub label: &'static str,
    pub callback_data: &'static str,
}

impl Default for RefreshControl {
    fn default() -> Self {
        Self {
            label: REFRESH_LABEL,
            callback_data: REFRESH_CALLBACK,
        }
    }
}

/// A rendered forecast: ordered lines plus the refresh control.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub lines: Vec<String>,
    pub refresh: RefreshControl,
}

impl RenderedMessage {
    /// Lines joined for sending.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether this is the formatter's degrade path rather than a forecast.
    #[cfg(test)]
    pub(crate) fn is_fallback(&self) -> bool {
        self.lines.len() == 1 && self.lines[0] == FORMAT_FALLBACK
    }
}

/// What the transport delivers: text and an optional refresh button.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub refresh: Option<RefreshControl>,
}

impl Reply {
    /// A plain notice without any control attached.
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            refresh: None,
        }
    }

    pub fn with_refresh(mut self) -> Self {
        self.refresh = Some(RefreshControl::default());
        self
    }
}

impl From<RenderedMessage> for Reply {
    fn from(message: RenderedMessage) -> Self {
        Self {
            text: message.text(),
            refresh: Some(message.refresh),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_message_joins_lines() {
        let message = RenderedMessage {
            lines: vec!["a".into(), String::new(), "b".into()],
            refresh: RefreshControl::default(),
        };
        assert_eq!(message.text(), "a\n\nb");
        assert!(!message.is_fallback());
    }

    #[test]
    fn reply_from_rendered_keeps_refresh() {
        let reply = Reply::from(RenderedMessage {
            lines: vec![FORMAT_FALLBACK.into()],
            refresh: RefreshControl::default(),
        });
        assert_eq!(reply.text, FORMAT_FALLBACK);
        assert_eq!(reply.refresh.map(|r| r.callback_data), Some(REFRESH_CALLBACK));
    }

    #[test]
    fn notice_has_no_control_until_requested() {
        let notice = Reply::notice("hi");
        assert!(notice.refresh.is_none());
        assert!(notice.with_refresh().refresh.is_some());
    }
}
