//! Forecast rendering.
//!
//! Turns a [`Snapshot`] into the Russian summary users see. Rendering never
//! fails: anything that cannot be rendered becomes [`FORMAT_FALLBACK`].

use super::conditions;
use super::{RefreshControl, RenderedMessage, FORMAT_FALLBACK};
use crate::weather::{Fact, Snapshot};

/// Render a snapshot (or its absence) into a deliverable message.
pub fn render(snapshot: Option<&Snapshot>) -> RenderedMessage {
    let lines = snapshot
        .and_then(|s| s.fact.as_ref())
        .and_then(render_fact)
        .unwrap_or_else(|| {
            tracing::debug!("Forecast snapshot not renderable, using fallback");
            vec![FORMAT_FALLBACK.to_string()]
        });

    RenderedMessage {
        lines,
        refresh: RefreshControl::default(),
    }
}

fn render_fact(fact: &Fact) -> Option<Vec<String>> {
    let code = fact.condition.as_deref().filter(|c| !c.is_empty())?;
    let (emoji, phrase) = conditions::describe(code);

    let mut lines = vec![format!("{emoji} {}", capitalize(phrase)), String::new()];

    // Feels-like is only shown next to the actual temperature.
    if let Some(temp) = fact.temp {
        lines.push(format!("🌡️ Температура: {}°C", signed(temp)));
        if let Some(feels_like) = fact.feels_like {
            lines.push(format!("🤔 Ощущается как: {}°C", signed(feels_like)));
        }
    }
    if let Some(humidity) = fact.humidity {
        lines.push(format!("💧 Влажность: {}%", number(humidity)));
    }
    if let Some(wind_speed) = fact.wind_speed {
        lines.push(format!("💨 Ветер: {} м/с", number(wind_speed)));
    }
    if let Some(pressure) = fact.pressure_mm {
        lines.push(format!("🔽 Давление: {} мм рт.ст.", number(pressure)));
    }

    Some(lines)
}

/// Explicit "+" for strictly positive values only.
fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", number(value))
    } else {
        number(value)
    }
}

/// Integral values without a fractional part, and no "-0".
fn number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// First character upper-case, the rest lower-case.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
