//! Yandex.Weather condition codes → emoji and Russian phrase.

/// Emoji used for condition codes missing from the table.
pub const UNKNOWN_CONDITION_EMOJI: &str = "🌍";

/// Known condition codes with their emoji and phrase.
const CONDITIONS: &[(&str, &str, &str)] = &[
    ("clear", "☀️", "ясно"),
    ("partly-cloudy", "⛅", "малооблачно"),
    ("cloudy", "☁️", "облачно с прояснениями"),
    ("overcast", "☁️", "пасмурно"),
    ("drizzle", "🌦️", "морось"),
    ("light-rain", "🌧️", "небольшой дождь"),
    ("rain", "🌧️", "дождь"),
    ("moderate-rain", "🌧️", "умеренно сильный дождь"),
    ("heavy-rain", "⛈️", "сильный дождь"),
    ("continuous-heavy-rain", "⛈️", "длительный сильный дождь"),
    ("showers", "🌧️", "ливень"),
    ("wet-snow", "🌨️", "дождь со снегом"),
    ("light-snow", "🌨️", "небольшой снег"),
    ("snow", "❄️", "снег"),
    ("snow-showers", "🌨️", "снегопад"),
    ("hail", "🌨️", "град"),
    ("thunderstorm", "⛈️", "гроза"),
    ("thunderstorm-with-rain", "⛈️", "дождь с грозой"),
    ("thunderstorm-with-hail", "⛈️", "гроза с градом"),
];

/// Look up a condition code. Unknown codes come back as their raw text with
/// the generic emoji.
pub fn describe(code: &str) -> (&'static str, &str) {
    CONDITIONS
        .iter()
        .find(|(known, _, _)| *known == code)
        .map(|(_, emoji, phrase)| (*emoji, *phrase))
        .unwrap_or((UNKNOWN_CONDITION_EMOJI, code))
}

/// Number of known condition codes.
#[cfg(test)]
fn known_count() -> usize {
    CONDITIONS.len()
}
