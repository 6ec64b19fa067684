//! Accent-insensitive stop search.

use unicode_normalization::UnicodeNormalization;

use crate::models::Stop;

/// Decompose `text`, drop its combining accents and lower-case it, so
/// "Bolhão" matches "bolhao" whichever way the accent was encoded.
pub fn normalize_for_search(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_diacritic(*c))
        .collect::<String>()
        .to_lowercase()
}

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// True when the stop's name or id contains `query`. A blank query matches
/// nothing.
pub fn stop_matches_query(stop: &Stop, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return false;
    }
    let query = normalize_for_search(query);
    normalize_for_search(&stop.name).contains(&query) || normalize_for_search(&stop.id).contains(&query)
}

pub fn filter_stops_by_query(stops: &[Stop], query: &str) -> Vec<Stop> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    stops
        .iter()
        .filter(|stop| stop_matches_query(stop, query))
        .cloned()
        .collect()
}
