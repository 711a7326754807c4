//! Building directory and search
//!
//! `filter` is pure. `SearchDebouncer` holds only the pending query text and
//! its quiescence deadline; the caller owns the clock.

use crate::domain::types::{Building, BuildingId};
use reqwest::Url;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// URL query parameter carrying the search text
pub const SEARCH_PARAM: &str = "search";

/// Default quiescence window before a typed query is applied
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Filter `all` by case-insensitive name substring, preserving order.
/// An empty query yields the quick navigation `shortlist` instead.
pub fn filter(all: &[Building], shortlist: &[Building], query: &str) -> Vec<Building> {
    if query.is_empty() {
        return shortlist.to_vec();
    }
    let needle = query.to_lowercase();
    all.iter().filter(|b| b.name.to_lowercase().contains(&needle)).cloned().collect()
}

/// Static building directory loaded once at startup
#[derive(Debug, Clone)]
pub struct Directory {
    quick_navigation: Arc<[Building]>,
    buildings: Arc<[Building]>,
    by_id: FxHashMap<BuildingId, usize>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Directory {
    pub fn new(quick_navigation: Vec<Building>, buildings: Vec<Building>) -> Self {
        let by_id = buildings.iter().enumerate().map(|(i, b)| (b.id, i)).collect();
        Self { quick_navigation: quick_navigation.into(), buildings: buildings.into(), by_id }
    }

    pub fn quick_navigation(&self) -> &[Building] {
        &self.quick_navigation
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Look up a building in the full list, falling back to the shortlist
    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        self.by_id
            .get(&id)
            .map(|&i| &self.buildings[i])
            .or_else(|| self.quick_navigation.iter().find(|b| b.id == id))
    }

    pub fn filter(&self, query: &str) -> Vec<Building> {
        filter(&self.buildings, &self.quick_navigation, query)
    }
}

/// Extract the `search` parameter from a raw query string.
/// Absent or empty parameter yields an empty query.
pub fn parse_search_param(query: Option<&str>) -> String {
    let Some(query) = query else {
        return String::new();
    };
    // Url needs an absolute base to parse a bare query string
    let Ok(url) = Url::parse(&format!("http://localhost/?{query}")) else {
        return String::new();
    };
    url.query_pairs()
        .find(|(k, _)| k == SEARCH_PARAM)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

/// Render a shareable link for a search; empty query drops the parameter
pub fn share_link(base: &str, query: &str) -> String {
    let Ok(mut url) = Url::parse(base) else {
        return base.to_string();
    };
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        if !query.is_empty() {
            pairs.append_pair(SEARCH_PARAM, query);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url.to_string()
}

/// Trailing-edge debouncer for search text
#[derive(Debug)]
pub struct SearchDebouncer {
    window: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Record new input, restarting the quiescence window
    pub fn push(&mut self, text: String, now: Instant) {
        self.pending = Some((text, now + self.window));
    }

    /// When the pending text becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Take the pending text if its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if *at <= now => self.pending.take().map(|(text, _)| text),
            _ => None,
        }
    }
}
