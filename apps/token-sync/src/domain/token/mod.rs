//! Token Entity Types
//!
//! Domain model for dashboard tokens and the in-memory collection the
//! synchronizer keeps current. The collection is replaced wholesale when a
//! structural event arrives and patched in place when a trade event arrives.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rolling price and volume metrics for a token.
///
/// Every field is optional; the indexer backfills windows as data arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// Price change over the last five minutes.
    #[serde(default)]
    pub five_min_price: Option<Decimal>,
    /// Trade volume over the last five minutes.
    #[serde(default)]
    pub five_min_volume: Option<Decimal>,
    /// Price change over the last hour.
    #[serde(default)]
    pub one_hour_price: Option<Decimal>,
    /// Trade volume over the last hour.
    #[serde(default)]
    pub one_hour_volume: Option<Decimal>,
    /// Price change over the last six hours.
    #[serde(default)]
    pub six_hour_price: Option<Decimal>,
    /// Trade volume over the last six hours.
    #[serde(default)]
    pub six_hour_volume: Option<Decimal>,
    /// Price change over the last twenty-four hours.
    #[serde(default)]
    pub twenty_four_hour_price: Option<Decimal>,
    /// Trade volume over the last twenty-four hours.
    #[serde(default)]
    pub twenty_four_hour_volume: Option<Decimal>,
}

/// External link attached to a token listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLink {
    /// Link kind, e.g. "twitter" or "website".
    #[serde(rename = "type")]
    pub link_type: String,
    /// Display label.
    pub label: String,
    /// Target URL.
    pub url: String,
}

/// One token tracked by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Market capitalization in quote currency.
    pub market_cap: Decimal,
    /// Time the token was first indexed.
    pub created_at: DateTime<Utc>,
    /// Time the token bonded, if it has.
    #[serde(default)]
    pub bonded_at: Option<DateTime<Utc>>,
    /// Rolling price and volume metrics.
    #[serde(default)]
    pub metrics: TokenMetrics,
    /// Chain the token lives on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    /// On-chain address. Tokens without an address cannot receive trade
    /// deltas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Listing description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// External links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<TokenLink>>,
}

/// Token collection response from the dashboard REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenList {
    /// The tokens themselves.
    pub tokens: Vec<Token>,
    /// Total count reported by the backend.
    pub total: u64,
    /// Whether the backend served the list from its cache.
    #[serde(default)]
    pub cached: bool,
}

/// Additive volume delta carried by a trade event.
///
/// Deltas apply at most once: a delta that lands between a structural event
/// and the snapshot that follows it is absorbed by the snapshot rather than
/// replayed on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDelta {
    /// Volume to add onto the token's five minute rolling volume.
    #[serde(default)]
    pub volume: Option<Decimal>,
}

/// Field to order a token listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Display name, case-insensitive.
    Name,
    /// Ticker symbol, case-insensitive.
    Symbol,
    /// Market capitalization.
    MarketCap,
    /// First-indexed time.
    CreatedAt,
}

/// Direction to order a token listing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Shared in-memory token collection.
///
/// A full snapshot replaces the collection; trade deltas patch single
/// entries in place. Readers get clones and never block the fold path for
/// long.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<Vec<Token>>,
}

impl TokenStore {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection with a fresh snapshot.
    ///
    /// Entries sharing an on-chain address are collapsed to the later
    /// occurrence. Entries without an address are kept as-is. Returns the
    /// retained count.
    pub fn replace_all(&self, tokens: Vec<Token>) -> usize {
        let mut deduped: Vec<Token> = Vec::with_capacity(tokens.len());
        let mut by_address: HashMap<String, usize> = HashMap::new();
        for token in tokens {
            if let Some(address) = token.token_address.clone() {
                match by_address.entry(address) {
                    Entry::Occupied(slot) => deduped[*slot.get()] = token,
                    Entry::Vacant(slot) => {
                        slot.insert(deduped.len());
                        deduped.push(token);
                    }
                }
            } else {
                deduped.push(token);
            }
        }
        let count = deduped.len();
        *self.tokens.write() = deduped;
        count
    }

    /// Add trade volume onto the token with the given address.
    ///
    /// An absent five minute volume counts as zero. Returns `false` when no
    /// token carries the address, leaving the collection untouched.
    pub fn apply_trade(&self, address: &str, volume: Decimal) -> bool {
        let mut tokens = self.tokens.write();
        let Some(token) = tokens
            .iter_mut()
            .find(|t| t.token_address.as_deref() == Some(address))
        else {
            return false;
        };
        let current = token.metrics.five_min_volume.unwrap_or_default();
        token.metrics.five_min_volume = Some(current + volume);
        true
    }

    /// Look up a token by on-chain address.
    #[must_use]
    pub fn get(&self, address: &str) -> Option<Token> {
        self.tokens
            .read()
            .iter()
            .find(|t| t.token_address.as_deref() == Some(address))
            .cloned()
    }

    /// Copy of the current collection in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Token> {
        self.tokens.read().clone()
    }

    /// Number of tracked tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// Check whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }

    /// Tokens whose name or symbol contains `needle`, case-insensitive.
    #[must_use]
    pub fn search(&self, needle: &str) -> Vec<Token> {
        let needle = needle.to_lowercase();
        self.tokens
            .read()
            .iter()
            .filter(|t| {
                t.name.to_lowercase().contains(&needle)
                    || t.symbol.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Copy of the collection ordered by the given key and direction.
    #[must_use]
    pub fn sorted_by(&self, key: SortKey, direction: SortDirection) -> Vec<Token> {
        let mut tokens = self.snapshot();
        tokens.sort_by(|a, b| {
            let ordering = match key {
                SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                SortKey::Symbol => a.symbol.to_lowercase().cmp(&b.symbol.to_lowercase()),
                SortKey::MarketCap => a.market_cap.cmp(&b.market_cap),
                SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(name: &str, symbol: &str, address: Option<&str>) -> Token {
        Token {
            name: name.to_string(),
            symbol: symbol.to_string(),
            market_cap: Decimal::ZERO,
            created_at: Utc::now(),
            bonded_at: None,
            metrics: TokenMetrics::default(),
            chain_id: Some("solana".to_string()),
            token_address: address.map(ToString::to_string),
            icon: None,
            description: None,
            links: None,
        }
    }

    #[test]
    fn test_replace_all_swaps_collection() {
        let store = TokenStore::new();
        store.replace_all(vec![make_token("Alpha", "ALp", Some("0xa"))]);

        let count = store.replace_all(vec![
            make_token("Beta", "BET", Some("0xb")),
            make_token("Gamma", "GAM", Some("0xc")),
        ]);

        assert_eq!(count, 2);
        assert_eq!(store.len(), 2);
        assert!(store.get("0xa").is_none());
        assert!(store.get("0xb").is_some());
    }

    #[test]
    fn test_replace_all_collapses_duplicate_addresses() {
        let store = TokenStore::new();
        let mut newer = make_token("Alpha V2", "ALP", Some("0xa"));
        newer.market_cap = Decimal::from(500);

        store.replace_all(vec![
            make_token("Alpha", "ALP", Some("0xa")),
            make_token("Beta", "BET", Some("0xb")),
            newer,
        ]);

        assert_eq!(store.len(), 2);
        let alpha = store.get("0xa").unwrap();
        assert_eq!(alpha.name, "Alpha V2");
        assert_eq!(alpha.market_cap, Decimal::from(500));
    }

    #[test]
    fn test_replace_all_keeps_addressless_tokens() {
        let store = TokenStore::new();
        store.replace_all(vec![
            make_token("NoAddr", "ONE", None),
            make_token("NoAddr", "TWO", None),
        ]);

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_apply_trade_treats_missing_volume_as_zero() {
        let store = TokenStore::new();
        store.replace_all(vec![make_token("Alpha", "ALP", Some("0xa"))]);

        assert!(store.apply_trade("0xa", Decimal::from(7)));

        let alpha = store.get("0xa").unwrap();
        assert_eq!(alpha.metrics.five_min_volume, Some(Decimal::from(7)));
    }

    #[test]
    fn test_apply_trade_accumulates() {
        let store = TokenStore::new();
        let mut token = make_token("Alpha", "ALP", Some("0xa"));
        token.metrics.five_min_volume = Some(Decimal::new(105, 1));
        store.replace_all(vec![token, make_token("Beta", "BET", Some("0xb"))]);

        assert!(store.apply_trade("0xa", Decimal::new(25, 1)));

        let alpha = store.get("0xa").unwrap();
        assert_eq!(alpha.metrics.five_min_volume, Some(Decimal::from(13)));
        let beta = store.get("0xb").unwrap();
        assert_eq!(beta.metrics.five_min_volume, None);
    }

    #[test]
    fn test_apply_trade_unknown_address_is_discarded() {
        let store = TokenStore::new();
        store.replace_all(vec![make_token("Alpha", "ALP", Some("0xa"))]);

        assert!(!store.apply_trade("0xdead", Decimal::from(1)));
        let alpha = store.get("0xa").unwrap();
        assert_eq!(alpha.metrics.five_min_volume, None);
    }

    #[test]
    fn test_search_matches_name_and_symbol_case_insensitive() {
        let store = TokenStore::new();
        store.replace_all(vec![
            make_token("Moonshot", "MOON", Some("0xa")),
            make_token("Doge Classic", "DGC", Some("0xb")),
            make_token("Quiet", "moonling", Some("0xc")),
        ]);

        let hits = store.search("MOON");
        assert_eq!(hits.len(), 2);

        let hits = store.search("doge");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "DGC");
    }

    #[test]
    fn test_sorted_by_market_cap_descending() {
        let store = TokenStore::new();
        let mut small = make_token("Small", "SML", Some("0xa"));
        small.market_cap = Decimal::from(10);
        let mut large = make_token("Large", "LRG", Some("0xb"));
        large.market_cap = Decimal::from(1000);
        let mut mid = make_token("Mid", "MID", Some("0xc"));
        mid.market_cap = Decimal::from(100);
        store.replace_all(vec![small, large, mid]);

        let sorted = store.sorted_by(SortKey::MarketCap, SortDirection::Descending);
        let symbols: Vec<&str> = sorted.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["LRG", "MID", "SML"]);
    }

    #[test]
    fn test_sorted_by_name_is_case_insensitive() {
        let store = TokenStore::new();
        store.replace_all(vec![
            make_token("banana", "BAN", Some("0xa")),
            make_token("Apple", "APL", Some("0xb")),
            make_token("cherry", "CHY", Some("0xc")),
        ]);

        let sorted = store.sorted_by(SortKey::Name, SortDirection::Ascending);
        let names: Vec<&str> = sorted.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn test_token_deserializes_from_api_shape() {
        let json = r#"{
            "name": "Moonshot",
            "symbol": "MOON",
            "market_cap": 123456.78,
            "created_at": "2026-01-15T12:30:00Z",
            "bonded_at": null,
            "metrics": {
                "five_min_price": 0.12,
                "five_min_volume": 4200.5
            },
            "chain_id": "solana",
            "token_address": "0xmoon",
            "links": [
                {"type": "twitter", "label": "Twitter", "url": "https://x.com/moon"}
            ]
        }"#;

        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.symbol, "MOON");
        assert_eq!(token.market_cap, Decimal::new(12_345_678, 2));
        assert_eq!(token.metrics.five_min_volume, Some(Decimal::new(42_005, 1)));
        assert_eq!(token.metrics.one_hour_price, None);
        assert_eq!(token.bonded_at, None);
        assert_eq!(token.links.as_ref().unwrap()[0].link_type, "twitter");
    }

    #[test]
    fn test_trade_delta_tolerates_missing_volume() {
        let delta: TradeDelta = serde_json::from_str("{}").unwrap();
        assert_eq!(delta.volume, None);

        let delta: TradeDelta = serde_json::from_str(r#"{"volume": 9.5}"#).unwrap();
        assert_eq!(delta.volume, Some(Decimal::new(95, 1)));
    }
}
