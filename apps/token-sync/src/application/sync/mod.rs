//! View Synchronizer
//!
//! Consumes stream events in arrival order and folds them into the shared
//! token collection. Structural events trigger a full refetch through the
//! token source port; trade events merge volume deltas in place. One task
//! runs the fold, so updates never interleave out of order.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::ports::TokenSourcePort;
use crate::domain::token::TokenStore;
use crate::infrastructure::metrics::{self, DiscardReason, RefreshOutcome};
use crate::infrastructure::stream::{StreamEvent, StreamMessage, TokenTradeMessage};

/// Folds stream events into the token collection.
pub struct ViewSynchronizer {
    source: Arc<dyn TokenSourcePort>,
    store: Arc<TokenStore>,
}

impl ViewSynchronizer {
    /// Create a synchronizer over the given snapshot source and collection.
    #[must_use]
    pub fn new(source: Arc<dyn TokenSourcePort>, store: Arc<TokenStore>) -> Self {
        Self { source, store }
    }

    /// Consume events until every sender is gone.
    ///
    /// Runs as the only consumer of the transport's event channel; events
    /// are folded strictly in arrival order.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<StreamEvent>) {
        tracing::debug!("synchronizer started");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("event channel closed, synchronizer stopping");
    }

    /// Replace the collection with a fresh snapshot from the source.
    ///
    /// A failed fetch keeps the previous collection; the next structural
    /// event retries naturally.
    pub async fn refresh(&self) {
        match self.source.fetch_tokens().await {
            Ok(list) => {
                let fetched = list.tokens.len();
                let retained = self.store.replace_all(list.tokens);
                metrics::record_refresh(RefreshOutcome::Replaced);
                metrics::record_tracked_tokens(retained);
                tracing::info!(
                    fetched,
                    retained,
                    total = list.total,
                    cached = list.cached,
                    "token collection refreshed"
                );
            }
            Err(e) => {
                metrics::record_refresh(RefreshOutcome::Failed);
                tracing::warn!(error = %e, "token refresh failed, keeping previous collection");
            }
        }
    }

    async fn handle_event(&self, event: StreamEvent) {
        match event {
            StreamEvent::Message(StreamMessage::NewToken) => self.refresh().await,
            StreamEvent::Message(StreamMessage::TokenTrade(trade)) => self.merge_trade(&trade),
            StreamEvent::Message(StreamMessage::Other(value)) => {
                tracing::trace!(frame = %value, "unhandled frame type, buffered only");
            }
            StreamEvent::Connected => {
                tracing::debug!("stream connected, live updates resumed");
            }
            StreamEvent::Disconnected => {
                tracing::debug!("stream disconnected, collection may go stale");
            }
            StreamEvent::Reconnecting { attempt } => {
                tracing::debug!(attempt, "stream reconnecting");
            }
            StreamEvent::DecodeFailed { reason } => {
                tracing::debug!(reason = %reason, "transport dropped an undecodable frame");
            }
            StreamEvent::IntentDropped { action, token } => {
                tracing::debug!(
                    action = action.as_str(),
                    token = %token,
                    "subscription intent dropped while disconnected"
                );
            }
        }
    }

    /// Merge one trade delta into the collection.
    ///
    /// Deltas for untracked addresses and deltas without a volume are
    /// discarded; nothing else is touched either way.
    fn merge_trade(&self, trade: &TokenTradeMessage) {
        let Some(volume) = trade.data.volume else {
            tracing::warn!(token = %trade.token, "trade delta without volume, discarding");
            metrics::record_trade_discarded(DiscardReason::MissingVolume);
            return;
        };

        if self.store.apply_trade(&trade.token, volume) {
            metrics::record_trade_merged();
            tracing::debug!(token = %trade.token, volume = %volume, "merged trade volume");
        } else {
            metrics::record_trade_discarded(DiscardReason::UnknownToken);
            tracing::debug!(token = %trade.token, "trade for untracked token, discarding");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockTokenSourcePort;
    use crate::domain::token::{Token, TokenList, TokenMetrics, TradeDelta};
    use crate::infrastructure::api::ApiError;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn make_token(symbol: &str, address: &str) -> Token {
        Token {
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            market_cap: Decimal::from(1000),
            created_at: Utc::now(),
            bonded_at: None,
            metrics: TokenMetrics::default(),
            chain_id: Some("solana".to_string()),
            token_address: Some(address.to_string()),
            icon: None,
            description: None,
            links: None,
        }
    }

    fn trade_event(address: &str, volume: Option<Decimal>) -> StreamEvent {
        StreamEvent::Message(StreamMessage::TokenTrade(TokenTradeMessage {
            msg_type: "tokenTrade".to_string(),
            token: address.to_string(),
            data: TradeDelta { volume },
        }))
    }

    async fn drive(synchronizer: ViewSynchronizer, events: Vec<StreamEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(Arc::new(synchronizer).run(rx));
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_new_token_event_triggers_full_refresh() {
        let mut source = MockTokenSourcePort::new();
        source.expect_fetch_tokens().times(1).returning(|| {
            Ok(TokenList {
                tokens: vec![make_token("MOON", "0xmoon"), make_token("SUN", "0xsun")],
                total: 2,
                cached: false,
            })
        });

        let store = Arc::new(TokenStore::new());
        store.replace_all(vec![make_token("OLD", "0xold")]);

        let synchronizer = ViewSynchronizer::new(Arc::new(source), Arc::clone(&store));
        drive(synchronizer, vec![StreamEvent::Message(StreamMessage::NewToken)]).await;

        assert_eq!(store.len(), 2);
        assert!(store.get("0xold").is_none());
        assert!(store.get("0xmoon").is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_collection() {
        let mut source = MockTokenSourcePort::new();
        source
            .expect_fetch_tokens()
            .times(1)
            .returning(|| Err(ApiError::Network("connection refused".to_string())));

        let store = Arc::new(TokenStore::new());
        store.replace_all(vec![make_token("OLD", "0xold")]);

        let synchronizer = ViewSynchronizer::new(Arc::new(source), Arc::clone(&store));
        drive(synchronizer, vec![StreamEvent::Message(StreamMessage::NewToken)]).await;

        assert_eq!(store.len(), 1);
        assert!(store.get("0xold").is_some());
    }

    #[tokio::test]
    async fn test_trade_delta_merges_additively() {
        let source = MockTokenSourcePort::new();
        let store = Arc::new(TokenStore::new());
        let mut token = make_token("MOON", "0xmoon");
        token.metrics.five_min_volume = Some(Decimal::from(10));
        store.replace_all(vec![token, make_token("SUN", "0xsun")]);

        let synchronizer = ViewSynchronizer::new(Arc::new(source), Arc::clone(&store));
        drive(
            synchronizer,
            vec![trade_event("0xmoon", Some(Decimal::from(5)))],
        )
        .await;

        let moon = store.get("0xmoon").unwrap();
        assert_eq!(moon.metrics.five_min_volume, Some(Decimal::from(15)));
        let sun = store.get("0xsun").unwrap();
        assert_eq!(sun.metrics.five_min_volume, None);
    }

    #[tokio::test]
    async fn test_trade_for_unknown_address_is_discarded() {
        let source = MockTokenSourcePort::new();
        let store = Arc::new(TokenStore::new());
        store.replace_all(vec![make_token("MOON", "0xmoon")]);

        let synchronizer = ViewSynchronizer::new(Arc::new(source), Arc::clone(&store));
        drive(
            synchronizer,
            vec![trade_event("0xunknown", Some(Decimal::from(5)))],
        )
        .await;

        let moon = store.get("0xmoon").unwrap();
        assert_eq!(moon.metrics.five_min_volume, None);
    }

    #[tokio::test]
    async fn test_trade_without_volume_is_discarded() {
        let source = MockTokenSourcePort::new();
        let store = Arc::new(TokenStore::new());
        store.replace_all(vec![make_token("MOON", "0xmoon")]);

        let synchronizer = ViewSynchronizer::new(Arc::new(source), Arc::clone(&store));
        drive(synchronizer, vec![trade_event("0xmoon", None)]).await;

        let moon = store.get("0xmoon").unwrap();
        assert_eq!(moon.metrics.five_min_volume, None);
    }

    #[tokio::test]
    async fn test_unknown_frames_do_not_fold_or_fetch() {
        // No fetch expectation: a fetch call would fail the test
        let source = MockTokenSourcePort::new();
        let store = Arc::new(TokenStore::new());
        store.replace_all(vec![make_token("MOON", "0xmoon")]);

        let synchronizer = ViewSynchronizer::new(Arc::new(source), Arc::clone(&store));
        drive(
            synchronizer,
            vec![
                StreamEvent::Message(StreamMessage::Other(serde_json::json!({
                    "type": "serverStats",
                    "connections": 3
                }))),
                StreamEvent::Connected,
                StreamEvent::Disconnected,
            ],
        )
        .await;

        assert_eq!(store.len(), 1);
        let moon = store.get("0xmoon").unwrap();
        assert_eq!(moon.metrics.five_min_volume, None);
    }

    #[tokio::test]
    async fn test_refresh_collapses_duplicate_addresses() {
        let mut source = MockTokenSourcePort::new();
        source.expect_fetch_tokens().times(1).returning(|| {
            let mut newer = make_token("MOON", "0xmoon");
            newer.market_cap = Decimal::from(9999);
            Ok(TokenList {
                tokens: vec![make_token("MOON", "0xmoon"), newer],
                total: 2,
                cached: true,
            })
        });

        let store = Arc::new(TokenStore::new());
        let synchronizer = ViewSynchronizer::new(Arc::new(source), Arc::clone(&store));
        synchronizer.refresh().await;

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("0xmoon").unwrap().market_cap, Decimal::from(9999));
    }
}
