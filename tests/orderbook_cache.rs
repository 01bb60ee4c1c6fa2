//! Offline tests for orderbook reconstruction from raw stream frames.

use cryptomarket::orderbook::{
    merge_side, BookState, OrderbookCache, OrderbookManager, SortDirection, UpdateOutcome,
};
use cryptomarket::types::{BookUpdate, Notification, PriceLevel, WsMessage};
use rust_decimal_macros::dec;

const KEY: &str = "ORDERBOOK:ETHBTC:";

fn level(price: rust_decimal::Decimal, size: rust_decimal::Decimal) -> PriceLevel {
    PriceLevel::new(price, size)
}

/// Decode a raw frame into the book update it carries
fn book_update(raw: &str) -> (String, BookUpdate) {
    match WsMessage::parse(raw).unwrap() {
        WsMessage::Notification(Notification::Orderbook { key, update }) => (key, update),
        other => panic!("not an orderbook notification: {:?}", other),
    }
}

fn snapshot_frame(sequence: u64, ask: &str, bid: &str) -> String {
    format!(
        concat!(
            r#"{{"jsonrpc":"2.0","method":"snapshotOrderbook","params":{{"symbol":"ETHBTC","#,
            r#""sequence":{},"timestamp":"2021-03-01T12:00:00.000Z","ask":{},"bid":{}}}}}"#,
        ),
        sequence, ask, bid
    )
}

fn delta_frame(from: u64, to: u64, ask: &str, bid: &str) -> String {
    format!(
        concat!(
            r#"{{"jsonrpc":"2.0","method":"updateOrderbook","params":{{"symbol":"ETHBTC","#,
            r#""fromSequence":{},"toSequence":{},"timestamp":"2021-03-01T12:00:01.000Z","#,
            r#""ask":{},"bid":{}}}}}"#,
        ),
        from, to, ask, bid
    )
}

fn apply(cache: &mut OrderbookCache, raw: &str) -> UpdateOutcome {
    let (key, update) = book_update(raw);
    cache.update(&key, update)
}

#[test]
fn test_snapshot_delta_gap_recovery() {
    let mut cache = OrderbookCache::new();

    let outcome = apply(
        &mut cache,
        &snapshot_frame(1, r#"[{"price":"10","size":"5"}]"#, r#"[{"price":"9","size":"3"}]"#),
    );
    assert_eq!(outcome, UpdateOutcome::Replaced);

    let outcome = apply(
        &mut cache,
        &delta_frame(1, 2, r#"[{"price":"10","size":"0"},{"price":"11","size":"7"}]"#, "[]"),
    );
    assert_eq!(outcome, UpdateOutcome::Applied);

    let book = cache.get_orderbook(KEY).unwrap();
    assert_eq!(book.sequence, 2);
    assert_eq!(book.ask, vec![level(dec!(11), dec!(7))]);
    assert_eq!(book.bid, vec![level(dec!(9), dec!(3))]);

    // Gap: 5 does not follow 2
    let outcome = apply(&mut cache, &delta_frame(5, 6, r#"[{"price":"12","size":"1"}]"#, "[]"));
    assert_eq!(outcome, UpdateOutcome::Broken { expected: 2, received: 5 });
    assert_eq!(cache.state(KEY), Some(BookState::Broken));
    assert_eq!(cache.get_orderbook(KEY).unwrap(), book);

    cache.mark_waiting_for_snapshot(KEY);
    assert!(cache.is_waiting(KEY));

    // Deltas are dropped while waiting, even contiguous ones
    let outcome = apply(&mut cache, &delta_frame(2, 3, r#"[{"price":"13","size":"1"}]"#, "[]"));
    assert_eq!(outcome, UpdateOutcome::Ignored);
    assert_eq!(cache.get_orderbook(KEY).unwrap(), book);

    let outcome = apply(
        &mut cache,
        &snapshot_frame(100, r#"[{"price":"20","size":"1"}]"#, r#"[{"price":"19","size":"2"}]"#),
    );
    assert_eq!(outcome, UpdateOutcome::Replaced);
    assert_eq!(cache.state(KEY), Some(BookState::Updating));

    let book = cache.get_orderbook(KEY).unwrap();
    assert_eq!(book.sequence, 100);
    assert_eq!(book.ask, vec![level(dec!(20), dec!(1))]);
    assert_eq!(book.bid, vec![level(dec!(19), dec!(2))]);

    let outcome = apply(
        &mut cache,
        &delta_frame(100, 101, "[]", r#"[{"price":"19.5","size":"4"}]"#),
    );
    assert_eq!(outcome, UpdateOutcome::Applied);
    assert_eq!(cache.get_orderbook(KEY).unwrap().best_bid().unwrap().price, dec!(19.5));
}

#[test]
fn test_delta_before_snapshot_is_ignored() {
    let mut cache = OrderbookCache::new();

    let outcome = apply(&mut cache, &delta_frame(1, 2, r#"[{"price":"10","size":"1"}]"#, "[]"));
    assert_eq!(outcome, UpdateOutcome::Ignored);
    assert!(cache.get_orderbook(KEY).is_none());
}

#[test]
fn test_snapshot_always_replaces() {
    let mut cache = OrderbookCache::new();
    apply(&mut cache, &snapshot_frame(50, r#"[{"price":"1","size":"1"}]"#, "[]"));

    // Lower sequence is still trusted
    let outcome = apply(&mut cache, &snapshot_frame(7, "[]", r#"[{"price":"0.5","size":"2"}]"#));
    assert_eq!(outcome, UpdateOutcome::Replaced);

    let book = cache.get_orderbook(KEY).unwrap();
    assert_eq!(book.sequence, 7);
    assert!(book.ask.is_empty());
    assert_eq!(book.bid, vec![level(dec!(0.5), dec!(2))]);
}

#[test]
fn test_missing_side_leaves_side_unchanged() {
    let mut cache = OrderbookCache::new();
    apply(
        &mut cache,
        &snapshot_frame(1, r#"[{"price":"10","size":"1"}]"#, r#"[{"price":"9","size":"1"}]"#),
    );

    let raw = r#"{"method":"updateOrderbook","params":{"symbol":"ETHBTC",
        "fromSequence":1,"toSequence":2,"timestamp":0,"bid":[{"price":"8","size":"4"}]}}"#;
    assert_eq!(apply(&mut cache, raw), UpdateOutcome::Applied);

    let book = cache.get_orderbook(KEY).unwrap();
    assert_eq!(book.ask, vec![level(dec!(10), dec!(1))]);
    assert_eq!(book.bid, vec![level(dec!(9), dec!(1)), level(dec!(8), dec!(4))]);
}

#[test]
fn test_books_are_independent_per_symbol() {
    let manager = OrderbookManager::new();
    let other = r#"{"method":"snapshotOrderbook","params":{"symbol":"BTCUSD",
        "sequence":3,"timestamp":0,"ask":[],"bid":[]}}"#;

    for raw in [snapshot_frame(1, "[]", "[]"), other.to_string()] {
        if let WsMessage::Notification(n) = WsMessage::parse(&raw).unwrap() {
            manager.handle_notification(&n);
        }
    }

    let gap = delta_frame(9, 10, "[]", "[]");
    if let WsMessage::Notification(n) = WsMessage::parse(&gap).unwrap() {
        assert!(manager.handle_notification(&n).unwrap().needs_resync());
    }

    assert!(manager.is_broken(KEY));
    assert_eq!(manager.state("ORDERBOOK:BTCUSD:"), Some(BookState::Updating));
    assert_eq!(manager.keys_needing_resync(), vec![KEY.to_string()]);
}

#[test]
fn test_returned_book_is_independent_copy() {
    let mut cache = OrderbookCache::new();
    apply(
        &mut cache,
        &snapshot_frame(1, r#"[{"price":"10","size":"5"}]"#, r#"[{"price":"9","size":"3"}]"#),
    );

    let mut copy = cache.get_orderbook(KEY).unwrap();
    copy.ask.clear();
    copy.bid.push(level(dec!(1), dec!(1)));
    copy.sequence = 99;

    let book = cache.get_orderbook(KEY).unwrap();
    assert_eq!(book.sequence, 1);
    assert_eq!(book.ask, vec![level(dec!(10), dec!(5))]);
    assert_eq!(book.bid, vec![level(dec!(9), dec!(3))]);

    // Same through the shared manager
    let manager = OrderbookManager::new();
    if let WsMessage::Notification(n) = WsMessage::parse(&snapshot_frame(4, "[]", "[]")).unwrap() {
        manager.handle_notification(&n);
    }
    let mut copy = manager.get_orderbook(KEY).unwrap();
    copy.ask.push(level(dec!(2), dec!(2)));
    copy.sequence = 99;

    let book = manager.get_orderbook(KEY).unwrap();
    assert_eq!(book.sequence, 4);
    assert!(book.ask.is_empty());
}

#[test]
fn test_merge_matches_decimal_values() {
    let old = vec![level(dec!(1.50), dec!(2)), level(dec!(2), dec!(1))];
    let delta = vec![level(dec!(1.5), dec!(0.000)), level(dec!(1.75), dec!(3))];

    let merged = merge_side(&old, &delta, SortDirection::Ascending);
    assert_eq!(merged, vec![level(dec!(1.75), dec!(3)), level(dec!(2), dec!(1))]);
}

#[test]
fn test_merged_sides_stay_sorted() {
    let asks = vec![level(dec!(10), dec!(1)), level(dec!(12), dec!(1)), level(dec!(14), dec!(1))];
    let bids = vec![level(dec!(9), dec!(1)), level(dec!(7), dec!(1)), level(dec!(5), dec!(1))];

    let asks = merge_side(
        &asks,
        &[level(dec!(11), dec!(2)), level(dec!(13), dec!(2)), level(dec!(15), dec!(2))],
        SortDirection::Ascending,
    );
    let bids = merge_side(
        &bids,
        &[level(dec!(8), dec!(2)), level(dec!(6), dec!(2)), level(dec!(4), dec!(2))],
        SortDirection::Descending,
    );

    assert_eq!(asks.len(), 6);
    assert_eq!(bids.len(), 6);
    assert!(asks.windows(2).all(|w| w[0].price < w[1].price));
    assert!(bids.windows(2).all(|w| w[0].price > w[1].price));
    assert!(asks.iter().chain(bids.iter()).all(|l| !l.size.is_zero()));
}
