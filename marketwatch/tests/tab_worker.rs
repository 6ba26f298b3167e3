use marketwatch::{
    currency::CurrencyConverter,
    exchange::ExchangeGroup,
    format::QuoteRow,
    record::QuoteSeed,
    tick::{TickCounters, TickNormalizer},
    worker::{TabRouter, spawn_tab_worker},
};
use smol_str::SmolStr;
use std::sync::Arc;

fn seed(token: &str, name: &str, close: f64) -> QuoteSeed {
    QuoteSeed {
        token: Some(SmolStr::new(token)),
        display_name: Some(name.to_string()),
        close,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_feed_frames_reconcile_into_tab_snapshots() {
    let converter = Arc::new(CurrencyConverter::new(88.0));
    let counters = Arc::new(TickCounters::default());
    let mut router = TabRouter::new(TickNormalizer::new(
        Arc::clone(&converter),
        Arc::clone(&counters),
    ));

    let (crypto, crypto_task) = spawn_tab_worker(
        ExchangeGroup::Crypto,
        Arc::clone(&converter),
        Arc::clone(&counters),
    );
    let (mcx, mcx_task) =
        spawn_tab_worker(ExchangeGroup::Mcx, Arc::clone(&converter), Arc::clone(&counters));

    assert!(crypto.add(seed("BTC", "BTC", 8800.0 * 500.0)).await.unwrap());
    assert!(mcx.add(seed("256265", "GOLD_31DEC", 71000.0)).await.unwrap());
    assert!(mcx.add(seed("1001", "SILVER_05MAR", 0.0)).await.unwrap());

    router.insert(crypto.clone());
    router.insert(mcx.clone());

    let mut updates = mcx.subscribe();
    let _ = updates.borrow_and_update();

    let frames = [
        r#"{"type": "tick", "data": {"Symbol": "BTC_SPOT", "BestBid": {"Price": 50000, "Volume": 1}, "BestAsk": {"Price": 50010, "Volume": 1}}}"#,
        r#"{"instrument_token": 256265, "bid": "0", "ask": "71020", "last_price": "71010", "close_": "0"}"#,
        r#"{"type": "heartbeat"}"#,
        r#"{"instrument_token": "256265", "bid": "0", "ask": "71020", "last_price": "71010"}"#,
    ];
    for frame in frames {
        router.route_str(frame);
    }

    // Snapshot requests queue behind the routed ticks
    let crypto_records = crypto.snapshot().await.unwrap();
    let mcx_records = mcx.snapshot().await.unwrap();

    let btc = &crypto_records[0];
    assert_eq!(btc.last_foreign, 50005.0);
    assert_eq!(btc.last, 50005.0 * 88.0);
    assert_eq!(btc.prev_last_foreign, 0.0);
    assert_eq!(btc.close_foreign, 8800.0 * 500.0 / 88.0);

    let gold = &mcx_records[0];
    assert_eq!(gold.bid, 71010.0);
    assert_eq!(gold.ask, 71020.0);
    assert_eq!(gold.close, 71000.0);
    assert_eq!(mcx_records[1].last, 0.0);

    assert!(updates.has_changed().unwrap());
    let published = updates.borrow_and_update().clone();
    assert_eq!(published, mcx_records);

    let counts = counters.snapshot();
    assert_eq!(counts.normalised, 3);
    assert_eq!(counts.dropped, 1);
    assert_eq!(counts.mutated, 2);
    assert_eq!(counts.suppressed, 1);

    let row = QuoteRow::from_record(gold, converter.rate());
    assert_eq!(row.symbol, "GOLD");
    assert_eq!(row.expiry.as_deref(), Some("31 DEC"));
    assert_eq!(row.bid, "71010");
    assert_eq!(row.percent.to_string(), "0.01");

    assert!(mcx.remove("256265").await.unwrap());
    router.route_str(r#"{"instrument_token": 256265, "last_price": "72000"}"#);
    assert_eq!(mcx.snapshot().await.unwrap().len(), 1);

    router.shutdown();
    crypto_task.await.unwrap();
    mcx_task.await.unwrap();
    assert!(crypto.latest().is_empty());
}
