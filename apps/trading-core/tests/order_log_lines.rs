//! The canonical order log line, observed through the tracing
//! pipeline for a rejected submit.

#![allow(clippy::unwrap_used)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal_macros::dec;

use trading_core::models::{AccountId, OrderRequest, ProductSymbol, TimeInForce, VenueId};
use trading_core::pipeline::OrderPipeline;
use trading_core::store::OrderStore;
use trading_core::telemetry::TelemetryHub;
use trading_core::venue::{MockVenueAdapter, VenueAdapter, VenueError, VenueRouter};

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Split the payload of `[order:...]` into its comma-separated fields.
fn order_fields(line: &str) -> Option<Vec<String>> {
    let start = line.find("[order:")?;
    let payload = &line[start + "[order:".len()..];
    let end = payload.find(']')?;
    Some(payload[..end].split(',').map(str::to_string).collect())
}

// Current-thread runtime: spawned submit tasks poll on this thread, so
// the thread-local subscriber captures their log lines too.
#[tokio::test]
async fn rejected_submit_logs_one_error_line_in_canonical_format() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let adapter = Arc::new(MockVenueAdapter::new());
    adapter.fail_next_create(VenueError::Rejected {
        reason: "unknown_error".to_string(),
    });
    let router = VenueRouter::new().with_adapter(
        VenueId::new("exchange_a"),
        Arc::clone(&adapter) as Arc<dyn VenueAdapter>,
    );
    let pipeline = OrderPipeline::new(
        Arc::new(OrderStore::new()),
        router,
        Arc::new(TelemetryHub::new()),
    );

    let order = pipeline
        .buy_limit(OrderRequest {
            venue_id: VenueId::new("exchange_a"),
            account_id: AccountId::new("main"),
            product_symbol: ProductSymbol::new("btc_usd"),
            price: dec!(100.1),
            size: dec!(0.1),
            time_in_force: TimeInForce::Fok,
            update_callback: None,
        })
        .unwrap();

    // Wait for the submit task to settle the order into error.
    for _ in 0..200 {
        let stored = pipeline.store().find(&order.client_id).unwrap();
        if stored.error_reason.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let order_lines: Vec<Vec<String>> = logs
        .lines()
        .iter()
        .filter(|line| line.contains(&format!("[order:{}", order.client_id)))
        .filter_map(|line| order_fields(line))
        .collect();

    // Exactly one line per transition: enqueued, then error.
    assert_eq!(order_lines.len(), 2);

    let enqueued = &order_lines[0];
    assert_eq!(enqueued.len(), 10);
    assert_eq!(enqueued[0].len(), 36);
    assert_eq!(
        &enqueued[1..],
        &[
            "enqueued", "exchange_a", "main", "btc_usd", "buy", "limit", "fok", "100.1", "0.1"
        ]
    );

    let errored = &order_lines[1];
    assert_eq!(errored.len(), 11);
    assert_eq!(errored[1], "error");
    assert_eq!(errored[10], "unknown_error");
}
