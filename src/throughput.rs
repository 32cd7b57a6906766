//! Quick throughput figures for the matching core.
//!
//! Not a benchmark harness (criterion covers that in matchbook); these are
//! the eyeball numbers printed when the lab runs.

use std::time::{Duration, Instant};

use matchbook::{Market, Order, Side};

/// Admission cost with a wide spread: the heaps grow, the matcher stays
/// asleep.
pub fn run_submission_throughput() {
    println!(" Submission throughput (non-crossing)");

    let market = Market::open();
    let n: u64 = 100_000;

    let start = Instant::now();
    for i in 0..n {
        let order = if i % 2 == 0 {
            Order::limit(Side::Buy, "AAPL", 100.0 - (i % 100) as f64 * 0.01, 100)
        } else {
            Order::limit(Side::Sell, "AAPL", 200.0 + (i % 100) as f64 * 0.01, 100)
        };
        market.process_order(order).expect("market is open");
    }
    let elapsed = start.elapsed();
    market.close();

    let per_order = elapsed.as_nanos() as f64 / n as f64;
    println!(
        "  {n} orders in {elapsed:.2?} ({per_order:.0} ns/order, {:.0} orders/sec)",
        1e9 / per_order
    );
}

/// End-to-end fill rate: every admitted pair crosses, the matcher drains
/// them concurrently with admission.
pub fn run_matching_throughput() {
    println!(" Matching throughput (fully crossing pairs)");

    let market = Market::open();
    let pairs: u64 = 20_000;

    let start = Instant::now();
    for _ in 0..pairs {
        market
            .process_order(Order::limit(Side::Buy, "AAPL", 10.0, 100))
            .expect("market is open");
        market
            .process_order(Order::limit(Side::Sell, "AAPL", 10.0, 100))
            .expect("market is open");
    }
    if !wait_for_volume(&market, pairs * 100) {
        println!("  matcher did not drain the book in time");
    }
    let elapsed = start.elapsed();
    let fills = market.total_orders_filled();
    market.close();

    println!(
        "  {fills} orders filled in {elapsed:.2?} ({:.0} fills/sec)",
        fills as f64 / elapsed.as_secs_f64()
    );
}

/// Polls until the market's cumulative volume reaches `target` (the
/// matcher runs on its own threads) or a generous deadline passes.
pub fn wait_for_volume(market: &Market, target: u64) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if market.total_volume() >= target {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    market.total_volume() >= target
}
