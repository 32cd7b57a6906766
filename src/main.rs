//! In-process matching lab.
//!
//! Drives the matchbook core directly (no sockets): throughput figures
//! first, then a small crossing demo with printed book state.

use matchbook::{Market, Order, Side};

mod throughput;

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== ferrofix matching lab ===");
    throughput::run_submission_throughput();
    throughput::run_matching_throughput();

    println!("\n=== Basic demo ===");
    run_basic_demo();
}

/// Opens a market, rests a spread, then sends a crossing bid through it.
fn run_basic_demo() {
    let market = Market::open();

    // Resting ask at 150.00 and bid at 149.50: a spread, nothing matches.
    market
        .process_order(Order::limit(Side::Sell, "AAPL", 150.0, 100))
        .expect("admit resting ask");
    market
        .process_order(Order::limit(Side::Buy, "AAPL", 149.5, 50))
        .expect("admit resting bid");

    let (bid, ask) = market.best_prices("AAPL").expect("AAPL book exists");
    println!("Best bid: {bid:?}");
    println!("Best ask: {ask:?}");

    // Crossing bid takes 75 of the resting ask at 150.00.
    market
        .process_order(Order::limit(Side::Buy, "AAPL", 150.0, 75))
        .expect("admit crossing bid");
    throughput::wait_for_volume(&market, 75);

    let stats = market.stats();
    println!(
        "Volume: {}  orders filled: {}",
        stats.total_volume, stats.total_orders_filled
    );

    let (bid, ask) = market.best_prices("AAPL").expect("AAPL book exists");
    println!("Final best bid: {bid:?}"); // the 149.50 bid, untouched
    println!("Final best ask: {ask:?}"); // 25 left of the original ask

    market.close();
}
