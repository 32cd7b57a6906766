use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use matchbook::{Market, Order, Side};

fn bench_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission");

    for &num_orders in [100, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("non_crossing_orders", num_orders),
            &num_orders,
            |b, &num_orders| {
                b.iter(|| {
                    let market = Market::open();
                    for i in 0..num_orders {
                        // Alternating sides with a wide spread so nothing
                        // matches and the heaps just grow.
                        let order = if i % 2 == 0 {
                            Order::limit(Side::Buy, "AAPL", 100.0 - (i % 50) as f64 * 0.01, 100)
                        } else {
                            Order::limit(Side::Sell, "AAPL", 200.0 + (i % 50) as f64 * 0.01, 100)
                        };
                        black_box(market.process_order(order).unwrap());
                    }
                    market.close();
                })
            },
        );
    }

    group.finish();
}

fn bench_crossing_flow(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching");

    group.bench_function("paired_crossing_orders", |b| {
        b.iter(|| {
            let market = Market::open();
            for _ in 0..500 {
                market
                    .process_order(Order::limit(Side::Buy, "AAPL", 10.0, 100))
                    .unwrap();
                market
                    .process_order(Order::limit(Side::Sell, "AAPL", 10.0, 100))
                    .unwrap();
            }
            // Close joins the matcher, bounding the iteration.
            market.close();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_admission, bench_crossing_flow);
criterion_main!(benches);
