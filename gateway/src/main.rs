//! Process bootstrap: open the market, init the session registry, start
//! the server, then sit in a stats loop until SIGINT. The signal handler
//! only flips a flag; teardown runs here on the main thread, in reverse
//! order of startup.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use fix_gateway::registry::SessionRegistry;
use fix_gateway::server::{Server, DEFAULT_PORT};
use matchbook::Market;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(Level::INFO.into()),
        )
        .init();

    let market = Arc::new(Market::open());
    let registry = Arc::new(SessionRegistry::new(Arc::clone(&market)));
    let listen_addr = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT));
    let mut server = Server::start(Arc::clone(&registry), listen_addr)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
        let shutdown = Arc::clone(&shutdown);
        move || shutdown.store(true, Ordering::SeqCst)
    })?;

    let started = Instant::now();
    let mut last_report = Instant::now();
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
        if last_report.elapsed() >= STATS_INTERVAL {
            last_report = Instant::now();
            report(&market, started);
        }
    }

    info!("interrupt received, shutting down");
    server.stop();
    registry.destroy();
    market.close();
    info!("shutdown complete");

    Ok(())
}

fn report(market: &Market, started: Instant) {
    let stats = market.stats();
    let elapsed_secs = started.elapsed().as_secs().max(1);
    info!(
        stats = %serde_json::to_string(&stats).unwrap_or_default(),
        volume_per_sec = stats.total_volume / elapsed_secs,
        "market report"
    );
}
