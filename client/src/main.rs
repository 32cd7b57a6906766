//! Throwaway load client: logs on as the given firm, then streams random
//! limit orders at the engine until stopped (or until `--count` orders
//! have gone out). Buys at 10.00 and sells at 9.00 so a pair of opposing
//! clients produces a steady stream of crosses.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rand::Rng;

use fixwire::messages::{
    build_header, build_logon, build_new_order_single, build_trailer, utc_timestamp,
    EncryptMethod, FixOrdType, FixSide, HandlInst, MsgType,
};

#[derive(Parser)]
#[command(name = "fix-client")]
#[command(about = "FIX load client - floods the engine with random limit orders")]
struct Args {
    /// SenderCompID to log on with
    sender: String,

    /// Engine address
    #[arg(short, long, default_value = "127.0.0.1:3927")]
    server: String,

    /// TargetCompID of the engine
    #[arg(long, default_value = "FERX")]
    target: String,

    /// Ticker to trade
    #[arg(long, default_value = "AAPL")]
    symbol: String,

    /// Orders to send before exiting; 0 keeps going forever
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,

    /// Pause between orders, in milliseconds
    #[arg(long, default_value = "50")]
    interval_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut stream = TcpStream::connect(&args.server)
        .with_context(|| format!("cannot connect to trading server at {}", args.server))?;
    let mut seq = 1u64;

    send_message(
        &mut stream,
        &args,
        &mut seq,
        MsgType::Logon,
        &build_logon(EncryptMethod::None, 0),
    )?;

    // Wait for the engine's logon reply before trading.
    let mut reply = [0u8; 1024];
    let n = stream.read(&mut reply).context("reading logon reply")?;
    anyhow::ensure!(n > 0, "engine closed the connection during logon");
    println!("{} logged on to {}", args.sender, args.server);

    let mut rng = rand::thread_rng();
    let mut sent = 0u64;
    while args.count == 0 || sent < args.count {
        let side = if rng.gen_bool(0.5) {
            FixSide::Buy
        } else {
            FixSide::Sell
        };
        let quantity = rng.gen_range(1..=100) as f64;
        let price = if side == FixSide::Buy { 10.0 } else { 9.0 };

        let payload = build_new_order_single(
            &utc_timestamp(),
            HandlInst::AutoPrivate,
            &args.symbol,
            side,
            quantity,
            FixOrdType::Limit,
            price,
        );
        send_message(&mut stream, &args, &mut seq, MsgType::NewOrderSingle, &payload)?;
        sent += 1;

        thread::sleep(Duration::from_millis(args.interval_ms));
    }

    println!("{} sent {} orders", args.sender, sent);
    Ok(())
}

fn send_message(
    stream: &mut TcpStream,
    args: &Args,
    seq: &mut u64,
    msg_type: MsgType,
    payload: &str,
) -> anyhow::Result<()> {
    let mut msg = build_header(msg_type, payload.len(), &args.sender, &args.target, *seq);
    *seq += 1;
    msg.push_str(payload);
    let trailer = build_trailer(&msg);
    msg.push_str(&trailer);

    stream
        .write_all(msg.as_bytes())
        .context("writing to trading server")?;
    Ok(())
}
