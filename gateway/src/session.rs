//! Per-counterparty session: socket reader, inbound processor, outbound
//! writer, and the sequence-number discipline between them.
//!
//! The reader frames raw bytes into messages and feeds the rx queue; the
//! processor validates, checks MsgSeqNum, and dispatches on MsgType; the
//! writer drains the tx queue to the socket in enqueue order. Any framing
//! or sequencing violation deactivates the whole session; a bad order
//! inside an otherwise valid NewOrderSingle only drops that order.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::io;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use fixwire::messages::{self, EncryptMethod, FixOrdType, FixSide, MsgType};
use fixwire::{frame, parser};
use matchbook::{Market, Order, OrderKind, Side};

/// CompID this engine signs outbound headers with.
pub const SERVER_COMP_ID: &str = "FERX";

const READ_CHUNK: usize = 256;

struct MessageQueue {
    messages: Mutex<VecDeque<String>>,
    ready: Condvar,
}

impl MessageQueue {
    fn new() -> MessageQueue {
        MessageQueue {
            messages: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }
}

/// Protocol state for one counterparty, alive for the life of the process
/// once created. `Created → Active` on socket binding, `Active → Inactive`
/// on any error or disconnect; the object stays in the registry afterwards
/// but the workers are gone.
pub struct Session {
    sender_comp_id: String,
    /// MsgSeqNum the client declared on first contact. Recorded only; the
    /// expected inbound sequence still starts at 1, so a client starting
    /// higher is dropped on its next message.
    declared_seq_start: u64,
    active: AtomicBool,
    socket: Mutex<Option<TcpStream>>,
    rx: MessageQueue,
    tx: MessageQueue,
    rx_seq_num: AtomicU64,
    tx_seq_num: AtomicU64,
    workers: Mutex<Vec<JoinHandle<()>>>,
    market: Arc<Market>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("sender_comp_id", &self.sender_comp_id)
            .field("declared_seq_start", &self.declared_seq_start)
            .field("active", &self.active.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(
        sender_comp_id: String,
        declared_seq_start: u64,
        market: Arc<Market>,
    ) -> Arc<Session> {
        Arc::new(Session {
            sender_comp_id,
            declared_seq_start,
            active: AtomicBool::new(false),
            socket: Mutex::new(None),
            rx: MessageQueue::new(),
            tx: MessageQueue::new(),
            rx_seq_num: AtomicU64::new(1),
            tx_seq_num: AtomicU64::new(1),
            workers: Mutex::new(Vec::new()),
            market,
        })
    }

    pub fn sender_comp_id(&self) -> &str {
        &self.sender_comp_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Binds the socket and starts the three workers. No-op if already
    /// active.
    pub fn activate(self: &Arc<Session>, stream: TcpStream) -> io::Result<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!(
            sender = %self.sender_comp_id,
            declared_seq = self.declared_seq_start,
            "activating session"
        );

        let reader_stream = stream.try_clone()?;
        let writer_stream = stream.try_clone()?;
        *self.socket.lock() = Some(stream);

        let spawned = self
            .spawn_worker("sess-reader", {
                let session = Arc::clone(self);
                move || session.run_reader(reader_stream)
            })
            .and_then(|_| {
                self.spawn_worker("sess-writer", {
                    let session = Arc::clone(self);
                    move || session.run_writer(writer_stream)
                })
            })
            .and_then(|_| {
                self.spawn_worker("sess-processor", {
                    let session = Arc::clone(self);
                    move || session.run_processor()
                })
            });

        if let Err(err) = spawned {
            warn!(sender = %self.sender_comp_id, %err, "failed to start session workers");
            self.deactivate();
            return Err(err);
        }
        Ok(())
    }

    fn spawn_worker<F>(&self, name: &str, body: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name.into()).spawn(body)?;
        self.workers.lock().push(handle);
        Ok(())
    }

    /// Tears the session down: clears the active flag, wakes both queue
    /// waiters, shuts the socket (which unblocks the reader), and joins
    /// every worker other than the calling thread. Idempotent; only the
    /// first caller performs the teardown.
    pub fn deactivate(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        info!(sender = %self.sender_comp_id, "deactivating session");

        // Notify under each queue lock: a worker between its active check
        // and its wait still holds the lock, so it either sees the cleared
        // flag or is already parked when the wakeup lands.
        {
            let _rx = self.rx.messages.lock();
            self.rx.ready.notify_all();
        }
        {
            let _tx = self.tx.messages.lock();
            self.tx.ready.notify_all();
        }

        if let Some(socket) = self.socket.lock().take() {
            let _ = socket.shutdown(Shutdown::Both);
        }

        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        let me = thread::current().id();
        for handle in handles {
            // A worker deactivating itself is not joined; it exits on its
            // own once this call returns.
            if handle.thread().id() != me {
                let _ = handle.join();
            }
        }
    }

    /// Enqueues a raw inbound message for the processor. Called by the
    /// reader and, for the buffered logon, by the server's accept path.
    pub fn receive_message(&self, message: String) {
        if message.is_empty() {
            return;
        }
        let mut queue = self.rx.messages.lock();
        queue.push_back(message);
        self.rx.ready.notify_one();
    }

    /// Frames `payload` with a header stamped from `tx_seq_num`
    /// (post-incremented) plus the checksum trailer, and queues it for the
    /// writer. Stamping happens under the queue lock so sequence numbers
    /// leave the socket in order.
    pub fn send_message(&self, msg_type: MsgType, payload: &str) {
        let mut queue = self.tx.messages.lock();

        let seq = self.tx_seq_num.fetch_add(1, Ordering::SeqCst);
        let mut message = messages::build_header(
            msg_type,
            payload.len(),
            SERVER_COMP_ID,
            &self.sender_comp_id,
            seq,
        );
        message.push_str(payload);
        let trailer = messages::build_trailer(&message);
        message.push_str(&trailer);

        queue.push_back(message);
        self.tx.ready.notify_one();
    }

    /// Socket reader: blocks in `read`, frames complete messages out of
    /// the byte stream (dropping any noise before the next `8=`), and
    /// feeds the rx queue. Read errors and orderly close both mean the
    /// client is gone.
    fn run_reader(self: Arc<Session>, mut stream: TcpStream) {
        let mut chunk = [0u8; READ_CHUNK];
        let mut buffer: Vec<u8> = Vec::new();

        while self.is_active() {
            match stream.read(&mut chunk) {
                Ok(n) if n > 0 => {
                    buffer.extend_from_slice(&chunk[..n]);
                    while let Some(message) = frame::extract(&mut buffer) {
                        debug!(sender = %self.sender_comp_id, len = message.len(), "framed message");
                        self.receive_message(message);
                    }
                }
                _ => {
                    debug!(sender = %self.sender_comp_id, "client disconnected");
                    self.deactivate();
                }
            }
        }
    }

    /// Inbound processor: drains the rx queue in arrival order.
    fn run_processor(self: Arc<Session>) {
        loop {
            let message = {
                let mut queue = self.rx.messages.lock();
                loop {
                    if !self.is_active() {
                        return;
                    }
                    if let Some(message) = queue.pop_front() {
                        break message;
                    }
                    self.rx.ready.wait(&mut queue);
                }
            };
            // Processed without the queue lock so the reader can keep
            // framing and a deactivation from here can join it.
            self.process_message(&message);
        }
    }

    /// Outbound writer: drains the tx queue to the socket in FIFO order.
    fn run_writer(self: Arc<Session>, mut stream: TcpStream) {
        loop {
            let message = {
                let mut queue = self.tx.messages.lock();
                loop {
                    if !self.is_active() {
                        return;
                    }
                    if let Some(message) = queue.pop_front() {
                        break message;
                    }
                    self.tx.ready.wait(&mut queue);
                }
            };
            if let Err(err) = stream.write_all(message.as_bytes()) {
                warn!(sender = %self.sender_comp_id, %err, "failed to write to client");
            }
        }
    }

    fn process_message(&self, message: &str) {
        if !parser::is_message_valid(message) {
            warn!(sender = %self.sender_comp_id, "received invalid message");
            self.deactivate();
            return;
        }

        let seq = parser::parse_seq_num(message).unwrap_or(0);
        let expected = self.rx_seq_num.load(Ordering::SeqCst);
        if seq != expected {
            // A sequence-reset/gap-fill exchange would belong here; for
            // now a gap is fatal to the session.
            warn!(
                sender = %self.sender_comp_id,
                expected,
                got = seq,
                "sequence number mismatch"
            );
            self.deactivate();
            return;
        }
        self.rx_seq_num.fetch_add(1, Ordering::SeqCst);

        match parser::parse_msg_type(message) {
            Some(MsgType::Logon) => {
                debug!(sender = %self.sender_comp_id, "logon");
                self.send_message(
                    MsgType::Logon,
                    &messages::build_logon(EncryptMethod::None, 0),
                );
            }
            Some(MsgType::Logout) => {
                debug!(sender = %self.sender_comp_id, "logout");
                self.send_message(MsgType::Logout, "");
            }
            Some(MsgType::NewOrderSingle) => {
                if let Some(order) = self.parse_order(message) {
                    if let Err(err) = self.market.process_order(order) {
                        warn!(sender = %self.sender_comp_id, %err, "market rejected order");
                    }
                }
            }
            _ => {
                warn!(sender = %self.sender_comp_id, "received unsupported message type");
                self.deactivate();
            }
        }
    }

    /// Builds an engine order from a NewOrderSingle. Unsupported order
    /// types and sides drop the order silently; the session stays up.
    fn parse_order(&self, message: &str) -> Option<Order> {
        let kind = match parser::parse_ord_type(message) {
            Some(FixOrdType::Limit) => OrderKind::Limit,
            other => {
                debug!(sender = %self.sender_comp_id, ?other, "unsupported order type, dropping");
                return None;
            }
        };
        let side = match parser::parse_side(message) {
            Some(FixSide::Buy) => Side::Buy,
            Some(FixSide::Sell) => Side::Sell,
            other => {
                debug!(sender = %self.sender_comp_id, ?other, "unsupported order side, dropping");
                return None;
            }
        };
        let symbol = parser::parse_symbol(message)?;

        debug!(
            sender = %self.sender_comp_id,
            cl_ord_id = parser::parse_client_id(message).unwrap_or(""),
            symbol,
            "accepting order"
        );

        // Missing numeric fields fall back to negative sentinels; a
        // negative quantity clamps to zero on the cast.
        let price = parser::parse_price(message).unwrap_or(-1.0);
        let quantity = parser::parse_order_qty(message).unwrap_or(-1.0) as u64;

        Some(Order::new(kind, side, symbol, price, quantity))
    }
}
