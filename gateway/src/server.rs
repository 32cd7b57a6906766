//! Listening acceptor and one-shot logon intake.
//!
//! The acceptor handles connections serially: it reads until one complete
//! framed message is buffered, asks the registry for the matching session,
//! and, if the session is not already running, hands the socket over and
//! queues the buffered message for normal processing. After that it never
//! touches the socket again.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use fixwire::frame;

use crate::registry::SessionRegistry;

/// FIX listening port.
pub const DEFAULT_PORT: u16 = 3927;

const READ_CHUNK: usize = 256;

pub struct Server {
    listener: TcpListener,
    acceptor: Option<JoinHandle<()>>,
    done: Arc<AtomicBool>,
}

impl Server {
    /// Binds `addr` with a full `SOMAXCONN` backlog and starts the
    /// acceptor thread. Tests pass port 0 and read the bound address back
    /// with [`Server::local_addr`].
    pub fn start(registry: Arc<SessionRegistry>, addr: SocketAddr) -> io::Result<Server> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        #[cfg(unix)]
        socket.listen(libc::SOMAXCONN)?;
        #[cfg(not(unix))]
        socket.listen(128)?;
        let listener: TcpListener = socket.into();
        info!(addr = %listener.local_addr()?, "server listening");

        let done = Arc::new(AtomicBool::new(false));
        let acceptor = thread::Builder::new().name("acceptor".into()).spawn({
            let listener = listener.try_clone()?;
            let done = Arc::clone(&done);
            move || accept_loop(listener, registry, done)
        })?;

        Ok(Server {
            listener,
            acceptor: Some(acceptor),
            done,
        })
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Stops accepting and joins the acceptor thread. Idempotent.
    pub fn stop(&mut self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("server stopping");

        // Unblock the accept call; there is no portable shutdown for a
        // listener in std.
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::shutdown(self.listener.as_raw_fd(), libc::SHUT_RDWR);
            }
        }

        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: TcpListener, registry: Arc<SessionRegistry>, done: Arc<AtomicBool>) {
    for connection in listener.incoming() {
        if done.load(Ordering::SeqCst) {
            break;
        }
        match connection {
            Ok(stream) => {
                debug!("new client");
                read_logon(stream, &registry);
            }
            Err(err) => warn!(%err, "accept failed"),
        }
    }
    debug!("acceptor exiting");
}

/// Reads until one complete message is buffered, then resolves it into a
/// session. On success the socket is bound to the session and the message
/// queued for its processor; on any failure the socket is simply dropped.
/// A client that connects and sends anything other than a resolvable
/// message gets no further reads.
fn read_logon(mut stream: TcpStream, registry: &SessionRegistry) {
    let mut chunk = [0u8; READ_CHUNK];
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        match stream.read(&mut chunk) {
            Ok(n) if n > 0 => {
                buffer.extend_from_slice(&chunk[..n]);
                let message = match frame::extract(&mut buffer) {
                    Some(message) => message,
                    None => continue,
                };

                match registry.lookup(&message) {
                    Ok(session) => {
                        if session.is_active() {
                            // The sender already has live workers; this
                            // duplicate connection is dropped.
                            debug!(sender = %session.sender_comp_id(), "session already active");
                        } else if let Err(err) = session.activate(stream) {
                            warn!(%err, "failed to activate session");
                        } else {
                            session.receive_message(message);
                        }
                    }
                    Err(err) => debug!(%err, "refusing connection"),
                }
                return;
            }
            _ => {
                // Disconnected before a full message arrived.
                debug!("client disconnected during logon intake");
                return;
            }
        }
    }
}
