use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Exact payload that ends a rampage.
pub const CANCEL_PAYLOAD: &str = "Gifts Collected!";
/// Datagrams that fill this buffer are treated as oversized.
const RECV_BUF: usize = 512;
/// How often the receive loop checks for shutdown.
const POLL_TIMEOUT: Duration = Duration::from_millis(250);

/// Requests the outside world can make of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Deescalate,
}

/// Decode one datagram. Anything but the exact cancel text is ignored.
pub fn parse_command(payload: &[u8]) -> Option<Command> {
    if payload.len() >= RECV_BUF {
        return None;
    }
    let text = std::str::from_utf8(payload).ok()?;
    (text.trim() == CANCEL_PAYLOAD).then_some(Command::Deescalate)
}

/// Background UDP receiver. Stops and joins on drop.
pub struct SignalListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl SignalListener {
    /// Bind `addr` and forward decoded commands to `tx`.
    pub fn spawn(addr: impl Into<SocketAddr>, tx: Sender<Command>) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr.into())?;
        socket.set_read_timeout(Some(POLL_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name("signal-listener".into())
            .spawn(move || receive_loop(socket, tx, thread_stop))?;

        Ok(Self {
            stop,
            handle: Some(handle),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn receive_loop(socket: UdpSocket, tx: Sender<Command>, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; RECV_BUF];
    while !stop.load(Ordering::Relaxed) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => {
                log::warn!("Signal listener receive failed: {e}");
                continue;
            }
        };

        match parse_command(&buf[..len]) {
            Some(cmd) => {
                log::info!("Received {cmd:?} from {from}");
                if tx.send(cmd).is_err() {
                    log::debug!("Engine gone, signal listener exiting");
                    return;
                }
            }
            None => log::debug!("Ignored {len}-byte datagram from {from}"),
        }
    }
}
