//! Remote command listener.
//!
//! Accepts loopback TCP connections from companion tools (key-bind daemons,
//! scripts). Each connection carries one command line, which is appended to
//! the shared [`CommandQueue`] and acknowledged with `OK`. Connections are
//! served one at a time on a dedicated thread.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use g15_types::config::RemoteConfig;
use g15_types::error::{G15Error, Result};
use g15_types::queue::CommandQueue;

/// Maximum bytes in a single command line.
const MAX_LINE_LEN: usize = 1024;

/// How long a client may take to send its line.
const READ_TIMEOUT_SECS: u64 = 2;

/// Acknowledgement sent after a line is queued.
pub const ACK: &[u8] = b"OK\n";

/// Configuration for the remote command listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind.
    pub bind: String,
    /// Port to listen on (0 picks a free port).
    pub port: u16,
    /// Maximum accepted line length in bytes.
    pub max_line_len: usize,
    /// Per-connection read timeout.
    pub read_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::from(&RemoteConfig::default())
    }
}

impl From<&RemoteConfig> for ListenerConfig {
    fn from(remote: &RemoteConfig) -> Self {
        Self {
            bind: remote.bind.clone(),
            port: remote.port,
            max_line_len: MAX_LINE_LEN,
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

/// Remote listener bound to a shared command queue.
pub struct RemoteListener {
    config: ListenerConfig,
    queue: Arc<CommandQueue>,
}

impl RemoteListener {
    pub fn new(config: ListenerConfig, queue: Arc<CommandQueue>) -> Self {
        Self { config, queue }
    }

    /// Bind and start the accept thread.
    pub fn spawn(self) -> Result<ListenerHandle> {
        let listener = TcpListener::bind((self.config.bind.as_str(), self.config.port))
            .map_err(|e| {
                G15Error::Transport(format!(
                    "cannot listen on {}:{}: {e}",
                    self.config.bind, self.config.port
                ))
            })?;
        let addr = listener.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("g15-remote".into())
            .spawn(move || self.accept_loop(listener, &thread_stop))?;
        log::info!("remote command listener on {addr}");
        Ok(ListenerHandle {
            addr,
            stop,
            thread: Some(thread),
        })
    }

    fn accept_loop(&self, listener: TcpListener, stop: &AtomicBool) {
        for conn in listener.incoming() {
            if stop.load(Ordering::Acquire) {
                break;
            }
            match conn {
                Ok(stream) => {
                    if let Err(e) = self.serve(stream) {
                        log::debug!("remote connection dropped: {e}");
                    }
                },
                Err(e) => log::warn!("accept error: {e}"),
            }
        }
        log::debug!("remote listener stopped");
    }

    /// Read one line, queue it, acknowledge.
    fn serve(&self, mut stream: TcpStream) -> Result<()> {
        stream.set_read_timeout(Some(self.config.read_timeout))?;
        let mut raw = Vec::with_capacity(64);
        BufReader::new(stream.try_clone()?)
            .take(self.config.max_line_len as u64)
            .read_until(b'\n', &mut raw)?;
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        if line.is_empty() {
            return Ok(());
        }
        self.queue.push(line);
        stream.write_all(ACK)?;
        Ok(())
    }
}

/// Running listener. Dropping it stops the accept thread.
pub struct ListenerHandle {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting and join the thread.
    pub fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop.store(true, Ordering::Release);
        // Wake the blocking accept.
        let _ = TcpStream::connect(self.addr);
        let _ = thread.join();
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver;

    use g15_types::queue::LoopEvent;

    fn start() -> (ListenerHandle, Arc<CommandQueue>, Receiver<LoopEvent>) {
        let (queue, events) = CommandQueue::new();
        let config = ListenerConfig {
            port: 0,
            ..ListenerConfig::default()
        };
        let handle = RemoteListener::new(config, Arc::clone(&queue)).spawn().unwrap();
        (handle, queue, events)
    }

    fn send(addr: SocketAddr, payload: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(payload).unwrap();
        client.shutdown(std::net::Shutdown::Write).unwrap();
        let mut reply = String::new();
        let _ = client.read_to_string(&mut reply);
        reply
    }

    #[test]
    fn default_config_uses_remote_port() {
        let config = ListenerConfig::default();
        assert_eq!(config.port, g15_types::config::DEFAULT_REMOTE_PORT);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.max_line_len, MAX_LINE_LEN);
    }

    #[test]
    fn line_is_queued_and_acknowledged() {
        let (handle, queue, events) = start();
        let reply = send(handle.local_addr(), b"BUTTON G3\n");
        assert_eq!(reply, "OK\n");
        events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(queue.pop().as_deref(), Some("BUTTON G3"));
    }

    #[test]
    fn line_without_newline_is_accepted() {
        let (handle, queue, _events) = start();
        assert_eq!(send(handle.local_addr(), b"BUTTON LCD1"), "OK\n");
        assert_eq!(queue.pop().as_deref(), Some("BUTTON LCD1"));
    }

    #[test]
    fn empty_connection_is_dropped_silently() {
        let (handle, queue, _events) = start();
        assert_eq!(send(handle.local_addr(), b""), "");
        assert_eq!(send(handle.local_addr(), b"   \n"), "");
        assert!(queue.is_empty());
    }

    #[test]
    fn only_first_line_is_taken() {
        let (handle, queue, _events) = start();
        send(handle.local_addr(), b"BUTTON M1\nBUTTON M2\n");
        assert_eq!(queue.pop().as_deref(), Some("BUTTON M1"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn sequential_clients_keep_order() {
        let (handle, queue, _events) = start();
        for name in ["G1", "G2", "G3"] {
            send(handle.local_addr(), format!("BUTTON {name}\n").as_bytes());
        }
        let got: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(got, vec!["BUTTON G1", "BUTTON G2", "BUTTON G3"]);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (mut handle, _queue, _events) = start();
        handle.shutdown();
        handle.shutdown();
    }

    #[test]
    fn bind_conflict_is_transport_error() {
        let (handle, queue, _events) = start();
        let config = ListenerConfig {
            port: handle.local_addr().port(),
            ..ListenerConfig::default()
        };
        let err = RemoteListener::new(config, queue).spawn().err().unwrap();
        assert!(matches!(err, G15Error::Transport(_)));
    }
}
