//! Blocking TCP transport for coded frames
//!
//! One connection carries one frame. The sender writes the frame as text
//! (`'0'`/`'1'` characters, not packed bytes), closes its write half, and
//! blocks for a short acknowledgment. The listener reads the whole frame,
//! acknowledges it, and closes.

use bitlink_core::Bits;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{LinkError, Result};

/// Acknowledgment text sent for every received frame
pub const ACK: &str = "RECEIVED";

/// Upper bound on the acknowledgment read by the sender
pub const MAX_ACK_BYTES: usize = 1024;

/// Upper bound on a frame accepted by the listener
pub const MAX_FRAME_CHARS: usize = 1 << 20;

/// Sending side of the transport
#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: String,
    timeout: Duration,
}

impl TcpTransport {
    /// Create a transport targeting `host:port`
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{}:{}", host, port),
            timeout: Duration::from_secs(5),
        }
    }

    /// Set the connect, read and write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one frame and wait for the acknowledgment
    pub fn send(&self, frame: &Bits) -> Result<String> {
        let target = self
            .addr
            .to_socket_addrs()
            .map_err(|e| LinkError::transport(&self.addr, e))?
            .next()
            .ok_or_else(|| LinkError::Config {
                msg: format!("{} did not resolve to any address", self.addr),
            })?;

        let io = |e| LinkError::transport(&self.addr, e);
        let mut stream = TcpStream::connect_timeout(&target, self.timeout).map_err(io)?;
        stream.set_read_timeout(Some(self.timeout)).map_err(io)?;
        stream.set_write_timeout(Some(self.timeout)).map_err(io)?;

        stream.write_all(frame.to_string().as_bytes()).map_err(io)?;
        stream.shutdown(Shutdown::Write).map_err(io)?;
        debug!("Wrote {} bits to {}", frame.len(), self.addr);

        let mut ack = Vec::with_capacity(MAX_ACK_BYTES);
        Read::by_ref(&mut stream)
            .take(MAX_ACK_BYTES as u64)
            .read_to_end(&mut ack)
            .map_err(io)?;
        let ack = String::from_utf8_lossy(&ack).into_owned();
        info!("Frame delivered to {}, ack {:?}", self.addr, ack);
        Ok(ack)
    }
}

/// Receiving side of the transport
#[derive(Debug)]
pub struct FrameListener {
    listener: TcpListener,
    timeout: Duration,
}

impl FrameListener {
    /// Listen on `addr` (e.g. `"0.0.0.0:8888"`, or port 0 for any free port)
    pub fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| LinkError::transport(addr, e))?;
        Ok(Self {
            listener,
            timeout: Duration::from_secs(5),
        })
    }

    /// Set the read and write timeout applied to each accepted connection
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Block for the next frame, acknowledge it, and parse it
    ///
    /// The acknowledgment goes out before the payload is validated, so a
    /// sender is never left waiting on a malformed frame. A peer that does
    /// not finish its frame within the timeout gets no acknowledgment.
    ///
    /// `LinkError::Io` means the listening socket itself failed; every other
    /// error concerns this one connection only.
    pub fn accept_frame(&self) -> Result<(Bits, SocketAddr)> {
        let (mut stream, peer) = self.listener.accept()?;
        let io = |e| LinkError::transport(peer.to_string(), e);
        stream.set_read_timeout(Some(self.timeout)).map_err(io)?;
        stream.set_write_timeout(Some(self.timeout)).map_err(io)?;

        let mut payload = Vec::new();
        Read::by_ref(&mut stream)
            .take(MAX_FRAME_CHARS as u64 + 1)
            .read_to_end(&mut payload)
            .map_err(io)?;
        stream.write_all(ACK.as_bytes()).map_err(io)?;
        drop(stream);

        if payload.len() > MAX_FRAME_CHARS {
            return Err(LinkError::FrameTooLarge {
                limit: MAX_FRAME_CHARS,
            });
        }
        let text = String::from_utf8_lossy(&payload);
        let bits = Bits::parse(text.trim())?;
        debug!("Accepted {} bits from {}", bits.len(), peer);
        Ok((bits, peer))
    }

    /// Hand frames to `on_frame` until `limit` have been delivered
    ///
    /// Failures confined to one connection are logged and skipped. Only a
    /// failure of the listening socket ends the loop early.
    pub fn serve<F>(&self, limit: Option<usize>, mut on_frame: F) -> Result<usize>
    where
        F: FnMut(Bits, SocketAddr),
    {
        let mut delivered = 0;
        while limit.map_or(true, |limit| delivered < limit) {
            match self.accept_frame() {
                Ok((bits, peer)) => {
                    on_frame(bits, peer);
                    delivered += 1;
                }
                Err(LinkError::Io(e)) => return Err(LinkError::Io(e)),
                Err(e) => warn!("Skipping connection: {}", e),
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitlink_core::CoreError;
    use std::thread;

    #[test]
    fn test_loopback_frame_and_ack() {
        let listener = FrameListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || listener.accept_frame().map(|(bits, _)| bits));

        let frame = Bits::parse("0100000110000001101100000010110110001011").unwrap();
        let ack = TcpTransport::new("127.0.0.1", port).send(&frame).unwrap();
        assert_eq!(ack, ACK);
        assert_eq!(server.join().unwrap().unwrap(), frame);
    }

    #[test]
    fn test_non_binary_payload_still_acknowledged() {
        let listener = FrameListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || listener.accept_frame());

        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(b"01x1").unwrap();
        stream.shutdown(Shutdown::Write).unwrap();
        let mut ack = String::new();
        stream.read_to_string(&mut ack).unwrap();
        assert_eq!(ack, ACK);

        assert!(matches!(
            server.join().unwrap(),
            Err(LinkError::Core(CoreError::InvalidBit { position: 2, found: 'x' }))
        ));
    }

    #[test]
    fn test_silent_peer_times_out() {
        let listener = FrameListener::bind("127.0.0.1:0")
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || listener.accept_frame());

        // write half stays open, so the frame never ends
        let mut silent = TcpStream::connect(addr).unwrap();
        silent.write_all(b"0101").unwrap();

        assert!(matches!(
            server.join().unwrap(),
            Err(LinkError::Transport { .. })
        ));
        drop(silent);
    }

    #[test]
    fn test_serve_survives_bad_peers() {
        let listener = FrameListener::bind("127.0.0.1:0")
            .unwrap()
            .with_timeout(Duration::from_millis(300));
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let mut frames = Vec::new();
            let delivered = listener.serve(Some(1), |bits, _| frames.push(bits)).unwrap();
            (delivered, frames)
        });

        let mut silent = TcpStream::connect(addr).unwrap();
        silent.write_all(b"0101").unwrap();

        let mut oversized = TcpStream::connect(addr).unwrap();
        oversized.write_all(&vec![b'0'; MAX_FRAME_CHARS + 1]).unwrap();
        oversized.shutdown(Shutdown::Write).unwrap();

        let frame = Bits::parse("100010010001").unwrap();
        let ack = TcpTransport::new("127.0.0.1", addr.port()).send(&frame).unwrap();
        assert_eq!(ack, ACK);

        let (delivered, frames) = server.join().unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(frames, vec![frame]);

        let mut ack = String::new();
        oversized.read_to_string(&mut ack).unwrap();
        assert_eq!(ack, ACK);
        drop(silent);
    }

    #[test]
    fn test_connection_refused_is_reported() {
        let port = {
            let vacant = TcpListener::bind("127.0.0.1:0").unwrap();
            vacant.local_addr().unwrap().port()
        };
        let transport = TcpTransport::new("127.0.0.1", port).with_timeout(Duration::from_secs(1));
        let err = transport.send(&Bits::zeros(8)).unwrap_err();
        assert!(matches!(err, LinkError::ConnectionRefused { .. }), "got {:?}", err);
    }
}
