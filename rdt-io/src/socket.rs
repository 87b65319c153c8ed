//! UDP socket wrapper
//!
//! Non-blocking datagram socket used by both transfer endpoints. The
//! protocol layers above only ever see opaque byte buffers and peer
//! addresses; socket-level failures are fatal, loss is not observable
//! here at all.

use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use thiserror::Error;

/// Socket configuration and I/O errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid socket address")]
    InvalidAddress,
}

/// Datagram socket for one transfer endpoint
///
/// The socket is non-blocking; `try_recv_from` folds `WouldBlock` into
/// `None` so callers poll without matching on error kinds.
#[derive(Debug)]
pub struct RdtSocket {
    inner: Socket,
}

impl RdtSocket {
    /// Create a socket bound to the given local address
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        tracing::debug!(addr = %addr, "datagram socket bound");
        Ok(RdtSocket { inner: socket })
    }

    /// Set the OS receive buffer size
    pub fn set_recv_buffer_size(&self, size: usize) -> Result<(), SocketError> {
        self.inner.set_recv_buffer_size(size)?;
        Ok(())
    }

    /// Get the local address this socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.inner
            .local_addr()?
            .as_socket()
            .ok_or(SocketError::InvalidAddress)
    }

    /// Send one datagram to `target`
    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        Ok(self.inner.send_to(buf, &target.into())?)
    }

    /// Receive one datagram if any is pending
    ///
    /// Returns `Ok(None)` when the socket has nothing to deliver right
    /// now; any other failure is a fatal socket error.
    pub fn try_recv_from(
        &self,
        buf: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        // socket2 receives into MaybeUninit; the buffer is caller-provided
        // and fully initialized, so the reinterpretation is sound.
        use std::mem::MaybeUninit;
        let uninit_buf = unsafe {
            std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut MaybeUninit<u8>, buf.len())
        };

        match self.inner.recv_from(uninit_buf) {
            Ok((n, addr)) => {
                let addr = addr.as_socket().ok_or(SocketError::InvalidAddress)?;
                Ok(Some((n, addr)))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(SocketError::Io(e)),
        }
    }

    /// Clone the socket handle, e.g. for a dedicated reader thread
    pub fn try_clone(&self) -> Result<Self, SocketError> {
        Ok(RdtSocket {
            inner: self.inner.try_clone()?,
        })
    }
}
