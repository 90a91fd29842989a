//! Establishing and owning the TCP session.

use crate::retry::RetryPolicy;
use crate::role::RemoteRole;
use logunify_log::{RecordReader, RecordWriter, StreamOrigin};
use std::io;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Listening address could not be bound
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying cause
        #[source]
        source: io::Error,
    },

    /// Accepting the peer failed
    #[error("Accept on {addr} failed: {source}")]
    Accept {
        /// Listening address
        addr: String,
        /// Underlying cause
        #[source]
        source: io::Error,
    },

    /// Connecting gave up after the policy's attempt limit
    #[error("Could not connect to {addr} after {attempts} attempts")]
    RetriesExhausted {
        /// Target address
        addr: String,
        /// Attempts made
        attempts: u32,
    },

    /// Shutdown was requested before a session was established
    #[error("Cancelled while establishing session")]
    Cancelled,

    /// The session's stream was already handed out or closed
    #[error("Session stream already taken")]
    StreamTaken,

    /// Socket failure on an established session
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An established TCP session with one peer
#[derive(Debug)]
pub struct Session {
    peer: SocketAddr,
    stream: Option<TcpStream>,
}

impl Session {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            peer,
            stream: Some(stream),
        }
    }

    /// Establish a session in the given role
    ///
    /// # Errors
    ///
    /// Returns error if binding or accepting fails, if connecting exhausts
    /// the retry policy, or if `cancel` fires first
    pub async fn establish(
        role: &RemoteRole,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<Self, TransportError> {
        match role {
            RemoteRole::Connect(addr) => connect_with_retry(addr, policy, cancel).await,
            RemoteRole::Listen(addr) => {
                let listener = RemoteListener::bind(addr).await?;
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(TransportError::Cancelled),
                    session = listener.accept_one() => session,
                }
            }
        }
    }

    /// Address of the peer
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Whether the stream is still owned by the session
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Take the stream for reading records
    ///
    /// # Errors
    ///
    /// Returns error if the stream was already taken or closed
    pub fn take_reader(&mut self) -> Result<RecordReader<TcpStream>, TransportError> {
        let stream = self.stream.take().ok_or(TransportError::StreamTaken)?;
        Ok(RecordReader::new(stream, StreamOrigin::Remote))
    }

    /// Take the stream for writing records
    ///
    /// # Errors
    ///
    /// Returns error if the stream was already taken or closed
    pub fn take_writer(&mut self) -> Result<RecordWriter<TcpStream>, TransportError> {
        let stream = self.stream.take().ok_or(TransportError::StreamTaken)?;
        Ok(RecordWriter::new(stream))
    }

    /// Shut the socket down; a no-op once closed or taken
    ///
    /// # Errors
    ///
    /// Returns error if the shutdown fails
    pub async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
            debug!(peer = %self.peer, "session closed");
        }
        Ok(())
    }
}

/// A bound listener that accepts a single peer
#[derive(Debug)]
pub struct RemoteListener {
    addr: String,
    listener: TcpListener,
}

impl RemoteListener {
    /// Bind the listening address
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!(addr, "waiting for remote peer");
        Ok(Self {
            addr: addr.to_string(),
            listener,
        })
    }

    /// Locally bound address
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot report it
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one peer and stop listening
    ///
    /// # Errors
    ///
    /// Returns error if accepting fails
    pub async fn accept_one(self) -> Result<Session, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|source| TransportError::Accept {
                addr: self.addr.clone(),
                source,
            })?;
        info!(%peer, "remote peer connected");
        Ok(Session::new(stream, peer))
    }
}

/// Bind `addr`, accept exactly one peer, then drop the listener
///
/// # Errors
///
/// Returns error if binding or accepting fails
pub async fn listen_once(addr: &str) -> Result<Session, TransportError> {
    RemoteListener::bind(addr).await?.accept_one().await
}

/// Connect to `addr`, waiting `policy.backoff` between failed attempts.
///
/// Failures are logged and retried; they only surface once the policy's
/// attempt limit is reached.
///
/// # Errors
///
/// Returns error if the attempt limit is reached or `cancel` fires
pub async fn connect_with_retry(
    addr: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Session, TransportError> {
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        let attempt = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            attempt = TcpStream::connect(addr) => attempt,
        };

        match attempt {
            Ok(stream) => {
                let peer = stream.peer_addr()?;
                info!(%peer, attempt = attempts, "connected to remote peer");
                return Ok(Session::new(stream, peer));
            }
            Err(error) => {
                warn!(addr, attempt = attempts, %error, "connection failed");
            }
        }

        if !policy.allows_retry(attempts) {
            return Err(TransportError::RetriesExhausted {
                addr: addr.to_string(),
                attempts,
            });
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            () = tokio::time::sleep(policy.backoff) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn free_addr() -> String {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_listen_accepts_one_peer() {
        let listener = RemoteListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(b"ping").await.unwrap();
        });

        let mut session = listener.accept_one().await.unwrap();
        client.await.unwrap();

        let _reader = session.take_reader().unwrap();
        assert!(!session.is_open());

        // Listener is gone after the single accept
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_retries_until_listener_appears() {
        let addr = free_addr().await;
        let policy = RetryPolicy::default().with_backoff(Duration::from_millis(20));
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let target = addr.clone();
        let connecting =
            tokio::spawn(async move { connect_with_retry(&target, &policy, &cancel).await });

        tokio::time::sleep(Duration::from_millis(120)).await;
        let listener = TcpListener::bind(&addr).await.unwrap();
        let (mut accepted, _) = listener.accept().await.unwrap();

        let mut session = connecting.await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(120));

        let mut writer_side = session.stream.take().unwrap();
        writer_side.write_all(b"hi").await.unwrap();
        let mut buf = [0u8; 2];
        accepted.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_backoff_spaces_attempts_two_seconds_apart() {
        let addr = free_addr().await;
        let policy = RetryPolicy::default().with_max_attempts(4);
        assert_eq!(policy.backoff, Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        let err = connect_with_retry(&addr, &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, TransportError::RetriesExhausted { attempts: 4, .. }));
        // Three waits between four attempts, and no wait after the last
        assert!(elapsed >= Duration::from_secs(6), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(8), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_limit() {
        let addr = free_addr().await;
        let policy = RetryPolicy::default()
            .with_backoff(Duration::from_millis(5))
            .with_max_attempts(3);

        let err = connect_with_retry(&addr, &policy, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::RetriesExhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_connect_cancelled() {
        let addr = free_addr().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = connect_with_retry(&addr, &RetryPolicy::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();
        let err = listen_once(&addr).await.unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let listener = RemoteListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });

        let mut session = listener.accept_one().await.unwrap();
        let _peer_stream = client.await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(matches!(session.take_writer(), Err(TransportError::StreamTaken)));
    }

    #[tokio::test]
    async fn test_establish_listen_role() {
        let addr = free_addr().await;
        let role = RemoteRole::Listen(addr.clone());
        let cancel = CancellationToken::new();

        let dialer = tokio::spawn(async move {
            let policy = RetryPolicy::default().with_backoff(Duration::from_millis(10));
            connect_with_retry(&addr, &policy, &CancellationToken::new()).await
        });

        let session = Session::establish(&role, &RetryPolicy::default(), &cancel).await.unwrap();
        assert!(session.is_open());
        assert!(dialer.await.unwrap().is_ok());
    }
}
