use std::{future::Future, net::SocketAddr, time::Duration};

use anyhow::{Context, anyhow};
use tokio::{io::AsyncWriteExt, net::TcpStream, time::{sleep, timeout}};

/// How often the initial connect is retried before giving up.
///
/// Only the handshake is retried. A connection lost mid-stream ends the
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 0,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    pub async fn run<T, F, Fut>(&self, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < attempts => {
                    warn!("Attempt {}/{} failed: {:#}", attempt, attempts, error);
                    sleep(self.delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ConnectorConfig {
    pub const DEFAULT_HOST: &'static str = "192.168.4.1";
    pub const DEFAULT_PORT: u16 = 8888;

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_owned(),
            port: Self::DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

/// The single outbound stream to the device.
pub struct Connector {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Connector {
    pub async fn connect(config: &ConnectorConfig) -> anyhow::Result<Self> {
        let address = config.address();
        info!("Connecting to {}...", address);

        let stream = config
            .retry
            .run(|_| {
                let host = config.host.clone();
                let port = config.port;
                async move {
                    let stream =
                        timeout(config.connect_timeout, TcpStream::connect((host.as_str(), port)))
                            .await
                            .map_err(|_| anyhow!("timed out after {:?}", config.connect_timeout))??;
                    anyhow::Ok(stream)
                }
            })
            .await
            .with_context(|| format!("Unable to connect to {}", address))?;

        let peer = stream.peer_addr()?;
        info!("Connected to {}", peer);
        Ok(Self { stream, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn stream(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Closes the connection. Errors are logged, not returned, since this
    /// runs on the way out of every exit path.
    pub async fn shutdown(mut self) {
        if let Err(error) = self.stream.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.peer, error);
        }
        info!("Connection to {} closed", self.peer);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use tokio::{io::AsyncReadExt, net::TcpListener};

    use super::*;
    use crate::{IngestConfig, IngestSession, StopReason};

    fn local(port: u16) -> ConnectorConfig {
        ConnectorConfig {
            host: "127.0.0.1".to_owned(),
            port,
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                retries: 0,
                delay: Duration::ZERO,
            },
        }
    }

    #[tokio::test]
    async fn retry_stops_after_configured_attempts() {
        let policy = RetryPolicy {
            retries: 2,
            delay: Duration::ZERO,
        };
        let calls = Cell::new(0);
        let result: anyhow::Result<()> = policy
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Err(anyhow!("refused")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn retry_returns_first_success() {
        let policy = RetryPolicy {
            retries: 5,
            delay: Duration::ZERO,
        };
        let result = policy
            .run(|attempt| async move {
                if attempt < 3 {
                    Err(anyhow!("refused"))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
    }

    #[test]
    fn default_policy_makes_a_single_attempt() {
        assert_eq!(RetryPolicy::default().attempts(), 1);
        assert_eq!(ConnectorConfig::default().address(), "192.168.4.1:8888");
    }

    #[tokio::test]
    async fn connects_and_shuts_down() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let connector = Connector::connect(&local(port)).await.unwrap();
        let (mut server, _) = listener.accept().await.unwrap();
        assert_eq!(connector.peer().port(), port);

        connector.shutdown().await;
        let mut buf = [0_u8; 8];
        assert_eq!(server.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn device_stream_is_recorded() {
        let dir = tempfile::TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let device = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"aX=16384|aY=0|aZ=0|gX=0|gY=0|gZ=0\naX=32").await.unwrap();
            socket.write_all(b"768|aY=0|aZ=0|gX=0|gY=0|gZ=0\n").await.unwrap();
        });

        let mut connector = Connector::connect(&local(port)).await.unwrap();
        let mut session = IngestSession::new(IngestConfig {
            record_path: dir.path().join("live_data.csv"),
            live_trace: false,
            ..IngestConfig::default()
        });
        let (_tx, mut rx) = tokio::sync::watch::channel(false);

        let reason = session.run(connector.stream(), &mut rx).await.unwrap();
        connector.shutdown().await;
        device.await.unwrap();

        assert_eq!(reason, StopReason::EndOfStream);
        let contents = std::fs::read_to_string(dir.path().join("live_data.csv")).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert!(row.ends_with(",9.81,0.00,0.00,0.00,0.00,0.00"), "{row}");
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let error = Connector::connect(&local(port)).await.err().unwrap();
        assert!(error.to_string().contains("Unable to connect"));
    }
}
