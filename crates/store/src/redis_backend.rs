use crate::backend::{
    CounterStore, Subscription, TokenCounts, TokenPublisher, TokenSubscriber, SUBSCRIPTION_BUFFER,
};
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use wordminer_protocol::{word_counts_key, WireToken, ALL_LANGUAGES, LAST_REPO_KEY, WORD_STREAM_CHANNEL};

/// How long the pub/sub reader blocks before checking whether anyone still listens.
const SUBSCRIPTION_POLL: Duration = Duration::from_millis(500);

/// Where the Redis server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Redis hashes for the counters and Redis pub/sub for the transport.
#[derive(Clone)]
pub struct RedisBackend {
    client: redis::Client,
    connection: MultiplexedConnection,
    channel: String,
}

impl RedisBackend {
    /// Connect and PING once; an unreachable server is reported as `Unavailable`.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let url = config.url();
        let client =
            redis::Client::open(url.as_str()).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(format!("{url}: {e}")))?;
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{url}: {e}")))?;

        log::info!("Connected to Redis at {}:{}", config.host, config.port);
        Ok(Self {
            client,
            connection,
            channel: WORD_STREAM_CHANNEL.to_string(),
        })
    }
}

#[async_trait]
impl CounterStore for RedisBackend {
    async fn increment_field(&self, key: &str, field: &str) -> Result<u64> {
        let mut con = self.connection.clone();
        let value: u64 = redis::cmd("HINCRBY")
            .arg(key)
            .arg(field)
            .arg(1)
            .query_async(&mut con)
            .await?;
        Ok(value)
    }

    async fn get_all_fields(&self, key: &str) -> Result<HashMap<String, u64>> {
        let mut con = self.connection.clone();
        let fields: HashMap<String, u64> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut con)
            .await?;
        Ok(fields)
    }

    async fn record_token(&self, token: &WireToken) -> Result<TokenCounts> {
        let mut con = self.connection.clone();
        let (language, all): (u64, u64) = redis::pipe()
            .atomic()
            .cmd("HINCRBY")
            .arg(word_counts_key(&token.language))
            .arg(&token.word)
            .arg(1)
            .cmd("HINCRBY")
            .arg(word_counts_key(ALL_LANGUAGES))
            .arg(&token.word)
            .arg(1)
            .cmd("SET")
            .arg(LAST_REPO_KEY)
            .arg(&token.repository)
            .ignore()
            .query_async(&mut con)
            .await?;
        Ok(TokenCounts { language, all })
    }

    async fn set_last_repo(&self, repository: &str) -> Result<()> {
        let mut con = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(LAST_REPO_KEY)
            .arg(repository)
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn last_repo(&self) -> Result<Option<String>> {
        let mut con = self.connection.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(LAST_REPO_KEY)
            .query_async(&mut con)
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl TokenPublisher for RedisBackend {
    async fn publish(&self, payload: &str) -> Result<()> {
        let mut con = self.connection.clone();
        let _: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut con)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TokenSubscriber for RedisBackend {
    /// Pub/sub needs a dedicated connection; it is driven from a blocking thread
    /// that forwards payloads until the subscription is dropped. Reads time out
    /// every `SUBSCRIPTION_POLL`, so a quiet channel does not keep the thread
    /// (and runtime shutdown) waiting.
    async fn subscribe(&self) -> Result<Subscription> {
        let client = self.client.clone();
        let channel = self.channel.clone();
        let (ready_tx, ready_rx) = oneshot::channel::<redis::RedisResult<()>>();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        tokio::task::spawn_blocking(move || {
            let mut con = match client.get_connection() {
                Ok(con) => con,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            if let Err(err) = con.set_read_timeout(Some(SUBSCRIPTION_POLL)) {
                let _ = ready_tx.send(Err(err));
                return;
            }
            let mut pubsub = con.as_pubsub();
            if let Err(err) = pubsub.subscribe(&channel) {
                let _ = ready_tx.send(Err(err));
                return;
            }
            let _ = ready_tx.send(Ok(()));

            loop {
                let message = match pubsub.get_message() {
                    Ok(message) => message,
                    Err(err) if err.is_timeout() => {
                        if tx.is_closed() {
                            log::debug!("Subscription on {channel} dropped; closing reader");
                            break;
                        }
                        continue;
                    }
                    Err(err) => {
                        log::warn!("Redis subscription on {channel} ended: {err}");
                        break;
                    }
                };
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        log::debug!("Skipping non-text payload on {channel}: {err}");
                        continue;
                    }
                };
                if tx.blocking_send(payload).is_err() {
                    break;
                }
            }
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                log::info!("Subscribed to Redis channel: {}", self.channel);
                Ok(Subscription::new(rx))
            }
            Ok(Err(err)) => Err(StoreError::Unavailable(err.to_string())),
            Err(_) => Err(StoreError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc as std_mpsc;

    /// Reads one RESP array command and returns its arguments.
    fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let count: usize = line.trim().strip_prefix('*')?.parse().ok()?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            line.clear();
            reader.read_line(&mut line).ok()?;
            let len: usize = line.trim().strip_prefix('$')?.parse().ok()?;
            let mut bulk = vec![0u8; len + 2];
            reader.read_exact(&mut bulk).ok()?;
            bulk.truncate(len);
            args.push(String::from_utf8(bulk).ok()?);
        }
        Some(args)
    }

    /// A Redis stand-in on its own OS threads that answers PING and SUBSCRIBE,
    /// acknowledges everything else and never publishes.
    fn quiet_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                std::thread::spawn(move || {
                    let mut writer = stream.try_clone().unwrap();
                    let mut reader = BufReader::new(stream);
                    while let Some(args) = read_command(&mut reader) {
                        let name = args.first().map(|a| a.to_ascii_uppercase());
                        let reply = match name.as_deref() {
                            Some("PING") => "+PONG\r\n".to_string(),
                            Some("SUBSCRIBE") => {
                                let channel = args.get(1).cloned().unwrap_or_default();
                                format!(
                                    "*3\r\n$9\r\nsubscribe\r\n${}\r\n{}\r\n:1\r\n",
                                    channel.len(),
                                    channel
                                )
                            }
                            _ => "+OK\r\n".to_string(),
                        };
                        if writer.write_all(reply.as_bytes()).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        port
    }

    #[test]
    fn url_includes_database() {
        let config = RedisConfig {
            host: "redis".to_string(),
            ..RedisConfig::default()
        };
        assert_eq!(config.url(), "redis://redis:6379/0");
    }

    #[test]
    fn dropped_subscription_releases_runtime_shutdown() {
        let config = RedisConfig {
            host: "127.0.0.1".to_string(),
            port: quiet_server(),
            db: 0,
        };
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let backend = RedisBackend::connect(&config).await.unwrap();
            let subscription = backend.subscribe().await.unwrap();
            drop(subscription);
        });

        let (done_tx, done_rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            drop(runtime);
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
            "runtime shutdown waited on the pub/sub reader"
        );
    }
}
