//! Line-delimited JSON session driving a pipeline over a transport.
//!
//! Used by `voxgate serve`: the embedding process writes `Message` lines
//! to stdin and reads `Event` lines from stdout. Pipeline events cross
//! from the worker's crossbeam channel into tokio through a dedicated
//! bridge thread.

use crate::audio::AudioBatch;
use crate::defaults;
use crate::error::{Result, VoxgateError};
use crate::pipeline::PipelineHandle;
use crate::protocol::{Event, Message};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tokio::sync::mpsc;

/// Transport carrying one JSON document per line in each direction.
#[async_trait::async_trait]
pub trait SessionTransport: Send {
    /// Next inbound line, `None` at end of stream.
    async fn next_line(&mut self) -> Result<Option<String>>;

    /// Write one outbound line.
    async fn send_line(&mut self, line: &str) -> Result<()>;
}

/// Stdin/stdout transport for `voxgate serve`.
pub struct StdioTransport {
    lines: Lines<BufReader<Stdin>>,
    writer: Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            writer: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionTransport for StdioTransport {
    async fn next_line(&mut self) -> Result<Option<String>> {
        self.lines
            .next_line()
            .await
            .map_err(|e| VoxgateError::Session {
                message: format!("failed to read from stdin: {}", e),
            })
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        let write = async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.writer.flush().await
        };
        write.await.map_err(|e| VoxgateError::Session {
            message: format!("failed to write to stdout: {}", e),
        })
    }
}

/// Scripted transport for tests: plays back a fixed set of inbound lines
/// and records everything sent.
pub struct MockTransport {
    inbound: VecDeque<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inbound: lines.into_iter().map(Into::into).collect(),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Clone the shared record of sent lines before handing the transport
    /// to a session.
    pub fn sent(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait::async_trait]
impl SessionTransport for MockTransport {
    async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.inbound.pop_front())
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(line.to_string());
        }
        Ok(())
    }
}

/// Drives `handle` over `transport` until end of input or ctrl-c.
///
/// Each inbound line is parsed as a [`Message`] and applied to the
/// pipeline; unparseable lines are reported back as `error` events and the
/// session continues. Pipeline events are written out as they arrive. On
/// end of input the pipeline is shut down (closing any open segment with a
/// manual-stop end) and remaining events are flushed before returning.
pub async fn run_session<T: SessionTransport>(
    mut handle: PipelineHandle,
    mut transport: T,
) -> Result<()> {
    let (bridge_tx, mut events) = mpsc::channel::<Event>(defaults::EVENT_CHANNEL_CAPACITY);
    let pipeline_events = handle.events();

    // Blocking bridge out of the worker's crossbeam channel. Exits when
    // the worker drops its sender or the session stops listening.
    let bridge = thread::Builder::new()
        .name("voxgate-bridge".to_string())
        .spawn(move || {
            while let Ok(event) = pipeline_events.recv() {
                if bridge_tx.blocking_send(Event::from(event)).is_err() {
                    break;
                }
            }
        })
        .map_err(|e| VoxgateError::Session {
            message: format!("failed to spawn bridge thread: {}", e),
        })?;

    let mut session_result: Result<()> = Ok(());

    loop {
        tokio::select! {
            line = transport.next_line() => match line {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match Message::from_json(trimmed) {
                        Ok(message) => {
                            if let Err(e) = apply_message(&mut handle, message) {
                                session_result = Err(e);
                                break;
                            }
                        }
                        Err(e) => {
                            let event = Event::Error {
                                message: format!("invalid message: {}", e),
                            };
                            if let Err(e) = send_event(&mut transport, &event).await {
                                session_result = Err(e);
                                break;
                            }
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    session_result = Err(e);
                    break;
                }
            },
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(e) = send_event(&mut transport, &event).await {
                        session_result = Err(e);
                        break;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Shut the worker down; the bridge then drains every queued event and
    // exits, which closes our side of the tokio channel.
    let (pulled, leftover) = handle.close();
    drop(leftover);
    while let Some(event) = events.recv().await {
        if send_event(&mut transport, &event).await.is_err() {
            break;
        }
    }
    // Events close() pulled aside while unblocking the worker never reached
    // the bridge; flush them last.
    for event in pulled {
        if send_event(&mut transport, &Event::from(event)).await.is_err() {
            break;
        }
    }
    let _ = bridge.join();

    session_result
}

fn apply_message(handle: &mut PipelineHandle, message: Message) -> Result<()> {
    match message {
        Message::Init => handle.init(),
        Message::AudioBatch {
            samples,
            timestamp_ms,
        } => match handle.send_batch(AudioBatch::new(samples, timestamp_ms)) {
            Ok(()) => Ok(()),
            Err(VoxgateError::BatchLength { expected, actual }) => {
                // A peer geometry bug; drop the batch, keep the session.
                eprintln!(
                    "voxgate: dropping malformed batch from peer: {} samples, expected {}",
                    actual, expected
                );
                Ok(())
            }
            Err(e) => Err(e),
        },
        Message::Reset => handle.reset(),
        Message::Stop => handle.stop(),
        Message::GetState => handle.query_state(),
    }
}

async fn send_event<T: SessionTransport>(transport: &mut T, event: &Event) -> Result<()> {
    let line = event.to_json().map_err(|e| VoxgateError::Protocol {
        message: format!("failed to serialize event: {}", e),
    })?;
    transport.send_line(&line).await
}
