//! Command audit recorder.
//!
//! Rebuilds the commands a user runs from the raw keystroke and echo
//! streams of a terminal session and hands each completed command to an
//! [`AuditSink`]. The reconstruction is heuristic: keystrokes accumulate in a
//! buffer until a carriage return closes the line, and a TAB marks the next
//! output chunk as an autocomplete expansion that belongs to the same line.
//!
//! All audit state is owned by one task (see [`AuditHandle`]). Both session
//! pumps feed it through a bounded channel, and a full or closed channel only
//! drops audit events; it never slows down or fails the bridge.

pub mod ascii;
pub mod noise;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use noise::NoisePattern;

use ascii::{BS, CR, HASH, HT};

/// Tracing target of emitted command records.
pub const AUDIT_TARGET: &str = "ptybridge::audit";

/// Channel capacity between the pumps and the audit task.
const AUDIT_CHANNEL_CAPACITY: usize = 256;

/// Which way a chunk is flowing through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Slave output on its way to the master (echoes, command output).
    Send,
    /// Master input on its way to the slave (keystrokes).
    Receive,
}

/// Audit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Identity attached to every record.
    pub user: String,

    /// Prompt strings removed from recorded commands.
    pub prompts: Vec<String>,

    /// Chunks that are skipped entirely.
    pub noise: Vec<NoisePattern>,

    /// Drop the last buffered byte on backspace. Off by default, in which
    /// case backspace leaves the buffer untouched.
    pub erase_on_backspace: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            prompts: vec!["sh-4.3#".to_string()],
            noise: noise::default_patterns(),
            erase_on_backspace: false,
        }
    }
}

/// A command reconstructed from the keystroke stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Configured audit identity.
    pub user: String,
    /// Command line with prompts removed.
    pub command: String,
}

/// Destination for completed audit records.
pub trait AuditSink: Send + Sync {
    /// Store or emit one record. Must not block for long.
    fn record(&self, record: &AuditRecord);
}

/// Emits each record as an info-level tracing event on [`AUDIT_TARGET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        tracing::info!(
            target: AUDIT_TARGET,
            user = %record.user,
            command = %record.command,
            "msg={}",
            record.command
        );
    }
}

/// The audit state machine.
#[derive(Debug, Clone)]
pub struct Auditor {
    config: AuditConfig,
    buffer: Vec<u8>,
    wait_for_autocomplete: bool,
}

impl Auditor {
    /// Creates an auditor with an empty buffer.
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            wait_for_autocomplete: false,
        }
    }

    /// Bytes collected toward the command in progress.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the next output chunk will be folded into the buffer.
    pub fn is_waiting_for_autocomplete(&self) -> bool {
        self.wait_for_autocomplete
    }

    /// Feeds one chunk and returns the command it completed, if any.
    pub fn record(&mut self, direction: Direction, chunk: &[u8]) -> Option<AuditRecord> {
        if noise::is_noise(&self.config.noise, direction, chunk) {
            return None;
        }

        match direction {
            Direction::Send => {
                self.on_send(chunk);
                None
            }
            Direction::Receive => self.on_receive(chunk),
        }
    }

    fn on_send(&mut self, chunk: &[u8]) {
        if self.wait_for_autocomplete {
            self.wait_for_autocomplete = false;
            self.buffer.extend_from_slice(chunk);
        }

        if chunk.len() > 1 && chunk[0] != HASH {
            tracing::debug!(
                user = %self.config.user,
                output = %ascii::render(chunk),
                "terminal output"
            );
        }
    }

    fn on_receive(&mut self, chunk: &[u8]) -> Option<AuditRecord> {
        if chunk.is_empty() {
            return None;
        }

        tracing::debug!(
            user = %self.config.user,
            input = %ascii::render(chunk),
            "terminal input"
        );

        let last = chunk.len() - 1;
        let mut completed = None;

        for (i, &byte) in chunk.iter().enumerate() {
            match byte {
                HT => self.wait_for_autocomplete = true,
                BS => {
                    if self.config.erase_on_backspace {
                        self.buffer.pop();
                    }
                }
                CR => {
                    if i == last && !self.buffer.is_empty() {
                        completed = Some(self.complete());
                    } else if i == 0 {
                        tracing::debug!("input starts with a newline, skipping chunk");
                        return None;
                    }
                }
                _ => {
                    tracing::trace!(byte, "buffered input byte");
                    self.buffer.push(byte);
                }
            }
        }

        completed
    }

    /// Turns the buffer into a record and clears it.
    fn complete(&mut self) -> AuditRecord {
        let mut command = String::from_utf8_lossy(&self.buffer).into_owned();
        for prompt in self.config.prompts.iter().filter(|p| !p.is_empty()) {
            command = command.replace(prompt.as_str(), "");
        }
        self.buffer.clear();

        AuditRecord {
            user: self.config.user.clone(),
            command,
        }
    }
}

struct AuditEvent {
    direction: Direction,
    bytes: Vec<u8>,
}

/// Sending side of a running audit task.
///
/// Cheap to clone; the task ends once every handle is dropped.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEvent>,
}

impl AuditHandle {
    /// Spawns the task that owns `auditor` and forwards records to `sink`.
    pub fn spawn(mut auditor: Auditor, sink: Arc<dyn AuditSink>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<AuditEvent>(AUDIT_CHANNEL_CAPACITY);

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(record) = auditor.record(event.direction, &event.bytes) {
                    sink.record(&record);
                }
            }
            tracing::debug!("Audit task ended");
        });

        (Self { tx }, task)
    }

    /// Queues a chunk for auditing without waiting.
    ///
    /// Returns false if the event was dropped.
    pub fn record(&self, direction: Direction, bytes: &[u8]) -> bool {
        let event = AuditEvent {
            direction,
            bytes: bytes.to_vec(),
        };

        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(?direction, "Audit channel full, dropping chunk");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(?direction, "Audit task gone, dropping chunk");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn auditor() -> Auditor {
        Auditor::new(AuditConfig {
            user: "alice".to_string(),
            ..AuditConfig::default()
        })
    }

    #[derive(Default)]
    struct CollectingSink {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl AuditSink for CollectingSink {
        fn record(&self, record: &AuditRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    #[test]
    fn test_command_completed_by_trailing_cr() {
        let mut auditor = auditor();

        let record = auditor.record(Direction::Receive, b"ls\r").unwrap();
        assert_eq!(record.command, "ls");
        assert_eq!(record.user, "alice");
        assert!(auditor.buffer().is_empty());
    }

    #[test]
    fn test_keystrokes_accumulate_across_chunks() {
        let mut auditor = auditor();

        assert!(auditor.record(Direction::Receive, b"l").is_none());
        assert!(auditor.record(Direction::Receive, b"s").is_none());
        assert!(auditor.record(Direction::Receive, b" -la").is_none());
        assert_eq!(auditor.buffer(), b"ls -la");

        let record = auditor.record(Direction::Receive, b"\r").unwrap();
        assert_eq!(record.command, "ls -la");
    }

    #[test]
    fn test_prompt_removed_from_record() {
        let mut auditor = auditor();

        let record = auditor
            .record(Direction::Receive, b"sh-4.3#pwd\r")
            .unwrap();
        assert_eq!(record.command, "pwd");
    }

    #[test]
    fn test_leading_cr_discards_chunk() {
        let mut auditor = auditor();
        auditor.record(Direction::Receive, b"ec");

        assert!(auditor.record(Direction::Receive, b"\rx").is_none());
        assert_eq!(auditor.buffer(), b"ec");
    }

    #[test]
    fn test_lone_cr_with_empty_buffer_emits_nothing() {
        let mut auditor = auditor();
        assert!(auditor.record(Direction::Receive, b"\r").is_none());
        assert!(auditor.buffer().is_empty());
    }

    #[test]
    fn test_cr_in_middle_is_dropped() {
        let mut auditor = auditor();
        assert!(auditor.record(Direction::Receive, b"a\rb").is_none());
        assert_eq!(auditor.buffer(), b"ab");
    }

    #[test]
    fn test_tab_folds_next_output_into_buffer() {
        let mut auditor = auditor();

        auditor.record(Direction::Receive, b"cat /et\t");
        assert!(auditor.is_waiting_for_autocomplete());
        assert_eq!(auditor.buffer(), b"cat /et");

        auditor.record(Direction::Send, b"c/");
        assert!(!auditor.is_waiting_for_autocomplete());

        let record = auditor.record(Direction::Receive, b"hosts\r").unwrap();
        assert_eq!(record.command, "cat /etc/hosts");
    }

    #[test]
    fn test_output_ignored_without_tab() {
        let mut auditor = auditor();
        auditor.record(Direction::Send, b"total 0\r\n");
        assert!(auditor.buffer().is_empty());
    }

    #[test]
    fn test_backspace_keeps_buffer_by_default() {
        let mut auditor = auditor();
        auditor.record(Direction::Receive, b"lsx\x08");
        assert_eq!(auditor.buffer(), b"lsx");
    }

    #[test]
    fn test_backspace_erases_when_enabled() {
        let mut auditor = Auditor::new(AuditConfig {
            erase_on_backspace: true,
            ..AuditConfig::default()
        });
        auditor.record(Direction::Receive, b"lsx\x08");
        assert_eq!(auditor.buffer(), b"ls");

        auditor.record(Direction::Receive, b"\x08\x08\x08");
        assert!(auditor.buffer().is_empty());
    }

    #[test]
    fn test_bare_crlf_changes_nothing() {
        let mut auditor = auditor();
        auditor.record(Direction::Receive, b"ls");

        assert!(auditor.record(Direction::Receive, b"\r\n").is_none());
        assert!(auditor.record(Direction::Send, b"\r\n").is_none());
        assert_eq!(auditor.buffer(), b"ls");
    }

    #[test]
    fn test_prompt_echo_does_not_consume_autocomplete() {
        let mut auditor = auditor();
        auditor.record(Direction::Receive, b"\t");

        auditor.record(Direction::Send, b"\r\nsh-4.3# ");
        assert!(auditor.is_waiting_for_autocomplete());
        assert!(auditor.buffer().is_empty());
    }

    #[test]
    fn test_custom_prompts() {
        let mut auditor = Auditor::new(AuditConfig {
            prompts: vec!["user@host:~$ ".to_string(), String::new()],
            ..AuditConfig::default()
        });

        let record = auditor
            .record(Direction::Receive, b"user@host:~$ whoami\r")
            .unwrap();
        assert_eq!(record.command, "whoami");
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        TracingAuditSink.record(&AuditRecord {
            user: "bob".to_string(),
            command: "uptime".to_string(),
        });
    }

    #[tokio::test]
    async fn test_audit_task_forwards_records() {
        let sink = Arc::new(CollectingSink::default());
        let (handle, task) = AuditHandle::spawn(auditor(), sink.clone());

        assert!(handle.record(Direction::Receive, b"uname -a"));
        assert!(handle.record(Direction::Send, b"uname -a"));
        assert!(handle.record(Direction::Receive, b"\r"));
        drop(handle);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("audit task did not stop")
            .unwrap();

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].command, "uname -a");
    }
}
