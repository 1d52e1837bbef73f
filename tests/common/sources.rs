//! Scripted data source for integration tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flowdash::error::Result;
use flowdash::feed::{DataSource, HistoryRange, HistoryRecord, LiveSample};
use serde_json::Value;

/// A source serving a fixed schema and a queue of live samples.
///
/// The queue's last sample repeats once drained, so the poll loop can keep
/// ticking for as long as a test needs. Every live fetch is counted, which
/// lets tests assert that pausing really suspends fetch issuance.
pub struct ScriptedSource {
    schema: Value,
    samples: VecDeque<LiveSample>,
    last: Option<LiveSample>,
    history: Vec<HistoryRecord>,
    pub live_fetches: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(schema: Value, samples: Vec<LiveSample>) -> Self {
        Self {
            schema,
            samples: samples.into(),
            last: None,
            history: Vec::new(),
            live_fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryRecord>) -> Self {
        self.history = history;
        self
    }

    /// Counter handle to observe fetch issuance from the test thread
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        self.live_fetches.clone()
    }
}

impl DataSource for ScriptedSource {
    fn fetch_schema(&mut self) -> Result<Value> {
        Ok(self.schema.clone())
    }

    fn fetch_live(&mut self) -> Result<LiveSample> {
        self.live_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(sample) = self.samples.pop_front() {
            self.last = Some(sample.clone());
            return Ok(sample);
        }
        Ok(self.last.clone().unwrap_or_default())
    }

    fn fetch_history(&mut self, _range: &HistoryRange) -> Result<Vec<HistoryRecord>> {
        Ok(self.history.clone())
    }

    fn export_csv(&mut self, _: &HistoryRange, _: Option<&[String]>) -> Result<Vec<u8>> {
        Ok(b"timestamp\n".to_vec())
    }

    fn set_token(&mut self, _: Option<String>) {}
}
