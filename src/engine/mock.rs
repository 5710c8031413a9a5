//! Scripted in-memory engine for tests.

use super::{CodecEngine, EngineProgress};
use crate::error::{ConvertError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Inputs whose bytes start with this marker fail to encode
pub const CORRUPT_MARKER: &[u8] = b"CORRUPT";

pub struct MockEngine {
    files: Mutex<HashMap<String, Vec<u8>>>,
    commands: Mutex<Vec<Vec<String>>>,
    staged_names: Mutex<Vec<String>>,
    init_calls: AtomicUsize,
    failing_inits: AtomicUsize,
    ticks: Vec<f64>,
    empty_output: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            commands: Mutex::new(Vec::new()),
            staged_names: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            failing_inits: AtomicUsize::new(0),
            ticks: vec![0.25, 0.5, 0.75, 1.0],
            empty_output: false,
        }
    }

    /// The next `count` initialize calls fail
    pub fn failing_init(count: usize) -> Self {
        let engine = Self::new();
        engine.failing_inits.store(count, Ordering::SeqCst);
        engine
    }

    /// Every encode produces a zero-byte output
    pub fn with_empty_output() -> Self {
        Self {
            empty_output: true,
            ..Self::new()
        }
    }

    pub fn with_ticks(ticks: Vec<f64>) -> Self {
        Self {
            ticks,
            ..Self::new()
        }
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Names currently present in the working namespace
    pub fn resident(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every name ever passed to `stage_input`, in order
    pub fn staged_names(&self) -> Vec<String> {
        self.staged_names.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    /// Deterministic stand-in for encoding: tags the bytes with the output name's extension
    pub fn encode(output_name: &str, input: &[u8]) -> Vec<u8> {
        let ext = output_name.rsplit('.').next().unwrap_or_default();
        let mut out = format!("{}:", ext).into_bytes();
        out.extend(input.iter().take(input.len() / 2));
        out
    }
}

#[async_trait]
impl CodecEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_inits.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_inits.store(remaining - 1, Ordering::SeqCst);
            return Err(ConvertError::EngineInit("mock engine refused to start".into()));
        }
        Ok(())
    }

    async fn stage_input(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.staged_names.lock().unwrap().push(name.to_string());
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn execute(&self, args: &[String], on_progress: EngineProgress<'_>) -> Result<()> {
        self.commands.lock().unwrap().push(args.to_vec());

        let input_name = args.get(1).cloned().unwrap_or_default();
        let output_name = args.last().cloned().unwrap_or_default();
        let input = self
            .files
            .lock()
            .unwrap()
            .get(&input_name)
            .cloned()
            .ok_or_else(|| ConvertError::encode(format!("{}: No such file", input_name), None))?;

        for tick in &self.ticks {
            on_progress(*tick);
        }

        if input.starts_with(CORRUPT_MARKER) {
            return Err(ConvertError::encode(
                "mock encoder rejected input",
                Some(format!("{}: Invalid data found when processing input", input_name)),
            ));
        }

        let output = if self.empty_output {
            Vec::new()
        } else {
            Self::encode(&output_name, &input)
        };
        self.files.lock().unwrap().insert(output_name, output);
        Ok(())
    }

    async fn read_output(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ConvertError::Staging(format!("cannot read output {}", name)))
    }

    async fn remove_staged(&self, name: &str) -> Result<()> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }
}
