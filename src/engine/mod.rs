//! # Codec Engine Module
//!
//! The external encoding engine is a black box: it accepts byte buffers into a
//! private working namespace, runs a command-line-style argument list against
//! them and hands back the encoded bytes.
//!
//! - `CodecEngine`: the collaborator contract used by `Converter`
//! - `FfmpegEngine`: implementation driving the `ffmpeg` executable inside a
//!   temporary working directory

mod ffmpeg;
#[cfg(test)]
pub(crate) mod mock;

pub use ffmpeg::FfmpegEngine;

use crate::error::Result;
use async_trait::async_trait;

/// Progress sink for one `execute` call. Receives fractions in [0.0, 1.0].
pub type EngineProgress<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// A codec engine session with its own working namespace.
///
/// Staged names must be unique per call; the engine does not arbitrate
/// between overlapping executions that touch the same names.
#[async_trait]
pub trait CodecEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Prepares the engine. Calling it again after success is a no-op.
    async fn initialize(&self) -> Result<()>;

    /// Writes input bytes into the working namespace under `name`.
    async fn stage_input(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Runs a compiled argument list. `on_progress` is only invoked while this
    /// call is running.
    async fn execute(&self, args: &[String], on_progress: EngineProgress<'_>) -> Result<()>;

    /// Reads an output produced by a previous `execute`.
    async fn read_output(&self, name: &str) -> Result<Vec<u8>>;

    /// Removes a staged input or output. Removing a missing name is not an error.
    async fn remove_staged(&self, name: &str) -> Result<()>;
}
