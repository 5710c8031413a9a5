//! FFmpeg-backed codec engine.
//!
//! The working namespace is a private temporary directory; staged names are
//! plain file names inside it and `ffmpeg` runs with that directory as its
//! current directory, so compiled commands never carry absolute paths.

use super::{CodecEngine, EngineProgress};
use crate::error::{ConvertError, Result};
use crate::platform::PlatformCommands;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const STDERR_TAIL_LINES: usize = 20;

/// Codec engine that shells out to `ffmpeg` / `ffprobe`
pub struct FfmpegEngine {
    ffmpeg_override: Option<PathBuf>,
    ffprobe_override: Option<PathBuf>,
    session: OnceCell<Session>,
}

struct Session {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    workspace: TempDir,
}

impl FfmpegEngine {
    pub fn new(ffmpeg_path: Option<PathBuf>, ffprobe_path: Option<PathBuf>) -> Self {
        Self {
            ffmpeg_override: ffmpeg_path,
            ffprobe_override: ffprobe_path,
            session: OnceCell::new(),
        }
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .get()
            .ok_or_else(|| ConvertError::EngineInit("engine used before initialize()".into()))
    }

    async fn start_session(&self) -> Result<Session> {
        let platform = PlatformCommands::instance();
        let ffmpeg = platform.resolve("ffmpeg", self.ffmpeg_override.as_deref());
        let ffprobe = platform.resolve("ffprobe", self.ffprobe_override.as_deref());

        let output = Command::new(&ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ConvertError::EngineInit(format!("failed to execute {}: {}", ffmpeg.display(), e))
            })?;

        if !output.status.success() {
            return Err(ConvertError::EngineInit(format!(
                "{} -version exited with {}",
                ffmpeg.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = version.lines().next() {
            info!("Codec engine ready: {}", first_line);
        }

        let workspace = tempfile::Builder::new()
            .prefix("media-converter-")
            .tempdir()
            .map_err(|e| ConvertError::EngineInit(format!("cannot create working directory: {}", e)))?;
        debug!("Engine working namespace: {}", workspace.path().display());

        Ok(Session {
            ffmpeg,
            ffprobe,
            workspace,
        })
    }

    /// Probe the duration of a staged input in seconds. Stills have none.
    async fn probe_duration(&self, session: &Session, name: &str) -> Option<f64> {
        let output = Command::new(&session.ffprobe)
            .current_dir(session.workspace.path())
            .args(["-v", "quiet", "-print_format", "json", "-show_format", name])
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            debug!("ffprobe could not read {}", name);
            return None;
        }

        parse_probe_duration(&output.stdout)
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Resolve a staged name inside the workspace, rejecting anything that could escape it
fn staged_path(workspace: &Path, name: &str) -> Result<PathBuf> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c: char| c == '/' || c == '\\')
        && !name.contains("..");
    if !valid {
        return Err(ConvertError::Staging(format!("invalid staged name: {:?}", name)));
    }
    Ok(workspace.join(name))
}

/// Extract `format.duration` from ffprobe JSON output
fn parse_probe_duration(stdout: &[u8]) -> Option<f64> {
    let info: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    info["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Parse one `-progress` line into a fraction of `duration_secs`.
///
/// `out_time_us` and `out_time_ms` both carry microseconds.
fn parse_progress_line(line: &str, duration_secs: Option<f64>) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "progress" if value == "end" => Some(1.0),
        "out_time_us" | "out_time_ms" => {
            let duration = duration_secs?;
            let micros = value.parse::<f64>().ok()?;
            Some((micros / 1_000_000.0 / duration).clamp(0.0, 1.0))
        }
        _ => None,
    }
}

#[async_trait]
impl CodecEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn initialize(&self) -> Result<()> {
        self.session
            .get_or_try_init(|| self.start_session())
            .await
            .map(|_| ())
    }

    async fn stage_input(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let session = self.session()?;
        let path = staged_path(session.workspace.path(), name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ConvertError::Staging(format!("cannot write {}: {}", name, e)))
    }

    async fn execute(&self, args: &[String], on_progress: EngineProgress<'_>) -> Result<()> {
        let session = self.session()?;

        // compiled commands start with `-i <input>`
        let duration = match args {
            [flag, input, ..] if flag == "-i" => self.probe_duration(session, input).await,
            _ => None,
        };

        debug!("Running {} {}", session.ffmpeg.display(), args.join(" "));

        let mut child = Command::new(&session.ffmpeg)
            .current_dir(session.workspace.path())
            .args(["-hide_banner", "-nostdin", "-y", "-loglevel", "error"])
            .args(["-progress", "pipe:1", "-nostats"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ConvertError::encode(format!("failed to execute {}: {}", session.ffmpeg.display(), e), None)
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConvertError::encode("ffmpeg stdout not captured", None))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConvertError::encode("ffmpeg stderr not captured", None))?;

        // drain stderr concurrently so a chatty encoder cannot block on a full pipe;
        // decoded lossily since file names and codec tags need not be UTF-8
        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer).await;
            String::from_utf8_lossy(&buffer).into_owned()
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut last = 0.0_f64;
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(fraction) = parse_progress_line(&line, duration) {
                if fraction >= last {
                    last = fraction;
                    on_progress(fraction);
                }
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            let lines: Vec<&str> = stderr_output.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            warn!("ffmpeg failed with {}", status);
            Err(ConvertError::encode(
                format!("ffmpeg exited with {}", status),
                Some(tail),
            ))
        }
    }

    async fn read_output(&self, name: &str) -> Result<Vec<u8>> {
        let session = self.session()?;
        let path = staged_path(session.workspace.path(), name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| ConvertError::Staging(format!("cannot read output {}: {}", name, e)))
    }

    async fn remove_staged(&self, name: &str) -> Result<()> {
        let session = self.session()?;
        let path = staged_path(session.workspace.path(), name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConvertError::Staging(format!("cannot remove {}: {}", name, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_path_rejects_escapes() {
        let root = Path::new("/tmp/ws");
        assert_eq!(staged_path(root, "input_1.png").unwrap(), root.join("input_1.png"));
        assert!(staged_path(root, "../etc/passwd").is_err());
        assert!(staged_path(root, "a/b.png").is_err());
        assert!(staged_path(root, "a\\b.png").is_err());
        assert!(staged_path(root, "").is_err());
    }

    #[test]
    fn test_parse_probe_duration() {
        let json = br#"{"format": {"filename": "in.mp4", "duration": "12.500000"}}"#;
        assert_eq!(parse_probe_duration(json), Some(12.5));

        let still = br#"{"format": {"filename": "in.png"}}"#;
        assert_eq!(parse_probe_duration(still), None);
        assert_eq!(parse_probe_duration(b"not json"), None);
    }

    #[test]
    fn test_parse_progress_line() {
        assert_eq!(parse_progress_line("out_time_us=5000000", Some(10.0)), Some(0.5));
        assert_eq!(parse_progress_line("out_time_ms=20000000", Some(10.0)), Some(1.0));
        assert_eq!(parse_progress_line("out_time_us=5000000", None), None);
        assert_eq!(parse_progress_line("progress=end", None), Some(1.0));
        assert_eq!(parse_progress_line("progress=continue", Some(3.0)), None);
        assert_eq!(parse_progress_line("frame=12", Some(3.0)), None);
    }

    #[tokio::test]
    async fn test_use_before_initialize_is_an_error() {
        let engine = FfmpegEngine::default();
        let err = engine.stage_input("a.png", b"x").await.unwrap_err();
        assert!(matches!(err, ConvertError::EngineInit(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_initialize() {
        let engine = FfmpegEngine::new(Some(PathBuf::from("/nonexistent/ffmpeg-binary")), None);
        let err = engine.initialize().await.unwrap_err();
        assert!(matches!(err, ConvertError::EngineInit(_)));
    }

    /// Stand-in `ffmpeg` / `ffprobe` shell scripts; `encode` runs for every
    /// invocation other than `-version`.
    #[cfg(unix)]
    fn scripted_engine(dir: &Path, encode: &str) -> FfmpegEngine {
        use std::os::unix::fs::PermissionsExt;

        let write_script = |name: &str, body: String| {
            let path = dir.join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        };

        let ffmpeg = write_script(
            "ffmpeg",
            format!(
                "#!/bin/sh\nif [ \"$1\" = \"-version\" ]; then echo \"ffmpeg version test\"; exit 0; fi\n{}\n",
                encode
            ),
        );
        let ffprobe = write_script(
            "ffprobe",
            "#!/bin/sh\necho '{\"format\":{\"duration\":\"10.0\"}}'\n".to_string(),
        );
        FfmpegEngine::new(Some(ffmpeg), Some(ffprobe))
    }

    #[cfg(unix)]
    fn encode_args() -> Vec<String> {
        ["-i", "in.mov", "out.mp4"].iter().map(|s| s.to_string()).collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_forward_progress_fractions() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted_engine(
            dir.path(),
            "echo out_time_us=2500000\necho out_time_us=5000000\necho out_time_us=4000000\necho progress=end\nexit 0",
        );
        engine.initialize().await.unwrap();

        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |fraction: f64| seen.lock().unwrap().push(fraction);
        engine.execute(&encode_args(), &sink).await.unwrap();

        assert_eq!(seen.into_inner().unwrap(), vec![0.25, 0.5, 1.0]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_failure_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted_engine(
            dir.path(),
            "echo 'first diagnostic line' >&2\necho 'Invalid data found when processing input' >&2\nexit 1",
        );
        engine.initialize().await.unwrap();

        let err = engine.execute(&encode_args(), &|_: f64| {}).await.unwrap_err();
        match &err {
            ConvertError::Encode { reason, stderr } => {
                assert!(reason.starts_with("ffmpeg exited with"));
                assert!(stderr.as_deref().unwrap().contains("first diagnostic line"));
            }
            other => panic!("expected an encode error, got {:?}", other),
        }
        assert!(err
            .result_message()
            .ends_with("Invalid data found when processing input"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_failure_keeps_non_utf8_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let engine = scripted_engine(
            dir.path(),
            "printf 'clip_\\377\\376.mov: Invalid data found when processing input\\n' >&2\nexit 1",
        );
        engine.initialize().await.unwrap();

        let err = engine.execute(&encode_args(), &|_: f64| {}).await.unwrap_err();
        assert!(matches!(err, ConvertError::Encode { .. }));
        let message = err.result_message();
        assert!(message.contains("Invalid data found when processing input"));
        assert!(message.contains('\u{FFFD}'));
    }
}
