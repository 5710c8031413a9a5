//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione cross-platform degli eseguibili
//! esterni usati dal codec engine (`ffmpeg`, `ffprobe`).
//!
//! ## Ordine di risoluzione:
//! 1. Path esplicito dalla configurazione
//! 2. Directory indicata da `MEDIA_CONVERTER_TOOLS_DIR` (tool bundled)
//! 3. Nome del comando per la piattaforma corrente, cercato nel `PATH`

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Environment variable pointing at a directory of bundled tools
pub const TOOLS_DIR_ENV: &str = "MEDIA_CONVERTER_TOOLS_DIR";

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
    which_command: &'static str,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        let which_command = if cfg!(windows) {
            commands.insert("ffmpeg", "ffmpeg.exe");
            commands.insert("ffprobe", "ffprobe.exe");
            "where"
        } else {
            commands.insert("ffmpeg", "ffmpeg");
            commands.insert("ffprobe", "ffprobe");
            "which"
        };

        Self {
            commands,
            which_command,
        }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        self.commands.get(base_name).copied().unwrap_or(base_name)
    }

    /// Get the command used to check if a program exists
    pub fn which_command(&self) -> &str {
        self.which_command
    }

    /// Resolve the executable for a tool, honouring an explicit override
    pub fn resolve(&self, base_name: &str, override_path: Option<&Path>) -> PathBuf {
        if let Some(path) = override_path {
            debug!("Using configured path for {}: {}", base_name, path.display());
            return path.to_path_buf();
        }

        let command = self.get_command(base_name);
        if let Ok(dir) = env::var(TOOLS_DIR_ENV) {
            let candidate = PathBuf::from(dir).join(command);
            if candidate.is_file() {
                debug!("Found bundled {} at {}", base_name, candidate.display());
                return candidate;
            }
        }

        PathBuf::from(command)
    }

    /// Check if a command is available on the system
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        let command_name = self.get_command(base_name);

        let result = tokio::process::Command::new(self.which_command)
            .arg(command_name)
            .output()
            .await;

        match result {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    /// Get system information for debugging
    pub fn system_info() -> SystemInfo {
        SystemInfo {
            os: env::consts::OS,
            arch: env::consts::ARCH,
            family: env::consts::FAMILY,
        }
    }
}

/// System information structure
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl std::fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.os, self.arch, self.family)
    }
}
