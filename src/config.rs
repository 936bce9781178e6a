//! Pipeline configuration.
//!
//! Settings are read from `gantry.toml` with baked-in defaults for every
//! field, so an empty (or missing) file yields a fully working pipeline.
//! A small number of settings can be overridden through the environment
//! (`GANTRY_BIN_DIR`, `GANTRY_TOOL_ARCHIVE`); the layering is file →
//! environment.
//!
//! # Configuration File Format
//!
//! ```toml
//! [tool]
//! name = "premake5"
//! version = "5.0.0-beta2"
//! url = "https://github.com/premake/premake-core/releases/download/v5.0.0-beta2/premake-5.0.0-beta2-linux.tar.gz"
//! bin_dir = "/usr/local/bin"
//!
//! [paths]
//! source_dir = "sources"
//! workspace_dir = "workspace"
//!
//! [targets]
//! test = "test"
//! server = "server"
//!
//! [build]
//! configuration = "Release"
//! generator_args = ["gmake2"]
//! compiler = "make"
//! cleanup_on_failure = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pinned toolchain settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Name of the build-tool binary inside the release archive
    #[serde(default = "default_tool_name")]
    pub name: String,
    /// Pinned version identifier; never parameterized at runtime
    #[serde(default = "default_tool_version")]
    pub version: String,
    /// Download URL for the release archive (defaults to the pinned release)
    #[serde(default)]
    pub url: Option<String>,
    /// Directory the tool binary is installed into
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
    /// Optional local archive to install from instead of downloading
    /// (air-gapped image builds)
    #[serde(default)]
    pub archive: Option<PathBuf>,
}

fn default_tool_name() -> String {
    "premake5".to_string()
}

fn default_tool_version() -> String {
    "5.0.0-beta2".to_string()
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("/usr/local/bin")
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            name: default_tool_name(),
            version: default_tool_version(),
            url: None,
            bin_dir: default_bin_dir(),
            archive: None,
        }
    }
}

impl ToolConfig {
    /// Download URL, falling back to the pinned premake release for the
    /// configured version.
    pub fn url(&self) -> String {
        self.url.clone().unwrap_or_else(|| {
            format!(
                "https://github.com/premake/premake-core/releases/download/v{version}/premake-{version}-linux.tar.gz",
                version = self.version
            )
        })
    }

    /// Install directory (`GANTRY_BIN_DIR` overrides the file setting).
    pub fn bin_dir(&self) -> PathBuf {
        std::env::var_os("GANTRY_BIN_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.bin_dir.clone())
    }

    /// Local archive override (`GANTRY_TOOL_ARCHIVE` overrides the file
    /// setting).
    pub fn archive(&self) -> Option<PathBuf> {
        std::env::var_os("GANTRY_TOOL_ARCHIVE")
            .map(PathBuf::from)
            .or_else(|| self.archive.clone())
    }
}

/// Filesystem layout for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the external project's source tree
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    /// Workspace the staged tree and built artifacts live under
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("sources")
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("workspace")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            workspace_dir: default_workspace_dir(),
        }
    }
}

/// Named build targets, compiled in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetsConfig {
    #[serde(default = "default_test_target")]
    pub test: String,
    #[serde(default = "default_server_target")]
    pub server: String,
}

fn default_test_target() -> String {
    "test".to_string()
}

fn default_server_target() -> String {
    "server".to_string()
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            test: default_test_target(),
            server: default_server_target(),
        }
    }
}

/// Generator and compiler invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Build configuration passed to the compiler (lowercased on the
    /// command line, make-style)
    #[serde(default = "default_configuration")]
    pub configuration: String,
    /// Generator command; defaults to the tool name when empty
    #[serde(default)]
    pub generator: Option<String>,
    /// Arguments to the generator (e.g. the makefile action)
    #[serde(default = "default_generator_args")]
    pub generator_args: Vec<String>,
    /// Compiler command invoked once per target
    #[serde(default = "default_compiler")]
    pub compiler: String,
    /// Whether to reclaim the staged tree when generation or a compile fails
    #[serde(default = "default_cleanup_on_failure")]
    pub cleanup_on_failure: bool,
}

fn default_configuration() -> String {
    "Release".to_string()
}

fn default_generator_args() -> Vec<String> {
    vec!["gmake2".to_string()]
}

fn default_compiler() -> String {
    "make".to_string()
}

fn default_cleanup_on_failure() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            configuration: default_configuration(),
            generator: None,
            generator_args: default_generator_args(),
            compiler: default_compiler(),
            cleanup_on_failure: default_cleanup_on_failure(),
        }
    }
}

/// Serializes tests that read or write the `GANTRY_*` environment
/// overrides; process environment is shared across the whole test binary.
#[cfg(test)]
pub(crate) fn env_guard() -> std::sync::MutexGuard<'static, ()> {
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Unified pipeline configuration loaded from `gantry.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub targets: TargetsConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse gantry.toml")
    }

    /// Load from the given path, or defaults when the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Where the source tree is staged for the build: two levels below the
    /// workspace, so built artifacts land in the workspace root.
    pub fn stage_root(&self) -> PathBuf {
        self.paths.workspace_dir.join("build").join("src")
    }

    /// Shared output directory for built targets. The generated build
    /// scripts place binaries two levels above the staged tree, which is
    /// the workspace root.
    pub fn output_dir(&self) -> PathBuf {
        self.paths.workspace_dir.clone()
    }

    /// Path of a built target's artifact.
    pub fn artifact_path(&self, target: &str) -> PathBuf {
        self.output_dir().join(target)
    }

    /// Targets in their deterministic compile/run order: test, then server.
    pub fn target_order(&self) -> [&str; 2] {
        [self.targets.test.as_str(), self.targets.server.as_str()]
    }

    /// Generator command name (falls back to the tool binary).
    pub fn generator_cmd(&self) -> String {
        self.build
            .generator
            .clone()
            .unwrap_or_else(|| self.tool.name.clone())
    }
}
