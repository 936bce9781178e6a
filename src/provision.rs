//! Toolchain provisioner.
//!
//! Stage 1 of the pipeline: fetch the pinned build-tool release archive,
//! extract the single binary it contains, and install it into a well-known
//! executable directory. The downloaded archive lives in a temporary file
//! that is removed when provisioning finishes, on both the success and the
//! failure path.

use flate2::read::GzDecoder;
use futures_util::StreamExt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};

use crate::config::ToolConfig;
use crate::errors::ProvisionError;

/// An installed build-tool binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBinary {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// Provision the pinned toolchain described by `tool`.
///
/// Uses the configured local archive when one is set (air-gapped builds),
/// otherwise downloads the pinned release. Re-provisioning the same version
/// overwrites the installed binary with an identical one.
pub async fn provision(tool: &ToolConfig) -> Result<ToolBinary, ProvisionError> {
    let bin_dir = tool.bin_dir();

    let installed = match tool.archive() {
        Some(archive) => {
            info!(archive = %archive.display(), "Installing toolchain from local archive");
            install_from_archive(&archive, &tool.name, &bin_dir)?
        }
        None => {
            let url = tool.url();
            let archive = download(&url).await?;
            // The NamedTempFile guard removes the archive when it drops,
            // whether or not extraction succeeded.
            install_from_archive(archive.path(), &tool.name, &bin_dir)?
        }
    };

    info!(
        tool = %tool.name,
        version = %tool.version,
        path = %installed.display(),
        "Toolchain provisioned"
    );

    Ok(ToolBinary {
        name: tool.name.clone(),
        version: tool.version.clone(),
        path: installed,
    })
}

/// Download `url` into a temporary file.
async fn download(url: &str) -> Result<tempfile::NamedTempFile, ProvisionError> {
    info!(%url, "Downloading toolchain archive");

    let response = reqwest::get(url)
        .await
        .map_err(|source| ProvisionError::DownloadFailed {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(ProvisionError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    // Stream the body straight into the temp file; release archives are
    // too large to hold in memory wholesale.
    let mut file = tempfile::NamedTempFile::new().map_err(ProvisionError::ArchiveWrite)?;
    let mut stream = response.bytes_stream();
    let mut size = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| ProvisionError::DownloadFailed {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).map_err(ProvisionError::ArchiveWrite)?;
        size += chunk.len();
    }
    debug!(size, path = %file.path().display(), "Archive saved");
    Ok(file)
}

/// Extract the tool binary from a `.tar.gz` archive and install it into
/// `bin_dir` with execute permissions.
pub fn install_from_archive(
    archive_path: &Path,
    name: &str,
    bin_dir: &Path,
) -> Result<PathBuf, ProvisionError> {
    let file = File::open(archive_path).map_err(|source| ProvisionError::ArchiveRead {
        path: archive_path.to_path_buf(),
        source,
    })?;

    std::fs::create_dir_all(bin_dir).map_err(|source| ProvisionError::InstallFailed {
        name: name.to_string(),
        path: bin_dir.to_path_buf(),
        source,
    })?;

    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);
    let dest = bin_dir.join(name);

    for entry in archive.entries().map_err(ProvisionError::ExtractFailed)? {
        let mut entry = entry.map_err(ProvisionError::ExtractFailed)?;
        let path = entry.path().map_err(ProvisionError::ExtractFailed)?;

        let is_tool = path
            .file_name()
            .map(|f| f == std::ffi::OsStr::new(name))
            .unwrap_or(false);
        if !is_tool {
            continue;
        }

        entry
            .unpack(&dest)
            .map_err(|source| ProvisionError::InstallFailed {
                name: name.to_string(),
                path: dest.clone(),
                source,
            })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o755)).map_err(
                |source| ProvisionError::InstallFailed {
                    name: name.to_string(),
                    path: dest.clone(),
                    source,
                },
            )?;
        }

        debug!(path = %dest.display(), "Tool binary installed");
        return Ok(dest);
    }

    Err(ProvisionError::BinaryNotInArchive {
        name: name.to_string(),
    })
}
