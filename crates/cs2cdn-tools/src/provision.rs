//! Provisioning of the external archive tools
//!
//! Each tool is looked up in the tools directory by executable name. Missing
//! tools are fetched from the latest GitHub release of their repository: the
//! first asset whose name ends with the platform-resolved suffix is
//! downloaded and unpacked into the tools directory, keeping the archive's
//! internal layout.

use crate::error::{ProvisionError, Result};
use crate::platform::Platform;
use crate::release::ReleaseClient;
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

/// A downloadable tool and its release asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Display name
    pub name: String,
    /// GitHub repository owner
    pub owner: String,
    /// GitHub repository name
    pub repo: String,
    /// Asset name suffix written for `linux`/`x64`
    pub asset_suffix: String,
    /// Executable file name inside the tools directory, without extension
    pub executable: String,
}

impl ToolSpec {
    /// SteamRE DepotDownloader
    pub fn depot_downloader() -> Self {
        Self {
            name: "DepotDownloader".to_string(),
            owner: "SteamRE".to_string(),
            repo: "DepotDownloader".to_string(),
            asset_suffix: "DepotDownloader-linux-x64.zip".to_string(),
            executable: "DepotDownloader".to_string(),
        }
    }

    /// ValveResourceFormat command-line decompiler
    pub fn source2_viewer() -> Self {
        Self {
            name: "ValveResourceFormat".to_string(),
            owner: "ValveResourceFormat".to_string(),
            repo: "ValveResourceFormat".to_string(),
            asset_suffix: "cli-linux-x64.zip".to_string(),
            executable: "Source2Viewer-CLI".to_string(),
        }
    }

    /// Both tools the pipeline needs
    pub fn defaults() -> Vec<Self> {
        vec![Self::depot_downloader(), Self::source2_viewer()]
    }

    fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Ensures tools are present in a local directory
#[derive(Debug, Clone)]
pub struct Provisioner {
    tools_dir: PathBuf,
    tools: Vec<ToolSpec>,
    platform: Platform,
    releases: ReleaseClient,
}

impl Provisioner {
    /// Provisioner for the running platform
    pub fn new(tools_dir: impl Into<PathBuf>, tools: Vec<ToolSpec>, releases: ReleaseClient) -> Self {
        Self {
            tools_dir: tools_dir.into(),
            tools,
            platform: Platform::detect(),
            releases,
        }
    }

    /// Override the detected platform
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Managed tools
    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    /// Tools directory
    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    /// Path of a tool's executable, with the platform executable suffix
    pub fn executable_path(&self, tool: &ToolSpec) -> PathBuf {
        self.tools_dir
            .join(format!("{}{}", tool.executable, std::env::consts::EXE_SUFFIX))
    }

    /// Download missing tools, then mark every tool executable.
    ///
    /// # Errors
    ///
    /// Any network, release lookup or extraction failure is returned as is;
    /// an executable missing after provisioning yields
    /// [`ProvisionError::MissingExecutable`].
    pub async fn ensure_tools(&self) -> Result<()> {
        fs::create_dir_all(&self.tools_dir)
            .map_err(|source| ProvisionError::io(&self.tools_dir, source))?;

        for tool in &self.tools {
            if self.executable_path(tool).is_file() {
                info!("Tool {} already exists. Skipping download.", tool.name);
                continue;
            }

            info!("Tool {} not found. Downloading...", tool.name);
            self.install(tool).await?;
            info!("Tool {} downloaded and installed successfully.", tool.name);
        }

        for tool in &self.tools {
            let path = self.executable_path(tool);
            if !path.is_file() {
                return Err(ProvisionError::MissingExecutable {
                    tool: tool.name.clone(),
                    path,
                });
            }
            make_executable(&path)?;
        }

        Ok(())
    }

    async fn install(&self, tool: &ToolSpec) -> Result<()> {
        let suffix = self.platform.resolve_suffix(&tool.asset_suffix);
        let release = self.releases.latest_release(&tool.owner, &tool.repo).await?;

        let asset = release
            .find_asset(&suffix)
            .ok_or_else(|| ProvisionError::AssetNotFound {
                repo: tool.repository(),
                suffix: suffix.clone(),
            })?;

        info!("Downloading {} from {}", tool.name, asset.browser_download_url);
        let data = self.releases.download(&asset.browser_download_url).await?;

        info!("Extracting {}...", tool.name);
        let extracted = extract_zip(&data, &self.tools_dir)?;
        debug!("Extracted {extracted} files for {}", tool.name);

        Ok(())
    }
}

/// Unpack a ZIP archive into `dest`, preserving its directory layout.
///
/// Directory entries are skipped; parents are created as needed. Returns the
/// number of files written.
///
/// # Errors
///
/// Returns [`ProvisionError::IllegalPath`] for any entry that would land
/// outside `dest` (absolute paths or `..` traversal).
pub fn extract_zip(data: &[u8], dest: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            return Err(ProvisionError::IllegalPath(entry.name().to_string()));
        };
        let out_path = dest.join(relative);

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ProvisionError::io(parent, source))?;
        }

        let mut out = File::create(&out_path).map_err(|source| ProvisionError::io(&out_path, source))?;
        io::copy(&mut entry, &mut out).map_err(|source| ProvisionError::io(&out_path, source))?;

        debug!("Extracted {} to {}", entry.name(), out_path.display());
        written += 1;
    }

    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|source| ProvisionError::io(path, source))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
