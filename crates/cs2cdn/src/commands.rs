//! Command lines for DepotDownloader and Source2Viewer-CLI

use crate::config::PipelineConfig;
use cs2cdn_tools::Invocation;
use std::path::{Path, PathBuf};

/// Builds the external tool invocations for one configuration
#[derive(Debug, Clone)]
pub struct ToolCommands {
    depot_downloader: PathBuf,
    source2_viewer: PathBuf,
    app_id: u32,
    depot_id: u32,
    data_dir: PathBuf,
    archive_dir_path: PathBuf,
    output_dir: PathBuf,
    image_prefix: String,
}

impl ToolCommands {
    /// Commands for `config` using the given executables
    pub fn new(config: &PipelineConfig, depot_downloader: PathBuf, source2_viewer: PathBuf) -> Self {
        Self {
            depot_downloader,
            source2_viewer,
            app_id: config.app_id,
            depot_id: config.depot_id,
            data_dir: config.data_dir.clone(),
            archive_dir_path: config.archive_dir_path(),
            output_dir: config.output_dir.clone(),
            image_prefix: config.image_prefix.clone(),
        }
    }

    fn depot(&self) -> Invocation {
        Invocation::new(&self.depot_downloader)
            .arg("-app")
            .arg(self.app_id.to_string())
            .arg("-depot")
            .arg(self.depot_id.to_string())
            .arg("-dir")
            .arg(self.data_dir.to_string_lossy())
    }

    /// Download only the depot manifest
    pub fn fetch_manifest(&self) -> Invocation {
        self.depot().arg("-manifest-only")
    }

    /// Download the depot files named in `filelist`
    pub fn fetch_files(&self, filelist: &Path) -> Invocation {
        self.depot().arg("-filelist").arg(filelist.to_string_lossy())
    }

    /// Print the archive directory listing to stdout
    pub fn dump_listing(&self) -> Invocation {
        Invocation::new(&self.source2_viewer)
            .arg("-i")
            .arg(self.archive_dir_path.to_string_lossy())
            .arg("--vpk_dir")
    }

    /// Decompile every archive entry under the image prefix
    pub fn extract_images(&self) -> Invocation {
        Invocation::new(&self.source2_viewer)
            .arg("-i")
            .arg(self.archive_dir_path.to_string_lossy())
            .arg("-o")
            .arg(self.output_dir.to_string_lossy())
            .arg("-d")
            .arg("--vpk_filepath")
            .arg(self.image_prefix.as_str())
    }
}
