//! Pipeline orchestration
//!
//! One run walks these stages in order; any error aborts the run:
//!
//! 1. provision the external tools
//! 2. download the depot manifest (with a deadline) and read its identity
//! 3. stop if the identity matches the stored one, otherwise persist it
//! 4. download the archive directory file and dump its listing
//! 5. resolve the segments holding the image entries
//! 6. download those segments and extract the images
//! 7. rename the extracted files and publish their URLs

use crate::commands::ToolCommands;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::identity::{IdentityStore, find_manifest};
use crate::publish::publish_directory;
use crate::rename::strip_png_suffixes;
use cs2cdn_tools::{
    CommandRunner, OutputSink, Provisioner, ReleaseClient, ToolSpec, TracingSink,
};
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::info;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Ensure both tools exist locally
    ProvisionTools,
    /// Download the depot manifest
    FetchManifest,
    /// Compare against the stored identity
    CompareIdentity,
    /// Download the archive directory file
    FetchDirectoryListing,
    /// Dump the listing and resolve segments
    ResolveSegments,
    /// Download the resolved segments
    FetchSegments,
    /// Decompile the image entries
    ExtractTargetEntries,
    /// Strip `_png` from output names
    RenameOutputs,
    /// Merge output URLs into the published manifest
    PublishUrls,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProvisionTools => "Provisioning tools",
            Self::FetchManifest => "Fetching manifest",
            Self::CompareIdentity => "Comparing manifest identity",
            Self::FetchDirectoryListing => "Fetching directory listing",
            Self::ResolveSegments => "Resolving segments",
            Self::FetchSegments => "Fetching segments",
            Self::ExtractTargetEntries => "Extracting images",
            Self::RenameOutputs => "Renaming outputs",
            Self::PublishUrls => "Publishing URLs",
        };
        f.write_str(name)
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The manifest identity matched the stored one; nothing was downloaded
    UpToDate {
        /// Current manifest id
        id: String,
    },
    /// No listing entry under the image prefix carried a segment number
    NoMatchingSegments {
        /// Current manifest id
        id: String,
    },
    /// Images were extracted and published
    Published {
        /// Current manifest id
        id: String,
        /// Number of segments downloaded
        segments: usize,
        /// Number of image files in the published manifest update
        published: usize,
    },
}

impl RunOutcome {
    /// Manifest id the run saw
    pub fn id(&self) -> &str {
        match self {
            Self::UpToDate { id } | Self::NoMatchingSegments { id } | Self::Published { id, .. } => {
                id
            }
        }
    }
}

/// Provisioner for the default tool set under `config.tools_dir`
///
/// # Errors
///
/// Returns [`PipelineError::Provision`] if the HTTP client cannot be built.
pub fn provisioner(config: &PipelineConfig) -> Result<Provisioner> {
    let releases = ReleaseClient::with_api_base(config.github_api.as_str())?;
    Ok(Provisioner::new(
        &config.tools_dir,
        ToolSpec::defaults(),
        releases,
    ))
}

/// The CDN update pipeline
pub struct Pipeline<R> {
    config: PipelineConfig,
    runner: R,
    provisioner: Provisioner,
    sink: Arc<dyn OutputSink>,
}

impl<R: CommandRunner> Pipeline<R> {
    /// Pipeline using `runner` for every external command
    pub fn new(config: PipelineConfig, runner: R, provisioner: Provisioner) -> Self {
        Self {
            config,
            runner,
            provisioner,
            sink: Arc::new(TracingSink),
        }
    }

    /// Pipeline with the default provisioner for `config`
    ///
    /// # Errors
    ///
    /// See [`provisioner`].
    pub fn from_config(config: PipelineConfig, runner: R) -> Result<Self> {
        let provisioner = provisioner(&config)?;
        Ok(Self::new(config, runner, provisioner))
    }

    /// Send streamed tool output to `sink` instead of the log
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn commands(&self) -> ToolCommands {
        ToolCommands::new(
            &self.config,
            self.provisioner.executable_path(&ToolSpec::depot_downloader()),
            self.provisioner.executable_path(&ToolSpec::source2_viewer()),
        )
    }

    /// Execute one run.
    ///
    /// With `force` the identity comparison is skipped; the identity is still
    /// stored. Temporary files are removed whether or not the run succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by any stage.
    pub async fn run(&self, force: bool) -> Result<RunOutcome> {
        let config = &self.config;
        let commands = self.commands();

        stage(Stage::ProvisionTools);
        self.provisioner.ensure_tools().await?;
        info!("All dependencies are satisfied.");

        stage(Stage::FetchManifest);
        self.runner
            .run(&commands.fetch_manifest(), Some(config.manifest_deadline()))
            .await
            .map_err(PipelineError::command(Stage::FetchManifest))?;
        info!("Finished collecting manifest.");

        let manifest = find_manifest(&config.data_dir, config.depot_id)?;
        let id = manifest.id;

        stage(Stage::CompareIdentity);
        let store = IdentityStore::new(&config.identity_file);
        let tracked = store.read()?;
        if !force && !tracked.is_empty() && tracked == id {
            info!("Manifest ID {id} is unchanged. Exiting.");
            return Ok(RunOutcome::UpToDate { id });
        }
        if force && tracked == id {
            info!("Manifest ID {id} is unchanged, continuing because of --force");
        }
        store.write(&id)?;
        info!("New manifest ID {id} has been saved.");

        stage(Stage::FetchDirectoryListing);
        let dir_filelist = temp_file("dir-file_")?;
        write_lines(&dir_filelist, &[config.archive_dir_file()])?;
        self.runner
            .run(&commands.fetch_files(dir_filelist.path()), None)
            .await
            .map_err(PipelineError::command(Stage::FetchDirectoryListing))?;

        stage(Stage::ResolveSegments);
        let listing = temp_file("vpkdir_")?;
        self.runner
            .run_to_file(&commands.dump_listing(), listing.path())
            .await
            .map_err(PipelineError::command(Stage::ResolveSegments))?;

        let segment_list = temp_file("filelist_")?;
        let segments = cs2cdn_vpk::resolve_listing(
            listing.path(),
            &config.image_prefix,
            &config.archive_dir,
            &config.segment_template(),
            segment_list.path(),
        )?;
        if segments.is_empty() {
            info!("No segments hold entries under {}", config.image_prefix);
            return Ok(RunOutcome::NoMatchingSegments { id });
        }

        stage(Stage::FetchSegments);
        self.runner
            .stream(&commands.fetch_files(segment_list.path()), Arc::clone(&self.sink))
            .await
            .map_err(PipelineError::command(Stage::FetchSegments))?;
        info!("Finished downloading files.");

        stage(Stage::ExtractTargetEntries);
        self.runner
            .stream(&commands.extract_images(), Arc::clone(&self.sink))
            .await
            .map_err(PipelineError::command(Stage::ExtractTargetEntries))?;

        stage(Stage::RenameOutputs);
        let renamed = strip_png_suffixes(&config.output_dir)?;
        info!("Renamed {renamed} files");

        stage(Stage::PublishUrls);
        let published =
            publish_directory(&config.cdn_manifest, &config.output_dir, &config.base_url)?;
        info!(
            "Published {published} images to {}",
            config.cdn_manifest.display()
        );

        Ok(RunOutcome::Published {
            id,
            segments: segments.len(),
            published,
        })
    }
}

fn stage(stage: Stage) {
    info!("{stage}...");
}

fn temp_file(prefix: &str) -> Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".txt")
        .tempfile()
        .map_err(|source| PipelineError::io(std::env::temp_dir(), source))
}

fn write_lines(file: &NamedTempFile, lines: &[String]) -> Result<()> {
    let mut handle = file.as_file();
    for line in lines {
        writeln!(handle, "{line}").map_err(|source| PipelineError::io(file.path(), source))?;
    }
    handle
        .flush()
        .map_err(|source| PipelineError::io(file.path(), source))
}
