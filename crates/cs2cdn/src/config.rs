//! Command-line and environment configuration.
//!
//! Every option can be given as a CLI flag or through a `CS2CDN_*`
//! environment variable; the defaults reproduce the layout the published CDN
//! repository expects (`data/`, `tools/`, `static/`, `cdn.json`,
//! `manifest_id.txt` in the working directory).
//!
//! # Example
//!
//! ```no_run
//! use cs2cdn::Cli;
//!
//! let cli = Cli::from_args();
//! cli.config.validate().expect("Invalid configuration");
//!
//! println!("Depot {} into {}", cli.config.depot_id, cli.config.data_dir.display());
//! ```

use crate::error::ConfigError;
use clap::{Args, Parser, Subcommand};
use cs2cdn_tools::GITHUB_API;
use cs2cdn_vpk::SegmentTemplate;
use std::path::PathBuf;
use std::time::Duration;

/// Default public URL prefix for published images
pub const DEFAULT_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/SkinDelta/go-cs2-cdn@main/";

/// Command-line interface
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cs2cdn",
    about = "Mirror Counter-Strike 2 econ images and publish their CDN URLs",
    version
)]
pub struct Cli {
    /// Pipeline settings
    #[command(flatten)]
    pub config: PipelineConfig,

    /// Action to perform (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Parse command-line arguments and environment.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }
}

/// Top-level actions
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the full pipeline
    Run {
        /// Skip the manifest identity check and always download
        #[arg(long, env = "CS2CDN_FORCE")]
        force: bool,
    },

    /// Resolve an existing `--vpk_dir` listing into a segment list
    Resolve {
        /// Listing file produced by `Source2Viewer-CLI --vpk_dir`
        listing: PathBuf,

        /// Output file, one segment path per line
        #[arg(short, long, default_value = "filelist.txt")]
        out: PathBuf,
    },

    /// Download missing tools and exit
    Provision,
}

impl Default for Command {
    fn default() -> Self {
        Self::Run { force: false }
    }
}

/// Settings shared by every action
#[derive(Debug, Clone, Args)]
pub struct PipelineConfig {
    /// Steam application id
    #[arg(long, global = true, env = "CS2CDN_APP_ID", default_value_t = 730)]
    pub app_id: u32,

    /// Depot id within the application
    #[arg(long, global = true, env = "CS2CDN_DEPOT_ID", default_value_t = 2_347_770)]
    pub depot_id: u32,

    /// DepotDownloader download directory
    #[arg(long, global = true, env = "CS2CDN_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory holding the external tools
    #[arg(long, global = true, env = "CS2CDN_TOOLS_DIR", default_value = "tools")]
    pub tools_dir: PathBuf,

    /// Directory the images are extracted into
    #[arg(long, global = true, env = "CS2CDN_OUTPUT_DIR", default_value = "static")]
    pub output_dir: PathBuf,

    /// File storing the last processed manifest id
    #[arg(
        long,
        global = true,
        env = "CS2CDN_IDENTITY_FILE",
        default_value = "manifest_id.txt"
    )]
    pub identity_file: PathBuf,

    /// Published-URL manifest
    #[arg(long, global = true, env = "CS2CDN_CDN_MANIFEST", default_value = "cdn.json")]
    pub cdn_manifest: PathBuf,

    /// URL prefix prepended to every published path
    #[arg(long, global = true, env = "CS2CDN_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Archive directory inside the depot
    #[arg(long, global = true, env = "CS2CDN_ARCHIVE_DIR", default_value = "game/csgo")]
    pub archive_dir: String,

    /// Archive name, without `_dir.vpk`
    #[arg(long, global = true, env = "CS2CDN_ARCHIVE", default_value = "pak01")]
    pub archive: String,

    /// Path prefix of the entries to extract
    #[arg(
        long,
        global = true,
        env = "CS2CDN_IMAGE_PREFIX",
        default_value = "panorama/images/econ"
    )]
    pub image_prefix: String,

    /// Deadline for the manifest download, in seconds
    #[arg(long, global = true, env = "CS2CDN_MANIFEST_TIMEOUT", default_value_t = 60)]
    pub manifest_timeout: u64,

    /// GitHub API base URL used for tool releases
    #[arg(long, global = true, env = "CS2CDN_GITHUB_API", default_value = GITHUB_API)]
    pub github_api: String,
}

impl PipelineConfig {
    /// Segment naming for the configured archive
    #[must_use]
    pub fn segment_template(&self) -> SegmentTemplate {
        SegmentTemplate::for_archive(&self.archive)
    }

    /// Depot-relative path of the archive directory file, e.g.
    /// `game/csgo/pak01_dir.vpk`
    #[must_use]
    pub fn archive_dir_file(&self) -> String {
        let dir = self.archive_dir.trim_end_matches('/');
        let file = self.segment_template().dir_file_name();
        if dir.is_empty() {
            file
        } else {
            format!("{dir}/{file}")
        }
    }

    /// Local path of the downloaded archive directory file
    #[must_use]
    pub fn archive_dir_path(&self) -> PathBuf {
        self.data_dir.join(self.archive_dir_file())
    }

    /// Manifest download deadline
    #[must_use]
    pub const fn manifest_deadline(&self) -> Duration {
        Duration::from_secs(self.manifest_timeout)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - the base URL is not an http(s) URL ending in `/`
    /// - the archive name or image prefix is empty
    /// - the app id, depot id or manifest timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: format!("'{}' is not an http(s) URL", self.base_url),
            });
        }
        if !self.base_url.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: format!("'{}' must end with '/'", self.base_url),
            });
        }

        if self.archive.trim().is_empty() {
            return Err(ConfigError::MissingRequired("archive"));
        }
        if self.image_prefix.trim_matches(['/', '\\', ' ']).is_empty() {
            return Err(ConfigError::MissingRequired("image_prefix"));
        }

        if self.app_id == 0 {
            return Err(ConfigError::InvalidValue {
                field: "app_id",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.depot_id == 0 {
            return Err(ConfigError::InvalidValue {
                field: "depot_id",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.manifest_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "manifest_timeout",
                reason: "must be at least one second".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cs2cdn").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        let config = &cli.config;

        assert_eq!(cli.command, None);
        assert_eq!(config.app_id, 730);
        assert_eq!(config.depot_id, 2_347_770);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.output_dir, PathBuf::from("static"));
        assert_eq!(config.archive_dir_file(), "game/csgo/pak01_dir.vpk");
        assert_eq!(
            config.archive_dir_path(),
            PathBuf::from("data").join("game/csgo/pak01_dir.vpk")
        );
        assert_eq!(config.manifest_deadline(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(
            parse(&["run", "--force"]).command,
            Some(Command::Run { force: true })
        );
        assert_eq!(
            parse(&["resolve", "vpk_dir.txt", "-o", "segments.txt"]).command,
            Some(Command::Resolve {
                listing: PathBuf::from("vpk_dir.txt"),
                out: PathBuf::from("segments.txt"),
            })
        );
        assert_eq!(parse(&["provision"]).command, Some(Command::Provision));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&["run", "--data-dir", "/tmp/depot", "--archive", "pak02"]);
        assert_eq!(cli.config.data_dir, PathBuf::from("/tmp/depot"));
        assert_eq!(cli.config.archive_dir_file(), "game/csgo/pak02_dir.vpk");
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = parse(&[]).config;

        config.base_url = "https://cdn.example.com/repo".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "base_url",
                ..
            })
        ));

        config.base_url = "ftp://cdn.example.com/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_required_fields() {
        let mut config = parse(&[]).config;
        config.image_prefix = "/".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired("image_prefix"))
        ));

        let mut config = parse(&[]).config;
        config.manifest_timeout = 0;
        assert!(config.validate().is_err());
    }
}
