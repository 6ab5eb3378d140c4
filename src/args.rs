//! Command-line parsing and run configuration. Flags and environment
//! variables are folded into a single immutable [`Config`] before anything
//! touches the filesystem.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Error, Result};
use clap::{CommandFactory, Parser};

use crate::extensions::{DEFAULT_EXTENSIONS, ExtensionSet};
use crate::webhook::DEFAULT_TIMEOUT;

pub const DEFAULT_SOURCE_DIR: &str = "/home/user/Downloads/complete/";
pub const DEFAULT_DEST_DIR: &str = "/home/user/torrents/qbittorrent/usenet/";
pub const DEFAULT_CROSS_SEED_URL: &str = "http://127.0.0.1:2468";

pub fn validate_arguments<I, T>(args: I) -> Result<Args, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).context("Failed attempt at parsing args")
}

pub fn print_usage() {
    if let Err(e) = Args::command().print_help() {
        eprintln!("Failed to print usage: {e}");
    }
}

#[derive(clap::Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Hardlink completed downloads into a torrent client's tree and ask
/// cross-seed to search them.
pub struct Args {
    /// Directory holding completed downloads.
    ///
    /// Overridden by `SAB_COMPLETE_DIR` / `NZBPP_DIRECTORY` when running as a
    /// post-processing script.
    #[arg(short, long, env = "XSEED_SOURCE_DIR", default_value = DEFAULT_SOURCE_DIR)]
    pub source_dir: PathBuf,

    /// Directory the hardlinks are created in. Must be on the same filesystem
    /// as the source directory.
    #[arg(short = 'D', long, env = "XSEED_DEST_DIR", default_value = DEFAULT_DEST_DIR)]
    pub dest_dir: PathBuf,

    /// Base URL of the cross-seed instance.
    #[arg(short, long, env = "XSEED_CROSS_SEED_URL", default_value = DEFAULT_CROSS_SEED_URL)]
    pub cross_seed_url: String,

    /// File suffix to pick up; repeat for several.
    #[arg(short, long = "extension", value_name = "SUFFIX", default_values_t = DEFAULT_EXTENSIONS.map(String::from))]
    pub extensions: Vec<String>,

    /// Descend into subdirectories of the source directory.
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub recursive: bool,

    /// Never prompt; always hardlink and trigger the search.
    #[arg(short, long, default_value_t = false, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub unattended: bool,

    /// Visit directory entries in name order for reproducible output.
    #[arg(long, default_value_t = false)]
    pub sorted: bool,

    /// When enabled, logs every action but leaves the filesystem untouched.
    #[arg(short, long, default_value_t = false)]
    pub dry_run: bool,

    /// Print the linking summary as JSON on stdout.
    #[arg(long, default_value_t = false)]
    pub report_json: bool,

    /// Seconds to wait for the cross-seed webhook.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub webhook_timeout: u64,

    /// Positional arguments handed over by download clients; ignored.
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub passthrough: Vec<String>,
}

/// The download client (if any) that launched us as a post-processing script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Standalone,
    Sabnzbd,
    Nzbget,
}

impl Framework {
    /// Detect the framework from its environment, returning the completed
    /// download directory it exported.
    pub fn detect<F>(env: F) -> (Self, Option<PathBuf>)
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let present = |key: &str| env(key).filter(|v| !v.is_empty());

        if let Some(dir) = present("SAB_COMPLETE_DIR") {
            (Self::Sabnzbd, Some(PathBuf::from(dir)))
        } else if let Some(dir) = present("NZBPP_DIRECTORY") {
            (Self::Nzbget, Some(PathBuf::from(dir)))
        } else {
            (Self::Standalone, None)
        }
    }

    pub fn success_code(self) -> i32 {
        match self {
            Self::Nzbget => 93,
            Self::Standalone | Self::Sabnzbd => 0,
        }
    }

    pub fn failure_code(self) -> i32 {
        match self {
            Self::Nzbget => 94,
            Self::Standalone | Self::Sabnzbd => 1,
        }
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub cross_seed_url: String,
    pub extensions: ExtensionSet,
    pub recursive: bool,
    pub unattended: bool,
    pub sorted: bool,
    pub dry_run: bool,
    pub report_json: bool,
    pub webhook_timeout: Duration,
    pub framework: Framework,
}

impl Config {
    /// Resolve against the process environment.
    pub fn from_args(args: Args) -> Result<Self, Error> {
        Self::resolve(args, |key| std::env::var_os(key))
    }

    /// Post-processing frameworks win over flags for the source directory and
    /// always force unattended mode.
    pub fn resolve<F>(args: Args, env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let (framework, framework_dir) = Framework::detect(env);

        let extensions = ExtensionSet::new(&args.extensions)
            .context("Failed to parse --extension values")?;

        if args.webhook_timeout == 0 {
            anyhow::bail!("--webhook-timeout must be at least one second");
        }

        Ok(Self {
            source_dir: framework_dir.unwrap_or(args.source_dir),
            dest_dir: args.dest_dir,
            cross_seed_url: args.cross_seed_url,
            extensions,
            recursive: args.recursive,
            unattended: args.unattended || framework != Framework::Standalone,
            sorted: args.sorted,
            dry_run: args.dry_run,
            report_json: args.report_json,
            webhook_timeout: Duration::from_secs(args.webhook_timeout),
            framework,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_standalone_setup() {
        let args = validate_arguments(["xseed-usenet"]).expect("parse");
        let config = Config::resolve(args, env_of(&[])).expect("config");

        assert_eq!(config.framework, Framework::Standalone);
        assert!(config.recursive);
        assert!(!config.unattended);
        assert_eq!(config.source_dir, PathBuf::from(DEFAULT_SOURCE_DIR));
        assert_eq!(config.extensions, ExtensionSet::default());
        assert_eq!(config.framework.success_code(), 0);
        assert_eq!(config.webhook_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn help_surfaces_as_a_clap_display_error() {
        let err = validate_arguments(["xseed-usenet", "--help"]).expect_err("help is not a run");
        let clap_err = err.downcast_ref::<clap::Error>().expect("clap error kept");
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert!(clap_err.to_string().contains("--dest-dir"));
    }

    #[test]
    fn nzbget_overrides_source_and_exit_codes() {
        let args = validate_arguments(["xseed-usenet", "--source-dir", "/ignored"]).expect("parse");
        let config = Config::resolve(args, env_of(&[("NZBPP_DIRECTORY", "/dl/Movie")])).expect("config");

        assert_eq!(config.framework, Framework::Nzbget);
        assert_eq!(config.source_dir, PathBuf::from("/dl/Movie"));
        assert!(config.unattended);
        assert_eq!(config.framework.success_code(), 93);
        assert_eq!(config.framework.failure_code(), 94);
    }

    #[test]
    fn sabnzbd_takes_precedence_and_passthrough_is_ignored() {
        let args = validate_arguments([
            "xseed-usenet",
            "/complete/Movie",
            "Movie.nzb",
            "Movie",
            "",
            "movies",
            "alt.binaries",
            "0",
        ])
        .expect("parse");
        assert_eq!(args.passthrough.len(), 7);

        let config = Config::resolve(
            args,
            env_of(&[("SAB_COMPLETE_DIR", "/complete/Movie"), ("NZBPP_DIRECTORY", "/x")]),
        )
        .expect("config");
        assert_eq!(config.framework, Framework::Sabnzbd);
        assert_eq!(config.source_dir, PathBuf::from("/complete/Movie"));
        assert_eq!(config.framework.failure_code(), 1);
    }

    #[test]
    fn boolean_flags_take_values() {
        let args = validate_arguments([
            "xseed-usenet",
            "--recursive",
            "false",
            "--unattended",
            "true",
            "-e",
            "avi",
        ])
        .expect("parse");
        let config = Config::resolve(args, env_of(&[])).expect("config");

        assert!(!config.recursive);
        assert!(config.unattended);
        assert!(config.extensions.contains(".avi"));
        assert!(!config.extensions.contains(".mkv"));
    }

    #[test]
    fn bad_extension_is_rejected() {
        let args = validate_arguments(["xseed-usenet", "-e", "tar.gz"]).expect("parse");
        assert!(Config::resolve(args, env_of(&[])).is_err());
    }
}
