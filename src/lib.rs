//! # xseed-usenet
//!
//! Post-processing companion for Usenet downloaders that feed a
//! [cross-seed](https://www.cross-seed.org/) setup. After a download
//! completes, the crate finds the new video files, hardlinks them into a
//! directory your torrent client can see, and asks cross-seed to search that
//! directory for torrents carrying the same content. Hardlinks cost no extra
//! space, so the same bytes can seed in several clients at once.
//!
//! ## Quick start (CLI)
//! ```text
//! xseed-usenet \
//!     --source-dir /srv/usenet/complete \
//!     --dest-dir /srv/torrents/usenet \
//!     --cross-seed-url http://127.0.0.1:2468
//! ```
//!
//! Add `--dry-run` to preview without touching the filesystem, and
//! `--unattended true` to skip both confirmation prompts.
//!
//! ## Quick start (library)
//! ```no_run
//! use xseed_usenet::{ExtensionSet, Linker, Scanner};
//!
//! # fn main() -> xseed_usenet::Result<()> {
//! let files = Scanner::new("/srv/usenet/complete", ExtensionSet::default())
//!     .recursive(true)
//!     .scan()?
//!     .collect::<xseed_usenet::Result<Vec<_>>>()?;
//!
//! let report = Linker::new("/srv/torrents/usenet")?.link(files).into_report();
//! println!("{} new hardlinks", report.linked.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Idempotence
//! A destination name that already exists is never touched: the file is
//! skipped, so running twice over the same downloads creates nothing the
//! second time. The existence check is backed by `link(2)` itself, which
//! refuses to replace an entry, so a concurrent writer can only turn a link
//! into a skip.
//!
//! ## Running as a post-processing script
//! SABnzbd (`SAB_COMPLETE_DIR`) and NZBGet (`NZBPP_DIRECTORY`) are detected
//! from the environment. Their download directory replaces `--source-dir`
//! and unattended mode is forced.
//!
//! ## Exit semantics
//! | Framework | Success | Failure |
//! |-----------|---------|---------|
//! | standalone | `0` | `1` |
//! | SABnzbd | `0` | `1` |
//! | NZBGet | `93` | `94` |
//!
//! A run fails when a directory is missing, any file could not be scanned or
//! linked, or cross-seed did not answer `204 No Content`.

mod args;
mod error;
mod extensions;
mod linker;
mod prompt;
mod scanner;
mod webhook;

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

pub use args::{Args, Config, Framework, validate_arguments};
pub use error::{Error, ErrorKindTag, Result};
pub use extensions::{DEFAULT_EXTENSIONS, ExtensionSet};
pub use linker::{LinkFailure, LinkReport, LinkResult, Linker, Links, link};
pub use prompt::{ask, confirm};
pub use scanner::{Scan, Scanner, scan};
pub use webhook::Notifier;

/// What happened to the cross-seed trigger.
#[derive(Debug)]
pub enum Notification {
    Sent,
    Declined,
    DryRun,
    Failed(Error),
}

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub discovered: Vec<PathBuf>,
    pub scan_errors: Vec<Error>,
    pub report: LinkReport,
    pub notification: Notification,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.scan_errors.is_empty()
            && self.report.is_success()
            && !matches!(self.notification, Notification::Failed(_))
    }

    pub fn exit_code(&self, framework: Framework) -> i32 {
        if self.is_success() {
            framework.success_code()
        } else {
            framework.failure_code()
        }
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    source_dir: &'a Path,
    dest_dir: &'a Path,
    discovered: &'a [PathBuf],
    scan_errors: Vec<String>,
    #[serde(flatten)]
    report: &'a LinkReport,
    notification: &'static str,
    success: bool,
}

/// Scan, optionally confirm, link, then trigger cross-seed.
///
/// `confirm` receives a question and its default answer; `notify` receives
/// the destination directory. Both are skipped in unattended mode and dry
/// runs respectively, as described on [`Config`].
///
/// # Errors
/// Only conditions that stop the run before anything is linked: a missing
/// source or destination directory, or a failed prompt. Per-file problems are
/// collected into the returned [`RunOutcome`].
pub fn run<P, N>(config: &Config, mut confirm: P, notify: N) -> anyhow::Result<RunOutcome>
where
    P: FnMut(&str, Option<bool>) -> std::io::Result<bool>,
    N: FnOnce(&Path) -> Result<()>,
{
    let linker = Linker::new(&config.dest_dir)
        .context("The destination directory is not usable")?
        .dry_run(config.dry_run);

    let scan = Scanner::new(&config.source_dir, config.extensions.clone())
        .recursive(config.recursive)
        .sorted(config.sorted)
        .scan()
        .context("The source directory is not usable")?;

    let mut discovered = Vec::new();
    let mut scan_errors = Vec::new();
    for item in scan {
        match item {
            Ok(path) => discovered.push(path),
            Err(e) => {
                warn!("{e}");
                scan_errors.push(e);
            }
        }
    }

    println!(
        "{} non-hardlinked file(s) found in '{}'.",
        discovered.len(),
        config.source_dir.display()
    );
    info!(count = discovered.len(), extensions = %config.extensions, "Scan finished");

    let mut report = LinkReport::default();
    if !discovered.is_empty() {
        let proceed = if config.unattended {
            println!("Running in unattended mode.");
            true
        } else {
            confirm("Do you want to hardlink them?", Some(false))
                .context("Failed to read confirmation")?
        };

        if proceed {
            report = linker.link(discovered.iter().cloned()).into_report();
            println!(
                "Hardlinked {} file(s), {} already present, {} failed.",
                report.linked.len() + report.planned.len(),
                report.skipped.len(),
                report.failed.len()
            );
        }
    }

    let dest = config.dest_dir.display();
    let trigger = config.unattended
        || confirm(
            &format!("Do you want to trigger a cross-seed search in {dest}?"),
            Some(true),
        )
        .context("Failed to read confirmation")?;

    let notification = if !trigger {
        println!("Not triggering a cross-seed search");
        Notification::Declined
    } else if config.dry_run {
        info!("[Dry Run] Would trigger a cross-seed search in {dest}");
        Notification::DryRun
    } else {
        println!("Triggering cross-seed search in {dest}");
        match notify(&config.dest_dir) {
            Ok(()) => {
                println!("Trigger sent successfully.");
                Notification::Sent
            }
            Err(e) => {
                println!("Trigger failed.");
                warn!("{e}");
                Notification::Failed(e)
            }
        }
    };

    Ok(RunOutcome {
        discovered,
        scan_errors,
        report,
        notification,
    })
}

/// Run the CLI entrypoint and return the process exit code.
///
/// This is what `src/main.rs` calls: parse arguments, resolve the
/// configuration, run the pipeline against stdin/stdout and the configured
/// cross-seed instance, and map the outcome to the invoking framework's exit
/// codes.
pub fn start() -> i32 {
    let (framework, _) = Framework::detect(|key| std::env::var_os(key));

    let parsed = match args::validate_arguments(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => {
            if let Some(clap_err) = e.downcast_ref::<clap::Error>()
                && matches!(
                    clap_err.kind(),
                    clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
                )
            {
                if let Err(e) = clap_err.print() {
                    eprintln!("Failed to print usage: {e}");
                }
                return framework.success_code();
            }
            eprintln!("Invalid arguments provided.");
            eprintln!("{e:#}");
            args::print_usage();
            return framework.failure_code();
        }
    };

    let config = match Config::from_args(parsed) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration.");
            eprintln!("{e:#}");
            return framework.failure_code();
        }
    };

    info!(
        source = %config.source_dir.display(),
        destination = %config.dest_dir.display(),
        recursive = config.recursive,
        unattended = config.unattended,
        framework = ?config.framework,
        "Configuration loaded"
    );

    let notifier = match Notifier::new(&config.cross_seed_url, config.webhook_timeout) {
        Ok(notifier) => notifier,
        Err(e) => {
            eprintln!("Failed to set up the cross-seed client: {e}");
            return config.framework.failure_code();
        }
    };

    let outcome = run(&config, prompt::confirm, |dest| {
        notifier.trigger(&dest.to_string_lossy())
    });

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{e:#}");
            return config.framework.failure_code();
        }
    };

    if config.report_json {
        let summary = Summary {
            source_dir: &config.source_dir,
            dest_dir: &config.dest_dir,
            discovered: &outcome.discovered,
            scan_errors: outcome.scan_errors.iter().map(ToString::to_string).collect(),
            report: &outcome.report,
            notification: match outcome.notification {
                Notification::Sent => "sent",
                Notification::Declined => "declined",
                Notification::DryRun => "dry_run",
                Notification::Failed(_) => "failed",
            },
            success: outcome.is_success(),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Failed to serialize run summary: {e}"),
        }
    }

    if !outcome.is_success() {
        let failed = outcome.scan_errors.len() + outcome.report.failed.len();
        if failed > 0 {
            eprintln!("Encountered {failed} error(s) during processing:");
            for e in &outcome.scan_errors {
                eprintln!("  - {e}");
            }
            for failure in &outcome.report.failed {
                eprintln!("  - {}", failure.message);
            }
        }
    }

    outcome.exit_code(config.framework)
}
