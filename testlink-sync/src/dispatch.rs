// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result, TestlinkSyncExitCode,
    outbox::JsonLinesOutbox,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
};
use testlink_runner::{
    catalog::{Catalog, CatalogSnapshot},
    config::{ReconcileConfig, ReconcileSettings, SeekerConfig},
    reconcile::{BuildOutcome, Reconciler, RunSummary},
};
use tracing::{debug, info};

/// Report automated test results into a test-management catalog.
///
/// Reads JUnit, TestNG and TAP reports, matches them to test cases through their key custom
/// fields, and writes one result per test case to an outbox of JSON lines.
#[derive(Debug, Parser)]
#[command(
    version,
    name = "testlink-sync",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct TestlinkSyncApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(subcommand)]
    command: Command,
}

impl TestlinkSyncApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Run(opts) => opts.exec(&self.config_opts, output, output_writer),
            Command::ShowConfig => {
                let config = self.config_opts.make_config()?;
                show_config(&config, output_writer)?;
                Ok(TestlinkSyncExitCode::OK)
            }
        }
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Directory reports are searched in
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        default_value = ".",
        env = "TESTLINK_BASE_DIR"
    )]
    base_dir: Utf8PathBuf,

    /// Config file [default: base-dir/.config/testlink.toml]
    #[arg(
        long,
        global = true,
        alias = "config",
        value_name = "PATH",
        env = "TESTLINK_CONFIG"
    )]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn base_dir(&self) -> Result<&Utf8Path> {
        if self.base_dir.is_dir() {
            Ok(&self.base_dir)
        } else {
            Err(ExpectedError::BaseDirNotFound {
                base_dir: self.base_dir.clone(),
            })
        }
    }

    fn make_config(&self) -> Result<ReconcileConfig> {
        let config = ReconcileConfig::from_sources(self.base_dir()?, self.config_file.as_deref())?;
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile reports with the catalog and write results to the outbox
    ///
    /// Exits with 10 if some results or attachments could not be written, and with 100 if the
    /// build is marked as failed by configuration.
    Run(RunOpts),

    /// Print the effective configuration as JSON
    ShowConfig,
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Catalog snapshot to match against, as JSON
    #[arg(long, value_name = "PATH", env = "TESTLINK_CATALOG")]
    catalog: Utf8PathBuf,

    /// Write results to this file instead of standard output
    #[arg(long, value_name = "PATH")]
    outbox: Option<Utf8PathBuf>,

    /// Mark the build as failed if any result is failed
    #[arg(long)]
    failed_tests_mark_build_as_failure: bool,

    /// Mark the build as failed if no result is produced
    #[arg(long)]
    fail_if_no_results: bool,
}

impl RunOpts {
    fn exec(
        self,
        config_opts: &ConfigOpts,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let base_dir = config_opts.base_dir()?;
        let config = self.apply_overrides(config_opts.make_config()?)?;
        debug!(
            base_dir = %base_dir,
            seekers = config.seekers().len(),
            verbose = output.verbose,
            "loaded config"
        );

        let mut catalog = Catalog::new(CatalogSnapshot::from_path(&self.catalog)?);
        let reconciler = Reconciler::new(&config, base_dir)?;

        let summary = match &self.outbox {
            Some(path) => {
                let file = File::create(path)
                    .map_err(|err| ExpectedError::outbox_create_error(path.clone(), err))?;
                run_into(&reconciler, &mut catalog, BufWriter::new(file))?
            }
            None => run_into(&reconciler, &mut catalog, output_writer.stdout_writer())?,
        };

        info!(
            "{} results reported ({} passed, {} failed, {} blocked), {} test cases not run",
            summary.updated, summary.passed, summary.failed, summary.blocked, summary.not_run,
        );
        match summary.outcome {
            BuildOutcome::Success => Ok(TestlinkSyncExitCode::OK),
            outcome => Err(ExpectedError::RunUnsuccessful { outcome }),
        }
    }

    /// Command-line flags can only turn settings on.
    fn apply_overrides(&self, config: ReconcileConfig) -> Result<ReconcileConfig> {
        let settings = config.settings();
        let settings = ReconcileSettings {
            failed_tests_mark_build_as_failure: settings.failed_tests_mark_build_as_failure
                || self.failed_tests_mark_build_as_failure,
            fail_if_no_results: settings.fail_if_no_results || self.fail_if_no_results,
        };
        Ok(ReconcileConfig::new(settings, config.seekers().to_vec())?)
    }
}

fn run_into<W: Write>(
    reconciler: &Reconciler<'_>,
    catalog: &mut Catalog,
    writer: W,
) -> Result<RunSummary> {
    let mut outbox = JsonLinesOutbox::new(writer);
    let summary = reconciler.run(catalog, &mut outbox)?;
    outbox.finish().map_err(ExpectedError::write_output_error)?;
    Ok(summary)
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct ShowConfig<'a> {
    reconcile: &'a ReconcileSettings,
    seeker: &'a [SeekerConfig],
}

fn show_config(config: &ReconcileConfig, output_writer: &mut OutputWriter) -> Result<()> {
    let show = ShowConfig {
        reconcile: config.settings(),
        seeker: config.seekers(),
    };
    let mut writer = output_writer.stdout_writer();
    serde_json::to_writer_pretty(&mut writer, &show)
        .map_err(|err| ExpectedError::write_output_error(err.into()))?;
    writeln!(writer).map_err(ExpectedError::write_output_error)?;
    writer.flush().map_err(ExpectedError::write_output_error)
}
