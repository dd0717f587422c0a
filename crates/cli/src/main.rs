// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! shine - administration tool for a parallel networked file system
//!
//! One invocation drives a cluster-wide lifecycle operation across the
//! servers of a file system. With `-R` the tool runs as the distant peer
//! of another invocation and reports framed events on stdout.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod model;
mod output;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use shine_adapters::SshShell;
use shine_core::{NodeSet, Settings, State};
use shine_engine::{FileSystem, MountdataPolicy, OpOptions, TuningModel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shine",
    version,
    about = "Administration of a parallel networked file system"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct CommonOpts {
    /// File system to operate on
    #[arg(short = 'f', long = "fsname", value_name = "FSNAME")]
    fsname: String,

    /// Remote mode: emit framed events on stdout for a calling invocation
    #[arg(short = 'R', long = "remote")]
    remote: bool,

    /// Verbose debug output
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Comma-separated component labels to restrict the operation to
    #[arg(short = 'l', long = "labels", value_name = "LABELS")]
    labels: Option<String>,

    /// Additional options for the underlying tool (the command itself for
    /// `execute`)
    #[arg(short = 'o', long = "addopts", value_name = "OPTIONS")]
    addopts: Option<String>,

    /// Failover candidate nodes
    #[arg(short = 'F', long = "failover", value_name = "NODES")]
    failover: Option<String>,

    /// On-disk metadata checks: auto, never or always
    #[arg(long = "mountdata", value_name = "POLICY", default_value = "auto")]
    mountdata: String,
}

#[derive(Subcommand)]
enum Command {
    /// Format the target devices of the file system
    Format(CommonOpts),
    /// Re-tune the on-disk configuration of the targets
    Tunefs(CommonOpts),
    /// Check the backing file system of the targets
    Fsck(CommonOpts),
    /// Report the state of every component
    Status(CommonOpts),
    /// Start the file system servers
    Start(CommonOpts),
    /// Stop the file system servers
    Stop(CommonOpts),
    /// Mount the file system clients
    Mount(CommonOpts),
    /// Unmount the file system clients
    Umount(CommonOpts),
    /// Run a custom command on the component servers
    Execute(CommonOpts),
    /// Apply the tuning configuration on every server
    Tune(CommonOpts),
    /// Push the file system configuration file onto its servers
    Install {
        #[command(flatten)]
        common: CommonOpts,
        /// Configuration file to push (defaults to the model file)
        #[arg(long = "config", value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Remove the file system configuration file everywhere
    Remove(CommonOpts),
}

impl Command {
    fn common(&self) -> &CommonOpts {
        match self {
            Command::Format(c)
            | Command::Tunefs(c)
            | Command::Fsck(c)
            | Command::Status(c)
            | Command::Start(c)
            | Command::Stop(c)
            | Command::Mount(c)
            | Command::Umount(c)
            | Command::Execute(c)
            | Command::Tune(c)
            | Command::Remove(c) => c,
            Command::Install { common, .. } => common,
        }
    }
}

fn load_settings() -> Settings {
    let path = std::env::var_os("SHINE_CONF")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/etc/shine/shine.toml"));
    if path.exists() {
        match Settings::load(&path) {
            Ok(settings) => return settings,
            Err(err) => tracing::warn!(error = %err, "cannot load settings, using defaults"),
        }
    }
    Settings::default()
}

fn load_tuning(settings: &Settings) -> TuningModel {
    let Some(path) = &settings.tuning_file else {
        return TuningModel::default();
    };
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(error = %err, "cannot read tuning file");
            return TuningModel::default();
        }
    };
    match toml::from_str(&raw) {
        Ok(model) => model,
        Err(err) => {
            tracing::warn!(error = %err, "invalid tuning file");
            TuningModel::default()
        }
    }
}

/// Restrict an operation to the components named with `-l`.
fn selection(fs: &FileSystem, labels: Option<&str>) -> Option<Vec<String>> {
    labels.map(|labels| {
        let all = fs.components.ids();
        fs.components.select_labels(&all, labels)
    })
}

fn op_options(common: &CommonOpts) -> Result<OpOptions> {
    let Some(mountdata) = MountdataPolicy::parse(&common.mountdata) else {
        bail!("invalid --mountdata value '{}'", common.mountdata);
    };
    Ok(OpOptions {
        addopts: common.addopts.clone(),
        failover: common.failover.clone(),
        mountdata,
    })
}

/// States counted as success, per operation result.
fn succeeded(op: &Command, state: State) -> bool {
    match op {
        Command::Format(_)
        | Command::Tunefs(_)
        | Command::Fsck(_)
        | Command::Stop(_)
        | Command::Umount(_)
        | Command::Remove(_) => state == State::Offline,
        _ => matches!(state, State::Mounted | State::Recovering | State::Offline),
    }
}

fn print_summary(fs: &FileSystem) {
    for comp in fs.components.iter() {
        let status = match comp.as_target() {
            Some(target) => target.text_status(),
            None => comp
                .state()
                .map(|s| s.text().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };
        println!("{:<24} {}", comp.label(), status);
    }
    for (nodes, message) in &fs.proxy_errors {
        eprintln!("{nodes}: {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SHINE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let common = cli.command.common().clone();

    let settings = load_settings();
    let mut fs = model::load_fs(&common.fsname, &settings)?;
    fs.debug = common.debug;

    if common.remote {
        fs.set_event_handler(Box::new(output::RemoteHandler));
    } else {
        fs.set_event_handler(Box::new(output::ConsoleHandler {
            verbose: common.debug,
        }));
    }

    // Apply the failover hint to the local model before operating.
    if let Some(failover) = &common.failover {
        let candidates = NodeSet::from(failover.as_str());
        let ids = fs.components.ids();
        for id in ids {
            if let Some(target) = fs
                .components
                .get_mut(&id)
                .and_then(shine_core::Component::as_target_mut)
            {
                target.failover(&candidates)?;
            }
        }
    }

    let comps = selection(&fs, common.labels.as_deref());
    let opts = op_options(&common)?;
    let shell = SshShell;

    let state = match &cli.command {
        Command::Format(_) => fs.format(&shell, comps, &opts).await?,
        Command::Tunefs(_) => fs.tunefs(&shell, comps, &opts).await?,
        Command::Fsck(_) => fs.fsck(&shell, comps, &opts).await?,
        Command::Status(_) => fs.status(&shell, comps, &opts).await?,
        Command::Start(_) => fs.start(&shell, comps, &opts).await?,
        Command::Stop(_) => fs.stop(&shell, comps, &opts).await?,
        Command::Mount(_) => fs.mount(&shell, comps, &opts).await?,
        Command::Umount(_) => fs.umount(&shell, comps, &opts).await?,
        Command::Execute(_) => fs.execute(&shell, comps, &opts).await?,
        Command::Tune(_) => {
            let model = load_tuning(&settings);
            fs.tune(&shell, &model, comps, &opts).await?
        }
        Command::Install { config, .. } => {
            let file = config
                .clone()
                .unwrap_or_else(|| settings.fs_conf_file(&common.fsname));
            fs.install(&shell, &file).await?;
            State::Offline
        }
        Command::Remove(_) => fs.remove(&shell).await?,
    };

    if !common.remote {
        print_summary(&fs);
    }

    if succeeded(&cli.command, state) {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
