//! BirdNET setup - provision model checkpoints and inspect training caches
//!
//! Downloads and unpacks the configured model release when any of its files
//! is missing. Failures are appended to the configured error log.
//!
//! ## Command line flags
//!
//! - `--config <path>`: YAML config file (default: `<user cache dir>/birdnet/config.yaml`)
//! - `--check`: only report whether the model is installed, never download
//! - `--inspect <cache>`: print a summary of a training cache archive

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use birdnet_core::config::{default_config_path, load_config, Config};
use birdnet_core::{load_cache, run_logged, ErrorLog, ModelProvisioner, ProvisionOutcome};

struct Options {
    config_path: PathBuf,
    check_only: bool,
    inspect: Option<PathBuf>,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let value_after = |flag: &str| {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|i| args.get(i + 1))
            .map(PathBuf::from)
    };

    Options {
        config_path: value_after("--config").unwrap_or_else(|| default_config_path("config.yaml")),
        check_only: args.iter().any(|arg| arg == "--check"),
        inspect: value_after("--inspect"),
    }
}

fn provision(config: &Config, check_only: bool) -> Result<bool> {
    let mut provisioner = ModelProvisioner::from_config(&config.model);

    if check_only {
        let installed = provisioner.is_installed();
        println!(
            "Model {} {}",
            provisioner.release().version,
            if installed { "installed" } else { "missing" }
        );
        return Ok(installed);
    }

    let last_logged = AtomicU32::new(0);
    provisioner = provisioner.with_progress(Box::new(move |fraction: f32| {
        let percent = (fraction * 100.0) as u32;
        if percent >= last_logged.load(Ordering::Relaxed) + 10 {
            last_logged.store(percent, Ordering::Relaxed);
            log::info!("Model download {}%", percent);
        }
    }));

    let error_log = ErrorLog::new(&config.error_log.path);
    let outcome = run_logged(&error_log, || provisioner.ensure())
        .with_context(|| format!("Failed to provision model in {:?}", config.model.checkpoints_dir))?;

    match outcome {
        ProvisionOutcome::Bundled => println!("Bundled deployment, model assets embedded"),
        ProvisionOutcome::AlreadyPresent => println!("Model found at {:?}", provisioner.model_dir()),
        ProvisionOutcome::Downloaded { bytes } => {
            println!("Model installed at {:?} ({} bytes downloaded)", provisioner.model_dir(), bytes)
        }
    }
    Ok(true)
}

fn inspect(path: &Path, config: &Config) -> Result<()> {
    let error_log = ErrorLog::new(&config.error_log.path);
    let cache = run_logged(&error_log, || load_cache(path, &config.preprocessing))
        .with_context(|| format!("Failed to load cache {:?}", path))?;

    println!("Cache: {:?}", path);
    println!("  train: {:?} -> {:?}", cache.x_train.dim(), cache.y_train.dim());
    println!("  test:  {:?} -> {:?}", cache.x_test.dim(), cache.y_test.dim());
    println!("  labels: {}", cache.labels.len());
    println!(
        "  binary_classification: {}, multi_label: {}",
        cache.binary_classification, cache.multi_label
    );
    match (&cache.snapshot, &cache.stale) {
        (None, _) => println!("  preprocessing: not recorded (legacy cache)"),
        (Some(_), None) => println!("  preprocessing: matches current settings"),
        (Some(_), Some(warning)) => println!("  preprocessing: STALE - {}", warning),
    }
    Ok(())
}

/// Read the config file, sanitizing preprocessing values unless a cache is
/// being inspected. Caches record the settings as written, so inspection
/// compares against the file's raw values.
fn load_settings(path: &Path, sanitize: bool) -> Config {
    let mut config: Config = load_config(path);
    if sanitize {
        config.preprocessing.validate();
    }
    config
}

fn main() -> ExitCode {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let options = parse_args();
    let config = load_settings(&options.config_path, options.inspect.is_none());

    log::info!("birdnet-setup starting, checkpoints at {:?}", config.model.checkpoints_dir);

    let result = match &options.inspect {
        Some(path) => inspect(path, &config).map(|_| true),
        None => provision(&config, options.check_only),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
