// Tabletkbd CLI
// Blocks the keyboard while a convertible is folded into tablet mode

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;

use tabletkbd_core::{reconcile, Config, DeviceResolver};

/// Exit status when no tablet-mode switch can be found
const EXIT_DEVICE_NOT_FOUND: u8 = 2;

/// Tablet-mode keyboard blocker for keyd
#[derive(Parser, Debug)]
#[command(name = "tabletkbd")]
#[command(version)]
#[command(about = "Toggles a keyboard-blocking keyd policy on tablet-mode switch events", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Use this input device instead of resolving it
    #[arg(short, long, value_name = "DEVICE")]
    device: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// Print the resolved switch device and exit
    #[arg(long)]
    resolve_only: bool,

    /// Print an annotated default config and exit
    #[arg(long)]
    print_default_config: bool,
}

/// Main application state
struct Application {
    config: Config,
    args: Args,
}

impl Application {
    fn new(args: Args) -> anyhow::Result<Self> {
        let mut config = Config::load(args.config.as_deref()).context("loading config")?;
        if let Some(device) = &args.device {
            config.device.path = Some(device.clone());
        }
        Ok(Self { config, args })
    }

    fn describe(&self) {
        match &self.config.source_path {
            Some(path) => log::debug!("Config: {}", path.display()),
            None => log::debug!("Config: built-in defaults"),
        }
        log::debug!(
            "Policy dir {} ({}), lock {:?} on {}",
            self.config.policy.dir.display(),
            self.config.policy.layout().blocking_active(),
            self.config.lock.mode,
            self.config.lock.file
        );
    }

    fn resolve(&self) -> Option<PathBuf> {
        match self.config.build_resolver().resolve() {
            Ok(path) => {
                log::info!("Found Tablet Mode Switch at {}", path.display());
                Some(path)
            }
            Err(e) => {
                eprintln!("Tablet Mode Switch not found: {}", e);
                None
            }
        }
    }

    fn run(&self) -> anyhow::Result<ExitCode> {
        self.describe();

        // Never leave the keyboard blocked across a restart
        let toggler = self.config.build_toggler();
        match reconcile(&toggler) {
            Ok(Some(report)) => log::debug!("Startup reconcile: {:?}", report),
            Ok(None) => {}
            Err(e) => log::error!("Startup reconcile failed: {}", e),
        }

        let Some(device) = self.resolve() else {
            return Ok(ExitCode::from(EXIT_DEVICE_NOT_FOUND));
        };

        let monitor = tabletkbd_core::Monitor::new(self.config.build_lock(), toggler);
        let summary = monitor
            .run_device(&device)
            .with_context(|| format!("monitoring {}", device.display()))?;

        log::warn!(
            "Event stream from {} ended ({} records, {} switch events, {} failed transitions)",
            device.display(),
            summary.records,
            summary.switch_events,
            summary.failures
        );
        Ok(ExitCode::SUCCESS)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.print_default_config {
        print!("{}", tabletkbd_core::config::default_config_content());
        return ExitCode::SUCCESS;
    }

    let app = match Application::new(args) {
        Ok(app) => app,
        Err(e) => {
            log::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if app.args.check_config {
        println!("Configuration is valid");
        return ExitCode::SUCCESS;
    }

    if app.args.resolve_only {
        return match app.resolve() {
            Some(path) => {
                println!("{}", path.display());
                ExitCode::SUCCESS
            }
            None => ExitCode::from(EXIT_DEVICE_NOT_FOUND),
        };
    }

    match app.run() {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
