// SPDX-License-Identifier: GPL-3.0-only
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use crate::bays::{DeviceEnumerator, LedProjector, TopologyResolver};
use crate::cli::Args;
use crate::config::Config;
use crate::error::AppError;
use crate::hotplug::{HotplugLoop, UdevMonitor};
use crate::leds::dry_run::DryRunLeds;
use crate::leds::{LedBackend, LedColor, LedControl, LedState, MAX_BAYS};
use crate::light_show::LightShow;
use crate::shutdown::ShutdownSignal;

#[macro_use]
extern crate tracing;

mod bays;
mod cli;
mod config;
mod daemon;
mod error;
mod hotplug;
mod leds;
mod light_show;
mod shutdown;

/// Forward `log` records from dependencies into tracing
fn install_log_bridge() -> std::result::Result<(), tracing_log::log::SetLoggerError> {
    tracing_log::LogTracer::init()
}

fn setup_logs(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let bridge = install_log_bridge();

    let fmt_layer = fmt::layer().with_target(false);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));

    #[cfg(feature = "journald")]
    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    }

    #[cfg(not(feature = "journald"))]
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    if let Err(e) = bridge {
        warn!("log records will not be captured: {}", e);
    }
}

/// Resolve attached drives, then follow hotplug events until shutdown
fn monitor_bays(leds: &mut dyn LedControl, config: &Config, shutdown: &ShutdownSignal) -> Result<()> {
    let resolver = TopologyResolver::new(config.topology.clone());

    // Subscribe first so drives arriving during the scan are queued
    let source = UdevMonitor::new(resolver.config())?;

    let enumerator = DeviceEnumerator::new(&resolver);
    let enumeration = enumerator.enumerate(enumerator.scan()?);

    let mut projector = LedProjector::new(Some(leds), config.presence_color.into());
    enumeration.project(&mut projector);

    let mut hotplug = HotplugLoop::new(source, &resolver, enumeration.offset, projector, shutdown);
    hotplug.run()?;
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config = Config::load(args.config.as_deref()).unwrap_or_else(|e| {
        error!("{}, using defaults", e);
        Config::default()
    });

    let shutdown = ShutdownSignal::install()?;

    let mut leds = if args.dry_run {
        LedBackend::DryRun(DryRunLeds)
    } else {
        LedBackend::probe()
            .context("Failed to probe LED hardware")?
            .ok_or(AppError::NoLedInterface)?
    };

    daemon::drop_privileges();

    if let Some(on) = args.usb {
        info!("{}ounting USB device", if on { "M" } else { "Unm" });
        leds.mount_usb(on).context("Failed to switch the USB device")?;
    }

    if args.daemon {
        daemon::detach()?;
    }

    info!("Found: {}", leds.describe());

    // steady blue instead of the firmware's blinking
    leds.set_system_led(LedColor::RED, LedState::Off)?;
    leds.set_system_led(LedColor::BLUE, LedState::On)?;

    if let Some(level) = args.brightness(&config) {
        leds.set_brightness(level).context("Failed to set LED brightness")?;
    }

    for index in 0..MAX_BAYS {
        leds.set_bay(LedColor::BLUE | LedColor::RED, index, args.xmas)?;
    }
    if args.xmas {
        return Ok(());
    }

    if let Some(mut show) = LightShow::new(args.light_show) {
        return show.run(&mut leds, &shutdown);
    }

    monitor_bays(&mut leds, &config, &shutdown)?;

    leds.set_system_led(LedColor::BLUE, LedState::Blink)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logs(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            if !daemon::is_root() {
                error!("Try running as root");
            }
            ExitCode::FAILURE
        }
    }
}
