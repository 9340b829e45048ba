// SPDX-License-Identifier: GPL-3.0-only
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Config;

/// Drive bay LED daemon for HP MediaSmart Server class hardware
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Set LED brightness (1 to 9, 0 turns the LEDs off; larger values act as 9)
    #[arg(long, value_name = "X")]
    pub brightness: Option<u8>,

    /// Detach and run in the background
    #[arg(short = 'D', long)]
    pub daemon: bool,

    /// Print debug messages
    #[arg(long)]
    pub debug: bool,

    /// Verbose (use twice to be more verbose)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Run a light show instead of monitoring drives
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub light_show: u32,

    /// Connect (1) or disconnect (0) the internal USB device
    #[arg(long, value_name = "0|1", value_parser = parse_switch)]
    pub usb: Option<bool>,

    /// Light all the LEDs up like a xmas tree and exit
    #[arg(long)]
    pub xmas: bool,

    /// Log LED changes instead of touching the hardware
    #[arg(long, env = "BAYLIGHTD_DRY_RUN")]
    pub dry_run: bool,

    /// Configuration file
    #[arg(short, long, env = "BAYLIGHTD_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

fn parse_switch(value: &str) -> Result<bool, String> {
    value
        .trim()
        .parse::<i64>()
        .map(|n| n != 0)
        .map_err(|_| format!("expected 0 or 1, got '{value}'"))
}

impl Args {
    /// Default tracing filter when RUST_LOG is unset
    pub fn log_filter(&self) -> String {
        let level = match (self.debug, self.verbose) {
            (_, 2..) => "trace",
            (true, _) | (_, 1) => "debug",
            _ => "info",
        };
        format!("warn,{}={}", env!("CARGO_CRATE_NAME"), level)
    }

    /// Brightness to apply, command line first
    pub fn brightness(&self, config: &Config) -> Option<u8> {
        self.brightness.or(config.brightness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["baylightd"]);
        assert!(!args.daemon && !args.xmas && !args.debug);
        assert_eq!(args.light_show, 0);
        assert_eq!(args.usb, None);
        assert_eq!(args.verbose, 0);
        assert!(args.log_filter().ends_with("=info"));
    }

    #[test]
    fn test_short_flags() {
        let args = Args::parse_from(["baylightd", "-D", "-vv", "--light-show", "3"]);
        assert!(args.daemon);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.light_show, 3);
        assert!(args.log_filter().ends_with("=trace"));
    }

    #[test]
    fn test_usb_switch() {
        assert_eq!(Args::parse_from(["baylightd", "--usb", "1"]).usb, Some(true));
        assert_eq!(Args::parse_from(["baylightd", "--usb=0"]).usb, Some(false));
        assert!(Args::try_parse_from(["baylightd", "--usb", "on"]).is_err());
    }

    #[test]
    fn test_debug_flag_level() {
        let args = Args::parse_from(["baylightd", "--debug"]);
        assert!(args.log_filter().ends_with("=debug"));
    }

    #[test]
    fn test_brightness_accepts_original_range() {
        // the driver clamps anything above its top level
        assert_eq!(Args::parse_from(["baylightd", "--brightness", "10"]).brightness, Some(10));
        assert_eq!(Args::parse_from(["baylightd", "--brightness", "1"]).brightness, Some(1));
        assert!(Args::try_parse_from(["baylightd", "--brightness", "-1"]).is_err());
    }

    #[test]
    fn test_brightness_precedence() {
        let config = Config {
            brightness: Some(4),
            ..Config::default()
        };
        assert_eq!(Args::parse_from(["baylightd"]).brightness(&config), Some(4));
        assert_eq!(Args::parse_from(["baylightd", "--brightness", "9"]).brightness(&config), Some(9));
        assert_eq!(Args::parse_from(["baylightd"]).brightness(&Config::default()), None);
    }
}
