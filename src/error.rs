// SPDX-License-Identifier: GPL-3.0-only
//! Error types for the daemon
//!
//! Only subsystem-level failures live here. Problems with a single device
//! or event are logged where they happen and never become an `AppError`.

use std::path::PathBuf;

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// udev context, filter or socket setup failed
    #[error("Failed to subscribe to device notifications ({stage}): {source}")]
    Subscribe {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Scanning already attached devices failed
    #[error("Failed to enumerate attached devices: {0}")]
    Enumerate(#[source] std::io::Error),

    /// The blocking wait failed for a reason other than a signal
    #[error("Waiting for device notifications failed: {0}")]
    Wait(#[source] std::io::Error),

    /// Installing the SIGINT/SIGTERM handlers failed
    #[error("Failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),

    /// No LED driver recognised the hardware
    #[error("Failed to find an LED control interface")]
    NoLedInterface,

    /// Detaching from the terminal failed
    #[error("Failed to run as a daemon: {0}")]
    Daemonize(#[source] std::io::Error),

    /// Configuration file could not be read or parsed
    #[error("Configuration error in {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;
