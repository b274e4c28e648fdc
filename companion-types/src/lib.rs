//! # companion-types
//!
//! Data model and wire format for the CGM companion-device sync engine.
//!
//! This crate provides the foundational types used across all companion crates:
//! - [`DeviceId`], [`AppId`] - Identity types
//! - [`Device`], [`ConnectionStatus`] - Paired devices and their connectivity
//! - [`CompanionApp`], [`AppStatus`] - Installable apps and their per-device state
//! - [`GlucoseReading`] - Snapshot fetched from the reading source
//! - [`ReadingPayload`] - The device-bound message (compatibility contract)
//! - [`ConnectivityError`], [`PayloadError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod app;
mod device;
mod error;
mod ids;
mod payload;
mod reading;

pub use app::{AppStatus, CompanionApp};
pub use device::{ConnectionStatus, Device};
pub use error::{ConnectivityError, PayloadError};
pub use ids::{AppId, DeviceId};
pub use payload::{ReadingPayload, WireReading, MAX_PAYLOAD_READINGS};
pub use reading::GlucoseReading;
