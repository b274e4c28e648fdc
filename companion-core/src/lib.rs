//! # companion-core
//!
//! Pure logic for the CGM companion-device sync engine (no I/O, instant tests).
//!
//! This crate implements the transition rules and policies of the engine
//! without any provider, disk or timer access, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`registration`]: how an app's install/registration state reacts to
//!   install queries and disconnects, and which provider call that requires
//! - [`delivery`]: when each delivery attempt of a reading push happens
//! - [`command`]: which inbound app messages trigger a push
//! - [`catalog`]: the validated list of companion apps every session exposes
//!
//! The actual I/O is performed by `companion-engine`, which interprets the
//! actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod command;
pub mod delivery;
pub mod registration;

pub use catalog::{CatalogError, CompanionCatalog, DATA_FIELD_APP_ID, WATCH_FACE_APP_ID};
pub use command::InboundCommand;
pub use delivery::{DeliveryPolicy, DEFAULT_REPEAT_DELAY};
pub use registration::{AppEvent, RegistrationAction};
