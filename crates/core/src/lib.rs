#![warn(clippy::all, missing_docs)]

//! Core domain logic for the parking lot simulator.
//!
//! This crate hosts the slot registry, the billing rule, the interaction
//! state machine, configuration handling and vehicle artwork loading used
//! by the terminal UI and any future frontends.

pub mod assets;
pub mod billing;
pub mod clock;
pub mod config;
pub mod geometry;
pub mod session;
pub mod slot;
pub mod vehicle;

pub use assets::{FsImageLoader, ImageHandle, ImageLoader};
pub use billing::BillingPolicy;
pub use clock::{Clock, ManualClock, SystemClock};
pub use crate::config::AppConfig;
pub use geometry::{Point, Rect};
pub use session::{Interaction, Mode, PointerButton, SessionController};
pub use slot::{Slot, SlotRegistry};
pub use vehicle::{Vehicle, VehicleCatalog, VehicleKind};
