#![allow(missing_docs)]

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::{
    geometry::{Point, Rect},
    vehicle::VehicleKind,
};

/// Which menu, if any, is waiting for the next click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// Choosing a vehicle for the empty slot at `slot`; the menu sits at `origin`.
    SelectingVehicle { slot: usize, origin: Point },
    /// Asking whether to remove the vehicle parked at `slot`.
    ConfirmingRemoval { slot: usize },
}

impl Mode {
    /// Slot the pending menu refers to.
    pub fn slot(&self) -> Option<usize> {
        match self {
            Mode::Idle => None,
            Mode::SelectingVehicle { slot, .. } | Mode::ConfirmingRemoval { slot } => Some(*slot),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// What a single input did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Nothing changed.
    Ignored,
    MenuOpened { slot: usize },
    Parked { slot: usize, kind: VehicleKind },
    ConfirmOpened { slot: usize },
    Removed(Receipt),
    /// A pending menu or dialog was closed without side effects.
    Dismissed,
    /// The pending menu pointed at a slot that no longer fits; back to idle.
    Reset,
}

/// Record of one completed removal.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// One-based slot number.
    pub slot: usize,
    pub vehicle: VehicleKind,
    pub parked_for: Duration,
    pub amount: f64,
    /// Wall-clock time, for display only.
    pub removed_at: DateTime<Local>,
}

/// Transient message shown after a removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub posted_at: Instant,
}

impl StatusMessage {
    pub fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.posted_at) <= ttl
    }
}

/// Confirmation dialog geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub frame: Rect,
    pub yes: Rect,
    pub no: Rect,
}

/// Figures for the HUD bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub parked: usize,
    pub total: usize,
    pub revenue: f64,
    pub removals: usize,
}
