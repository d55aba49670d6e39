#![allow(missing_docs)]

//! Interaction state machine wrapped around the slot registry.

mod controller;
mod models;

pub use controller::{SessionController, RECEIPT_HISTORY};
pub use models::{ConfirmDialog, Interaction, Mode, PointerButton, Receipt, StatusMessage, Summary};
