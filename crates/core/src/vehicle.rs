//! Vehicle kinds and the catalogue of ready-to-park vehicles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    assets::{ImageHandle, ImageLoader},
    config::AssetConfig,
};

/// Category of vehicle that can occupy a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    /// Passenger car.
    Car,
    /// Motorbike.
    Bike,
    /// Truck.
    Truck,
}

impl VehicleKind {
    /// Every kind, in selection-menu order.
    pub const ALL: [VehicleKind; 3] = [VehicleKind::Car, VehicleKind::Bike, VehicleKind::Truck];

    /// Display name.
    pub fn label(self) -> &'static str {
        match self {
            VehicleKind::Car => "Car",
            VehicleKind::Bike => "Bike",
            VehicleKind::Truck => "Truck",
        }
    }

    /// Keyboard shortcut used in the selection menu.
    pub fn hotkey(self) -> char {
        match self {
            VehicleKind::Car => 'c',
            VehicleKind::Bike => 'b',
            VehicleKind::Truck => 't',
        }
    }

    /// Inverse of [`VehicleKind::hotkey`], case-insensitive.
    pub fn from_hotkey(ch: char) -> Option<Self> {
        let ch = ch.to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.hotkey() == ch)
    }
}

/// A vehicle as stored in a slot: kind, display name and optional artwork.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    kind: VehicleKind,
    name: String,
    image: Option<ImageHandle>,
}

impl Vehicle {
    /// Build a vehicle.
    pub fn new(kind: VehicleKind, name: impl Into<String>, image: Option<ImageHandle>) -> Self {
        Self {
            kind,
            name: name.into(),
            image,
        }
    }

    /// Vehicle without artwork, named after its kind.
    pub fn plain(kind: VehicleKind) -> Self {
        Self::new(kind, kind.label(), None)
    }

    /// Category tag.
    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Artwork, when it was loaded successfully.
    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }
}

/// Prototype vehicles for every kind; parking clones from here.
#[derive(Debug, Clone)]
pub struct VehicleCatalog {
    vehicles: HashMap<VehicleKind, Vehicle>,
}

impl VehicleCatalog {
    /// Catalogue with no artwork at all.
    pub fn plain() -> Self {
        Self {
            vehicles: VehicleKind::ALL
                .into_iter()
                .map(|kind| (kind, Vehicle::plain(kind)))
                .collect(),
        }
    }

    /// Build the catalogue, loading each kind's image from the asset
    /// directory. Kinds whose image fails to load get no artwork.
    pub fn load(loader: &impl ImageLoader, assets: &AssetConfig) -> Self {
        let vehicles = VehicleKind::ALL
            .into_iter()
            .map(|kind| {
                let path = assets.directory.join(assets.file_for(kind));
                let image = loader.load(&path);
                (kind, Vehicle::new(kind, kind.label(), image))
            })
            .collect::<HashMap<_, _>>();
        let with_art = vehicles.values().filter(|v| v.image.is_some()).count();
        info!(
            directory = %assets.directory.display(),
            with_art,
            "Vehicle catalogue ready"
        );
        Self { vehicles }
    }

    /// Prototype for `kind`.
    pub fn get(&self, kind: VehicleKind) -> Vehicle {
        self.vehicles
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Vehicle::plain(kind))
    }
}

impl Default for VehicleCatalog {
    fn default() -> Self {
        Self::plain()
    }
}
