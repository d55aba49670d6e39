//! Parking slots and the registry that owns them.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::{
    billing::BillingPolicy,
    config::LayoutConfig,
    geometry::{Point, Rect},
    vehicle::Vehicle,
};

/// Who is parked in a slot and since when.
#[derive(Debug, Clone, PartialEq)]
pub struct Occupant {
    vehicle: Vehicle,
    entered_at: Instant,
    overstay: bool,
}

impl Occupant {
    /// The parked vehicle.
    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    /// Moment the vehicle was parked.
    pub fn entered_at(&self) -> Instant {
        self.entered_at
    }
}

/// A fixed-position parking space.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    index: usize,
    rect: Rect,
    occupant: Option<Occupant>,
}

impl Slot {
    /// Empty slot at registry position `index` covering `rect`.
    pub fn new(index: usize, rect: Rect) -> Self {
        Self {
            index,
            rect,
            occupant: None,
        }
    }

    /// Registry position.
    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based number shown to users.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Fixed on-screen geometry.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Whether `point` lies within the slot, edges included.
    pub fn contains(&self, point: Point) -> bool {
        self.rect.contains(point)
    }

    /// Whether a vehicle is parked here.
    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Whether the occupant has been flagged as past the flat-rate threshold.
    pub fn is_overstay(&self) -> bool {
        self.occupant.as_ref().is_some_and(|o| o.overstay)
    }

    /// Current occupant, if any.
    pub fn occupant(&self) -> Option<&Occupant> {
        self.occupant.as_ref()
    }

    /// Parked vehicle, if any.
    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.occupant.as_ref().map(|o| &o.vehicle)
    }

    /// Park `vehicle` at `now`. Returns `false` and leaves the slot untouched
    /// when it is already occupied.
    pub fn park(&mut self, vehicle: Vehicle, now: Instant) -> bool {
        if self.occupant.is_some() {
            return false;
        }
        self.occupant = Some(Occupant {
            vehicle,
            entered_at: now,
            overstay: false,
        });
        true
    }

    /// Time parked so far; zero when empty.
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.occupant
            .as_ref()
            .map(|o| now.saturating_duration_since(o.entered_at))
            .unwrap_or(Duration::ZERO)
    }

    /// [`Slot::elapsed`] in fractional seconds.
    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        self.elapsed(now).as_secs_f64()
    }

    /// Bill the occupant would pay if removed at `now`.
    pub fn current_bill(&self, policy: &BillingPolicy, now: Instant) -> Option<f64> {
        self.occupant
            .as_ref()
            .map(|_| policy.compute_bill(self.elapsed(now)))
    }

    /// Bill the occupant, then empty the slot. `None` for an empty slot.
    pub fn remove_and_bill(&mut self, policy: &BillingPolicy, now: Instant) -> Option<f64> {
        let bill = self.current_bill(policy, now)?;
        self.occupant = None;
        Some(bill)
    }

    /// Latch the overstay flag once the occupant passes the threshold.
    /// Returns `true` when the flag was newly set.
    pub fn refresh_overstay(&mut self, policy: &BillingPolicy, now: Instant) -> bool {
        let elapsed = self.elapsed(now);
        match self.occupant.as_mut() {
            Some(occupant) if !occupant.overstay && policy.is_overstay(elapsed) => {
                occupant.overstay = true;
                true
            }
            _ => false,
        }
    }
}

/// Ordered collection of slots. Order is registry order for hit-testing.
#[derive(Debug, Clone, Default)]
pub struct SlotRegistry {
    slots: Vec<Slot>,
}

impl SlotRegistry {
    /// Registry with one empty slot per rectangle.
    pub fn new(rects: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            slots: rects
                .into_iter()
                .enumerate()
                .map(|(index, rect)| Slot::new(index, rect))
                .collect(),
        }
    }

    /// Registry laid out as a centred grid.
    pub fn from_layout(layout: &LayoutConfig) -> Self {
        Self::new(layout.slot_rects())
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at `index`.
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Mutable slot at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    /// Slots in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Index of the first slot containing `point`.
    pub fn hit_test(&self, point: Point) -> Option<usize> {
        self.slots.iter().position(|slot| slot.contains(point))
    }

    /// Number of occupied slots.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_occupied()).count()
    }

    /// Run the overstay latch over every slot; returns how many were newly flagged.
    pub fn refresh_overstay(&mut self, policy: &BillingPolicy, now: Instant) -> usize {
        let mut flagged = 0;
        for slot in &mut self.slots {
            if slot.refresh_overstay(policy, now) {
                debug!(slot = slot.number(), "Overstay detected");
                flagged += 1;
            }
        }
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{Clock, ManualClock},
        vehicle::VehicleKind,
    };

    fn slot() -> Slot {
        Slot::new(0, Rect::new(0, 0, 10, 10))
    }

    #[test]
    fn park_starts_the_timer_at_zero() {
        let clock = ManualClock::new();
        let mut slot = slot();
        assert_eq!(slot.elapsed(clock.now()), Duration::ZERO);
        assert!(slot.park(Vehicle::plain(VehicleKind::Car), clock.now()));
        assert!(slot.is_occupied());
        assert!(!slot.is_overstay());
        assert!(slot.elapsed_secs(clock.now()) < 1e-6);

        clock.advance_secs(2.5);
        assert_eq!(slot.elapsed(clock.now()), Duration::from_millis(2500));
    }

    #[test]
    fn parking_an_occupied_slot_is_a_no_op() {
        let clock = ManualClock::new();
        let mut slot = slot();
        slot.park(Vehicle::plain(VehicleKind::Car), clock.now());
        clock.advance_secs(5.0);
        assert!(!slot.park(Vehicle::plain(VehicleKind::Truck), clock.now()));
        assert_eq!(slot.vehicle().map(Vehicle::kind), Some(VehicleKind::Car));
        assert_eq!(slot.elapsed(clock.now()), Duration::from_secs(5));
    }

    #[test]
    fn billing_follows_the_clock() {
        let policy = BillingPolicy::default();
        let clock = ManualClock::new();
        let mut slot = slot();
        slot.park(Vehicle::plain(VehicleKind::Bike), clock.now());

        clock.advance_secs(30.0);
        assert_eq!(slot.current_bill(&policy, clock.now()), Some(100.0));
        clock.advance_secs(1.4);
        assert_eq!(slot.current_bill(&policy, clock.now()), Some(101.0));
        clock.advance_secs(58.6);
        assert_eq!(slot.current_bill(&policy, clock.now()), Some(160.0));

        let expected = slot.current_bill(&policy, clock.now());
        assert_eq!(slot.remove_and_bill(&policy, clock.now()), expected);
        assert!(!slot.is_occupied());
        assert!(!slot.is_overstay());
        assert_eq!(slot.elapsed(clock.now()), Duration::ZERO);
        assert_eq!(slot.current_bill(&policy, clock.now()), None);
    }

    #[test]
    fn removing_from_an_empty_slot_bills_nothing() {
        let clock = ManualClock::new();
        let mut slot = slot();
        assert_eq!(
            slot.remove_and_bill(&BillingPolicy::default(), clock.now()),
            None
        );
    }

    #[test]
    fn overstay_latches_until_removal() {
        let policy = BillingPolicy::default();
        let clock = ManualClock::new();
        let mut slot = slot();
        assert!(!slot.refresh_overstay(&policy, clock.now()));

        slot.park(Vehicle::plain(VehicleKind::Car), clock.now());
        clock.advance_secs(30.0);
        assert!(!slot.refresh_overstay(&policy, clock.now()));
        assert!(!slot.is_overstay());

        clock.advance_secs(0.5);
        assert!(slot.refresh_overstay(&policy, clock.now()));
        assert!(slot.is_overstay());
        assert!(!slot.refresh_overstay(&policy, clock.now()));

        // The cached flag agrees with a fresh computation.
        assert!(policy.is_overstay(slot.elapsed(clock.now())));
        assert!(slot.current_bill(&policy, clock.now()) >= Some(policy.base_fee));

        slot.remove_and_bill(&policy, clock.now());
        assert!(!slot.is_overstay());
        slot.park(Vehicle::plain(VehicleKind::Car), clock.now());
        assert!(!slot.is_overstay());
    }

    #[test]
    fn hit_test_is_first_match_and_edge_inclusive() {
        let registry = SlotRegistry::new([
            Rect::new(0, 0, 10, 10),
            Rect::new(10, 0, 10, 10),
            Rect::new(40, 0, 10, 10),
        ]);
        assert_eq!(registry.hit_test(Point::new(10, 10)), Some(0));
        assert_eq!(registry.hit_test(Point::new(11, 5)), Some(1));
        assert_eq!(registry.hit_test(Point::new(50, 10)), Some(2));
        assert_eq!(registry.hit_test(Point::new(30, 5)), None);
    }

    #[test]
    fn registry_refresh_counts_new_overstays() {
        let policy = BillingPolicy::default();
        let clock = ManualClock::new();
        let mut registry = SlotRegistry::from_layout(&LayoutConfig::default());
        assert_eq!(registry.len(), 6);
        registry
            .get_mut(0)
            .expect("slot 1")
            .park(Vehicle::plain(VehicleKind::Car), clock.now());
        clock.advance_secs(20.0);
        registry
            .get_mut(4)
            .expect("slot 5")
            .park(Vehicle::plain(VehicleKind::Truck), clock.now());
        assert_eq!(registry.occupied_count(), 2);

        clock.advance_secs(15.0);
        assert_eq!(registry.refresh_overstay(&policy, clock.now()), 1);
        clock.advance_secs(20.0);
        assert_eq!(registry.refresh_overstay(&policy, clock.now()), 1);
        assert_eq!(registry.refresh_overstay(&policy, clock.now()), 0);
        assert!(registry.iter().filter(|s| s.is_overstay()).all(Slot::is_occupied));
    }
}
