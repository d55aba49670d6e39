use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::{
    billing::BillingPolicy,
    clock::Clock,
    config::{AppConfig, LayoutConfig},
    geometry::{Point, Rect},
    slot::SlotRegistry,
    vehicle::{VehicleCatalog, VehicleKind},
};

use super::models::{
    ConfirmDialog, Interaction, Mode, PointerButton, Receipt, StatusMessage, Summary,
};

const OPTION_WIDTH: i32 = 92;
const OPTION_HEIGHT: i32 = 120;
const OPTION_GAP: i32 = 12;
const MENU_OFFSET: i32 = 10;
const MENU_CLEARANCE: i32 = 140;
const MENU_MARGIN: i32 = 8;
const MENU_PADDING: i32 = 8;

const DIALOG_WIDTH: i32 = 520;
const DIALOG_HEIGHT: i32 = 150;
const BUTTON_WIDTH: i32 = 130;
const BUTTON_HEIGHT: i32 = 48;
const BUTTON_SPACING: i32 = 40;
const BUTTON_BOTTOM_PAD: i32 = 18;

const TOAST_WIDTH: i32 = 520;
const TOAST_HEIGHT: i32 = 56;
const TOAST_BOTTOM_PAD: i32 = 18;

/// Receipts kept for display; older ones are dropped.
pub const RECEIPT_HISTORY: usize = 50;

/// Owns the slots and turns pointer and key input into slot operations.
pub struct SessionController {
    registry: SlotRegistry,
    catalog: VehicleCatalog,
    policy: BillingPolicy,
    layout: LayoutConfig,
    message_ttl: Duration,
    clock: Arc<dyn Clock>,
    mode: Mode,
    hovered: Option<usize>,
    revenue: f64,
    receipts: VecDeque<Receipt>,
    removals: usize,
    status: Option<StatusMessage>,
}

impl SessionController {
    pub fn new(config: &AppConfig, catalog: VehicleCatalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: SlotRegistry::from_layout(&config.layout),
            catalog,
            policy: config.billing.clone(),
            layout: config.layout.clone(),
            message_ttl: config.ui.message_display(),
            clock,
            mode: Mode::Idle,
            hovered: None,
            revenue: 0.0,
            receipts: VecDeque::with_capacity(RECEIPT_HISTORY),
            removals: 0,
            status: None,
        }
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut SlotRegistry {
        &mut self.registry
    }

    pub fn catalog(&self) -> &VehicleCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Total collected across all removals.
    pub fn revenue(&self) -> f64 {
        self.revenue
    }

    /// The most recent receipts, oldest first, at most [`RECEIPT_HISTORY`].
    pub fn receipts(&self) -> &VecDeque<Receipt> {
        &self.receipts
    }

    pub fn last_receipt(&self) -> Option<&Receipt> {
        self.receipts.back()
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            parked: self.registry.occupied_count(),
            total: self.registry.len(),
            revenue: self.revenue,
            removals: self.removals,
        }
    }

    /// Message text while it is still within its display window.
    pub fn status_message(&self) -> Option<&str> {
        let now = self.clock.now();
        self.status
            .as_ref()
            .filter(|status| status.is_live(now, self.message_ttl))
            .map(|status| status.text.as_str())
    }

    /// Periodic refresh: latch overstays and expire the status message.
    /// Returns the number of slots newly flagged as overstayed.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        let flagged = self.registry.refresh_overstay(&self.policy, now);
        if self
            .status
            .as_ref()
            .is_some_and(|status| !status.is_live(now, self.message_ttl))
        {
            debug!("Status message expired");
            self.status = None;
        }
        flagged
    }

    /// Track which slot is under the pointer.
    pub fn on_pointer_move(&mut self, point: Point) -> Option<usize> {
        self.hovered = self.registry.hit_test(point);
        self.hovered
    }

    /// Route a pointer button event. Only primary presses do anything; a
    /// pending menu or dialog always consumes the click.
    pub fn on_click(&mut self, button: PointerButton, pressed: bool, point: Point) -> Interaction {
        if button != PointerButton::Primary || !pressed {
            return Interaction::Ignored;
        }

        match self.mode {
            Mode::ConfirmingRemoval { .. } => {
                let dialog = self.confirm_dialog();
                if dialog.yes.contains(point) {
                    self.confirm_removal()
                } else {
                    self.cancel()
                }
            }
            Mode::SelectingVehicle { origin, .. } => {
                let chosen = selection_options(origin)
                    .into_iter()
                    .find(|(_, rect)| rect.contains(point))
                    .map(|(kind, _)| kind);
                match chosen {
                    Some(kind) => self.choose_vehicle(kind),
                    None => self.cancel(),
                }
            }
            Mode::Idle => match self.registry.hit_test(point) {
                Some(index) => self.activate_slot(index),
                None => Interaction::Ignored,
            },
        }
    }

    /// Open the menu appropriate for slot `index`, as a click on it would.
    pub fn activate_slot(&mut self, index: usize) -> Interaction {
        if !self.mode.is_idle() {
            return Interaction::Ignored;
        }
        let Some(slot) = self.registry.get(index) else {
            return Interaction::Ignored;
        };
        if slot.is_occupied() {
            self.mode = Mode::ConfirmingRemoval { slot: index };
            Interaction::ConfirmOpened { slot: index }
        } else {
            let origin = self.menu_origin(slot.rect());
            self.mode = Mode::SelectingVehicle {
                slot: index,
                origin,
            };
            Interaction::MenuOpened { slot: index }
        }
    }

    /// Park `kind` on the slot whose selection menu is open.
    pub fn choose_vehicle(&mut self, kind: VehicleKind) -> Interaction {
        let Mode::SelectingVehicle { slot: index, .. } = self.mode else {
            return Interaction::Ignored;
        };
        self.mode = Mode::Idle;

        let now = self.clock.now();
        let vehicle = self.catalog.get(kind);
        let Some(slot) = self.registry.get_mut(index) else {
            warn!(index, "Selection referred to a missing slot; resetting");
            return Interaction::Reset;
        };
        if !slot.park(vehicle, now) {
            debug!(slot = slot.number(), "Slot already occupied; menu closed");
            return Interaction::Dismissed;
        }
        info!(slot = slot.number(), vehicle = kind.label(), "Vehicle parked");
        Interaction::Parked { slot: index, kind }
    }

    /// Remove and bill the vehicle whose confirmation dialog is open.
    pub fn confirm_removal(&mut self) -> Interaction {
        let Mode::ConfirmingRemoval { slot: index } = self.mode else {
            return Interaction::Ignored;
        };
        self.mode = Mode::Idle;

        let now = self.clock.now();
        let Some(slot) = self.registry.get_mut(index) else {
            warn!(index, "Confirmation referred to a missing slot; resetting");
            return Interaction::Reset;
        };
        let number = slot.number();
        let parked_for = slot.elapsed(now);
        let Some(vehicle) = slot.vehicle().map(|v| v.kind()) else {
            warn!(slot = number, "Confirmation referred to an empty slot; resetting");
            return Interaction::Reset;
        };
        let Some(amount) = slot.remove_and_bill(&self.policy, now) else {
            return Interaction::Reset;
        };

        self.revenue += amount;
        let text = format!(
            "Slot {number} removed. Bill: {}",
            self.policy.format_amount(amount)
        );
        info!(
            slot = number,
            vehicle = vehicle.label(),
            parked_secs = parked_for.as_secs_f64(),
            amount,
            revenue = self.revenue,
            "{text}"
        );
        self.status = Some(StatusMessage {
            text,
            posted_at: now,
        });

        let receipt = Receipt {
            slot: number,
            vehicle,
            parked_for,
            amount,
            removed_at: Local::now(),
        };
        if self.receipts.len() == RECEIPT_HISTORY {
            self.receipts.pop_front();
        }
        self.receipts.push_back(receipt.clone());
        self.removals += 1;
        Interaction::Removed(receipt)
    }

    /// Close whatever menu or dialog is pending.
    pub fn cancel(&mut self) -> Interaction {
        if self.mode.is_idle() {
            return Interaction::Ignored;
        }
        self.mode = Mode::Idle;
        Interaction::Dismissed
    }

    /// Option boxes of the selection menu, when it is open.
    pub fn selection_menu(&self) -> Option<[(VehicleKind, Rect); 3]> {
        match self.mode {
            Mode::SelectingVehicle { origin, .. } => Some(selection_options(origin)),
            _ => None,
        }
    }

    /// Backdrop of the selection menu placed at `origin`.
    pub fn selection_menu_frame(origin: Point) -> Rect {
        Rect::new(origin.x, origin.y, menu_width(), OPTION_HEIGHT).outset(MENU_PADDING)
    }

    /// Removal dialog geometry, centred in the window.
    pub fn confirm_dialog(&self) -> ConfirmDialog {
        let frame = self
            .layout
            .window_rect()
            .centered(DIALOG_WIDTH, DIALOG_HEIGHT);
        let mid = frame.x + frame.w / 2;
        let button_y = frame.bottom() - BUTTON_HEIGHT - BUTTON_BOTTOM_PAD;
        ConfirmDialog {
            frame,
            yes: Rect::new(
                mid - BUTTON_WIDTH - BUTTON_SPACING / 2,
                button_y,
                BUTTON_WIDTH,
                BUTTON_HEIGHT,
            ),
            no: Rect::new(mid + BUTTON_SPACING / 2, button_y, BUTTON_WIDTH, BUTTON_HEIGHT),
        }
    }

    /// Where the status message is drawn.
    pub fn status_rect(&self) -> Rect {
        Rect::new(
            (self.layout.window_width - TOAST_WIDTH) / 2,
            self.layout.window_height - TOAST_HEIGHT - TOAST_BOTTOM_PAD,
            TOAST_WIDTH,
            TOAST_HEIGHT,
        )
    }

    fn menu_origin(&self, slot: Rect) -> Point {
        let x = slot.x + (slot.w - menu_width()) / 2;
        let mut y = slot.bottom() + MENU_OFFSET;
        if y + MENU_CLEARANCE > self.layout.window_height {
            y = slot.y - MENU_CLEARANCE;
        }
        Point::new(x.max(MENU_MARGIN), y.max(MENU_MARGIN))
    }
}

fn menu_width() -> i32 {
    let count = VehicleKind::ALL.len() as i32;
    count * OPTION_WIDTH + (count - 1) * OPTION_GAP
}

fn selection_options(origin: Point) -> [(VehicleKind, Rect); 3] {
    std::array::from_fn(|position| {
        let offset = position as i32 * (OPTION_WIDTH + OPTION_GAP);
        (
            VehicleKind::ALL[position],
            Rect::new(origin.x + offset, origin.y, OPTION_WIDTH, OPTION_HEIGHT),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, vehicle::Vehicle};

    fn controller() -> (SessionController, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let controller =
            SessionController::new(&AppConfig::default(), VehicleCatalog::plain(), clock.clone());
        (controller, clock)
    }

    fn click(controller: &mut SessionController, x: i32, y: i32) -> Interaction {
        controller.on_click(PointerButton::Primary, true, Point::new(x, y))
    }

    fn center(rect: Rect) -> (i32, i32) {
        (rect.x + rect.w / 2, rect.y + rect.h / 2)
    }

    fn park(controller: &mut SessionController, index: usize, kind: VehicleKind) {
        assert_eq!(
            controller.activate_slot(index),
            Interaction::MenuOpened { slot: index }
        );
        assert_eq!(
            controller.choose_vehicle(kind),
            Interaction::Parked { slot: index, kind }
        );
    }

    fn remove(controller: &mut SessionController, index: usize) -> Receipt {
        controller.activate_slot(index);
        match controller.confirm_removal() {
            Interaction::Removed(receipt) => receipt,
            other => panic!("expected removal, got {other:?}"),
        }
    }

    #[test]
    fn click_through_park_and_cancelled_removal() {
        let (mut controller, _clock) = controller();
        let slot_two = controller.registry().get(1).expect("slot 2").rect();
        let (sx, sy) = center(slot_two);

        assert_eq!(click(&mut controller, sx, sy), Interaction::MenuOpened { slot: 1 });
        assert!(matches!(
            controller.mode(),
            Mode::SelectingVehicle { slot: 1, .. }
        ));

        let menu = controller.selection_menu().expect("menu open");
        let (_, bike_rect) = menu[1];
        let (bx, by) = center(bike_rect);
        assert_eq!(
            click(&mut controller, bx, by),
            Interaction::Parked {
                slot: 1,
                kind: VehicleKind::Bike
            }
        );
        assert_eq!(controller.mode(), Mode::Idle);
        let slot = controller.registry().get(1).expect("slot 2");
        assert_eq!(slot.vehicle().map(|v| v.kind()), Some(VehicleKind::Bike));

        assert_eq!(click(&mut controller, sx, sy), Interaction::ConfirmOpened { slot: 1 });
        assert_eq!(controller.mode(), Mode::ConfirmingRemoval { slot: 1 });

        let (nx, ny) = center(controller.confirm_dialog().no);
        assert_eq!(click(&mut controller, nx, ny), Interaction::Dismissed);
        assert_eq!(controller.mode(), Mode::Idle);
        assert!(controller.registry().get(1).expect("slot 2").is_occupied());
        assert_eq!(controller.revenue(), 0.0);
    }

    #[test]
    fn confirmed_removal_bills_and_posts_message() {
        let (mut controller, clock) = controller();
        park(&mut controller, 0, VehicleKind::Car);

        clock.advance_secs(90.0);
        let expected = controller
            .registry()
            .get(0)
            .and_then(|slot| slot.current_bill(controller.policy(), clock.now()));
        assert_eq!(expected, Some(160.0));

        let (sx, sy) = center(controller.registry().get(0).expect("slot 1").rect());
        click(&mut controller, sx, sy);
        let (yx, yy) = center(controller.confirm_dialog().yes);
        let Interaction::Removed(receipt) = click(&mut controller, yx, yy) else {
            panic!("expected a removal");
        };

        assert_eq!(receipt.slot, 1);
        assert_eq!(receipt.vehicle, VehicleKind::Car);
        assert_eq!(receipt.amount, 160.0);
        assert_eq!(receipt.parked_for, Duration::from_secs(90));
        assert_eq!(controller.revenue(), 160.0);
        assert_eq!(controller.mode(), Mode::Idle);
        let slot = controller.registry().get(0).expect("slot 1");
        assert!(!slot.is_occupied());
        assert_eq!(slot.elapsed(clock.now()), Duration::ZERO);
        assert_eq!(
            controller.status_message(),
            Some("Slot 1 removed. Bill: 160 Tk")
        );
    }

    #[test]
    fn revenue_is_the_sum_of_receipts() {
        let (mut controller, clock) = controller();
        park(&mut controller, 0, VehicleKind::Car);
        clock.advance_secs(10.0);
        park(&mut controller, 3, VehicleKind::Truck);
        clock.advance_secs(35.2);
        let first = remove(&mut controller, 0);
        park(&mut controller, 5, VehicleKind::Bike);
        clock.advance_secs(40.0);
        let second = remove(&mut controller, 3);
        let third = remove(&mut controller, 5);

        assert_eq!(first.amount, 115.0);
        assert_eq!(second.amount, 145.0);
        assert_eq!(third.amount, 110.0);
        let total: f64 = controller.receipts().iter().map(|r| r.amount).sum();
        assert_eq!(controller.revenue(), total);
        assert_eq!(controller.summary().removals, 3);
        assert_eq!(controller.summary().parked, 0);
    }

    #[test]
    fn receipt_history_is_bounded() {
        let (mut controller, clock) = controller();
        let sessions = RECEIPT_HISTORY + 7;
        for _ in 0..sessions {
            park(&mut controller, 0, VehicleKind::Car);
            clock.advance_secs(31.0);
            remove(&mut controller, 0);
        }

        let summary = controller.summary();
        assert_eq!(summary.removals, sessions);
        assert_eq!(summary.revenue, 101.0 * sessions as f64);
        assert_eq!(controller.receipts().len(), RECEIPT_HISTORY);
        assert_eq!(
            controller.last_receipt().map(|r| r.parked_for),
            Some(Duration::from_secs(31))
        );
    }

    #[test]
    fn choosing_for_a_slot_filled_behind_the_menu_keeps_the_occupant() {
        let (mut controller, clock) = controller();
        assert_eq!(controller.activate_slot(3), Interaction::MenuOpened { slot: 3 });
        let parked = controller
            .registry_mut()
            .get_mut(3)
            .expect("slot 4")
            .park(Vehicle::plain(VehicleKind::Truck), clock.now());
        assert!(parked);

        clock.advance_secs(4.0);
        assert_eq!(
            controller.choose_vehicle(VehicleKind::Bike),
            Interaction::Dismissed
        );
        assert_eq!(controller.mode(), Mode::Idle);
        let slot = controller.registry().get(3).expect("slot 4");
        assert_eq!(slot.vehicle().map(Vehicle::kind), Some(VehicleKind::Truck));
        assert_eq!(slot.elapsed(clock.now()), Duration::from_secs(4));
        assert_eq!(controller.summary().parked, 1);
    }

    #[test]
    fn clicks_outside_menus_dismiss_without_side_effects() {
        let (mut controller, _clock) = controller();
        controller.activate_slot(2);
        assert_eq!(click(&mut controller, 1, 1), Interaction::Dismissed);
        assert!(!controller.registry().get(2).expect("slot 3").is_occupied());

        park(&mut controller, 2, VehicleKind::Car);
        controller.activate_slot(2);
        let dialog = controller.confirm_dialog();
        assert_eq!(
            click(&mut controller, dialog.frame.x + 2, dialog.frame.y + 2),
            Interaction::Dismissed
        );
        assert!(controller.registry().get(2).expect("slot 3").is_occupied());
        assert_eq!(controller.revenue(), 0.0);
    }

    #[test]
    fn pending_menu_consumes_clicks_on_other_slots() {
        let (mut controller, _clock) = controller();
        controller.activate_slot(0);
        let (sx, sy) = center(controller.registry().get(2).expect("slot 3").rect());
        assert_eq!(click(&mut controller, sx, sy), Interaction::Dismissed);
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(controller.activate_slot(1), Interaction::MenuOpened { slot: 1 });
        assert_eq!(controller.activate_slot(2), Interaction::Ignored);
        assert_eq!(controller.confirm_removal(), Interaction::Ignored);
    }

    #[test]
    fn only_primary_presses_are_handled() {
        let (mut controller, _clock) = controller();
        let (sx, sy) = center(controller.registry().get(0).expect("slot 1").rect());
        let point = Point::new(sx, sy);
        assert_eq!(
            controller.on_click(PointerButton::Secondary, true, point),
            Interaction::Ignored
        );
        assert_eq!(
            controller.on_click(PointerButton::Primary, false, point),
            Interaction::Ignored
        );
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(click(&mut controller, 2, 2), Interaction::Ignored);
    }

    #[test]
    fn stale_confirmation_resets_to_idle() {
        let (mut controller, clock) = controller();
        park(&mut controller, 4, VehicleKind::Car);
        controller.activate_slot(4);
        controller
            .registry_mut()
            .get_mut(4)
            .expect("slot 5")
            .remove_and_bill(&BillingPolicy::default(), clock.now());

        assert_eq!(controller.confirm_removal(), Interaction::Reset);
        assert_eq!(controller.mode(), Mode::Idle);
        assert_eq!(controller.revenue(), 0.0);
        assert!(controller.receipts().is_empty());
    }

    #[test]
    fn menu_flips_above_bottom_row() {
        let (mut controller, _clock) = controller();
        controller.activate_slot(0);
        assert_eq!(
            controller.mode(),
            Mode::SelectingVehicle {
                slot: 0,
                origin: Point::new(20, 420)
            }
        );
        controller.cancel();

        controller.activate_slot(4);
        assert_eq!(
            controller.mode(),
            Mode::SelectingVehicle {
                slot: 4,
                origin: Point::new(350, 350)
            }
        );
    }

    #[test]
    fn hover_tracks_pointer_independently() {
        let (mut controller, _clock) = controller();
        let rect = controller.registry().get(5).expect("slot 6").rect();
        assert_eq!(
            controller.on_pointer_move(Point::new(rect.right(), rect.bottom())),
            Some(5)
        );
        controller.activate_slot(0);
        assert_eq!(controller.on_pointer_move(Point::new(0, 0)), None);
        assert_eq!(controller.hovered(), None);
        assert!(matches!(
            controller.mode(),
            Mode::SelectingVehicle { slot: 0, .. }
        ));
    }

    #[test]
    fn tick_latches_overstay_and_expires_message() {
        let (mut controller, clock) = controller();
        park(&mut controller, 0, VehicleKind::Car);
        park(&mut controller, 1, VehicleKind::Bike);
        assert_eq!(controller.tick(), 0);

        clock.advance_secs(31.0);
        assert_eq!(controller.tick(), 2);
        assert!(controller.registry().get(0).expect("slot 1").is_overstay());

        remove(&mut controller, 0);
        assert!(controller.status_message().is_some());
        clock.advance_secs(5.0);
        controller.tick();
        assert!(controller.status_message().is_some());
        clock.advance_secs(0.1);
        assert!(controller.status_message().is_none());
        controller.tick();
        assert!(controller.registry().get(1).expect("slot 2").is_overstay());
        assert!(!controller.registry().get(0).expect("slot 1").is_overstay());
    }
}
