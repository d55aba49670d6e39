use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parklot_core::{
    billing::format_elapsed,
    geometry::Rect as LogicalRect,
    session::{ConfirmDialog, Interaction, Mode, PointerButton, SessionController},
    Slot, VehicleKind,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::{Position, Title},
        Block, BorderType, Borders, Clear, Paragraph, Wrap,
    },
    Frame, Terminal,
};
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tracing::{debug, info};

use crate::{sprite::Sprite, viewport::Viewport};

const TITLE: &str = "Parking Management System";
const IMAGE_INSET: i32 = 10;
const OPTION_IMAGE_INSET: i32 = 8;
const OPTION_LABEL_HEIGHT: i32 = 32;
const HOVER_OUTSET: i32 = 2;
const HUD_MIN_ROWS: u16 = 5;

#[derive(Debug, Clone)]
struct Theme {
    background: Color,
    foreground: Color,
    muted: Color,
    border: Color,
    hud_bg: Color,
    slot_empty: Color,
    slot_parked: Color,
    slot_overstay: Color,
    menu_bg: Color,
    option_bg: Color,
    dialog_bg: Color,
    confirm_bg: Color,
    cancel_bg: Color,
    toast_bg: Color,
    hover: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(247, 247, 252),
            foreground: Color::Rgb(20, 20, 20),
            muted: Color::Rgb(110, 110, 120),
            border: Color::Rgb(31, 31, 31),
            hud_bg: Color::Rgb(242, 245, 252),
            slot_empty: Color::Rgb(240, 250, 240),
            slot_parked: Color::Rgb(247, 247, 247),
            slot_overstay: Color::Rgb(255, 199, 199),
            menu_bg: Color::Rgb(250, 250, 255),
            option_bg: Color::Rgb(255, 255, 255),
            dialog_bg: Color::Rgb(255, 255, 255),
            confirm_bg: Color::Rgb(217, 242, 217),
            cancel_bg: Color::Rgb(242, 217, 217),
            toast_bg: Color::Rgb(250, 250, 224),
            hover: Color::Rgb(0, 153, 0),
            danger: Color::Rgb(170, 20, 20),
        }
    }
}

const INPUT_POLL: Duration = Duration::from_millis(250);

enum AppEvent {
    Input(Event),
}

/// Terminal frontend driving a [`SessionController`].
pub struct ParkingApp {
    controller: SessionController,
    theme: Theme,
    tick_rate: Duration,
    viewport: Viewport,
    should_quit: bool,
}

impl ParkingApp {
    pub fn new(controller: SessionController, tick_rate: Duration) -> Self {
        let layout = controller.layout();
        let viewport = Viewport::new(Rect::default(), layout.window_width, layout.window_height);
        Self {
            controller,
            theme: Theme::default(),
            tick_rate,
            viewport,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);
        info!(slots = self.controller.registry().len(), "Parking lot open");

        let result = self.event_loop(&mut terminal, &mut event_rx).await;

        restore_terminal(&mut terminal)?;
        let summary = self.controller.summary();
        info!(
            parked = summary.parked,
            removals = summary.removals,
            revenue = summary.revenue,
            "Parking lot closed"
        );
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(self.tick_rate);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }
            tokio::select! {
                maybe_event = event_rx.recv() => match maybe_event {
                    Some(AppEvent::Input(event)) => self.handle_input(event),
                    None => break,
                },
                _ = ticker.tick() => self.handle_tick(),
            }
            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn handle_tick(&mut self) {
        let flagged = self.controller.tick();
        if flagged > 0 {
            debug!(flagged, "Slots entered overstay");
        }
    }

    fn handle_input(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Key(_) | Event::Resize(_, _) => {}
            Event::FocusGained | Event::FocusLost | Event::Paste(_) => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let point = self.viewport.to_logical(mouse.column, mouse.row);
        let interaction = match mouse.kind {
            MouseEventKind::Down(button) => {
                self.controller
                    .on_click(pointer_button(button), true, point)
            }
            MouseEventKind::Up(button) => {
                self.controller
                    .on_click(pointer_button(button), false, point)
            }
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                self.controller.on_pointer_move(point);
                return;
            }
            _ => return,
        };
        report(&interaction);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        let interaction = match (self.controller.mode(), key.code) {
            (_, KeyCode::Char('q')) => {
                self.should_quit = true;
                return;
            }
            (Mode::Idle, KeyCode::Esc) => {
                self.should_quit = true;
                return;
            }
            (_, KeyCode::Esc) => self.controller.cancel(),
            (Mode::Idle, KeyCode::Char(ch)) => match ch.to_digit(10) {
                Some(digit @ 1..=9) => self.controller.activate_slot(digit as usize - 1),
                _ => Interaction::Ignored,
            },
            (Mode::SelectingVehicle { .. }, KeyCode::Char(ch)) => {
                match VehicleKind::from_hotkey(ch) {
                    Some(kind) => self.controller.choose_vehicle(kind),
                    None => Interaction::Ignored,
                }
            }
            (Mode::ConfirmingRemoval { .. }, KeyCode::Char('y') | KeyCode::Enter) => {
                self.controller.confirm_removal()
            }
            (Mode::ConfirmingRemoval { .. }, KeyCode::Char('n')) => self.controller.cancel(),
            _ => Interaction::Ignored,
        };
        report(&interaction);
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = self.controller.layout();
        self.viewport = Viewport::new(area, layout.window_width, layout.window_height);

        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.background)),
            area,
        );
        self.render_hud(frame);
        for slot in self.controller.registry().iter() {
            self.render_slot(frame, slot);
        }
        self.render_hover(frame);

        match self.controller.mode() {
            Mode::SelectingVehicle { .. } => self.render_selection_menu(frame),
            Mode::ConfirmingRemoval { slot } => {
                let dialog = self.controller.confirm_dialog();
                self.render_confirm_dialog(frame, slot, dialog);
            }
            Mode::Idle => {}
        }
        self.render_status(frame);
    }

    fn render_hud(&self, frame: &mut Frame) {
        let mut area = self.viewport.to_cells(self.controller.layout().hud_rect());
        area.height = area
            .height
            .max(HUD_MIN_ROWS)
            .min(self.viewport.area().bottom().saturating_sub(area.y));
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border))
            .title(Span::styled(
                TITLE,
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .style(
                Style::default()
                    .bg(self.theme.hud_bg)
                    .fg(self.theme.foreground),
            );
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(30), Constraint::Length(34)])
            .split(inner);

        let slot_keys = self.controller.registry().len().min(9);
        let help = vec![
            Line::from("Left click an empty slot to park, an occupied slot to remove"),
            Line::from(self.controller.policy().describe()),
            Line::from(Span::styled(
                format!("Keys: 1-{slot_keys} slot, c/b/t vehicle, y/n confirm, q quit"),
                Style::default().fg(self.theme.muted),
            )),
        ];
        frame.render_widget(
            Paragraph::new(help).wrap(Wrap { trim: true }),
            columns[0],
        );

        let policy = self.controller.policy();
        let summary = self.controller.summary();
        let mut totals = vec![
            Line::from(format!("Parked: {} / {}", summary.parked, summary.total)),
            Line::from(format!(
                "Collected: {} ({} removals)",
                policy.format_amount(summary.revenue),
                summary.removals
            )),
        ];
        if let Some(receipt) = self.controller.last_receipt() {
            totals.push(Line::from(Span::styled(
                format!(
                    "Last: slot {} {} at {}",
                    receipt.slot,
                    policy.format_amount(receipt.amount),
                    receipt.removed_at.format("%H:%M:%S")
                ),
                Style::default().fg(self.theme.muted),
            )));
        }
        frame.render_widget(
            Paragraph::new(totals).alignment(Alignment::Right),
            columns[1],
        );
    }

    fn render_slot(&self, frame: &mut Frame, slot: &Slot) {
        let area = self.viewport.to_cells(slot.rect());
        let now = self.controller.now();
        let policy = self.controller.policy();
        let background = if !slot.is_occupied() {
            self.theme.slot_empty
        } else if slot.is_overstay() {
            self.theme.slot_overstay
        } else {
            self.theme.slot_parked
        };

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border))
            .title(Span::styled(
                format!(" {} ", slot.number()),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .style(Style::default().bg(background).fg(self.theme.foreground));

        let elapsed = slot.elapsed(now);
        if slot.is_occupied() {
            block = block.title(
                Title::from(format!(" {} ", format_elapsed(elapsed)))
                    .position(Position::Bottom)
                    .alignment(Alignment::Center),
            );
        } else {
            block = block.title(
                Title::from(Span::styled(" Empty ", Style::default().fg(self.theme.muted)))
                    .position(Position::Bottom)
                    .alignment(Alignment::Center),
            );
        }

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if let Some(vehicle) = slot.vehicle() {
            let frame_rect = slot.rect().inset(IMAGE_INSET);
            match vehicle.image() {
                Some(image) => {
                    let fitted = frame_rect.fit_aspect(image.width(), image.height());
                    let target = self.viewport.to_cells(fitted).intersection(inner);
                    frame.render_widget(Sprite::new(image, background), target);
                }
                None => {
                    let target = centered_rect(inner.width, 1, inner);
                    frame.render_widget(
                        Paragraph::new(vehicle.name()).alignment(Alignment::Center),
                        target,
                    );
                }
            }
        }

        if slot.is_overstay() {
            let warning = Line::from(vec![
                Span::styled(
                    format!("Over+{}s", policy.overage_secs(elapsed)),
                    Style::default()
                        .fg(self.theme.danger)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "  Penalty: {}",
                    policy.format_amount(policy.penalty(elapsed))
                )),
            ]);
            let row = Rect::new(inner.x, inner.y, inner.width, 1).intersection(inner);
            frame.render_widget(
                Paragraph::new(warning)
                    .alignment(Alignment::Center)
                    .style(Style::default().bg(background)),
                row,
            );
        }
    }

    fn render_hover(&self, frame: &mut Frame) {
        let Some(slot) = self
            .controller
            .hovered()
            .and_then(|index| self.controller.registry().get(index))
        else {
            return;
        };
        let area = self.viewport.to_cells(slot.rect().outset(HOVER_OUTSET));
        frame.render_widget(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Thick)
                .border_style(Style::default().fg(self.theme.hover)),
            area,
        );
    }

    fn render_selection_menu(&self, frame: &mut Frame) {
        let (Some(options), Mode::SelectingVehicle { slot, origin }) =
            (self.controller.selection_menu(), self.controller.mode())
        else {
            return;
        };

        let backdrop = self
            .viewport
            .to_cells(SessionController::selection_menu_frame(origin));
        frame.render_widget(Clear, backdrop);
        frame.render_widget(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.border))
                .title(format!(" Park in slot {} ", slot + 1))
                .style(Style::default().bg(self.theme.menu_bg).fg(self.theme.foreground)),
            backdrop,
        );

        for (kind, rect) in options {
            self.render_vehicle_option(frame, kind, rect);
        }
    }

    fn render_vehicle_option(&self, frame: &mut Frame, kind: VehicleKind, rect: LogicalRect) {
        let area = self.viewport.to_cells(rect);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border))
            .title(
                Title::from(format!("[{}] {}", kind.hotkey(), kind.label()))
                    .position(Position::Bottom)
                    .alignment(Alignment::Center),
            )
            .style(Style::default().bg(self.theme.option_bg).fg(self.theme.foreground));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let vehicle = self.controller.catalog().get(kind);
        match vehicle.image() {
            Some(image) => {
                let frame_rect = LogicalRect::new(
                    rect.x + OPTION_IMAGE_INSET,
                    rect.y + OPTION_IMAGE_INSET,
                    rect.w - 2 * OPTION_IMAGE_INSET,
                    rect.h - OPTION_LABEL_HEIGHT - OPTION_IMAGE_INSET,
                );
                let fitted = frame_rect.fit_aspect(image.width(), image.height());
                let target = self.viewport.to_cells(fitted).intersection(inner);
                frame.render_widget(Sprite::new(image, self.theme.option_bg), target);
            }
            None => {
                frame.render_widget(
                    Paragraph::new(vehicle.name()).alignment(Alignment::Center),
                    centered_rect(inner.width, 1, inner),
                );
            }
        }
    }

    fn render_confirm_dialog(&self, frame: &mut Frame, slot_index: usize, dialog: ConfirmDialog) {
        let full = frame.size();
        frame
            .buffer_mut()
            .set_style(full, Style::default().add_modifier(Modifier::DIM));

        let area = self.viewport.to_cells(dialog.frame);
        frame.render_widget(Clear, area);

        let now = self.controller.now();
        let policy = self.controller.policy();
        let mut lines = vec![Line::from(Span::styled(
            "Do you want to remove the vehicle from this slot?",
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        if let Some(slot) = self.controller.registry().get(slot_index) {
            if let Some(bill) = slot.current_bill(policy, now) {
                lines.push(Line::from(format!(
                    "Slot {}  Elapsed: {}  Estimated bill: {}",
                    slot.number(),
                    format_elapsed(slot.elapsed(now)),
                    policy.format_amount(bill)
                )));
            }
        }

        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(Style::default().fg(self.theme.border))
                        .title(" Remove vehicle ")
                        .style(Style::default().bg(self.theme.dialog_bg).fg(self.theme.foreground)),
                ),
            area,
        );

        self.render_button(frame, dialog.yes, "Yes [y]", self.theme.confirm_bg);
        self.render_button(frame, dialog.no, "No [n]", self.theme.cancel_bg);
    }

    fn render_button(&self, frame: &mut Frame, rect: LogicalRect, label: &str, background: Color) {
        let area = self.viewport.to_cells(rect);
        let label_row = Rect::new(area.x, area.y + area.height / 2, area.width, 1).intersection(area);
        frame.render_widget(
            Block::default().style(Style::default().bg(background)),
            area,
        );
        frame.render_widget(
            Paragraph::new(Span::styled(
                label,
                Style::default()
                    .fg(self.theme.foreground)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            label_row,
        );
    }

    fn render_status(&self, frame: &mut Frame) {
        let Some(message) = self.controller.status_message() else {
            return;
        };
        let area = self.viewport.to_cells(self.controller.status_rect());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(self.theme.border))
                        .style(Style::default().bg(self.theme.toast_bg).fg(self.theme.foreground)),
                ),
            area,
        );
    }
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
    }
}

fn report(interaction: &Interaction) {
    if *interaction != Interaction::Ignored {
        debug!(?interaction, "Input handled");
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(INPUT_POLL) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.is_closed() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
