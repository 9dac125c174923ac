//! The overlay surface: a key grid wired into the injection and visibility
//! services. Deliberately plain; the interesting behavior lives in the
//! services this app drives each frame.

use eframe::egui;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::focus::observer::{FocusObserver, ObserverEvent};
use crate::focus::restore::FocusRestorationService;
use crate::focus::tracker::TargetWindowTracker;
use crate::input::classifier::InputOrigin;
use crate::input::injector::SyntheticInputInjector;
use crate::keymap::{layout_rows, KeyAction, KeyDef};
use crate::overlay::style_guard::ActivationStyleGuard;
use crate::overlay::window::{frame_window_id, Win32OverlayWindow};
use crate::repeat::KeyRepeat;
use crate::settings::Settings;
use crate::visibility::VisibilityCoordinator;

const BASE_KEY_SIZE: egui::Vec2 = egui::vec2(52.0, 42.0);
const STYLE_TICK: Duration = Duration::from_secs(2);

pub struct OverlayApp {
    settings: Settings,
    coordinator: VisibilityCoordinator,
    observer: FocusObserver,
    injector: Arc<SyntheticInputInjector>,
    surface: Arc<Win32OverlayWindow>,
    style_guard: Option<ActivationStyleGuard>,
    repeat: KeyRepeat,
    rows: Vec<Vec<KeyDef>>,
    /// Label → key index, built once with the layout so nothing ever has to
    /// walk the widget tree to find a key again.
    key_index: HashMap<&'static str, KeyDef>,
    held_repeat: Option<&'static str>,
    last_style_tick: Instant,
    exiting: bool,
}

impl OverlayApp {
    pub fn new(settings: &Settings) -> Self {
        let tracker = Arc::new(TargetWindowTracker::default());
        let mut observer = FocusObserver::with_default_backend(Arc::clone(&tracker));
        observer.set_auto_show(settings.auto_show);
        observer.set_cooldown(settings.cooldown());
        if let Err(err) = observer.install() {
            // Auto-show and click classification are lost; manual show/hide
            // keeps working.
            tracing::error!(?err, "focus hooks unavailable, running in manual-show mode");
        }

        let injector = Arc::new(SyntheticInputInjector::default());
        let surface = Arc::new(Win32OverlayWindow::default());
        let mut coordinator = VisibilityCoordinator::new(
            tracker,
            Box::new(FocusRestorationService::default()),
            Arc::clone(&injector),
            Box::new(Arc::clone(&surface)),
        );
        coordinator.set_cooldown(settings.cooldown());

        let rows = layout_rows();
        let key_index = rows
            .iter()
            .flatten()
            .map(|def| (def.label, *def))
            .collect();

        Self {
            settings: settings.clone(),
            coordinator,
            observer,
            injector,
            surface,
            style_guard: None,
            repeat: KeyRepeat::new(
                Duration::from_millis(settings.repeat_initial_delay_ms),
                Duration::from_millis(settings.repeat_interval_ms),
            ),
            rows,
            key_index,
            held_repeat: None,
            last_style_tick: Instant::now(),
            exiting: false,
        }
    }

    pub fn key_by_label(&self, label: &str) -> Option<&KeyDef> {
        self.key_index.get(label)
    }

    fn bind_surface(&mut self, frame: &eframe::Frame) {
        if self.surface.id().is_some() {
            return;
        }
        if let Some(id) = frame_window_id(frame) {
            self.surface.attach(id);
            self.observer.set_overlay_window(id);
            let guard = ActivationStyleGuard::new(id);
            guard.apply();
            self.style_guard = Some(guard);
            // First appearance counts as a show.
            self.coordinator.show(Instant::now());
        }
    }

    /// The most recent desktop click, if our own injection produced it. Key
    /// handling skips those so the overlay cannot feed itself.
    fn click_is_injected(&self) -> bool {
        self.observer
            .last_click()
            .map(|sample| sample.origin == InputOrigin::Injected)
            .unwrap_or(false)
    }

    fn fire(&self, action: KeyAction) {
        match action {
            KeyAction::Virtual(vk) => {
                self.injector.press_virtual_key(vk);
            }
            KeyAction::Char(ch) => {
                self.injector.send_unicode_char(ch);
            }
            KeyAction::Modifier(_) => {}
        }
    }

    fn key_button(&mut self, ui: &mut egui::Ui, def: KeyDef, now: Instant) {
        let size = egui::vec2(BASE_KEY_SIZE.x * def.width, BASE_KEY_SIZE.y);

        if let KeyAction::Modifier(latch) = def.action {
            let held = self.coordinator.latch_held(latch);
            let response = ui.add_sized(size, egui::SelectableLabel::new(held, def.label));
            if response.clicked() && !self.click_is_injected() {
                self.coordinator.toggle_latch(latch);
            }
            return;
        }

        let response = ui.add_sized(size, egui::Button::new(def.label));
        if def.repeats {
            let down = response.is_pointer_button_down_on();
            match (down, self.held_repeat) {
                (true, None) => {
                    if !self.click_is_injected() {
                        let vk = match def.action {
                            KeyAction::Virtual(vk) => vk,
                            _ => 0,
                        };
                        self.fire(def.action);
                        self.repeat.press(vk, now);
                        self.held_repeat = Some(def.label);
                    }
                }
                (false, Some(label)) if label == def.label => {
                    self.repeat.release();
                    self.held_repeat = None;
                }
                _ => {}
            }
        } else if response.clicked() && !self.click_is_injected() {
            self.fire(def.action);
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.bind_surface(frame);

        for event in self.observer.drain_events() {
            match event {
                ObserverEvent::AutoShowRequested(window) => {
                    tracing::debug!(id = window.id, class = %window.class_name, "auto-show requested");
                    self.coordinator.auto_show(now);
                }
            }
        }

        self.coordinator.poll(now);

        if now.duration_since(self.last_style_tick) >= STYLE_TICK {
            if let Some(guard) = &self.style_guard {
                guard.enforce();
            }
            self.last_style_tick = now;
        }

        // Hold-to-repeat re-fires through the key index.
        if self.repeat.tick(now).is_some() {
            if let Some(def) = self.held_repeat.and_then(|label| self.key_index.get(label)) {
                self.fire(def.action);
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("⌨ Overkey");
                let mut auto_show = self.settings.auto_show;
                if ui.checkbox(&mut auto_show, "Auto-show").changed() {
                    self.settings.auto_show = auto_show;
                    self.observer.set_auto_show(auto_show);
                    if let Err(err) = self.settings.save(&crate::settings::default_path()) {
                        tracing::warn!(?err, "failed to persist settings");
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Exit").clicked() {
                        self.exiting = true;
                    }
                    if ui.button("Hide").clicked() {
                        self.coordinator.hide(now);
                        self.observer.note_hidden(now);
                    }
                });
            });
            ui.separator();

            let rows = self.rows.clone();
            for row in rows {
                ui.horizontal(|ui| {
                    for def in row {
                        self.key_button(ui, def, now);
                    }
                });
            }
        });

        if self.exiting {
            self.coordinator.shutdown();
            self.observer.uninstall();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        // Hidden or not, keep the service ticks flowing.
        ctx.request_repaint_after(Duration::from_millis(50));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.coordinator.shutdown();
        self.observer.uninstall();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Latch;

    #[test]
    fn key_index_covers_every_layout_key() {
        let app = OverlayApp::new(&Settings::default());
        for row in layout_rows() {
            for def in row {
                assert!(app.key_by_label(def.label).is_some(), "missing {}", def.label);
            }
        }
    }

    #[test]
    fn key_index_resolves_actions_by_label() {
        let app = OverlayApp::new(&Settings::default());
        assert_eq!(
            app.key_by_label("Bksp").map(|def| def.action),
            Some(KeyAction::Virtual(0x08))
        );
        assert_eq!(
            app.key_by_label("Caps").map(|def| def.action),
            Some(KeyAction::Modifier(Latch::CapsLock))
        );
        assert!(app.key_by_label("NoSuchKey").is_none());
    }
}
