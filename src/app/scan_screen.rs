// SPDX-License-Identifier: GPL-3.0-only

//! Live scanning screen
//!
//! Owns the capture session controller for its whole lifetime: initialized
//! on first appearance, resumed on every later appearance, torn down exactly
//! once when the screen leaves the stack. Detection events arrive through
//! the controller's channel and are handled here, on the UI thread.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{Frame, layout::Rect};
use tracing::{debug, error, info};

use crate::backends::audio;
use crate::backends::camera::{VideoDevice, create_session};
use crate::config::Config;
use crate::constants::ui;
use crate::session::{CaptureSessionController, EventReceiver, SessionError, SessionEvent};

use super::display_screen::CodeDisplayScreen;
use super::widgets::{PreviewWidget, StatusBar};
use super::{Screen, Transition};

const PAUSED_STATUS: &str = "Paused | space resume | q quit";

fn scanning_status(device: Option<&str>) -> String {
    match device {
        Some(name) => format!("Scanning on {} | space pause | q quit", name),
        None => "Scanning | space pause | q quit".to_string(),
    }
}

fn error_status(err: &SessionError) -> String {
    format!("Camera error: {} | 'r' retries | q quit", err)
}

/// The preview fills everything above the status bar
fn preview_area(area: Rect) -> Rect {
    Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: area.height.saturating_sub(ui::STATUS_BAR_HEIGHT),
    }
}

pub struct ScanScreen {
    controller: CaptureSessionController,
    events: EventReceiver,
    config: Config,
    status: String,
    initialized: bool,
    area: Rect,
}

impl ScanScreen {
    pub fn new(config: Config) -> Self {
        let session = create_session(config.scan_interval());
        let preferred = config.device_path.clone().map(VideoDevice::from_path);
        let (controller, events) =
            CaptureSessionController::with_preferred_device(session, preferred);
        Self {
            controller,
            events,
            config,
            status: String::new(),
            initialized: false,
            area: Rect::default(),
        }
    }

    /// Surface bounds in half-block pixel space
    fn apply_layout(&mut self) {
        let preview = preview_area(self.area);
        let result = self
            .controller
            .on_layout_changed(u32::from(preview.width), u32::from(preview.height) * 2);
        if let Err(err) = result {
            debug!(error = %err, "Layout update skipped");
        }
    }
}

impl Screen for ScanScreen {
    fn on_appear(&mut self, area: Rect) {
        self.area = area;

        if !self.initialized {
            match self.controller.initialize() {
                Ok(()) => self.initialized = true,
                Err(err) => {
                    error!(error = %err, "Session initialization failed");
                    self.status = error_status(&err);
                    return;
                }
            }
        }

        self.apply_layout();
        match self.controller.start() {
            Ok(()) => self.status = scanning_status(self.controller.device_name().as_deref()),
            Err(err) => {
                error!(error = %err, "Session start failed");
                self.status = error_status(&err);
            }
        }
    }

    fn on_resize(&mut self, area: Rect) {
        self.area = area;
        self.apply_layout();
    }

    fn on_key(&mut self, key: KeyEvent) -> Transition {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Transition::Quit,
            KeyCode::Char(' ') => {
                match self.controller.toggle() {
                    Ok(()) => {
                        self.status = if self.controller.is_running() {
                            scanning_status(self.controller.device_name().as_deref())
                        } else {
                            PAUSED_STATUS.to_string()
                        };
                    }
                    Err(err) => self.status = error_status(&err),
                }
                Transition::None
            }
            KeyCode::Char('r') => {
                self.initialized = false;
                self.on_appear(self.area);
                Transition::None
            }
            _ => Transition::None,
        }
    }

    fn tick(&mut self) -> Transition {
        self.controller.pump_preview();

        if let Ok(Some(SessionEvent::CodeDetected(code))) = self.events.try_next() {
            info!(symbology = %code.symbology, "Detection event received");
            // The controller already stopped the session
            audio::play_cue(&self.config.cue_path());
            self.status = PAUSED_STATUS.to_string();
            return Transition::Push(Box::new(CodeDisplayScreen::new(code.payload, &self.config)));
        }
        Transition::None
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();

        let snapshot = self.controller.preview();
        frame.render_widget(
            PreviewWidget {
                frame: snapshot.as_ref().map(|s| &s.frame),
                placeholder: "Waiting for camera...",
            },
            preview_area(area),
        );

        let status_area = Rect {
            x: area.x,
            y: area.y + area.height.saturating_sub(ui::STATUS_BAR_HEIGHT),
            width: area.width,
            height: ui::STATUS_BAR_HEIGHT.min(area.height),
        };
        frame.render_widget(
            StatusBar {
                message: &self.status,
            },
            status_area,
        );
    }

    fn will_close(&mut self) {
        if let Err(err) = self.controller.teardown() {
            debug!(error = %err, "Teardown reported an error");
        }
    }
}
