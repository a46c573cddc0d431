// SPDX-License-Identifier: GPL-3.0-only

//! Magnified code display screen
//!
//! Encodes the detected payload once at construction and presents the
//! raster full-screen under a configured caption. Any key dismisses back to
//! the scanner; 's' writes the raster to disk first.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use image::GrayImage;
use ratatui::{Frame, layout::Rect};
use tracing::error;

use crate::config::Config;
use crate::constants::ui;
use crate::encode::{self, EncodeProfile};

use super::widgets::{CenteredText, RasterWidget, StatusBar};
use super::{Screen, Transition};

const DISPLAY_STATUS: &str = "'s' save | any key closes";

/// One text row at `offset` rows below the top of `area`
fn row(area: Rect, offset: u16) -> Rect {
    Rect {
        x: area.x,
        y: area.y + offset.min(area.height),
        width: area.width,
        height: u16::from(offset < area.height),
    }
}

/// Everything between the caption rows and the status bar
fn body_area(area: Rect) -> Rect {
    let top = ui::CAPTION_ROW + 2;
    Rect {
        x: area.x,
        y: area.y + top.min(area.height),
        width: area.width,
        height: area.height.saturating_sub(top + ui::STATUS_BAR_HEIGHT),
    }
}

pub struct CodeDisplayScreen {
    image: Option<GrayImage>,
    encode_error: Option<String>,
    caption: String,
    caption_date: String,
    save_dir: Option<PathBuf>,
    status: String,
}

impl CodeDisplayScreen {
    /// Encode `payload` for display; an encoding failure becomes an
    /// on-screen message, never a crash
    pub fn new(payload: String, config: &Config) -> Self {
        let (image, encode_error) = match encode::generate(&payload, &EncodeProfile::default()) {
            Ok(image) => (Some(image), None),
            Err(err) => {
                error!(error = %err, "Payload could not be encoded");
                (None, Some(format!("Cannot display code: {}", err)))
            }
        };

        Self {
            image,
            encode_error,
            caption: config.caption.clone(),
            caption_date: config.caption_date.clone(),
            save_dir: config.save_dir.clone(),
            status: DISPLAY_STATUS.to_string(),
        }
    }

    fn save(&mut self) {
        let Some(image) = &self.image else {
            return;
        };

        let dir = self
            .save_dir
            .clone()
            .unwrap_or_else(encode::default_save_dir);
        if let Err(err) = std::fs::create_dir_all(&dir) {
            error!(error = %err, dir = %dir.display(), "Save directory unavailable");
            self.status = format!("Error: {}", err);
            return;
        }

        let path = encode::timestamped_path(&dir);
        match encode::save_png(image, &path) {
            Ok(()) => self.status = format!("Saved: {}", path.display()),
            Err(err) => {
                error!(error = %err, "Save failed");
                self.status = format!("Error: {}", err);
            }
        }
    }
}

impl Screen for CodeDisplayScreen {
    fn on_appear(&mut self, _area: Rect) {}

    fn on_resize(&mut self, _area: Rect) {}

    fn on_key(&mut self, key: KeyEvent) -> Transition {
        match key.code {
            KeyCode::Char('s') if self.image.is_some() => {
                self.save();
                Transition::None
            }
            _ => Transition::Pop,
        }
    }

    fn tick(&mut self) -> Transition {
        Transition::None
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();

        if !self.caption.is_empty() {
            frame.render_widget(
                CenteredText {
                    text: &self.caption,
                },
                row(area, ui::CAPTION_ROW),
            );
        }
        if !self.caption_date.is_empty() {
            frame.render_widget(
                CenteredText {
                    text: &self.caption_date,
                },
                row(area, ui::CAPTION_ROW + 1),
            );
        }

        let body = body_area(area);
        match (&self.image, &self.encode_error) {
            (Some(image), _) => frame.render_widget(
                RasterWidget {
                    image,
                    fraction: ui::DISPLAY_FRACTION,
                },
                body,
            ),
            (None, Some(message)) => frame.render_widget(CenteredText { text: message }, body),
            (None, None) => {}
        }

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

    fn will_close(&mut self) {}
}
