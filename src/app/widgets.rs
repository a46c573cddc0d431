// SPDX-License-Identifier: GPL-3.0-only

//! Terminal rendering widgets
//!
//! Rasters are drawn with Unicode half-block characters: every cell carries
//! two vertical pixels, the upper half as foreground and the lower as
//! background. Layout math lives in standalone functions so the cell
//! arithmetic is testable without a terminal.

use image::GrayImage;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::backends::camera::types::CameraFrame;

/// Fit `src` pixels into `cols x rows` cells preserving aspect ratio
///
/// Half-block rendering gives every cell two pixel rows, so the vertical
/// budget is `rows * 2`.
pub(crate) fn fit_cells(src_width: u32, src_height: u32, cols: u16, rows: u16) -> (u16, u16) {
    if src_width == 0 || src_height == 0 || cols == 0 || rows == 0 {
        return (0, 0);
    }

    let aspect = src_width as f64 / src_height as f64;
    let term_width = cols as f64;
    let term_height = (rows as u32 * 2) as f64;

    if term_width / term_height > aspect {
        // Terminal is wider; fit to height
        let h = term_height;
        let w = h * aspect;
        (w as u16, (h / 2.0) as u16)
    } else {
        // Terminal is taller; fit to width
        let w = term_width;
        let h = w / aspect;
        (w as u16, (h / 2.0) as u16)
    }
}

/// Cell rectangle for a square raster at `fraction` of the shorter screen
/// dimension, measured in half-block pixel space
pub(crate) fn square_cells(cols: u16, rows: u16, fraction: f32) -> (u16, u16) {
    if cols == 0 || rows == 0 {
        return (0, 0);
    }

    let pixel_cols = cols as f32;
    let pixel_rows = rows as f32 * 2.0;
    let side = (pixel_cols.min(pixel_rows) * fraction) as u16;
    (side, side.div_ceil(2))
}

/// Draw a `cell_w x cell_h` half-block raster centered in `area`, sampling
/// source pixels through `sample`
fn blit_half_blocks(
    buf: &mut Buffer,
    area: Rect,
    cell_w: u16,
    cell_h: u16,
    src_width: u32,
    src_height: u32,
    sample: impl Fn(u32, u32) -> Color,
) {
    let x_offset = area.x + area.width.saturating_sub(cell_w) / 2;
    let y_offset = area.y + area.height.saturating_sub(cell_h) / 2;

    let x_scale = src_width as f64 / cell_w as f64;
    let y_scale = src_height as f64 / (cell_h as u32 * 2) as f64;

    for ty in 0..cell_h {
        for tx in 0..cell_w {
            let src_x = (tx as f64 * x_scale) as u32;
            let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
            let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

            if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                cell.set_char('▀');
                cell.set_fg(sample(src_x, src_y_top));
                cell.set_bg(sample(src_x, src_y_bottom));
            }
        }
    }
}

fn sample_rgb(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let x = x.min(frame.width.saturating_sub(1));
    let y = y.min(frame.height.saturating_sub(1));
    let idx = y as usize * frame.stride as usize + x as usize * 4;
    match frame.data.get(idx..idx + 3) {
        Some(px) => Color::Rgb(px[0], px[1], px[2]),
        None => Color::Rgb(0, 0, 0),
    }
}

fn sample_gray(image: &GrayImage, x: u32, y: u32) -> Color {
    let x = x.min(image.width() - 1);
    let y = y.min(image.height() - 1);
    let v = image.get_pixel(x, y).0[0];
    Color::Rgb(v, v, v)
}

/// Live camera preview, aspect-fit and centered
pub struct PreviewWidget<'a> {
    pub frame: Option<&'a CameraFrame>,
    pub placeholder: &'a str,
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame else {
            CenteredText {
                text: self.placeholder,
            }
            .render(area, buf);
            return;
        };

        let (cell_w, cell_h) = fit_cells(frame.width, frame.height, area.width, area.height);
        if cell_w == 0 || cell_h == 0 {
            return;
        }

        blit_half_blocks(buf, area, cell_w, cell_h, frame.width, frame.height, |x, y| {
            sample_rgb(frame, x, y)
        });
    }
}

/// Magnified code raster, square, centered, sized by `fraction`
pub struct RasterWidget<'a> {
    pub image: &'a GrayImage,
    pub fraction: f32,
}

impl Widget for RasterWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.image.width() == 0 || self.image.height() == 0 {
            return;
        }

        let (cell_w, cell_h) = square_cells(area.width, area.height, self.fraction);
        if cell_w == 0 || cell_h == 0 {
            return;
        }

        blit_half_blocks(
            buf,
            area,
            cell_w,
            cell_h,
            self.image.width(),
            self.image.height(),
            |x, y| sample_gray(self.image, x, y),
        );
    }
}

/// One line of text, centered in its area, clipped to the width
pub struct CenteredText<'a> {
    pub text: &'a str,
}

impl Widget for CenteredText<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let shown: String = self.text.chars().take(area.width as usize).collect();
        let len = shown.chars().count() as u16;
        let x = area.x + area.width.saturating_sub(len) / 2;
        let y = area.y + area.height / 2;
        buf.set_string(x, y, &shown, Style::default());
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    pub message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let shown: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            &shown,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}
