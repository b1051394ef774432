//! Box and caption overlays rendered onto a grayscale frame.

use crate::font::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use facegate_core::FaceBox;
use facegate_hw::Frame;
use image::{Rgb, RgbImage};

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    /// Caption whose baseline starts at (`x`, `y`).
    Text {
        text: String,
        x: i32,
        y: i32,
        scale: u32,
        color: Rgb<u8>,
    },
    Rect {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        thickness: i32,
        color: Rgb<u8>,
    },
}

/// Marks to draw over the next preview frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    marks: Vec<Mark>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, text: impl Into<String>, x: i32, y: i32, scale: u32, color: Rgb<u8>) -> &mut Self {
        self.marks.push(Mark::Text {
            text: text.into(),
            x,
            y,
            scale: scale.max(1),
            color,
        });
        self
    }

    pub fn face(&mut self, face: &FaceBox, color: Rgb<u8>) -> &mut Self {
        self.marks.push(Mark::Rect {
            left: face.left.round() as i32,
            top: face.top.round() as i32,
            right: face.right.round() as i32,
            bottom: face.bottom.round() as i32,
            thickness: 2,
            color,
        });
        self
    }

    /// Captions in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().filter_map(|m| match m {
            Mark::Text { text, .. } => Some(text.as_str()),
            Mark::Rect { .. } => None,
        })
    }

    /// Draw every mark over an RGB copy of `frame`.
    pub fn render(&self, frame: &Frame) -> RgbImage {
        let mut canvas = RgbImage::from_fn(frame.width, frame.height, |x, y| {
            let v = frame
                .data
                .get((y * frame.width + x) as usize)
                .copied()
                .unwrap_or(0);
            Rgb([v, v, v])
        });

        for mark in &self.marks {
            match mark {
                Mark::Text { text, x, y, scale, color } => draw_text(&mut canvas, text, *x, *y, *scale, *color),
                Mark::Rect {
                    left,
                    top,
                    right,
                    bottom,
                    thickness,
                    color,
                } => draw_rect(&mut canvas, (*left, *top, *right, *bottom), *thickness, *color),
            }
        }

        canvas
    }
}

fn put(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_rect(canvas: &mut RgbImage, (left, top, right, bottom): (i32, i32, i32, i32), thickness: i32, color: Rgb<u8>) {
    for t in 0..thickness {
        for x in left..=right {
            put(canvas, x, top + t, color);
            put(canvas, x, bottom - t, color);
        }
        for y in top..=bottom {
            put(canvas, left + t, y, color);
            put(canvas, right - t, y, color);
        }
    }
}

fn draw_text(canvas: &mut RgbImage, text: &str, x: i32, baseline: i32, scale: u32, color: Rgb<u8>) {
    let s = scale as i32;
    let top = baseline - (GLYPH_HEIGHT * scale) as i32;

    for (i, c) in text.chars().enumerate() {
        let origin_x = x + (i as u32 * ADVANCE * scale) as i32;
        for (col, bits) in font::glyph(c).iter().enumerate().take(GLYPH_WIDTH as usize) {
            for row in 0..GLYPH_HEIGHT as i32 {
                if bits & (1 << row) == 0 {
                    continue;
                }
                for dy in 0..s {
                    for dx in 0..s {
                        put(canvas, origin_x + col as i32 * s + dx, top + row * s + dy, color);
                    }
                }
            }
        }
    }
}
