use crate::overlay::pager::{PagerState, WarningPager};
use std::time::Instant;

pub const BACKGROUND: Color = Color::rgb(0x1a, 0x1a, 0x1a);
pub const HEADER_BG: Color = Color::rgb(0x2a, 0x2a, 0x2a);
pub const WARNING_RED: Color = Color::rgb(0xff, 0x3b, 0x30);
pub const ALLOW_GREEN: Color = Color::rgb(0x34, 0xc7, 0x59);
pub const PROGRESS_TRACK: Color = Color::rgb(0x33, 0x33, 0x33);
pub const TEXT_WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
pub const TEXT_DIM: Color = Color::rgb(0x88, 0x88, 0x88);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fade toward `background` by `opacity` (1.0 keeps the color, 0.0 is
    /// fully the background). The backing bitmap has no alpha channel, so the
    /// pulse is baked into the pixel color.
    pub fn faded(self, background: Color, opacity: f32) -> Color {
        let t = opacity.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (b as f32 + (a as f32 - b as f32) * t).round() as u8;
        Color::rgb(
            mix(self.r, background.r),
            mix(self.g, background.g),
            mix(self.b, background.b),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn contains(&self, point: (i32, i32)) -> bool {
        point.0 >= self.x
            && point.0 < self.x + self.width
            && point.1 >= self.y
            && point.1 < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayTap {
    Forward,
    Close,
}

/// Pixel layout of the overlay for a given surface size. Header on top,
/// warning text in the middle, progress bar and the two action buttons at the
/// bottom, mirroring the layout users already know from the mobile overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneLayout {
    pub header: Rect,
    pub body: Rect,
    pub progress_track: Rect,
    pub progress_fill: Rect,
    pub close_button: Rect,
    pub forward_button: Rect,
}

pub fn layout(width: i32, height: i32, progress: f32) -> SceneLayout {
    let margin = width / 24;
    let header_h = (height / 10).max(48);
    let button_h = (height / 12).max(44);
    let progress_h = 6;
    let footer_h = button_h + margin;

    let header = Rect {
        x: 0,
        y: 0,
        width,
        height: header_h,
    };
    let progress_y = height - footer_h - margin - progress_h;
    let progress_track = Rect {
        x: margin,
        y: progress_y,
        width: width - margin * 2,
        height: progress_h,
    };
    let fill_w = (progress_track.width as f32 * progress.clamp(0.0, 1.0)).round() as i32;
    let progress_fill = Rect {
        width: fill_w,
        ..progress_track
    };
    let body = Rect {
        x: margin,
        y: header_h + margin,
        width: width - margin * 2,
        height: progress_y - header_h - margin * 2,
    };

    let button_w = (width - margin * 3) / 2;
    let button_y = height - footer_h;
    let close_button = Rect {
        x: margin,
        y: button_y,
        width: button_w,
        height: button_h,
    };
    let forward_button = Rect {
        x: margin * 2 + button_w,
        y: button_y,
        width: button_w,
        height: button_h,
    };

    SceneLayout {
        header,
        body,
        progress_track,
        progress_fill,
        close_button,
        forward_button,
    }
}

pub fn hit_test(layout: &SceneLayout, point: (i32, i32)) -> Option<OverlayTap> {
    if layout.close_button.contains(point) {
        Some(OverlayTap::Close)
    } else if layout.forward_button.contains(point) {
        Some(OverlayTap::Forward)
    } else {
        None
    }
}

/// Everything the platform painter needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayScene {
    pub layout: SceneLayout,
    pub header_text: String,
    pub page_label: String,
    pub body_text: String,
    pub body_color: Color,
    pub forward_label: Option<String>,
    pub close_label: String,
}

pub fn compose_scene(pager: &WarningPager, size: (i32, i32), now: Instant) -> OverlayScene {
    let layout = layout(size.0, size.1, pager.progress());
    match pager.state() {
        PagerState::Empty => OverlayScene {
            layout,
            header_text: "WARNING SCREEN".to_string(),
            page_label: String::new(),
            body_text: "No warnings to display".to_string(),
            body_color: TEXT_DIM,
            forward_label: None,
            close_label: "Close App".to_string(),
        },
        state => OverlayScene {
            layout,
            header_text: "WARNING SCREEN".to_string(),
            page_label: format!("{} / {}", pager.index() + 1, pager.len()),
            body_text: pager.current_warning().unwrap_or_default().to_string(),
            body_color: TEXT_WHITE.faded(BACKGROUND, pager.pulse_opacity(now)),
            forward_label: Some(
                if state == PagerState::LastPage {
                    "Open App"
                } else {
                    "Next"
                }
                .to_string(),
            ),
            close_label: "Close App".to_string(),
        },
    }
}
