//! Pointer, wheel and focus handling.

use super::settings::MouseMode;
use super::viewer::Viewer;
use crate::backend::RenderBackend;
use crate::consts::{DRAG_ZOOM_RATE, MAX_DRAG_ZOOM, MIN_DRAG_ZOOM, SCROLL_DEADZONE_DEGREES};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        shift: false,
        ctrl: false,
    };

    pub const ALT: Modifiers = Modifiers {
        alt: true,
        shift: false,
        ctrl: false,
    };
}

/// Pointer gesture state, in window pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    /// Last known pointer position.
    pub position: (i32, i32),
    /// Button of the gesture in progress.
    pub drag_button: Option<PointerButton>,
    pub dragging: bool,
    pub selecting: bool,
    pub select_start: (i32, i32),
    pub select_end: (i32, i32),
    /// Set by focus loss; the next press only re-activates the window.
    pub mouse_activation: bool,
}

impl<B: RenderBackend> Viewer<B> {
    pub fn on_pointer_down(&mut self, x: i32, y: i32, button: PointerButton, modifiers: Modifiers) {
        self.pointer.position = (x, y);
        self.pointer.drag_button = Some(button);
        if self.pointer.mouse_activation {
            self.pointer.mouse_activation = false;
            return;
        }

        let area = self.settings.area_sample_mode;
        let zoom_click = self.settings.mouse_mode == MouseMode::Zoom && !modifiers.alt && !area;
        match button {
            PointerButton::Left if area => {
                self.pointer.select_start = (x, y);
                self.pointer.select_end = (x, y);
                self.pointer.selecting = true;
                self.request_redraw();
            }
            PointerButton::Left | PointerButton::Right if zoom_click => {
                if button == PointerButton::Left {
                    self.zoom_in();
                } else {
                    self.zoom_out();
                }
            }
            _ => self.pointer.dragging = true,
        }
    }

    /// Pointer motion. The gesture button is the one recorded at press.
    pub fn on_pointer_move(&mut self, x: i32, y: i32, modifiers: Modifiers) {
        if self.settings.area_sample_mode && self.pointer.selecting {
            self.pointer.select_end = (x, y);
            self.pointer.position = (x, y);
            self.request_redraw();
            return;
        }

        let dx = (x - self.pointer.position.0) as f32;
        let dy = (y - self.pointer.position.1) as f32;
        let button = self.pointer.drag_button;
        let alt = modifiers.alt;

        match self.settings.mouse_mode {
            MouseMode::Zoom => match button {
                Some(PointerButton::Middle) => self.drag_pan(dx, dy),
                Some(PointerButton::Left) if alt => self.drag_pan(dx, dy),
                Some(PointerButton::Right) if alt => {
                    let zoom = (self.view.zoom * (1.0 + DRAG_ZOOM_RATE * (dx + dy)))
                        .clamp(MIN_DRAG_ZOOM, MAX_DRAG_ZOOM);
                    self.zoom_to(zoom, true);
                }
                _ => {}
            },
            MouseMode::Pan => {
                if button.is_some() {
                    self.drag_pan(dx, dy);
                }
            }
            MouseMode::Select => {
                if button.is_some() && self.pointer.selecting {
                    self.pointer.select_end = (x, y);
                    self.request_redraw();
                }
            }
            MouseMode::Wipe | MouseMode::Annotate => {}
        }

        self.pointer.position = (x, y);
        if self.settings.pixelview {
            self.request_redraw();
        }
    }

    fn drag_pan(&mut self, dx: f32, dy: f32) {
        let zoom = self.view.zoom;
        self.pan_by(-dx / zoom, -dy / zoom);
    }

    /// Ends any gesture. A selection in progress is measured by the area
    /// probe.
    pub fn on_pointer_up(&mut self, x: i32, y: i32, _button: PointerButton, _modifiers: Modifiers) {
        self.pointer.position = (x, y);
        self.pointer.drag_button = None;
        self.pointer.dragging = false;
        if self.pointer.selecting {
            self.pointer.select_end = (x, y);
            self.pointer.selecting = false;
            if let Some(image) = self.image.clone() {
                let (start, end) = (self.pointer.select_start, self.pointer.select_end);
                self.probe.update(&*image, &self.view, start, end);
            }
            self.pointer.select_start = (0, 0);
            self.pointer.select_end = (0, 0);
            self.request_redraw();
        }
    }

    /// Wheel motion in degrees. Only clearly vertical motion zooms.
    pub fn on_scroll(&mut self, dx: f32, dy: f32) {
        self.pointer.mouse_activation = false;
        if dy.abs() > dx.abs() && dy.abs() > SCROLL_DEADZONE_DEGREES {
            if dy > 0.0 {
                self.zoom_in();
            } else {
                self.zoom_out();
            }
        }
    }

    pub fn focus_out(&mut self) {
        self.pointer.mouse_activation = true;
    }
}
