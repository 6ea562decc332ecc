//! Board widgets: sticky notes and script runners.
//!
//! A widget is a positioned, text-bearing board entity. Its `hitbox` is the
//! full collision/render rectangle derived from the text extent; the
//! `dragging_hitbox` is the title-bar slice at the top used for drag and
//! click hit-testing. Both are recomputed together whenever the text changes.

use crate::input::InputState;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Font size used for text extent approximation, in world units.
pub const FONT_SIZE: f64 = 40.0;
/// Average character width as a fraction of the font size.
const CHAR_WIDTH_FACTOR: f64 = 0.55;
/// Line height as a fraction of the font size.
const LINE_HEIGHT_FACTOR: f64 = 1.2;
/// Padding added around the text extent on all sides.
const HITBOX_PADDING: f64 = 20.0;
/// Extra room above the text for the title bar.
const TITLE_BAR_EXTEND: f64 = 30.0;
/// Height of the dragging hitbox (title-bar slice).
pub const DRAG_BAR_HEIGHT: f64 = 50.0;
/// Side length of a script runner's action control.
pub const ACTION_BOX_SIZE: f64 = 120.0;
/// Minimum text extent so empty widgets stay grabbable.
const MIN_TEXT_EXTENT: f64 = 60.0;

/// Transient UI state for a script runner's action control.
///
/// Holds no persistent data beyond the owning widget's text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptRunnerState {
    /// Action control rectangle, hung off the widget's bottom-right corner.
    #[serde(skip)]
    pub action_hitbox: Rect,
    /// Whether the pointer is over the action control this frame.
    #[serde(skip)]
    pub hovering: bool,
    /// Set when the action control was clicked this frame.
    #[serde(skip)]
    pub triggered: bool,
}

/// Widget variant tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WidgetKind {
    /// A plain editable sticky note.
    Note,
    /// A note whose text is a runnable file-management script.
    ScriptRunner(ScriptRunnerState),
}

impl WidgetKind {
    /// Wire tag for the session codec.
    pub fn tag(&self) -> u8 {
        match self {
            WidgetKind::Note => 0,
            WidgetKind::ScriptRunner(_) => 1,
        }
    }

    /// Reconstruct a kind from its wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(WidgetKind::Note),
            1 => Some(WidgetKind::ScriptRunner(ScriptRunnerState::default())),
            _ => None,
        }
    }
}

/// One placeable board entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Widget {
    /// Editable content. For a script runner this is the script source.
    pub text: String,
    /// Top-left anchor of the hitbox in world coordinates.
    pub position: Point,
    /// Variant tag plus any per-variant UI state.
    pub kind: WidgetKind,
    /// Full collision/render rectangle.
    #[serde(skip)]
    pub hitbox: Rect,
    /// Title-bar slice used for drag/click hit-testing.
    #[serde(skip)]
    pub dragging_hitbox: Rect,
    /// Pointer is over the title bar this frame.
    #[serde(skip)]
    pub hovering: bool,
    /// Widget is being dragged.
    #[serde(skip)]
    pub dragging: bool,
    /// Widget claimed this frame's click.
    #[serde(skip)]
    pub just_selected: bool,
    /// Text-edit region has input focus.
    #[serde(skip)]
    pub editing: bool,
}

impl Widget {
    /// Create a widget of the given kind at the origin.
    pub fn new(kind: WidgetKind) -> Self {
        let mut widget = Self {
            text: String::new(),
            position: Point::ZERO,
            kind,
            hitbox: Rect::ZERO,
            dragging_hitbox: Rect::ZERO,
            hovering: false,
            dragging: false,
            just_selected: false,
            editing: false,
        };
        widget.update_layout();
        widget
    }

    /// Create a blank note.
    pub fn note() -> Self {
        Self::new(WidgetKind::Note)
    }

    /// Create a blank script runner.
    pub fn script_runner() -> Self {
        Self::new(WidgetKind::ScriptRunner(ScriptRunnerState::default()))
    }

    /// Approximate extent of the text content.
    ///
    /// Exact glyph metrics live in the renderer; the board only needs a
    /// stable approximation (widest line x char width, line count x line
    /// height) to size hitboxes.
    fn text_extent(&self) -> Size {
        let max_line_len = self.text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let line_count = self.text.lines().count().max(1);
        // lines() does not count a trailing empty line
        let line_count = if self.text.ends_with('\n') {
            line_count + 1
        } else {
            line_count
        };

        Size::new(
            (max_line_len as f64 * FONT_SIZE * CHAR_WIDTH_FACTOR).max(MIN_TEXT_EXTENT),
            (line_count as f64 * FONT_SIZE * LINE_HEIGHT_FACTOR).max(MIN_TEXT_EXTENT),
        )
    }

    /// Recompute `hitbox`, `dragging_hitbox` and the action control from the
    /// current text and position. Call after every text change.
    pub fn update_layout(&mut self) {
        let extent = self.text_extent();
        self.hitbox = Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + extent.width + HITBOX_PADDING * 2.0,
            self.position.y + extent.height + HITBOX_PADDING * 2.0 + TITLE_BAR_EXTEND,
        );
        self.dragging_hitbox = Rect::new(
            self.hitbox.x0,
            self.hitbox.y0,
            self.hitbox.x1,
            self.hitbox.y0 + DRAG_BAR_HEIGHT,
        );
        if let WidgetKind::ScriptRunner(state) = &mut self.kind {
            // Top-right corner of the action box sits on the widget's
            // bottom-right corner.
            state.action_hitbox = Rect::new(
                self.hitbox.x1 - ACTION_BOX_SIZE,
                self.hitbox.y1,
                self.hitbox.x1,
                self.hitbox.y1 + ACTION_BOX_SIZE,
            );
        }
    }

    /// Full hitbox.
    pub fn hitbox(&self) -> Rect {
        self.hitbox
    }

    /// The text-edit region: everything below the title bar.
    pub fn body_hitbox(&self) -> Rect {
        Rect::new(
            self.hitbox.x0,
            self.hitbox.y0 + DRAG_BAR_HEIGHT,
            self.hitbox.x1,
            self.hitbox.y1,
        )
    }

    /// Whether this widget carries a runnable script.
    pub fn is_script_runner(&self) -> bool {
        matches!(self.kind, WidgetKind::ScriptRunner(_))
    }

    /// Translate the widget and all derived rectangles.
    pub fn move_by(&mut self, delta: Vec2) {
        self.position += delta;
        self.hitbox = self.hitbox + delta;
        self.dragging_hitbox = self.dragging_hitbox + delta;
        if let WidgetKind::ScriptRunner(state) = &mut self.kind {
            state.action_hitbox = state.action_hitbox + delta;
        }
    }

    /// Move the widget so its hitbox top-left lands on `position`.
    pub fn set_position(&mut self, position: Point) {
        let delta = position - self.hitbox.origin();
        self.move_by(delta);
    }

    /// Replace the text content and recompute the layout.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.update_layout();
    }

    /// Deep copy with transient per-frame flags cleared.
    pub fn duplicated(&self) -> Self {
        let mut copy = self.clone();
        copy.hovering = false;
        copy.dragging = false;
        copy.just_selected = false;
        copy.editing = false;
        if let WidgetKind::ScriptRunner(state) = &mut copy.kind {
            state.hovering = false;
            state.triggered = false;
        }
        copy
    }

    /// Per-frame update: text editing, hover, click claim, drag.
    ///
    /// `world_mouse` and `world_delta` are the pointer position and frame
    /// delta already transformed into world coordinates. `other_selected`
    /// gates off click capture when a widget earlier in the pass (visually
    /// above this one) has already claimed the click.
    pub fn update(
        &mut self,
        input: &InputState,
        world_mouse: Point,
        world_delta: Vec2,
        other_selected: bool,
    ) {
        if self.editing && !other_selected {
            let mut changed = false;
            if input.is_key_pressed("Backspace") && self.text.pop().is_some() {
                changed = true;
            }
            if input.is_key_pressed("Enter") {
                self.text.push('\n');
                changed = true;
            }
            if !input.typed().is_empty() {
                self.text.push_str(input.typed());
                changed = true;
            }
            if changed {
                self.update_layout();
            }
        }

        self.hovering = self.dragging_hitbox.contains(world_mouse);
        if let WidgetKind::ScriptRunner(state) = &mut self.kind {
            state.hovering = state.action_hitbox.contains(world_mouse);
            state.triggered = false;
        }

        self.just_selected = false;
        if input.left_clicked() {
            if self.hovering && !other_selected {
                self.dragging = true;
                self.just_selected = true;
            } else if !other_selected && self.body_hitbox().contains(world_mouse) {
                self.editing = true;
                self.just_selected = true;
            } else {
                self.editing = false;
                if let WidgetKind::ScriptRunner(state) = &mut self.kind {
                    if state.hovering && !other_selected {
                        state.triggered = true;
                        self.just_selected = true;
                    }
                }
            }
        }

        if input.left_released() {
            self.dragging = false;
        }

        if self.dragging {
            self.move_by(world_delta);
        }
    }

    /// Whether the action control fired this frame.
    pub fn script_triggered(&self) -> bool {
        match &self.kind {
            WidgetKind::ScriptRunner(state) => state.triggered,
            WidgetKind::Note => false,
        }
    }
}
