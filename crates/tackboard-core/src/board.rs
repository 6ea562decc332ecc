//! The board: per-frame selection/drag arbitration and the shortcut surface.
//!
//! `Board::update` runs once per frame over the current draw order, feeding
//! each widget the input snapshot topmost-first. At most one widget captures
//! a given click; the winner is promoted to the top of the draw order.
//!
//! Keyboard shortcuts (all ctrl-gated except delete, all suppressed while a
//! text field has focus):
//!
//! | Keys              | Action                         |
//! |-------------------|--------------------------------|
//! | Ctrl+C            | copy selected widget           |
//! | Ctrl+V            | paste at pointer               |
//! | Ctrl+D            | duplicate selected in place    |
//! | Ctrl+T            | toggle turbo paste             |
//! | Backspace/Delete  | delete selected widget         |
//! | Ctrl+S            | request session save           |
//! | Ctrl+L            | request session load           |

use crate::camera::Camera;
use crate::input::InputState;
use crate::store::WidgetStore;
use crate::widget::Widget;
use kurbo::Point;
use log::warn;
use serde::{Deserialize, Serialize};

/// Default spawn position for the first widget on a fresh board.
pub const DEFAULT_NOTE_POSITION: Point = Point::new(200.0, 200.0);

/// What a frame update asks of the outer loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    /// Ctrl+S was pressed; the caller should persist the session.
    pub save_requested: bool,
    /// Ctrl+L was pressed; the caller should reload the session.
    pub load_requested: bool,
    /// Script runner whose action control was clicked this frame.
    pub run_script: Option<usize>,
    /// Pointer is over a grabbable region (hand-cursor hint).
    pub hovering_any: bool,
}

/// The persistent half of a board: widgets, draw order, view transform.
///
/// This is the unit the session codec and the JSON interchange serialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardDocument {
    pub widgets: Vec<Widget>,
    pub draw_order: Vec<usize>,
    pub camera: Camera,
}

/// Board state plus per-frame controller flags.
#[derive(Debug, Clone)]
pub struct Board {
    /// Widget collection and z-order.
    pub store: WidgetStore,
    /// View transform (persisted with the session).
    pub camera: Camera,
    /// Turbo paste: paste repeats while the key is held.
    pub turbo: bool,
    /// Whether background panning is allowed this frame.
    pub allow_view_drag: bool,
    /// Whether any widget's text field holds focus this frame.
    pub any_text_focus: bool,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::with_store(WidgetStore::new())
    }

    /// Create a board around an existing store.
    pub fn with_store(store: WidgetStore) -> Self {
        Self {
            store,
            camera: Camera::new(),
            turbo: false,
            allow_view_drag: true,
            any_text_focus: false,
        }
    }

    /// The default board: a single blank note.
    ///
    /// This is also the recovery target when the session file is absent or
    /// fails its integrity check.
    pub fn default_board() -> Self {
        let mut board = Self::new();
        let mut note = Widget::note();
        note.set_position(DEFAULT_NOTE_POSITION);
        board.store.add(note);
        board
    }

    /// Run the per-frame update pass. See the module docs for the shortcut
    /// table; persistence and script execution stay with the caller.
    pub fn update(&mut self, input: &InputState) -> FrameOutcome {
        let world_mouse = self.camera.screen_to_world(input.pointer_position);
        let world_delta = input.pointer_delta() / self.camera.zoom;

        let mut outcome = FrameOutcome::default();
        let mut other_selected = false;
        let mut just_selected = None;
        self.any_text_focus = false;

        // Topmost visual layer first; once a widget claims the click, every
        // lower widget in the same pass is gated off.
        let pass: Vec<usize> = self.store.draw_order().iter().rev().copied().collect();
        for id in pass {
            let Some(widget) = self.store.get_mut(id) else { continue };
            widget.update(input, world_mouse, world_delta, other_selected);
            let widget_just_selected = widget.just_selected;
            let widget_script_triggered = widget.script_triggered();
            let widget_editing = widget.editing;
            if widget_just_selected {
                self.store.selected = Some(id);
                just_selected = Some(id);
                other_selected = true;
            }
            if widget_script_triggered {
                outcome.run_script = Some(id);
            }
            if widget_editing {
                self.any_text_focus = true;
            }
        }

        if let Some(id) = just_selected {
            self.store.promote(id);
        }

        self.handle_shortcuts(input, world_mouse, &mut outcome);

        self.allow_view_drag = !self
            .store
            .widgets()
            .iter()
            .any(|w| w.editing || w.dragging);
        outcome.hovering_any = self.store.widgets().iter().any(|w| w.hovering);

        outcome
    }

    fn handle_shortcuts(&mut self, input: &InputState, world_mouse: Point, outcome: &mut FrameOutcome) {
        if !self.any_text_focus {
            if input.is_key_held("Control") {
                if self.turbo && input.is_key_held("v") {
                    self.store.paste(world_mouse);
                }
                if input.is_key_single_pressed("c") {
                    self.store.copied = self.store.selected;
                }
                if input.is_key_pressed("v") {
                    self.store.paste(world_mouse);
                }
                if input.is_key_pressed("d") {
                    self.duplicate_selected_in_place();
                }
                if input.is_key_single_pressed("t") {
                    self.turbo = !self.turbo;
                }
            }

            let delete = input.is_key_single_pressed("Backspace")
                || input.is_key_single_pressed("Delete");
            if delete {
                if let Some(selected) = self.store.selected {
                    self.store.remove(selected);
                }
            }
        }

        if input.is_key_held("Control") {
            if input.is_key_single_pressed("s") {
                outcome.save_requested = true;
            }
            if input.is_key_single_pressed("l") {
                outcome.load_requested = true;
            }
        }
    }

    /// Duplicate the selected widget at its own center, preserving the copy
    /// source across the operation.
    fn duplicate_selected_in_place(&mut self) {
        let Some(selected) = self.store.selected else { return };
        let Some(center) = self.store.get(selected).map(|w| w.hitbox().center()) else {
            return;
        };
        let before = self.store.copied;
        self.store.copied = Some(selected);
        self.store.paste(center);
        self.store.copied = before;
    }

    /// Snapshot the persistent state.
    pub fn document(&self) -> BoardDocument {
        BoardDocument {
            widgets: self.store.widgets().to_vec(),
            draw_order: self.store.draw_order().to_vec(),
            camera: self.camera.clone(),
        }
    }

    /// Rebuild a board from a document.
    ///
    /// Widget layouts are recomputed (hitboxes are derived state). A draw
    /// order that is not a permutation of the widget indices is replaced
    /// with insertion order rather than rejected.
    pub fn from_document(document: BoardDocument) -> Self {
        let mut store = WidgetStore::new();
        for mut widget in document.widgets {
            widget.update_layout();
            let position = widget.position;
            widget.set_position(position);
            store.add(widget);
        }

        if document.draw_order.len() == store.len() {
            let mut restored = store.clone();
            // Re-apply the stored order by promoting in sequence.
            for &id in &document.draw_order {
                restored.promote(id);
            }
            if restored.draw_order() == document.draw_order.as_slice()
                && restored.draw_order_is_permutation()
            {
                store = restored;
            } else {
                warn!("session draw order invalid, falling back to insertion order");
            }
        } else if !document.draw_order.is_empty() {
            warn!("session draw order has wrong length, falling back to insertion order");
        }

        let mut board = Self::with_store(store);
        board.camera = document.camera;
        board
    }

    /// Serialize the board document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document())
    }

    /// Deserialize a board from document JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_document(serde_json::from_str(json)?))
    }
}
