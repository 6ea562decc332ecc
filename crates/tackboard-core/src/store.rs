//! Widget storage: dense collection, draw order, spatial placement.
//!
//! `WidgetStore` owns every widget on the board. Widgets are addressed by
//! their index into a dense vector; deletion swaps with the last slot and
//! renumbers `draw_order`, so ids are stable only between mutations.
//! `draw_order` is a permutation of all indices: front-to-back paint order,
//! iterated in reverse for topmost-first hit testing.

use crate::widget::Widget;
use kurbo::{Point, Rect};
use log::warn;
use thiserror::Error;

/// Gap left between a placed widget and the neighbor it is placed against.
const PLACEMENT_MARGIN: f64 = 10.0;
/// Margin widening schedule used when a search pass is exhausted.
const PLACEMENT_RETRY_MARGINS: [f64; 3] = [40.0, 160.0, 640.0];

/// Placement failures.
#[derive(Debug, Error, PartialEq)]
pub enum PlacementError {
    /// Every side of every widget collided, at every retry margin.
    #[error("no free spot found for a {0}x{1} widget")]
    Exhausted(f64, f64),
}

/// Seeded xorshift64 generator driving the placement side shuffle.
///
/// Placement is intentionally randomized, so callers that need reproducible
/// layouts (tests, demos) inject a fixed seed.
#[derive(Debug, Clone)]
pub struct PlacementRng {
    state: u64,
}

impl PlacementRng {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-ish index below `bound` (bound must be non-zero).
    fn next_below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }

    /// Fisher-Yates shuffle.
    fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_below(i + 1);
            slice.swap(i, j);
        }
    }
}

impl Default for PlacementRng {
    fn default() -> Self {
        Self::new(0x9E37_79B9_7F4A_7C15)
    }
}

/// The four sides a candidate can be placed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    /// Position a rectangle of `size` adjacent to `neighbor` on this side,
    /// offset outward by `margin`, aligned to the side's leading corner.
    fn place_beside(self, neighbor: Rect, size: kurbo::Size, margin: f64) -> Rect {
        let origin = match self {
            Side::Left => Point::new(neighbor.x0 - margin - size.width, neighbor.y0),
            Side::Right => Point::new(neighbor.x1 + margin, neighbor.y0),
            Side::Top => Point::new(neighbor.x0, neighbor.y0 - margin - size.height),
            Side::Bottom => Point::new(neighbor.x0, neighbor.y1 + margin),
        };
        Rect::from_origin_size(origin, size)
    }
}

/// Strict axis-aligned overlap (touching edges do not collide).
fn rects_collide(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// Ordered collection of widgets plus selection bookkeeping.
#[derive(Debug, Clone)]
pub struct WidgetStore {
    /// Dense storage; indices are widget ids.
    widgets: Vec<Widget>,
    /// Permutation of `0..widgets.len()`, back-to-front paint order.
    draw_order: Vec<usize>,
    /// Currently selected widget, if any.
    pub selected: Option<usize>,
    /// Copy source for paste, if any.
    pub copied: Option<usize>,
    rng: PlacementRng,
}

impl Default for WidgetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_rng(PlacementRng::default())
    }

    /// Create an empty store with an injected placement generator.
    pub fn with_rng(rng: PlacementRng) -> Self {
        Self {
            widgets: Vec::new(),
            draw_order: Vec::new(),
            selected: None,
            copied: None,
            rng,
        }
    }

    /// Create an empty store with a fixed placement seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(PlacementRng::new(seed))
    }

    /// Number of widgets.
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether the board is empty.
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Get a widget by id.
    pub fn get(&self, id: usize) -> Option<&Widget> {
        self.widgets.get(id)
    }

    /// Get a mutable widget by id.
    pub fn get_mut(&mut self, id: usize) -> Option<&mut Widget> {
        self.widgets.get_mut(id)
    }

    /// All widgets in storage order.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Mutable view of all widgets in storage order.
    pub fn widgets_mut(&mut self) -> &mut [Widget] {
        &mut self.widgets
    }

    /// Current paint order (back to front).
    pub fn draw_order(&self) -> &[usize] {
        &self.draw_order
    }

    /// Widgets in paint order, for the rendering collaborator.
    pub fn ordered(&self) -> impl Iterator<Item = &Widget> {
        self.draw_order.iter().filter_map(|&id| self.widgets.get(id))
    }

    /// The topmost widget id, if any.
    pub fn topmost(&self) -> Option<usize> {
        self.draw_order.last().copied()
    }

    /// Whether `rect` overlaps any widget's hitbox.
    pub fn collides_any(&self, rect: Rect) -> bool {
        self.widgets.iter().any(|w| rects_collide(rect, w.hitbox()))
    }

    /// Append a widget at its current position; it becomes topmost.
    pub fn add(&mut self, widget: Widget) -> usize {
        let id = self.widgets.len();
        self.widgets.push(widget);
        self.draw_order.push(id);
        id
    }

    /// Place a widget via the free-spot search, then append it.
    pub fn add_placed(&mut self, mut widget: Widget) -> Result<usize, PlacementError> {
        let spot = self.find_free_spot(widget.hitbox())?;
        widget.set_position(spot.origin());
        Ok(self.add(widget))
    }

    /// Find a position where `candidate` collides with no widget.
    ///
    /// On an empty board the candidate is free where it stands. Otherwise
    /// the search walks existing widgets nearest-center-first and tries the
    /// four sides of each in randomized order; if the whole pass collides the
    /// margin is widened and the pass repeated before reporting exhaustion.
    pub fn find_free_spot(&mut self, candidate: Rect) -> Result<Rect, PlacementError> {
        if self.widgets.is_empty() {
            return Ok(candidate);
        }
        if let Some(spot) = self.search_free_spot(candidate, PLACEMENT_MARGIN) {
            return Ok(spot);
        }
        for margin in PLACEMENT_RETRY_MARGINS {
            warn!("placement pass exhausted, widening margin to {margin}");
            if let Some(spot) = self.search_free_spot(candidate, margin) {
                return Ok(spot);
            }
        }
        Err(PlacementError::Exhausted(candidate.width(), candidate.height()))
    }

    /// One search pass at a fixed margin.
    fn search_free_spot(&mut self, candidate: Rect, margin: f64) -> Option<Rect> {
        let mut by_distance: Vec<(usize, f64)> = self
            .widgets
            .iter()
            .enumerate()
            .map(|(id, w)| {
                let d = (candidate.center() - w.hitbox().center()).hypot();
                (id, d)
            })
            .collect();
        by_distance.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut sides = Side::ALL;
        for (id, _) in by_distance {
            let neighbor = self.widgets[id].hitbox();
            self.rng.shuffle(&mut sides);
            for side in sides {
                let placed = side.place_beside(neighbor, candidate.size(), margin);
                if !self.collides_any(placed) {
                    return Some(placed);
                }
            }
        }
        None
    }

    /// Duplicate the copy source, centered at `position` when that spot is
    /// free, otherwise wherever the free-spot search lands. The clone is a
    /// deep copy (script-runner state included) and becomes topmost.
    pub fn paste(&mut self, position: Point) -> Option<usize> {
        let src = self.copied?;
        let mut widget = self.widgets.get(src)?.duplicated();

        let mut hitbox = Rect::from_center_size(position, widget.hitbox().size());
        if self.collides_any(hitbox) {
            hitbox = match self.find_free_spot(hitbox) {
                Ok(spot) => spot,
                Err(err) => {
                    warn!("paste skipped: {err}");
                    return None;
                }
            };
        }

        widget.set_position(hitbox.origin());
        Some(self.add(widget))
    }

    /// Move a widget to the back of the draw order (topmost).
    pub fn promote(&mut self, id: usize) {
        if id >= self.widgets.len() {
            return;
        }
        self.draw_order.retain(|&other| other != id);
        self.draw_order.push(id);
    }

    /// Remove a widget by id.
    ///
    /// The target is swapped with the last slot, the stale draw-order entry
    /// dropped and every entry referencing an index at or above the removed
    /// one renumbered down, keeping `draw_order` a permutation of the
    /// shrunken range.
    pub fn remove(&mut self, id: usize) {
        if id >= self.widgets.len() {
            return;
        }

        self.draw_order.retain(|&other| other != id);
        let last = self.widgets.len() - 1;
        if id != last {
            self.widgets.swap(id, last);
            for entry in &mut self.draw_order {
                if *entry >= id {
                    *entry -= 1;
                }
            }
        }
        self.widgets.pop();

        self.selected = None;
        if self.copied == Some(id) || self.copied.map_or(false, |c| c >= self.widgets.len()) {
            self.copied = None;
        }
    }

    /// Check the draw-order invariant: a permutation of `0..len`.
    pub fn draw_order_is_permutation(&self) -> bool {
        if self.draw_order.len() != self.widgets.len() {
            return false;
        }
        let mut seen = vec![false; self.widgets.len()];
        for &id in &self.draw_order {
            if id >= seen.len() || seen[id] {
                return false;
            }
            seen[id] = true;
        }
        true
    }
}
