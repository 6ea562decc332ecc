//! Tackboard Core Library
//!
//! Engine for an infinite sticky-note board: widget placement, per-frame
//! selection and drag arbitration, draw-order management, ciphered session
//! persistence and the script-runner interpreter.

pub mod board;
pub mod camera;
pub mod input;
pub mod script;
pub mod storage;
pub mod store;
pub mod widget;

pub use board::{Board, BoardDocument, FrameOutcome};
pub use camera::Camera;
pub use input::{InputState, KeyEvent, MouseButton, PointerEvent};
pub use script::{FileSystem, MemoryFileSystem, ScriptInterpreter, ScriptReport, StdFileSystem};
pub use storage::{CipherConfig, SessionFile};
pub use store::{PlacementError, PlacementRng, WidgetStore};
pub use widget::{Widget, WidgetKind};
