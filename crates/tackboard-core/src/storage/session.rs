//! Session file: tamper-checked binary save/load of the board document.
//!
//! Layout after keystream reversal, all little-endian:
//! `[4 x u64 cookie][widget count][per widget: text, position x/y, kind tag]`
//! `[draw-order count + entries][camera offset x/y][camera zoom]`.

use super::codec::{ByteReader, ByteWriter, CipherConfig, CodecError};
use crate::board::{Board, BoardDocument};
use crate::camera::Camera;
use crate::widget::{Widget, WidgetKind};
use kurbo::{Point, Vec2};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the persisted session.
pub const SESSION_FILE_NAME: &str = "session.dat";

/// Upper bound on decoded element counts, rejecting garbage that happens to
/// pass the cookie check before it can balloon allocations.
const MAX_ELEMENT_COUNT: u64 = 1 << 20;

/// Session persistence failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Encode a board document into the ciphered session blob.
pub fn encode_document(document: &BoardDocument, cipher: &CipherConfig) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    for word in cipher.check {
        writer.write_u64(word);
    }

    writer.write_u64(document.widgets.len() as u64);
    for widget in &document.widgets {
        writer.write_str(&widget.text);
        writer.write_f64(widget.position.x);
        writer.write_f64(widget.position.y);
        writer.write_u8(widget.kind.tag());
    }

    writer.write_u64(document.draw_order.len() as u64);
    for &id in &document.draw_order {
        writer.write_u64(id as u64);
    }

    writer.write_f64(document.camera.offset.x);
    writer.write_f64(document.camera.offset.y);
    writer.write_f64(document.camera.zoom);

    let mut bytes = writer.into_inner();
    cipher.apply_keystream(&mut bytes);
    bytes
}

fn read_count(reader: &mut ByteReader<'_>) -> Result<usize, CodecError> {
    let count = reader.read_u64()?;
    if count > MAX_ELEMENT_COUNT {
        return Err(CodecError::CountOutOfRange(count));
    }
    Ok(count as usize)
}

/// Decode a ciphered session blob back into a board document.
pub fn decode_document(bytes: &mut [u8], cipher: &CipherConfig) -> Result<BoardDocument, CodecError> {
    cipher.apply_keystream(bytes);
    let mut reader = ByteReader::new(bytes);

    for expected in cipher.check {
        if reader.read_u64()? != expected {
            return Err(CodecError::CookieMismatch);
        }
    }

    let widget_count = read_count(&mut reader)?;
    let mut widgets = Vec::with_capacity(widget_count);
    for _ in 0..widget_count {
        let text = reader.read_str()?;
        let x = reader.read_f64()?;
        let y = reader.read_f64()?;
        let tag = reader.read_u8()?;
        let kind = WidgetKind::from_tag(tag).ok_or(CodecError::UnknownKind(tag))?;

        let mut widget = Widget::new(kind);
        widget.set_text(text);
        widget.set_position(Point::new(x, y));
        widgets.push(widget);
    }

    let order_count = read_count(&mut reader)?;
    let mut draw_order = Vec::with_capacity(order_count);
    for _ in 0..order_count {
        draw_order.push(reader.read_u64()? as usize);
    }

    let offset = Vec2::new(reader.read_f64()?, reader.read_f64()?);
    let zoom = reader.read_f64()?;
    let mut camera = Camera::new();
    camera.offset = offset;
    camera.zoom = zoom.clamp(camera.min_zoom, camera.max_zoom);

    Ok(BoardDocument {
        widgets,
        draw_order,
        camera,
    })
}

/// Handle to the session file on disk.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
    cipher: CipherConfig,
}

impl SessionFile {
    /// Create a session handle for an explicit path.
    pub fn new(path: impl Into<PathBuf>, cipher: CipherConfig) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    /// Session file in the platform data directory
    /// (e.g. `~/.local/share/tackboard/session.dat`).
    pub fn at_default_location() -> Result<Self, SessionError> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                SessionError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "could not determine a data directory",
                ))
            })?;
        Ok(Self::new(
            base.join("tackboard").join(SESSION_FILE_NAME),
            CipherConfig::default(),
        ))
    }

    /// Path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a board document atomically (temp file + rename).
    pub fn save(&self, document: &BoardDocument) -> Result<(), SessionError> {
        let bytes = encode_document(document, &self.cipher);
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("dat.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Load the persisted board document.
    pub fn load(&self) -> Result<BoardDocument, SessionError> {
        let mut bytes = fs::read(&self.path)?;
        Ok(decode_document(&mut bytes, &self.cipher)?)
    }

    /// Load the session, absorbing every failure into the default board.
    ///
    /// An absent, truncated or tampered file is recoverable: the board
    /// starts over with a single blank note.
    pub fn load_or_default(&self) -> Board {
        match self.load() {
            Ok(document) => Board::from_document(document),
            Err(SessionError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                info!("no session file at {}, starting fresh", self.path.display());
                Board::default_board()
            }
            Err(err) => {
                warn!("couldn't load session ({err}), starting fresh");
                Board::default_board()
            }
        }
    }
}
