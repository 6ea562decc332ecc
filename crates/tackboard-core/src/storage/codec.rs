//! Byte-level codec primitives and the keyed session transform.
//!
//! The session file is a little-endian binary blob wrapped in a
//! size-preserving symmetric keystream. The transform is integrity-by-cookie,
//! not cryptographic authentication: tampering is detected by comparing the
//! leading cookie words after reversal, nothing more.

use thiserror::Error;

/// Default session key.
pub const SESSION_KEY: [u64; 4] = [
    0x92FB_CBE8_85E4_4ACF,
    0xFA7B_0BE4_3DE4_E416,
    0xB170_8694_B275_B457,
    0x727B_B4DC_B018_8D50,
];

/// Default integrity cookie, written ahead of the payload.
pub const SESSION_CHECK: [u64; 4] = [
    0xC687_3132_7582_20A2,
    0x37A5_7B21_12DE_C1B6,
    0xEF1A_296A_DF40_52CD,
    0xB91C_C2E6_74BC_A7C4,
];

/// Decode failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of data at byte {0}")]
    UnexpectedEof(usize),
    #[error("string data is not valid UTF-8")]
    InvalidUtf8,
    #[error("integrity cookie mismatch")]
    CookieMismatch,
    #[error("unknown widget kind tag {0}")]
    UnknownKind(u8),
    #[error("implausible element count {0}")]
    CountOutOfRange(u64),
}

/// Key plus integrity cookie for the session transform.
///
/// Injected into the codec rather than read from globals so tests can run
/// with fixture keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherConfig {
    /// Keystream key material.
    pub key: [u64; 4],
    /// Expected cookie words at the head of the decoded payload.
    pub check: [u64; 4],
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            key: SESSION_KEY,
            check: SESSION_CHECK,
        }
    }
}

impl CipherConfig {
    /// Apply the size-preserving keystream in place.
    ///
    /// XOR against a key-derived xorshift64* stream: applying the same call
    /// twice restores the input, so this both encrypts and decrypts.
    pub fn apply_keystream(&self, data: &mut [u8]) {
        let mut state = (self.key[0]
            ^ self.key[1].rotate_left(16)
            ^ self.key[2].rotate_left(32)
            ^ self.key[3].rotate_left(48))
            | 1;
        for (block, chunk) in data.chunks_mut(8).enumerate() {
            state ^= self.key[block % 4];
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let word = state.wrapping_mul(0x2545_F491_4F6C_DD1D).to_le_bytes();
            for (byte, key_byte) in chunk.iter_mut().zip(word) {
                *byte ^= key_byte;
            }
        }
    }
}

/// Little-endian byte sink for session encoding.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append a little-endian u64.
    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian f64.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) {
        self.write_u64(value.len() as u64);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Finish and take the buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Little-endian byte source for session decoding.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader over a decoded buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(CodecError::UnexpectedEof(self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    /// Read a little-endian f64.
    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        let bytes = self.take(8)?;
        Ok(f64::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String, CodecError> {
        let len = self.read_u64()?;
        let len = usize::try_from(len).map_err(|_| CodecError::CountOutOfRange(len))?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Bytes remaining past the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
