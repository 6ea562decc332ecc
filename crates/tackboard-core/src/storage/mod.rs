//! Session persistence: binary codec, keyed transform, session file.

mod codec;
mod session;

pub use codec::{ByteReader, ByteWriter, CipherConfig, CodecError};
pub use session::{
    decode_document, encode_document, SessionError, SessionFile, SESSION_FILE_NAME,
};
