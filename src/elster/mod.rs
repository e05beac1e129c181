//! Elster-over-CAN codec: the frame envelope and the typed value codec.

pub mod frame;
pub mod value;

pub use frame::{parse_frame, read_request, response, write_request, ElsterFrame};
pub use value::{decode_value, encode_value, EncodeError, ValueType};
