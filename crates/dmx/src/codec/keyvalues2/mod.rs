//! KeyValues2: the brace and quoted-string text encoding.
//!
//! ```text
//! "DmElement"
//! {
//!     "id" "elementid" "c2b6f0a4-..."
//!     "name" "string" "root"
//!     "scale" "float" "1.5"
//! }
//! ```

pub mod lexer;
pub mod parser;
pub mod writer;

pub use lexer::{escape, Lexer, Token};
pub use parser::{decode_keyvalues2, STUB_ELEMENT_TYPE};
pub use writer::{encode_keyvalues2, format_float};
