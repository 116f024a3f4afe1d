//! Wire protocol: newline framing, command parsing, and control tokens.
//!
//! The protocol is plain UTF-8 lines terminated by `\n`, with no length
//! prefix; CRLF on the wire is normalized on read. It is symmetric: clients
//! and the server speak the same framing.
//!
//! ```text
//! +--------+                             +--------+
//! | Client |  --- "!move 4" ---------->  | Server |
//! |        |  <-- "!settile 4 X" ------  |        |
//! +--------+                             +--------+
//!               ^                   ^
//!               |     LineCodec     |
//!               +-------------------+
//! ```
//!
//! ## Terminology
//!
//! - **Command**: a client line beginning with `!` (verb + args remainder)
//! - **Chat**: any client line not beginning with `!`
//! - **Control token**: a server-originated `!` line that drives client UI
//!   state (`!yourturn`, `!settile ...`) rather than being shown as text

pub mod codec;
pub mod command;
pub mod error;
pub mod token;

pub use codec::{LineCodec, MAX_LINE_LENGTH};
pub use command::Input;
pub use error::ProtocolError;
pub use token::ControlToken;
