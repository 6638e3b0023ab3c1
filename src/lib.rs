//! Vim-style modal key interpretation for text-editing surfaces.
//!
//! An [`InputSession`] takes key strokes one at a time, expands user
//! mappings, builds commands (count, register, action, argument) and runs
//! them against anything implementing [`Editor`].

pub mod action;
pub mod command;
pub mod config;
pub mod editor;
pub mod error;
pub mod handler;
pub mod key;
pub mod keytrie;
pub mod log;
pub mod mode;
pub mod operator;
pub mod options;
pub mod range;
pub mod registers;
pub mod search;
pub mod state;
pub mod text;

pub use action::{ActionContext, ActionHandler, ActionRegistry, ExHandler, ExtensionHandler, OperatorFunction};
pub use command::{Argument, ArgumentType, Command, CommandFlags, CommandType};
pub use config::Config;
pub use editor::{Editor, TextBuffer, TextLayout};
pub use error::{ActionError, Error, Result};
pub use handler::{InputSession, MappingTimeout};
pub use key::{parse_keys, to_notation, KeyStroke};
pub use mode::{MappingModes, Mode, ModeStack, SubMode};
pub use options::{OptionValue, Options};
pub use range::{MotionType, SelectionType, TextRange};
pub use registers::{Register, Registers};
