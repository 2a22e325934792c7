mod chip8;
mod execute;
mod font;
mod keypad;
mod nibble;
mod opcode;
mod quirks;
mod runner;
mod types;

pub use chip8::*;
pub use font::*;
pub use keypad::*;
pub use nibble::u4;
pub use opcode::*;
pub use quirks::*;
pub use runner::*;
pub use types::*;
