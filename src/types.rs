use std::fmt;

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
/// Number of cells in the framebuffer (one bit each, 2048 in total).
pub const DISPLAY_SIZE: usize = DISPLAY_X * DISPLAY_Y;

/// Error types that can occur while loading or executing a CHIP-8 program.
///
/// Every variant is fatal: the engine never retries and leaves recovery to the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomLoadError { size: usize, max_size: usize },

    #[error("Stack overflow: call depth exceeded {limit} entries")]
    StackOverflow { limit: usize },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,

    #[error("Unknown opcode {opcode:04X} at address {address:#05X}")]
    UnknownOpcode { opcode: u16, address: u16 },
}

/// Monochrome 64x32 framebuffer, stored row-major (`index = y * 64 + x`).
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer([bool; DISPLAY_SIZE]);

impl Framebuffer {
    pub const fn new() -> Self {
        Self([false; DISPLAY_SIZE])
    }

    /// Returns the pixel at `(x, y)`. Coordinates outside the display read as unlit.
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= DISPLAY_X || y >= DISPLAY_Y {
            return false;
        }
        self.0[y * DISPLAY_X + x]
    }

    /// All 2048 cells in row-major order.
    pub fn cells(&self) -> &[bool; DISPLAY_SIZE] {
        &self.0
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.0.chunks_exact(DISPLAY_X)
    }

    pub fn lit_count(&self) -> usize {
        self.0.iter().filter(|&&lit| lit).count()
    }

    pub fn clear(&mut self) {
        self.0.fill(false);
    }

    /// XORs a lit sprite bit into `(x, y)`. Returns true if the pixel was erased.
    pub(crate) fn flip(&mut self, x: usize, y: usize) -> bool {
        if x >= DISPLAY_X || y >= DISPLAY_Y {
            return false;
        }
        let pixel = &mut self.0[y * DISPLAY_X + x];
        *pixel ^= true;
        !*pixel
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for &lit in row {
                f.write_str(if lit { "#" } else { "." })?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}
