use log::{info, trace};

use crate::{
    Chip8Error, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, Framebuffer, Keypad, Opcode, Quirks,
};

// The constants are specified by the CHIP-8 specification
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
/// Default call stack depth.
pub const STACK_LIMIT: usize = 16;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;

/// Instructions address 12 bits; every memory access is masked to this range.
pub(crate) const ADDRESS_MASK: u16 = 0x0FFF;

/// CHIP-8 virtual machine state
#[derive(Clone)]
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Framebuffer,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: Vec<u16>,
    pub(crate) stack_limit: usize,

    /// Delay timer in 60Hz ticks, fractional so that any update rate can drive it
    pub(crate) delay_timer: Timer,
    /// Sound timer in 60Hz ticks, beeps while non-zero
    pub(crate) sound_timer: Timer,
}

impl Chip8 {
    /// Creates a machine with zeroed registers, the font installed and PC at 0x200.
    pub fn new() -> Self {
        let mut chip8 = Chip8 {
            memory: [0; MEMORY_SIZE],
            display: Framebuffer::new(),
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: Vec::with_capacity(STACK_LIMIT),
            stack_limit: STACK_LIMIT,
            delay_timer: Timer::default(),
            sound_timer: Timer::default(),
        };
        chip8.install_font();
        chip8
    }

    /// Allows subroutine nesting deeper (or shallower) than the standard 16 levels.
    pub fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = limit;
        self
    }

    /// Writes the built-in hexadecimal glyphs into the font region.
    pub fn install_font(&mut self) {
        self.memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
    }

    /// Copies a program to 0x200 and points the program counter at it.
    ///
    /// Everything else (registers, timers, display) is left as it is.
    pub fn install_program(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.memory
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::RomLoadError {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            })?
            .copy_from_slice(rom);

        self.pc = ROM_START_ADDRESS as u16;
        info!("Loaded ROM [size: {}]", rom.len());

        Ok(())
    }

    /// Loads a ROM into memory and initializes the font set.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.install_font();
        self.install_program(rom)
    }

    /// Executes one fetch-decode-execute cycle.
    ///
    /// `keypad` is the input snapshot for this cycle (`None` means nothing is
    /// pressed) and `elapsed_ticks` is the real time since the previous cycle,
    /// measured in 60Hz timer ticks.
    pub fn step(
        &mut self,
        quirks: &Quirks,
        keypad: Option<&Keypad>,
        elapsed_ticks: f64,
    ) -> Result<(), Chip8Error> {
        let address = self.pc;
        let word = self.fetch();
        self.pc = self.pc.wrapping_add(2);

        self.tick_timers(elapsed_ticks);

        let opcode = Opcode::decode(word);
        trace!("{address:03X}: {word:04X}  {}", opcode.with_quirks(quirks));

        let keypad = keypad.copied().unwrap_or_default();
        self.execute(opcode, quirks, &keypad)
    }

    /// Decrements both timers by `elapsed_ticks`, never below zero.
    pub fn tick_timers(&mut self, elapsed_ticks: f64) {
        if elapsed_ticks.is_nan() || elapsed_ticks <= 0.0 {
            return;
        }
        self.delay_timer.tick(elapsed_ticks);
        self.sound_timer.tick(elapsed_ticks);
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer.is_active()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer.get()
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.get()
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.display
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn i(&self) -> u16 {
        self.i
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    /// Fetches the 16-bit big-endian word at the program counter.
    fn fetch(&self) -> u16 {
        u16::from_be_bytes([self.mem(self.pc), self.mem(self.pc.wrapping_add(1))])
    }

    pub(crate) fn mem(&self, addr: u16) -> u8 {
        self.memory[usize::from(addr & ADDRESS_MASK)]
    }

    pub(crate) fn mem_mut(&mut self, addr: u16) -> &mut u8 {
        &mut self.memory[usize::from(addr & ADDRESS_MASK)]
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

/// Remainders smaller than this are rounding residue from summing many
/// fractional steps, not time left on the timer.
const TICK_EPSILON: f64 = 1e-6;

/// Countdown timer holding a fractional number of 60Hz ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Timer(f64);

impl Timer {
    pub(crate) fn set(&mut self, ticks: u8) {
        self.0 = f64::from(ticks);
    }

    pub(crate) fn tick(&mut self, elapsed_ticks: f64) {
        self.0 -= elapsed_ticks;
        if self.0 < TICK_EPSILON {
            self.0 = 0.0;
        }
    }

    /// A partially elapsed tick still counts, so a timer set to 1 reads 1
    /// until it fully expires.
    pub(crate) fn get(&self) -> u8 {
        (self.0 - TICK_EPSILON).ceil() as u8
    }

    pub(crate) fn is_active(&self) -> bool {
        self.0 > 0.0
    }
}
