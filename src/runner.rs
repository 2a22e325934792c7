use crate::{Chip8, Chip8Error, Framebuffer, Keypad, Quirks, u4};

pub const TIMER_HZ: f64 = 60.0;

/// Longest stretch of wall-clock time a single `update` will catch up on.
const MAX_BACKLOG_SECONDS: f32 = 0.25;

/// High-level emulator runner that manages timing internally.
///
/// The CPU runs at `updates_per_second`, independently of the 60Hz timer
/// rate: each step is handed the number of timer ticks that elapse in one
/// CPU period.
pub struct Chip8Runner {
    chip8: Chip8,
    quirks: Quirks,
    keypad: Keypad,
    step_time: f32,
    ticks_per_step: f64,
    dt_accumulator: f32,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8, quirks: Quirks, updates_per_second: u32) -> Self {
        let ups = updates_per_second.max(1);
        Self {
            chip8,
            quirks,
            keypad: Keypad::new(),
            step_time: 1.0 / ups as f32,
            // Timer ticks are summed over many steps, so keep the extra precision
            ticks_per_step: TIMER_HZ / f64::from(ups),
            dt_accumulator: 0.0,
        }
    }

    /// Update emulator by delta time (in seconds).
    ///
    /// Runs as many CPU steps as fit in the accumulated time and returns how
    /// many were executed. The first error stops the update and is returned.
    pub fn update(&mut self, dt: f32) -> Result<usize, Chip8Error> {
        let backlog_cap = MAX_BACKLOG_SECONDS.max(self.step_time);
        self.dt_accumulator = (self.dt_accumulator + dt.max(0.0)).min(backlog_cap);

        let mut steps = 0;
        while self.dt_accumulator >= self.step_time {
            self.dt_accumulator -= self.step_time;
            self.chip8
                .step(&self.quirks, Some(&self.keypad), self.ticks_per_step)?;
            steps += 1;
        }

        Ok(steps)
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.chip8.should_beep()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad.set(key, pressed)
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.chip8.framebuffer()
    }

    pub fn chip8(&self) -> &Chip8 {
        &self.chip8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(program: &[u8], ups: u32) -> Chip8Runner {
        let mut chip8 = Chip8::new();
        chip8.load(program).unwrap();
        Chip8Runner::new(chip8, Quirks::default(), ups)
    }

    #[test]
    fn steps_at_the_configured_rate() {
        // 0x200: JP 0x200
        let mut runner = runner(&[0x12, 0x00], 8);
        assert_eq!(runner.update(0.125).unwrap(), 1);
        assert_eq!(runner.update(0.0625).unwrap(), 0);
        assert_eq!(runner.update(0.0625).unwrap(), 1);
    }

    #[test]
    fn backlog_is_capped() {
        let mut runner = runner(&[0x12, 0x00], 8);
        assert_eq!(runner.update(10.0).unwrap(), 2);
        assert_eq!(runner.update(0.0).unwrap(), 0);
    }

    #[test]
    fn timers_follow_wall_clock_not_step_count() {
        // LD V0, 0x3C; LD DT, V0; JP 0x204
        let mut runner = runner(&[0x60, 0x3C, 0xF0, 0x15, 0x12, 0x04], 4);
        assert_eq!(runner.update(0.25).unwrap(), 1);
        assert_eq!(runner.update(0.25).unwrap(), 1);
        assert_eq!(runner.chip8().delay_timer(), 60);

        // Each step at 4 updates per second is 15 timer ticks
        runner.update(0.25).unwrap();
        assert_eq!(runner.chip8().delay_timer(), 45);
    }

    #[test]
    fn delay_timer_expires_after_one_second_at_700_ups() {
        #[rustfmt::skip]
        let program = [
            0x60, 0x3C, // 200: LD V0, 60
            0xF0, 0x15, // 202: LD DT, V0
            0xF1, 0x07, // 204: LD V1, DT
            0x12, 0x04, // 206: JP 0x204
        ];
        let mut runner = runner(&program, 700);

        // DT is loaded by the second step; one second later is 700 steps on
        for _ in 0..701 {
            assert_eq!(runner.update(1.0 / 700.0).unwrap(), 1);
        }
        assert_eq!(runner.chip8().delay_timer(), 1);

        runner.update(1.0 / 700.0).unwrap();
        assert_eq!(runner.chip8().delay_timer(), 0);

        // Step 703 runs LD V1, DT
        runner.update(1.0 / 700.0).unwrap();
        assert_eq!(runner.chip8().pc(), 0x206);
        assert_eq!(runner.chip8().v()[1], 0);
    }

    #[test]
    fn keys_reach_the_engine() {
        // LD V2, K; JP 0x202
        let mut runner = runner(&[0xF2, 0x0A, 0x12, 0x02], 8);
        runner.update(0.125).unwrap();
        assert_eq!(runner.chip8().pc(), 0x200);

        runner.set_key(u4::new(0xE), true);
        assert!(runner.keypad().is_pressed(u4::new(0xE)));
        runner.update(0.125).unwrap();
        assert_eq!(runner.chip8().pc(), 0x202);
        assert_eq!(runner.chip8().v()[2], 0xE);
    }

    #[test]
    fn errors_stop_the_update() {
        let mut runner = runner(&[0x00, 0xEE, 0x12, 0x02], 8);
        assert_eq!(runner.update(0.25), Err(Chip8Error::StackUnderflow));
        assert!(!runner.should_beep());
        assert_eq!(runner.framebuffer().lit_count(), 0);
    }
}
