use log::{debug, trace};

use crate::{
    Chip8, Chip8Error, DISPLAY_X, DISPLAY_Y, FONT_GLYPH_SIZE, FONT_START_ADDRESS, Keypad, Opcode,
    OpcodeALU, Quirks, u4,
};

/// Flag register.
const VF: usize = 0xF;

impl Chip8 {
    /// Executes an already decoded instruction. The program counter must
    /// already point past it.
    pub(crate) fn execute(
        &mut self,
        opcode: Opcode,
        quirks: &Quirks,
        keypad: &Keypad,
    ) -> Result<(), Chip8Error> {
        match opcode {
            Opcode::ClearDisplay => {
                self.display.clear();
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { x, nnn } => {
                let offset = if quirks.jump_with_offset {
                    self.v[x]
                } else {
                    self.v[0]
                };
                self.pc = nnn.wrapping_add(offset.into());
            }
            Opcode::Call { nnn } => {
                if self.stack.len() >= self.stack_limit {
                    return Err(Chip8Error::StackOverflow {
                        limit: self.stack_limit,
                    });
                }
                self.stack.push(self.pc);
                debug!("Call {nnn:03X} [depth: {}]", self.stack.len());
                self.pc = nnn;
            }
            Opcode::Return => {
                self.pc = self.stack.pop().ok_or(Chip8Error::StackUnderflow)?;
                debug!("Return to {:03X} [depth: {}]", self.pc, self.stack.len());
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::ALU { x, y, op } => {
                self.execute_alu(x, y, op, quirks);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = rand::random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                let (index, overflow) = self.i.overflowing_add(self.v[x].into());
                self.i = index;
                if overflow {
                    self.v[VF] = 1;
                } else if quirks.index_overflow_flag {
                    self.v[VF] = 0;
                }
            }
            Opcode::Draw { x, y, n } => {
                self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                self.skip_if(keypad.is_pressed(u4::from_low_bits(self.v[x])));
            }
            Opcode::SkipIfNotPressed { x } => {
                self.skip_if(!keypad.is_pressed(u4::from_low_bits(self.v[x])));
            }
            Opcode::WaitForKey { x } => {
                self.execute_wait_for_key(x, keypad);
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer();
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer.set(self.v[x]);
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer.set(self.v[x]);
            }
            Opcode::FontChar { x } => {
                // Not masked to a hex digit: Vx > 0xF points past the font table
                let glyph = u16::from(self.v[x]) * FONT_GLYPH_SIZE as u16;
                self.i = FONT_START_ADDRESS as u16 + glyph;
            }
            Opcode::BCD { x } => {
                let value = self.v[x];
                *self.mem_mut(self.i) = value / 100;
                *self.mem_mut(self.i.wrapping_add(1)) = (value / 10) % 10;
                *self.mem_mut(self.i.wrapping_add(2)) = value % 10;
            }
            Opcode::StoreRegs { x } => {
                for reg_index in 0..=u8::from(x) {
                    let addr = self.i.wrapping_add(reg_index.into());
                    *self.mem_mut(addr) = self.v[usize::from(reg_index)];
                }
                if quirks.store_increment_index {
                    self.i = self.i.wrapping_add(u16::from(x) + 1);
                }
            }
            Opcode::LoadRegs { x } => {
                for reg_index in 0..=u8::from(x) {
                    let addr = self.i.wrapping_add(reg_index.into());
                    self.v[usize::from(reg_index)] = self.mem(addr);
                }
                if quirks.load_increment_index {
                    self.i = self.i.wrapping_add(u16::from(x) + 1);
                }
            }
            Opcode::Unknown(opcode) => {
                return Err(Chip8Error::UnknownOpcode {
                    opcode,
                    address: self.pc.wrapping_sub(2) & crate::chip8::ADDRESS_MASK,
                });
            }
        };

        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    /// Both operands are read before Vx is written, and VF is written last,
    /// so the flag always reflects the original values even when x or y is F.
    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeALU, quirks: &Quirks) {
        let vx = self.v[x];
        let vy = self.v[y];
        let shift_source = if quirks.shift { vy } else { vx };

        let (result, flag) = match op {
            OpcodeALU::Set => (vy, None),
            OpcodeALU::Or => (vx | vy, None),
            OpcodeALU::And => (vx & vy, None),
            OpcodeALU::Xor => (vx ^ vy, None),
            OpcodeALU::Add => {
                let (res, carry) = vx.overflowing_add(vy);
                (res, Some(u8::from(carry)))
            }
            OpcodeALU::Sub => (vx.wrapping_sub(vy), Some(u8::from(vx >= vy))),
            OpcodeALU::SubReverse => (vy.wrapping_sub(vx), Some(u8::from(vy >= vx))),
            OpcodeALU::ShiftRight => (shift_source >> 1, Some(shift_source & 1)),
            OpcodeALU::ShiftLeft => (shift_source << 1, Some(shift_source >> 7)),
        };

        self.v[x] = result;
        if let Some(flag) = flag {
            self.v[VF] = flag;
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) {
        // The origin wraps, the sprite itself does not
        let x_pos = usize::from(self.v[x]) % DISPLAY_X;
        let y_pos = usize::from(self.v[y]) % DISPLAY_Y;

        // Don't draw out of bounds
        let row_count = std::cmp::min(usize::from(n), DISPLAY_Y - y_pos);
        let col_count = std::cmp::min(8, DISPLAY_X - x_pos);

        let mut any_erased = false;
        for row in 0..row_count {
            let sprite_byte = self.mem(self.i.wrapping_add(row as u16));

            for col in 0..col_count {
                if (sprite_byte & (0x80 >> col)) != 0 {
                    any_erased |= self.display.flip(x_pos + col, y_pos + row);
                }
            }
        }

        self.v[VF] = u8::from(any_erased);
    }

    fn execute_wait_for_key(&mut self, x: u4, keypad: &Keypad) {
        match keypad.first_pressed() {
            Some(key) => {
                debug!("Key {key:X} pressed, resuming");
                self.v[x] = key.into();
            }
            None => {
                // Repeat this instruction until a key is pressed
                trace!("Waiting for key press");
                self.pc = self.pc.wrapping_sub(2);
            }
        }
    }
}
