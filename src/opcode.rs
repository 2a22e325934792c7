use std::fmt;

use crate::{Quirks, u4};

/// CHIP-8 instruction opcodes.
///
/// The fields (x, y, n, nn, nnn) correspond to the operands encoded in the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// 1nnn - Jump to location nnn.
    Jump { nnn: u16 },
    /// Bnnn - Jump to location nnn + V0, or nnn + Vx with the jump quirk.
    JumpWithOffset { x: u4, nnn: u16 },

    /// 2nnn - Call subroutine at nnn.
    Call { nnn: u16 },
    /// 00EE - Return from a subroutine.
    Return,

    /// 3xnn - Skip next instruction if Vx == nn.
    SkipRegEqualImm { x: u4, nn: u8 },
    /// 4xnn - Skip next instruction if Vx != nn.
    SkipRegNotEqualImm { x: u4, nn: u8 },
    /// 5xy0 - Skip next instruction if Vx == Vy.
    SkipRegEqualReg { x: u4, y: u4 },
    /// 9xy0 - Skip next instruction if Vx != Vy.
    SkipRegNotEqualReg { x: u4, y: u4 },

    /// 6xnn - Set Vx = nn.
    SetRegImm { x: u4, nn: u8 },
    /// 7xnn - Set Vx = Vx + nn.
    AddRegImm { x: u4, nn: u8 },
    /// Annn - Set I = nnn.
    SetIndexImm { nnn: u16 },
    /// Fx1E - Set I = I + Vx.
    AddIndexReg { x: u4 },

    /// 8xyN - ALU operations
    ALU { x: u4, y: u4, op: OpcodeALU },
    /// Cxnn - Set Vx = random byte AND nn.
    Random { x: u4, nn: u8 },

    /// 00E0 - Clear the display.
    ClearDisplay,
    /// Dxyn - Display sprite.
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E - Skip next instruction if key with the value of Vx is pressed.
    SkipIfPressed { x: u4 },
    /// ExA1 - Skip next instruction if key with the value of Vx is not pressed.
    SkipIfNotPressed { x: u4 },
    /// Fx0A - Wait for a key press, store the value of the key in Vx.
    WaitForKey { x: u4 },

    /// Fx07 - Set Vx = delay timer value.
    ReadDelayTimer { x: u4 },
    /// Fx15 - Set delay timer = Vx.
    SetDelayTimer { x: u4 },
    /// Fx18 - Set sound timer = Vx.
    SetSoundTimer { x: u4 },

    /// Fx29 - Set I = location of sprite for digit Vx.
    FontChar { x: u4 },
    /// Fx33 - Store BCD representation of Vx in memory locations I, I+1, and I+2.
    BCD { x: u4 },

    /// Fx55 - Store registers V0 through Vx in memory starting at location I.
    StoreRegs { x: u4 },
    /// Fx65 - Read registers V0 through Vx from memory starting at location I.
    LoadRegs { x: u4 },

    /// Any bit pattern that is not a valid instruction, including reserved
    /// encodings such as 5xy1 and 8xyF.
    Unknown(u16),
}

/// ALU operations for the 8xyN instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpcodeALU {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx = Vx OR Vy
    Or,
    /// 8xy2 - Vx = Vx AND Vy
    And,
    /// 8xy3 - Vx = Vx XOR Vy
    Xor,
    /// 8xy4 - Vx = Vx + Vy, VF = carry
    Add,
    /// 8xy5 - Vx = Vx - Vy, VF = NOT borrow
    Sub,
    /// 8xy6 - Vx = Vx SHR 1
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = NOT borrow
    SubReverse,
    /// 8xyE - Vx = Vx SHL 1
    ShiftLeft,
}

impl OpcodeALU {
    fn from_nibble(n: u8) -> Option<Self> {
        Some(match n {
            0x0 => OpcodeALU::Set,
            0x1 => OpcodeALU::Or,
            0x2 => OpcodeALU::And,
            0x3 => OpcodeALU::Xor,
            0x4 => OpcodeALU::Add,
            0x5 => OpcodeALU::Sub,
            0x6 => OpcodeALU::ShiftRight,
            0x7 => OpcodeALU::SubReverse,
            0xE => OpcodeALU::ShiftLeft,
            _ => return None,
        })
    }

    fn mnemonic(self) -> &'static str {
        match self {
            OpcodeALU::Set => "LD",
            OpcodeALU::Or => "OR",
            OpcodeALU::And => "AND",
            OpcodeALU::Xor => "XOR",
            OpcodeALU::Add => "ADD",
            OpcodeALU::Sub => "SUB",
            OpcodeALU::ShiftRight => "SHR",
            OpcodeALU::SubReverse => "SUBN",
            OpcodeALU::ShiftLeft => "SHL",
        }
    }
}

impl Opcode {
    /// Decode a 16-bit raw opcode into an `Opcode` enum variant.
    pub fn decode(opcode: u16) -> Self {
        let [hi, lo] = opcode.to_be_bytes();
        let nibbles = [hi >> 4, hi & 0x0F, lo >> 4, lo & 0x0F];

        let x = u4::new(nibbles[1]);
        let y = u4::new(nibbles[2]);
        let n = u4::new(nibbles[3]);
        let nn = lo;
        let nnn = opcode & 0x0FFF;

        match nibbles {
            [0x0, 0x0, 0xE, 0x0] => Opcode::ClearDisplay,
            [0x0, 0x0, 0xE, 0xE] => Opcode::Return,
            [0x1, ..] => Opcode::Jump { nnn },
            [0x2, ..] => Opcode::Call { nnn },
            [0x3, ..] => Opcode::SkipRegEqualImm { x, nn },
            [0x4, ..] => Opcode::SkipRegNotEqualImm { x, nn },
            [0x5, _, _, 0x0] => Opcode::SkipRegEqualReg { x, y },
            [0x6, ..] => Opcode::SetRegImm { x, nn },
            [0x7, ..] => Opcode::AddRegImm { x, nn },
            [0x8, _, _, op] => match OpcodeALU::from_nibble(op) {
                Some(op) => Opcode::ALU { x, y, op },
                None => Opcode::Unknown(opcode),
            },
            [0x9, _, _, 0x0] => Opcode::SkipRegNotEqualReg { x, y },
            [0xA, ..] => Opcode::SetIndexImm { nnn },
            [0xB, ..] => Opcode::JumpWithOffset { x, nnn },
            [0xC, ..] => Opcode::Random { x, nn },
            [0xD, ..] => Opcode::Draw { x, y, n },
            [0xE, _, 0x9, 0xE] => Opcode::SkipIfPressed { x },
            [0xE, _, 0xA, 0x1] => Opcode::SkipIfNotPressed { x },
            [0xF, _, 0x0, 0x7] => Opcode::ReadDelayTimer { x },
            [0xF, _, 0x0, 0xA] => Opcode::WaitForKey { x },
            [0xF, _, 0x1, 0x5] => Opcode::SetDelayTimer { x },
            [0xF, _, 0x1, 0x8] => Opcode::SetSoundTimer { x },
            [0xF, _, 0x1, 0xE] => Opcode::AddIndexReg { x },
            [0xF, _, 0x2, 0x9] => Opcode::FontChar { x },
            [0xF, _, 0x3, 0x3] => Opcode::BCD { x },
            [0xF, _, 0x5, 0x5] => Opcode::StoreRegs { x },
            [0xF, _, 0x6, 0x5] => Opcode::LoadRegs { x },

            _ => Opcode::Unknown(opcode),
        }
    }
}

impl Opcode {
    /// Renders the instruction the way it executes under `quirks`, naming the
    /// register Bnnn actually adds and dropping Vy from in-place shifts.
    pub fn with_quirks<'a>(&'a self, quirks: &'a Quirks) -> QuirkedOpcode<'a> {
        QuirkedOpcode {
            opcode: self,
            quirks,
        }
    }
}

/// Display adapter returned by [`Opcode::with_quirks`].
pub struct QuirkedOpcode<'a> {
    opcode: &'a Opcode,
    quirks: &'a Quirks,
}

impl fmt::Display for QuirkedOpcode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.opcode {
            Opcode::JumpWithOffset { nnn, .. } if !self.quirks.jump_with_offset => {
                write!(f, "JP V0, {nnn:#05X}")
            }
            Opcode::ALU {
                x,
                op: op @ (OpcodeALU::ShiftRight | OpcodeALU::ShiftLeft),
                ..
            } if !self.quirks.shift => write!(f, "{} V{x:X}", op.mnemonic()),
            ref opcode => write!(f, "{opcode}"),
        }
    }
}

/// Assembly-style rendering of the encoded operands.
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Opcode::ClearDisplay => write!(f, "CLS"),
            Opcode::Return => write!(f, "RET"),
            Opcode::Jump { nnn } => write!(f, "JP {nnn:#05X}"),
            Opcode::JumpWithOffset { x, nnn } => write!(f, "JP V{x:X}, {nnn:#05X}"),
            Opcode::Call { nnn } => write!(f, "CALL {nnn:#05X}"),
            Opcode::SkipRegEqualImm { x, nn } => write!(f, "SE V{x:X}, {nn:#04X}"),
            Opcode::SkipRegNotEqualImm { x, nn } => write!(f, "SNE V{x:X}, {nn:#04X}"),
            Opcode::SkipRegEqualReg { x, y } => write!(f, "SE V{x:X}, V{y:X}"),
            Opcode::SkipRegNotEqualReg { x, y } => write!(f, "SNE V{x:X}, V{y:X}"),
            Opcode::SetRegImm { x, nn } => write!(f, "LD V{x:X}, {nn:#04X}"),
            Opcode::AddRegImm { x, nn } => write!(f, "ADD V{x:X}, {nn:#04X}"),
            Opcode::SetIndexImm { nnn } => write!(f, "LD I, {nnn:#05X}"),
            Opcode::AddIndexReg { x } => write!(f, "ADD I, V{x:X}"),
            Opcode::ALU { x, y, op } => write!(f, "{} V{x:X}, V{y:X}", op.mnemonic()),
            Opcode::Random { x, nn } => write!(f, "RND V{x:X}, {nn:#04X}"),
            Opcode::Draw { x, y, n } => write!(f, "DRW V{x:X}, V{y:X}, {n:X}"),
            Opcode::SkipIfPressed { x } => write!(f, "SKP V{x:X}"),
            Opcode::SkipIfNotPressed { x } => write!(f, "SKNP V{x:X}"),
            Opcode::WaitForKey { x } => write!(f, "LD V{x:X}, K"),
            Opcode::ReadDelayTimer { x } => write!(f, "LD V{x:X}, DT"),
            Opcode::SetDelayTimer { x } => write!(f, "LD DT, V{x:X}"),
            Opcode::SetSoundTimer { x } => write!(f, "LD ST, V{x:X}"),
            Opcode::FontChar { x } => write!(f, "LD F, V{x:X}"),
            Opcode::BCD { x } => write!(f, "LD B, V{x:X}"),
            Opcode::StoreRegs { x } => write!(f, "LD [I], V{x:X}"),
            Opcode::LoadRegs { x } => write!(f, "LD V{x:X}, [I]"),
            Opcode::Unknown(opcode) => write!(f, "??? {opcode:04X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operand_fields() {
        assert_eq!(Opcode::decode(0x1ABC), Opcode::Jump { nnn: 0xABC });
        assert_eq!(Opcode::decode(0x2DEF), Opcode::Call { nnn: 0xDEF });
        assert_eq!(
            Opcode::decode(0x3A42),
            Opcode::SkipRegEqualImm {
                x: u4::new(0xA),
                nn: 0x42
            }
        );
        assert_eq!(
            Opcode::decode(0xD125),
            Opcode::Draw {
                x: u4::new(1),
                y: u4::new(2),
                n: u4::new(5)
            }
        );
        assert_eq!(
            Opcode::decode(0xB312),
            Opcode::JumpWithOffset {
                x: u4::new(3),
                nnn: 0x312
            }
        );
        assert_eq!(Opcode::decode(0xA123), Opcode::SetIndexImm { nnn: 0x123 });
    }

    #[test]
    fn decodes_alu_family() {
        let cases = [
            (0x8120, OpcodeALU::Set),
            (0x8121, OpcodeALU::Or),
            (0x8122, OpcodeALU::And),
            (0x8123, OpcodeALU::Xor),
            (0x8124, OpcodeALU::Add),
            (0x8125, OpcodeALU::Sub),
            (0x8126, OpcodeALU::ShiftRight),
            (0x8127, OpcodeALU::SubReverse),
            (0x812E, OpcodeALU::ShiftLeft),
        ];
        for (word, op) in cases {
            assert_eq!(
                Opcode::decode(word),
                Opcode::ALU {
                    x: u4::new(1),
                    y: u4::new(2),
                    op
                }
            );
        }
    }

    #[test]
    fn decodes_f_family_by_low_byte() {
        let x = u4::new(7);
        assert_eq!(Opcode::decode(0xF707), Opcode::ReadDelayTimer { x });
        assert_eq!(Opcode::decode(0xF70A), Opcode::WaitForKey { x });
        assert_eq!(Opcode::decode(0xF715), Opcode::SetDelayTimer { x });
        assert_eq!(Opcode::decode(0xF718), Opcode::SetSoundTimer { x });
        assert_eq!(Opcode::decode(0xF71E), Opcode::AddIndexReg { x });
        assert_eq!(Opcode::decode(0xF729), Opcode::FontChar { x });
        assert_eq!(Opcode::decode(0xF733), Opcode::BCD { x });
        assert_eq!(Opcode::decode(0xF755), Opcode::StoreRegs { x });
        assert_eq!(Opcode::decode(0xF765), Opcode::LoadRegs { x });
    }

    #[test]
    fn reserved_encodings_are_unknown() {
        for word in [
            0x0000, 0x0123, 0x00E1, 0x5001, 0x9ABF, 0x8008, 0x800F, 0xE19F, 0xE0A2, 0xF000,
            0xF0FF, 0xF156,
        ] {
            assert_eq!(Opcode::decode(word), Opcode::Unknown(word), "{word:04X}");
        }
    }

    #[test]
    fn renders_mnemonics() {
        assert_eq!(Opcode::decode(0x00E0).to_string(), "CLS");
        assert_eq!(Opcode::decode(0x6A0F).to_string(), "LD VA, 0x0F");
        assert_eq!(Opcode::decode(0x8AB7).to_string(), "SUBN VA, VB");
        assert_eq!(Opcode::decode(0xD01F).to_string(), "DRW V0, V1, F");
        assert_eq!(Opcode::decode(0x1200).to_string(), "JP 0x200");
        assert_eq!(Opcode::decode(0x5001).to_string(), "??? 5001");
        assert_eq!(Opcode::decode(0xB312).to_string(), "JP V3, 0x312");
    }

    #[test]
    fn quirk_aware_rendering_names_the_executed_form() {
        let jump = Opcode::decode(0xB312);
        let shift = Opcode::decode(0x812E);
        let none = Quirks::default();
        let all = Quirks::default().with_shift(true).with_jump_with_offset(true);

        assert_eq!(jump.with_quirks(&none).to_string(), "JP V0, 0x312");
        assert_eq!(jump.with_quirks(&all).to_string(), "JP V3, 0x312");
        assert_eq!(shift.with_quirks(&none).to_string(), "SHL V1");
        assert_eq!(shift.with_quirks(&all).to_string(), "SHL V1, V2");

        let add = Opcode::decode(0x8124);
        assert_eq!(add.with_quirks(&none).to_string(), "ADD V1, V2");
    }
}
