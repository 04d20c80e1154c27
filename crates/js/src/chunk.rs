use std::fmt::Write;
use std::rc::Rc;

use crate::error::CompileError;
use crate::opcode::OpCode;

/// Constant operands are one byte.
pub const MAX_CONSTANTS: usize = 255;

/// Compile-time constants. Chunks never hold heap references, so compiled
/// code can outlive any one heap.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Number(f64),
    String(Rc<str>),
    Function(Rc<FunctionProto>),
}

impl Constant {
    fn same(&self, other: &Constant) -> bool {
        match (self, other) {
            (Constant::Number(a), Constant::Number(b)) => a.to_bits() == b.to_bits(),
            (Constant::String(a), Constant::String(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Constant>,
    /// Source line per code byte.
    pub lines: Vec<u32>,
}

impl Chunk {
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Adds a constant, reusing an equal number or string already present.
    pub fn add_constant(&mut self, constant: Constant) -> Result<u8, CompileError> {
        if let Some(i) = self.constants.iter().position(|c| c.same(&constant)) {
            return Ok(i as u8);
        }
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(constant);
        Ok((self.constants.len() - 1) as u8)
    }

    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines
            .get(offset)
            .or(self.lines.last())
            .copied()
            .unwrap_or(0)
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        let hi = self.code.get(offset).copied().unwrap_or(0);
        let lo = self.code.get(offset + 1).copied().unwrap_or(0);
        u16::from_be_bytes([hi, lo])
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = format!("== {name} ==\n");
        let mut offset = 0;
        while offset < self.code.len() {
            offset = self.disassemble_instruction(offset, &mut out);
        }
        out
    }

    fn disassemble_instruction(&self, offset: usize, out: &mut String) -> usize {
        let _ = write!(out, "{offset:04} {:4} ", self.line_at(offset));
        let Some(op) = OpCode::from_byte(self.code[offset]) else {
            let _ = writeln!(out, "<bad opcode {}>", self.code[offset]);
            return offset + 1;
        };
        let byte = |i: usize| self.code.get(offset + i).copied().unwrap_or(0);
        match op {
            OpCode::Constant
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::DefineGlobal
            | OpCode::GetProperty
            | OpCode::SetProperty
            | OpCode::InitProperty => {
                let idx = byte(1);
                let _ = writeln!(out, "{op:?} {idx} ({})", self.describe_constant(idx));
                offset + 2
            }
            OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetUpvalue
            | OpCode::SetUpvalue
            | OpCode::Call
            | OpCode::New => {
                let _ = writeln!(out, "{op:?} {}", byte(1));
                offset + 2
            }
            OpCode::Jump | OpCode::JumpIfFalse | OpCode::Try => {
                let target = offset + 3 + self.read_u16(offset + 1) as usize;
                let _ = writeln!(out, "{op:?} -> {target}");
                offset + 3
            }
            OpCode::Loop => {
                let target = (offset + 3).saturating_sub(self.read_u16(offset + 1) as usize);
                let _ = writeln!(out, "{op:?} -> {target}");
                offset + 3
            }
            OpCode::Closure => {
                let idx = byte(1);
                let count = match self.constants.get(idx as usize) {
                    Some(Constant::Function(f)) => f.upvalue_count as usize,
                    _ => 0,
                };
                let _ = writeln!(out, "{op:?} {idx} ({})", self.describe_constant(idx));
                for i in 0..count {
                    let kind = if byte(2 + 2 * i) == 1 { "local" } else { "upvalue" };
                    let _ = writeln!(out, "     |      {kind} {}", byte(3 + 2 * i));
                }
                offset + 2 + 2 * count
            }
            _ => {
                let _ = writeln!(out, "{op:?}");
                offset + 1
            }
        }
    }

    fn describe_constant(&self, idx: u8) -> String {
        match self.constants.get(idx as usize) {
            Some(Constant::Number(n)) => n.to_string(),
            Some(Constant::String(s)) => format!("{s:?}"),
            Some(Constant::Function(f)) => format!("<fn {}>", f.name),
            None => "?".to_string(),
        }
    }
}

/// A compiled function body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionProto {
    pub name: Rc<str>,
    pub arity: u8,
    pub upvalue_count: u8,
    pub chunk: Chunk,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_shared_and_bounded() {
        let mut chunk = Chunk::default();
        let a = chunk.add_constant(Constant::String("x".into())).expect("fits");
        let b = chunk.add_constant(Constant::String("x".into())).expect("fits");
        assert_eq!(a, b);
        for n in 1..MAX_CONSTANTS {
            chunk.add_constant(Constant::Number(n as f64)).expect("fits");
        }
        assert_eq!(
            chunk.add_constant(Constant::Number(-1.0)),
            Err(CompileError::TooManyConstants)
        );
    }

    #[test]
    fn disassembly_lists_jump_targets() {
        let mut chunk = Chunk::default();
        chunk.write(OpCode::True as u8, 1);
        chunk.write(OpCode::JumpIfFalse as u8, 1);
        chunk.write(0, 1);
        chunk.write(1, 1);
        chunk.write(OpCode::Pop as u8, 2);
        chunk.write(OpCode::Return as u8, 2);
        let listing = chunk.disassemble("test");
        assert!(listing.contains("JumpIfFalse -> 5"), "{listing}");
        assert!(listing.contains("0004    2 Pop"), "{listing}");
    }
}
