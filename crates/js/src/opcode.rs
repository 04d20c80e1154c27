//! Instruction set. Operands follow the opcode byte: `u8` for constant,
//! slot and count operands, big-endian `u16` for jump offsets.

macro_rules! opcodes {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[repr(u8)]
        pub enum OpCode {
            $($(#[$meta])* $name),*
        }

        impl OpCode {
            const ALL: &'static [OpCode] = &[$(OpCode::$name),*];

            pub fn from_byte(byte: u8) -> Option<OpCode> {
                Self::ALL.get(byte as usize).copied()
            }
        }
    };
}

opcodes! {
    /// `idx`: push constant.
    Constant,
    Undefined,
    Null,
    True,
    False,
    Pop,
    Dup,
    /// Duplicates the top two values.
    Dup2,
    Swap,
    GetLocal,
    SetLocal,
    GetUpvalue,
    SetUpvalue,
    GetGlobal,
    /// Assigning an undeclared global throws `ReferenceError`.
    SetGlobal,
    DefineGlobal,
    /// `name`: `[obj] -> [value]`.
    GetProperty,
    /// `name`: `[obj, value] -> [value]`.
    SetProperty,
    /// `[obj, key] -> [value]`.
    GetIndex,
    /// `[obj, key, value] -> [value]`.
    SetIndex,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitAnd,
    BitOr,
    Negate,
    ToNumber,
    Not,
    TypeOf,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    InstanceOf,
    /// `offset`: forward jump.
    Jump,
    /// `offset`: forward jump if the top value is falsy; does not pop.
    JumpIfFalse,
    /// `offset`: backward jump.
    Loop,
    /// `argc`: `[callee, this, args..] -> [result]`.
    Call,
    /// `argc`: like `Call` with a fresh `this`.
    New,
    /// `idx`, then `(is_local, index)` per upvalue.
    Closure,
    CloseUpvalue,
    Return,
    /// Pushes an empty array.
    Array,
    /// `[array, value] -> [array]`.
    ArrayPush,
    /// Pushes an empty object.
    Object,
    /// `name`: `[obj, value] -> [obj]`.
    InitProperty,
    /// `offset`: installs a handler whose catch block starts at the target.
    Try,
    EndTry,
    Throw,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        assert_eq!(OpCode::from_byte(OpCode::Throw as u8), Some(OpCode::Throw));
        assert_eq!(OpCode::from_byte(0), Some(OpCode::Constant));
        assert_eq!(OpCode::from_byte(u8::MAX), None);
    }
}
