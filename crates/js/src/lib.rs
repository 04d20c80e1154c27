//! A small scripting engine: lexer, Pratt parser, bytecode compiler and a
//! stack VM with closures, exceptions and a mark-and-sweep heap.
//!
//! ```
//! let mut vm = js::Vm::new();
//! let value = vm.interpret("function add(a, b) { return a + b; } return add(1, 2);").unwrap();
//! assert_eq!(value, js::Value::Number(3.0));
//! ```

pub mod ast;
pub mod chunk;
pub mod compiler;
pub mod error;
pub mod heap;
pub mod lexer;
pub mod opcode;
pub mod parser;
mod prelude;
pub mod runtime;
pub mod token;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, Constant, FunctionProto};
pub use compiler::compile;
pub use error::{CompileError, JsError, RuntimeError, SyntaxError};
pub use heap::{Heap, HeapRef, NativeFn, Object, ObjectKind};
pub use lexer::{Lexer, tokenize};
pub use opcode::OpCode;
pub use parser::parse;
pub use runtime::{Prototypes, RuntimeContext};
pub use token::{Token, TokenKind};
pub use value::Value;
pub use vm::{Vm, VmConfig};
