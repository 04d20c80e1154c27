use thiserror::Error;

/// A parse failure at a source line. Parsing keeps going after an error, so
/// one script can report several.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Programs that parse but exceed the bytecode format's limits.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("too many constants in one chunk")]
    TooManyConstants,
    #[error("too much code to jump over")]
    JumpTooLarge,
    #[error("loop body too large")]
    LoopTooLarge,
    #[error("too many local variables in function")]
    TooManyLocals,
    #[error("too many closure variables in function")]
    TooManyUpvalues,
    #[error("can't have more than 255 parameters or arguments")]
    TooManyArguments,
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
}

/// Failures that end a script run. Script-level errors (`TypeError`,
/// `ReferenceError`, thrown values) only become `Uncaught` when no `catch`
/// handles them.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RuntimeError {
    #[error("uncaught {0}")]
    Uncaught(String),
    #[error("maximum call stack size exceeded")]
    StackOverflow,
    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum JsError {
    #[error("syntax error: {}", describe(.0))]
    Syntax(Vec<SyntaxError>),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn describe(errors: &[SyntaxError]) -> String {
    match errors {
        [] => "unknown".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

impl From<Vec<SyntaxError>> for JsError {
    fn from(errors: Vec<SyntaxError>) -> Self {
        JsError::Syntax(errors)
    }
}
