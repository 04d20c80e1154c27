//! AST to bytecode.
//!
//! Each function body gets its own [`FunctionState`]: a chunk, the locals in
//! scope (resolved to stack slots at compile time) and the upvalues it
//! captures from enclosing functions. Names that resolve to neither become
//! global lookups by name. Forward jumps are emitted with a placeholder
//! offset and patched once the target is known.
//!
//! Frame layout: slot 0 holds the callee, slot 1 `this`, then parameters
//! and locals in declaration order.

use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, Function, LogicalOp, Stmt, StmtKind, UnaryOp, UpdateOp, VarKind};
use crate::chunk::{Chunk, Constant, FunctionProto};
use crate::error::CompileError;
use crate::opcode::OpCode;

type CompileResult<T = ()> = Result<T, CompileError>;

const MAX_LOCALS: usize = 256;
const MAX_UPVALUES: usize = 255;
const MAX_ARGS: usize = 255;

struct Local {
    name: Rc<str>,
    depth: usize,
    captured: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct UpvalueDesc {
    index: u8,
    is_local: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Function,
    Arrow,
}

struct FunctionState {
    kind: FunctionKind,
    name: Rc<str>,
    arity: u8,
    chunk: Chunk,
    locals: Vec<Local>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: usize,
}

impl FunctionState {
    fn new(kind: FunctionKind, name: Rc<str>) -> Self {
        // Arrow functions leave slot 1 unnamed so `this` resolves to the
        // enclosing function's.
        let this_name = if kind == FunctionKind::Arrow { "" } else { "this" };
        let reserved = |name: &str| Local {
            name: Rc::from(name),
            depth: 0,
            captured: false,
        };
        Self {
            kind,
            name,
            arity: 0,
            chunk: Chunk::default(),
            locals: vec![reserved(""), reserved(this_name)],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }

    fn resolve_local(&self, name: &str) -> Option<u8> {
        self.locals
            .iter()
            .rposition(|local| !local.name.is_empty() && &*local.name == name)
            .map(|slot| slot as u8)
    }

    fn add_upvalue(&mut self, index: u8, is_local: bool) -> CompileResult<u8> {
        let desc = UpvalueDesc { index, is_local };
        if let Some(existing) = self.upvalues.iter().position(|u| *u == desc) {
            return Ok(existing as u8);
        }
        if self.upvalues.len() >= MAX_UPVALUES {
            return Err(CompileError::TooManyUpvalues);
        }
        self.upvalues.push(desc);
        Ok((self.upvalues.len() - 1) as u8)
    }

    fn into_proto(self) -> (FunctionProto, Vec<UpvalueDesc>) {
        let proto = FunctionProto {
            name: self.name,
            arity: self.arity,
            upvalue_count: self.upvalues.len() as u8,
            chunk: self.chunk,
        };
        (proto, self.upvalues)
    }
}

#[derive(Clone, Copy)]
enum Access {
    Get,
    Set,
}

pub struct Compiler {
    current: FunctionState,
    /// Enclosing functions, outermost first.
    enclosing: Vec<FunctionState>,
    line: u32,
}

/// Compiles a parsed script into its top-level function.
pub fn compile(program: &[Stmt]) -> CompileResult<Rc<FunctionProto>> {
    let mut compiler = Compiler {
        current: FunctionState::new(FunctionKind::Script, Rc::from("<script>")),
        enclosing: Vec::new(),
        line: program.first().map_or(1, |s| s.line),
    };
    compiler.statements(program)?;
    compiler.emit_op(OpCode::Undefined);
    compiler.emit_op(OpCode::Return);
    let (proto, _) = compiler.current.into_proto();
    log::debug!(
        target: "js.compiler",
        "compiled script: {} bytes, {} constants",
        proto.chunk.len(),
        proto.chunk.constants.len()
    );
    if log::log_enabled!(target: "js.compiler", log::Level::Trace) {
        log::trace!(target: "js.compiler", "{}", proto.chunk.disassemble(&proto.name));
    }
    Ok(Rc::new(proto))
}

impl Compiler {
    fn chunk(&mut self) -> &mut Chunk {
        &mut self.current.chunk
    }

    fn emit(&mut self, byte: u8) {
        let line = self.line;
        self.chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit(op as u8);
    }

    fn emit_op_arg(&mut self, op: OpCode, arg: u8) {
        self.emit(op as u8);
        self.emit(arg);
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit(0xff);
        self.emit(0xff);
        self.chunk().len() - 2
    }

    fn patch_jump(&mut self, at: usize) -> CompileResult {
        let distance = self.chunk().len() - at - 2;
        let distance = u16::try_from(distance).map_err(|_| CompileError::JumpTooLarge)?;
        let [hi, lo] = distance.to_be_bytes();
        self.chunk().code[at] = hi;
        self.chunk().code[at + 1] = lo;
        Ok(())
    }

    fn emit_loop(&mut self, start: usize) -> CompileResult {
        self.emit_op(OpCode::Loop);
        let distance = self.chunk().len() - start + 2;
        let distance = u16::try_from(distance).map_err(|_| CompileError::LoopTooLarge)?;
        let [hi, lo] = distance.to_be_bytes();
        self.emit(hi);
        self.emit(lo);
        Ok(())
    }

    fn constant(&mut self, constant: Constant) -> CompileResult<u8> {
        self.chunk().add_constant(constant)
    }

    fn name_constant(&mut self, name: &Rc<str>) -> CompileResult<u8> {
        self.constant(Constant::String(name.clone()))
    }

    fn begin_scope(&mut self) {
        self.current.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.current.scope_depth -= 1;
        while let Some(local) = self.current.locals.last() {
            if local.depth <= self.current.scope_depth {
                break;
            }
            let op = if local.captured {
                OpCode::CloseUpvalue
            } else {
                OpCode::Pop
            };
            self.current.locals.pop();
            self.emit_op(op);
        }
    }

    /// Declares a local for the value on top of the stack.
    fn add_local(&mut self, name: Rc<str>) -> CompileResult<u8> {
        if self.current.locals.len() >= MAX_LOCALS {
            return Err(CompileError::TooManyLocals);
        }
        self.current.locals.push(Local {
            name,
            depth: self.current.scope_depth,
            captured: false,
        });
        Ok((self.current.locals.len() - 1) as u8)
    }

    fn declares_globals(&self, kind: VarKind) -> bool {
        self.current.kind == FunctionKind::Script
            && (self.current.scope_depth == 0 || kind == VarKind::Var)
    }

    /// Binds the value on top of the stack to `name`.
    fn define_variable(&mut self, kind: VarKind, name: &Rc<str>) -> CompileResult {
        if self.declares_globals(kind) {
            let idx = self.name_constant(name)?;
            self.emit_op_arg(OpCode::DefineGlobal, idx);
        } else {
            self.add_local(name.clone())?;
        }
        Ok(())
    }

    /// `level` indexes `enclosing` followed by `current`.
    fn state_at(&mut self, level: usize) -> &mut FunctionState {
        if level == self.enclosing.len() {
            &mut self.current
        } else {
            &mut self.enclosing[level]
        }
    }

    fn resolve_upvalue(&mut self, level: usize, name: &str) -> CompileResult<Option<u8>> {
        if level == 0 {
            return Ok(None);
        }
        let parent = level - 1;
        if let Some(slot) = self.state_at(parent).resolve_local(name) {
            self.state_at(parent).locals[slot as usize].captured = true;
            return self.state_at(level).add_upvalue(slot, true).map(Some);
        }
        match self.resolve_upvalue(parent, name)? {
            Some(index) => self.state_at(level).add_upvalue(index, false).map(Some),
            None => Ok(None),
        }
    }

    fn variable(&mut self, name: &Rc<str>, access: Access) -> CompileResult {
        let (op, arg) = if let Some(slot) = self.current.resolve_local(name) {
            let op = match access {
                Access::Get => OpCode::GetLocal,
                Access::Set => OpCode::SetLocal,
            };
            (op, slot)
        } else if let Some(index) = self.resolve_upvalue(self.enclosing.len(), name)? {
            let op = match access {
                Access::Get => OpCode::GetUpvalue,
                Access::Set => OpCode::SetUpvalue,
            };
            (op, index)
        } else {
            let op = match access {
                Access::Get => OpCode::GetGlobal,
                Access::Set => OpCode::SetGlobal,
            };
            (op, self.name_constant(name)?)
        };
        self.emit_op_arg(op, arg);
        Ok(())
    }

    /// Hoisting within one statement list: every local declared directly in
    /// the list gets its slot (holding `undefined`) first, then function
    /// declarations are bound, then the remaining statements run in source
    /// order.
    fn statements(&mut self, statements: &[Stmt]) -> CompileResult {
        for stmt in statements {
            for name in self.hoisted_locals(stmt) {
                if self.declared_here(&name).is_none() {
                    self.emit_op(OpCode::Undefined);
                    self.add_local(name)?;
                }
            }
        }
        let (functions, rest): (Vec<&Stmt>, Vec<&Stmt>) = statements
            .iter()
            .partition(|s| matches!(s.kind, StmtKind::Function(_)));
        for stmt in functions.into_iter().chain(rest) {
            self.statement(stmt)?;
        }
        Ok(())
    }

    fn hoisted_locals(&self, stmt: &Stmt) -> Vec<Rc<str>> {
        match &stmt.kind {
            StmtKind::Var { kind, declarations } if !self.declares_globals(*kind) => {
                declarations.iter().map(|(name, _)| name.clone()).collect()
            }
            StmtKind::Function(function) if !self.function_is_global() => {
                function.name.iter().cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    fn function_is_global(&self) -> bool {
        self.declares_globals(VarKind::Var) && self.current.scope_depth == 0
    }

    /// Slot of a local named `name` in the innermost scope.
    fn declared_here(&self, name: &str) -> Option<u8> {
        let depth = self.current.scope_depth;
        self.current
            .locals
            .iter()
            .rposition(|local| local.depth == depth && !local.name.is_empty() && &*local.name == name)
            .map(|slot| slot as u8)
    }

    /// Stores the value on top of the stack into `slot` and drops it.
    fn assign_local(&mut self, slot: u8) {
        self.emit_op_arg(OpCode::SetLocal, slot);
        self.emit_op(OpCode::Pop);
    }

    fn block(&mut self, statements: &[Stmt]) -> CompileResult {
        self.begin_scope();
        self.statements(statements)?;
        self.end_scope();
        Ok(())
    }

    fn statement(&mut self, stmt: &Stmt) -> CompileResult {
        self.line = stmt.line;
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.expression(expr)?;
                self.emit_op(OpCode::Pop);
            }
            StmtKind::Var { kind, declarations } => {
                for (name, init) in declarations {
                    let hoisted = if self.declares_globals(*kind) {
                        None
                    } else {
                        self.declared_here(name)
                    };
                    match (hoisted, init) {
                        (Some(slot), Some(expr)) => {
                            self.expression(expr)?;
                            self.assign_local(slot);
                        }
                        // `var x;` on an existing binding keeps its value.
                        (Some(_), None) => {}
                        (None, init) => {
                            match init {
                                Some(expr) => self.expression(expr)?,
                                None => self.emit_op(OpCode::Undefined),
                            }
                            self.define_variable(*kind, name)?;
                        }
                    }
                }
            }
            StmtKind::Function(function) => {
                let name = function.name.clone().unwrap_or_else(|| Rc::from(""));
                if self.function_is_global() {
                    self.function(function)?;
                    let idx = self.name_constant(&name)?;
                    self.emit_op_arg(OpCode::DefineGlobal, idx);
                } else if let Some(slot) = self.declared_here(&name) {
                    self.function(function)?;
                    self.assign_local(slot);
                } else {
                    // Declared first so the body can refer to itself.
                    self.add_local(name)?;
                    self.function(function)?;
                }
            }
            StmtKind::Return(value) => {
                match value {
                    Some(expr) => self.expression(expr)?,
                    None => self.emit_op(OpCode::Undefined),
                }
                self.emit_op(OpCode::Return);
            }
            StmtKind::If {
                test,
                then,
                otherwise,
            } => {
                self.expression(test)?;
                let to_else = self.emit_jump(OpCode::JumpIfFalse);
                self.emit_op(OpCode::Pop);
                self.scoped_statement(then)?;
                let to_end = self.emit_jump(OpCode::Jump);
                self.patch_jump(to_else)?;
                self.emit_op(OpCode::Pop);
                if let Some(otherwise) = otherwise {
                    self.scoped_statement(otherwise)?;
                }
                self.patch_jump(to_end)?;
            }
            StmtKind::While { test, body } => {
                let start = self.chunk().len();
                self.expression(test)?;
                let exit = self.emit_jump(OpCode::JumpIfFalse);
                self.emit_op(OpCode::Pop);
                self.scoped_statement(body)?;
                self.emit_loop(start)?;
                self.patch_jump(exit)?;
                self.emit_op(OpCode::Pop);
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                self.begin_scope();
                if let Some(init) = init {
                    self.statement(init)?;
                }
                let start = self.chunk().len();
                let exit = match test {
                    Some(test) => {
                        self.expression(test)?;
                        let exit = self.emit_jump(OpCode::JumpIfFalse);
                        self.emit_op(OpCode::Pop);
                        Some(exit)
                    }
                    None => None,
                };
                self.scoped_statement(body)?;
                if let Some(update) = update {
                    self.expression(update)?;
                    self.emit_op(OpCode::Pop);
                }
                self.emit_loop(start)?;
                if let Some(exit) = exit {
                    self.patch_jump(exit)?;
                    self.emit_op(OpCode::Pop);
                }
                self.end_scope();
            }
            StmtKind::Block(statements) => self.block(statements)?,
            StmtKind::Throw(value) => {
                self.expression(value)?;
                self.emit_op(OpCode::Throw);
            }
            StmtKind::Try {
                block,
                param,
                handler,
                finalizer,
            } => self.try_statement(block, param.as_ref(), handler.as_deref(), finalizer.as_deref())?,
            StmtKind::Empty => {}
        }
        Ok(())
    }

    /// A statement used as a branch or loop body gets its own scope, so a
    /// declaration there cannot leak a stack slot.
    fn scoped_statement(&mut self, stmt: &Stmt) -> CompileResult {
        self.begin_scope();
        self.statement(stmt)?;
        self.end_scope();
        Ok(())
    }

    /// Layout:
    ///
    /// ```text
    ///         TRY catch
    ///         <block>
    ///         END_TRY
    ///         JUMP finally
    /// catch:  [exception]            (handler pushed the thrown value)
    ///         TRY rethrow            (only with a finally clause)
    ///         <handler>
    ///         END_TRY
    ///         JUMP finally
    /// rethrow:<finalizer> THROW      (finally runs, then the error continues)
    /// finally:<finalizer>
    /// ```
    fn try_statement(
        &mut self,
        block: &[Stmt],
        param: Option<&Rc<str>>,
        handler: Option<&[Stmt]>,
        finalizer: Option<&[Stmt]>,
    ) -> CompileResult {
        let to_catch = self.emit_jump(OpCode::Try);
        self.block(block)?;
        self.emit_op(OpCode::EndTry);
        let mut to_finally = vec![self.emit_jump(OpCode::Jump)];
        self.patch_jump(to_catch)?;

        match (handler, finalizer) {
            (Some(handler), finalizer) => {
                self.begin_scope();
                self.add_local(param.cloned().unwrap_or_else(|| Rc::from("")))?;
                let to_rethrow = match finalizer {
                    Some(_) => Some(self.emit_jump(OpCode::Try)),
                    None => None,
                };
                self.statements(handler)?;
                if to_rethrow.is_some() {
                    self.emit_op(OpCode::EndTry);
                }
                self.end_scope();
                if let (Some(to_rethrow), Some(finalizer)) = (to_rethrow, finalizer) {
                    to_finally.push(self.emit_jump(OpCode::Jump));
                    self.patch_jump(to_rethrow)?;
                    // The catch binding is still below the new exception.
                    self.begin_scope();
                    self.add_local(Rc::from(""))?;
                    self.rethrow_after(finalizer)?;
                    self.end_scope();
                }
            }
            (None, Some(finalizer)) => {
                self.begin_scope();
                self.rethrow_after(finalizer)?;
                self.end_scope();
            }
            (None, None) => self.emit_op(OpCode::Pop),
        }

        for jump in to_finally {
            self.patch_jump(jump)?;
        }
        if let Some(finalizer) = finalizer {
            self.block(finalizer)?;
        }
        Ok(())
    }

    /// With the pending exception on top of the stack: run `finalizer`, then
    /// throw it again.
    fn rethrow_after(&mut self, finalizer: &[Stmt]) -> CompileResult {
        let slot = self.add_local(Rc::from(""))?;
        self.block(finalizer)?;
        self.emit_op_arg(OpCode::GetLocal, slot);
        self.emit_op(OpCode::Throw);
        Ok(())
    }

    fn function(&mut self, function: &Function) -> CompileResult {
        if function.params.len() > MAX_ARGS {
            return Err(CompileError::TooManyArguments);
        }
        let (kind, fallback) = if function.arrow {
            (FunctionKind::Arrow, "<arrow>")
        } else {
            (FunctionKind::Function, "<anonymous>")
        };
        let name = function.name.clone().unwrap_or_else(|| Rc::from(fallback));
        let outer = std::mem::replace(&mut self.current, FunctionState::new(kind, name));
        self.enclosing.push(outer);
        let saved_line = self.line;
        self.line = function.line;

        self.current.arity = function.params.len() as u8;
        let body = (|| {
            for param in &function.params {
                self.add_local(param.clone())?;
            }
            self.statements(&function.body)?;
            self.emit_op(OpCode::Undefined);
            self.emit_op(OpCode::Return);
            Ok(())
        })();

        let Some(outer) = self.enclosing.pop() else {
            unreachable!("enclosing function pushed above");
        };
        let finished = std::mem::replace(&mut self.current, outer);
        self.line = saved_line;
        body?;

        let (proto, upvalues) = finished.into_proto();
        log::trace!(
            target: "js.compiler",
            "function {}: arity {}, {} upvalues",
            proto.name,
            proto.arity,
            upvalues.len()
        );
        let idx = self.constant(Constant::Function(Rc::new(proto)))?;
        self.emit_op_arg(OpCode::Closure, idx);
        for upvalue in upvalues {
            self.emit(u8::from(upvalue.is_local));
            self.emit(upvalue.index);
        }
        Ok(())
    }

    fn binary_opcode(op: BinaryOp) -> OpCode {
        match op {
            BinaryOp::Add => OpCode::Add,
            BinaryOp::Subtract => OpCode::Subtract,
            BinaryOp::Multiply => OpCode::Multiply,
            BinaryOp::Divide => OpCode::Divide,
            BinaryOp::Modulo => OpCode::Modulo,
            BinaryOp::BitAnd => OpCode::BitAnd,
            BinaryOp::BitOr => OpCode::BitOr,
            BinaryOp::Equal => OpCode::Equal,
            BinaryOp::NotEqual => OpCode::NotEqual,
            BinaryOp::StrictEqual => OpCode::StrictEqual,
            BinaryOp::StrictNotEqual => OpCode::StrictNotEqual,
            BinaryOp::Less => OpCode::Less,
            BinaryOp::LessEqual => OpCode::LessEqual,
            BinaryOp::Greater => OpCode::Greater,
            BinaryOp::GreaterEqual => OpCode::GreaterEqual,
            BinaryOp::InstanceOf => OpCode::InstanceOf,
        }
    }

    fn expression(&mut self, expr: &Expr) -> CompileResult {
        match expr {
            Expr::Number(n) => {
                let idx = self.constant(Constant::Number(*n))?;
                self.emit_op_arg(OpCode::Constant, idx);
            }
            Expr::String(s) => {
                let idx = self.constant(Constant::String(s.clone()))?;
                self.emit_op_arg(OpCode::Constant, idx);
            }
            Expr::Bool(true) => self.emit_op(OpCode::True),
            Expr::Bool(false) => self.emit_op(OpCode::False),
            Expr::Null => self.emit_op(OpCode::Null),
            Expr::Undefined => self.emit_op(OpCode::Undefined),
            Expr::This => self.variable(&Rc::from("this"), Access::Get)?,
            Expr::Identifier(name) => self.variable(name, Access::Get)?,
            Expr::Array(items) => {
                self.emit_op(OpCode::Array);
                for item in items {
                    self.expression(item)?;
                    self.emit_op(OpCode::ArrayPush);
                }
            }
            Expr::Object(properties) => {
                self.emit_op(OpCode::Object);
                for (key, value) in properties {
                    self.expression(value)?;
                    let idx = self.name_constant(key)?;
                    self.emit_op_arg(OpCode::InitProperty, idx);
                }
            }
            Expr::Function(function) => self.function(function)?,
            Expr::Unary { op, operand } => {
                self.expression(operand)?;
                self.emit_op(match op {
                    UnaryOp::Negate => OpCode::Negate,
                    UnaryOp::Plus => OpCode::ToNumber,
                    UnaryOp::Not => OpCode::Not,
                    UnaryOp::TypeOf => OpCode::TypeOf,
                });
            }
            Expr::Binary { op, left, right } => {
                self.expression(left)?;
                self.expression(right)?;
                self.emit_op(Self::binary_opcode(*op));
            }
            Expr::Logical { op, left, right } => {
                self.expression(left)?;
                match op {
                    LogicalOp::And => {
                        let to_end = self.emit_jump(OpCode::JumpIfFalse);
                        self.emit_op(OpCode::Pop);
                        self.expression(right)?;
                        self.patch_jump(to_end)?;
                    }
                    LogicalOp::Or => {
                        let to_right = self.emit_jump(OpCode::JumpIfFalse);
                        let to_end = self.emit_jump(OpCode::Jump);
                        self.patch_jump(to_right)?;
                        self.emit_op(OpCode::Pop);
                        self.expression(right)?;
                        self.patch_jump(to_end)?;
                    }
                }
            }
            Expr::Assign { op, target, value } => self.assignment(*op, target, value)?,
            Expr::Update { op, prefix, target } => self.update(*op, *prefix, target)?,
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                self.expression(test)?;
                let to_else = self.emit_jump(OpCode::JumpIfFalse);
                self.emit_op(OpCode::Pop);
                self.expression(then)?;
                let to_end = self.emit_jump(OpCode::Jump);
                self.patch_jump(to_else)?;
                self.emit_op(OpCode::Pop);
                self.expression(otherwise)?;
                self.patch_jump(to_end)?;
            }
            Expr::Call { callee, args } => {
                match &**callee {
                    Expr::Member { object, property } => {
                        self.expression(object)?;
                        self.emit_op(OpCode::Dup);
                        let idx = self.name_constant(property)?;
                        self.emit_op_arg(OpCode::GetProperty, idx);
                        self.emit_op(OpCode::Swap);
                    }
                    Expr::Index { object, index } => {
                        self.expression(object)?;
                        self.emit_op(OpCode::Dup);
                        self.expression(index)?;
                        self.emit_op(OpCode::GetIndex);
                        self.emit_op(OpCode::Swap);
                    }
                    other => {
                        self.expression(other)?;
                        self.emit_op(OpCode::Undefined);
                    }
                }
                let argc = self.arguments(args)?;
                self.emit_op_arg(OpCode::Call, argc);
            }
            Expr::New { callee, args } => {
                self.expression(callee)?;
                self.emit_op(OpCode::Undefined);
                let argc = self.arguments(args)?;
                self.emit_op_arg(OpCode::New, argc);
            }
            Expr::Member { object, property } => {
                self.expression(object)?;
                let idx = self.name_constant(property)?;
                self.emit_op_arg(OpCode::GetProperty, idx);
            }
            Expr::Index { object, index } => {
                self.expression(object)?;
                self.expression(index)?;
                self.emit_op(OpCode::GetIndex);
            }
        }
        Ok(())
    }

    fn arguments(&mut self, args: &[Expr]) -> CompileResult<u8> {
        if args.len() > MAX_ARGS {
            return Err(CompileError::TooManyArguments);
        }
        for arg in args {
            self.expression(arg)?;
        }
        Ok(args.len() as u8)
    }

    fn assignment(&mut self, op: Option<BinaryOp>, target: &Expr, value: &Expr) -> CompileResult {
        match target {
            Expr::Identifier(name) => {
                if let Some(op) = op {
                    self.variable(name, Access::Get)?;
                    self.expression(value)?;
                    self.emit_op(Self::binary_opcode(op));
                } else {
                    self.expression(value)?;
                }
                self.variable(name, Access::Set)
            }
            Expr::Member { object, property } => {
                self.expression(object)?;
                let idx = self.name_constant(property)?;
                if let Some(op) = op {
                    self.emit_op(OpCode::Dup);
                    self.emit_op_arg(OpCode::GetProperty, idx);
                    self.expression(value)?;
                    self.emit_op(Self::binary_opcode(op));
                } else {
                    self.expression(value)?;
                }
                self.emit_op_arg(OpCode::SetProperty, idx);
                Ok(())
            }
            Expr::Index { object, index } => {
                self.expression(object)?;
                self.expression(index)?;
                if let Some(op) = op {
                    self.emit_op(OpCode::Dup2);
                    self.emit_op(OpCode::GetIndex);
                    self.expression(value)?;
                    self.emit_op(Self::binary_opcode(op));
                } else {
                    self.expression(value)?;
                }
                self.emit_op(OpCode::SetIndex);
                Ok(())
            }
            _ => Err(CompileError::InvalidAssignmentTarget),
        }
    }

    /// `++`/`--`. Postfix forms on properties undo the step on the stored
    /// value to produce the old one.
    fn update(&mut self, op: UpdateOp, prefix: bool, target: &Expr) -> CompileResult {
        let (step, undo) = match op {
            UpdateOp::Increment => (OpCode::Add, OpCode::Subtract),
            UpdateOp::Decrement => (OpCode::Subtract, OpCode::Add),
        };
        let one = self.constant(Constant::Number(1.0))?;
        match target {
            Expr::Identifier(name) => {
                self.variable(name, Access::Get)?;
                self.emit_op(OpCode::ToNumber);
                if !prefix {
                    self.emit_op(OpCode::Dup);
                }
                self.emit_op_arg(OpCode::Constant, one);
                self.emit_op(step);
                self.variable(name, Access::Set)?;
                if !prefix {
                    self.emit_op(OpCode::Pop);
                }
                return Ok(());
            }
            Expr::Member { object, property } => {
                self.expression(object)?;
                let idx = self.name_constant(property)?;
                self.emit_op(OpCode::Dup);
                self.emit_op_arg(OpCode::GetProperty, idx);
                self.emit_op(OpCode::ToNumber);
                self.emit_op_arg(OpCode::Constant, one);
                self.emit_op(step);
                self.emit_op_arg(OpCode::SetProperty, idx);
            }
            Expr::Index { object, index } => {
                self.expression(object)?;
                self.expression(index)?;
                self.emit_op(OpCode::Dup2);
                self.emit_op(OpCode::GetIndex);
                self.emit_op(OpCode::ToNumber);
                self.emit_op_arg(OpCode::Constant, one);
                self.emit_op(step);
                self.emit_op(OpCode::SetIndex);
            }
            _ => return Err(CompileError::InvalidAssignmentTarget),
        }
        if !prefix {
            self.emit_op_arg(OpCode::Constant, one);
            self.emit_op(undo);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn compile_src(source: &str) -> CompileResult<Rc<FunctionProto>> {
        compile(&parse(source).expect("parses"))
    }

    fn ops(proto: &FunctionProto) -> String {
        proto.chunk.disassemble("test")
    }

    #[test]
    fn top_level_vars_are_globals_and_function_vars_are_locals() {
        let script = compile_src("var x = 1; function f(a) { var y = a; return y; }").expect("compiles");
        let listing = ops(&script);
        assert!(listing.contains("DefineGlobal"), "{listing}");
        let Some(Constant::Function(f)) = script
            .chunk
            .constants
            .iter()
            .find(|c| matches!(c, Constant::Function(_)))
        else {
            panic!("no function constant");
        };
        let body = ops(f);
        assert!(body.contains("GetLocal 2"), "{body}");
        assert!(!body.contains("Global"), "{body}");
        assert_eq!(f.arity, 1);
    }

    #[test]
    fn captured_locals_become_upvalues() {
        let script =
            compile_src("function outer() { var n = 0; return function() { n = n + 1; return n; }; }")
                .expect("compiles");
        let Some(Constant::Function(outer)) = script.chunk.constants.first() else {
            panic!("no outer");
        };
        let Some(Constant::Function(inner)) = outer
            .chunk
            .constants
            .iter()
            .find(|c| matches!(c, Constant::Function(_)))
        else {
            panic!("no inner");
        };
        assert_eq!(inner.upvalue_count, 1);
        assert!(ops(inner).contains("SetUpvalue 0"));
        assert!(ops(outer).contains("local 2"));
    }

    #[test]
    fn invalid_assignment_targets_are_rejected() {
        assert_eq!(
            compile_src("1 = 2;").err(),
            Some(CompileError::InvalidAssignmentTarget)
        );
        assert_eq!(
            compile_src("f()++;").err(),
            Some(CompileError::InvalidAssignmentTarget)
        );
    }

    #[test]
    fn too_many_constants_is_reported() {
        let source: String = (0..300).map(|i| format!("x = {i};\n")).collect();
        assert_eq!(compile_src(&source).err(), Some(CompileError::TooManyConstants));
    }

    #[test]
    fn too_many_locals_is_reported() {
        let body: String = (0..300).map(|i| format!("var v{i};")).collect();
        let source = format!("function f() {{ {body} }}");
        assert_eq!(compile_src(&source).err(), Some(CompileError::TooManyLocals));
    }

    #[test]
    fn oversized_jumps_are_reported() {
        let body: String = (0..22_000).map(|_| "x = y;").collect();
        let source = format!("if (c) {{ {body} }}");
        assert_eq!(compile_src(&source).err(), Some(CompileError::JumpTooLarge));
    }
}
