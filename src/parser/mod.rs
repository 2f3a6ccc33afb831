//! Fused recursive-descent parser, type-checker, and code generator (C4).
//!
//! There is no separate AST: recognizing a production, checking its types,
//! and emitting its instructions all happen in the same function call. A
//! single `Parser` carries the scanner's one-token lookahead, the symbol
//! table, and the emitter together as parsing proceeds, so every production
//! below reads as "recognize this, check it, emit for it" in one pass.

#[cfg(test)]
mod tests;

use crate::emitter::{type_descriptor, ArrayElemType, CmpOp, Emitter, Instr};
use crate::error::{CompileError, ErrorKind, Position};
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::Scanner;
use crate::symtab::{BaseType, IdProp, SymbolTable, ValType};

/// Compiles `source` into a finished [`Emitter`], or the first diagnostic
/// encountered. There is no recovery: compilation stops at the first error.
pub fn compile(source: &str) -> Result<Emitter, CompileError> {
    Parser::new(source)?.parse_program()
}

#[derive(Clone, Copy)]
enum AddOp {
    Add,
    Sub,
    Or,
}

#[derive(Clone, Copy)]
enum MulOp {
    Mul,
    Div,
    Rem,
    And,
}

#[derive(Clone, Copy)]
enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    lookahead: Token,
    symtab: SymbolTable,
    emitter: Emitter,
    /// Next local-variable slot to hand out in the subroutine being parsed.
    next_offset: u32,
    /// `Some(t)` inside a function body, where `leave` must produce a `t`;
    /// `None` inside a procedure body or the top-level program, where
    /// `leave` takes no expression.
    return_type: Option<ValType>,
    /// Whether a `leave <expr>` has been seen anywhere in the function body
    /// currently open. Checked against `return_type` when the body closes.
    has_leave_value: bool,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, CompileError> {
        let mut scanner = Scanner::new(source);
        let lookahead = scanner.next_token()?;
        Ok(Self {
            scanner,
            lookahead,
            symtab: SymbolTable::new(),
            emitter: Emitter::new(""),
            next_offset: 0,
            return_type: None,
            has_leave_value: false,
        })
    }

    // --- token-stream plumbing -------------------------------------------

    fn pos(&self) -> Position {
        self.lookahead.pos
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.lookahead.kind == kind
    }

    fn advance(&mut self) -> Result<(), CompileError> {
        self.lookahead = self.scanner.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        CompileError::expected(expected, self.lookahead.kind.describe(), self.lookahead.pos)
    }

    /// Consumes `kind` if it is the lookahead, else fails with a syntax error.
    /// Only meaningful for tokens whose spelling never varies (reserved
    /// words and punctuation) — `Id`/`Number`/`Str` go through their own
    /// `expect_*` helpers.
    fn expect(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        if self.lookahead.kind == kind {
            self.advance()
        } else {
            let expected = kind
                .reserved_spelling()
                .map(|s| format!("'{}'", s))
                .unwrap_or_else(|| kind.describe());
            Err(self.unexpected(&expected))
        }
    }

    fn expect_id(&mut self) -> Result<String, CompileError> {
        match self.lookahead.kind.clone() {
            TokenKind::Id(name) => {
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn starts_expr(&self) -> bool {
        matches!(
            self.lookahead.kind,
            TokenKind::Number(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Not
                | TokenKind::LParen
                | TokenKind::Minus
                | TokenKind::Id(_)
        )
    }

    // --- symbol-table helpers ----------------------------------------------

    fn lookup(&self, name: &str, pos: Position) -> Result<IdProp, CompileError> {
        self.symtab
            .find(name)
            .cloned()
            .ok_or_else(|| CompileError::new(ErrorKind::UnknownIdentifier(name.to_string()), pos))
    }

    fn declare(&mut self, name: &str, val_type: ValType, pos: Position) -> Result<u32, CompileError> {
        let offset = self.next_offset;
        self.next_offset += 1;
        if self.symtab.insert(name, IdProp::variable(val_type, offset)) {
            Ok(offset)
        } else {
            Err(CompileError::new(ErrorKind::MultipleDefinition(name.to_string()), pos))
        }
    }

    // --- type-checking helpers ----------------------------------------------

    fn require_scalar_integer(&self, ty: &ValType, pos: Position) -> Result<(), CompileError> {
        if ty.is_scalar() && matches!(ty.base, BaseType::Integer) {
            Ok(())
        } else {
            Err(CompileError::new(
                ErrorKind::IncompatibleTypes {
                    expected: "integer".to_string(),
                    found: ty.to_string(),
                },
                pos,
            ))
        }
    }

    fn require_boolean(&self, ty: &ValType, pos: Position) -> Result<(), CompileError> {
        if ty.is_scalar() && matches!(ty.base, BaseType::Boolean) {
            Ok(())
        } else {
            Err(CompileError::new(
                ErrorKind::IncompatibleTypes {
                    expected: "boolean".to_string(),
                    found: ty.to_string(),
                },
                pos,
            ))
        }
    }

    // --- program structure ---------------------------------------------

    fn parse_program(mut self) -> Result<Emitter, CompileError> {
        self.expect(TokenKind::Source)?;
        let name = self.expect_id()?;
        self.emitter = Emitter::new(name);

        while self.at(&TokenKind::Function) {
            self.parse_funcdef()?;
        }

        self.symtab.open_top_level_scope();
        self.next_offset = 0;
        self.return_type = None;
        self.has_leave_value = false;
        self.emitter.open_method("main", Vec::new());
        self.parse_body()?;
        self.emit_fallback_return();
        self.emitter.close_method(None, self.symtab.current_locals_width());
        self.symtab.close_subroutine();

        self.expect(TokenKind::Eof)?;
        Ok(self.emitter)
    }

    fn parse_funcdef(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Function)?;
        let name_pos = self.pos();
        let name = self.expect_id()?;
        self.expect(TokenKind::LParen)?;

        let mut param_types = Vec::new();
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let (base, is_array) = self.parse_type()?;
                let param_pos = self.pos();
                let param_name = self.expect_id()?;
                let vt = if is_array {
                    ValType::array(base)
                } else {
                    ValType::scalar(base)
                };
                param_types.push(vt);
                params.push((param_name, param_pos, vt));
                if self.at(&TokenKind::Comma) {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let mut ret_vt: Option<ValType> = None;
        if self.at(&TokenKind::To) {
            self.advance()?;
            let (base, is_array) = self.parse_type()?;
            ret_vt = Some(ValType {
                base,
                is_array,
                is_callable: false,
            });
        }

        let callable_vt = ValType {
            base: ret_vt.map(|v| v.base).unwrap_or(BaseType::None),
            is_array: ret_vt.map(|v| v.is_array).unwrap_or(false),
            is_callable: true,
        };
        let prop = IdProp::callable(callable_vt, param_types.clone());
        if !self.symtab.open_subroutine(&name, prop) {
            return Err(CompileError::new(ErrorKind::MultipleDefinition(name), name_pos));
        }

        for (i, (param_name, param_pos, vt)) in params.iter().enumerate() {
            if !self.symtab.insert(param_name, IdProp::variable(*vt, i as u32)) {
                return Err(CompileError::new(
                    ErrorKind::MultipleDefinition(param_name.clone()),
                    *param_pos,
                ));
            }
        }

        let saved_return = self.return_type;
        let saved_has_leave = self.has_leave_value;
        let saved_offset = self.next_offset;
        self.return_type = ret_vt;
        self.has_leave_value = false;
        self.next_offset = param_types.len() as u32;

        let emitter_params: Vec<(BaseType, bool)> =
            param_types.iter().map(|vt| (vt.base, vt.is_array)).collect();
        self.emitter.open_method(name.clone(), emitter_params);
        self.parse_body()?;

        if let Some(rt) = ret_vt {
            if !self.has_leave_value {
                return Err(CompileError::new(
                    ErrorKind::IncompatibleTypes {
                        expected: rt.to_string(),
                        found: "no value".to_string(),
                    },
                    name_pos,
                ));
            }
        }
        self.emit_fallback_return();
        self.emitter
            .close_method(ret_vt.map(|vt| (vt.base, vt.is_array)), self.symtab.current_locals_width());
        self.symtab.close_subroutine();

        self.return_type = saved_return;
        self.has_leave_value = saved_has_leave;
        self.next_offset = saved_offset;
        Ok(())
    }

    fn emit_fallback_return(&mut self) {
        match self.return_type {
            None => self.emitter.emit(Instr::Return),
            Some(rt) if rt.is_array() => {
                let elem = if matches!(rt.base, BaseType::Boolean) {
                    ArrayElemType::Boolean
                } else {
                    ArrayElemType::Int
                };
                self.emitter.emit(Instr::LdcInt(0));
                self.emitter.emit(Instr::NewArray(elem));
                self.emitter.emit(Instr::AReturn);
            }
            Some(_) => {
                self.emitter.emit(Instr::LdcInt(0));
                self.emitter.emit(Instr::IReturn);
            }
        }
    }

    fn parse_type(&mut self) -> Result<(BaseType, bool), CompileError> {
        let base = match self.lookahead.kind {
            TokenKind::Integer => BaseType::Integer,
            TokenKind::Boolean => BaseType::Boolean,
            _ => return Err(self.unexpected("'integer' or 'boolean'")),
        };
        self.advance()?;
        let is_array = if self.at(&TokenKind::Array) {
            self.advance()?;
            true
        } else {
            false
        };
        Ok((base, is_array))
    }

    fn parse_body(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Begin)?;
        while matches!(self.lookahead.kind, TokenKind::Integer | TokenKind::Boolean) {
            self.parse_vardef()?;
        }
        self.parse_statements()?;
        self.expect(TokenKind::End)
    }

    fn parse_vardef(&mut self) -> Result<(), CompileError> {
        let (base, is_array) = self.parse_type()?;
        loop {
            let pos = self.pos();
            let name = self.expect_id()?;
            let vt = if is_array {
                ValType::array(base)
            } else {
                ValType::scalar(base)
            };
            self.declare(&name, vt, pos)?;
            if self.at(&TokenKind::Comma) {
                self.advance()?;
                continue;
            }
            break;
        }
        self.expect(TokenKind::Semicolon)
    }

    // --- statements ------------------------------------------------------

    fn parse_statements(&mut self) -> Result<(), CompileError> {
        if self.at(&TokenKind::Relax) {
            return self.advance();
        }
        self.parse_statement()?;
        while self.at(&TokenKind::Semicolon) {
            self.advance()?;
            self.parse_statement()?;
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<(), CompileError> {
        match self.lookahead.kind {
            TokenKind::Call => self.parse_call_stmt(),
            TokenKind::If => self.parse_if(),
            TokenKind::Get => self.parse_get(),
            TokenKind::Leave => self.parse_leave(),
            TokenKind::Put => self.parse_put(),
            TokenKind::While => self.parse_while(),
            TokenKind::Id(_) => self.parse_assign(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_assign(&mut self) -> Result<(), CompileError> {
        let pos = self.pos();
        let name = self.expect_id()?;
        let prop = self.lookup(&name, pos)?;
        if prop.val_type.is_callable() {
            return Err(CompileError::new(ErrorKind::NotAVariable(name), pos));
        }

        let mut subscripted = false;
        if self.at(&TokenKind::LBracket) {
            subscripted = true;
            self.advance()?;
            if !prop.val_type.is_array() {
                return Err(CompileError::new(ErrorKind::NotAnArray(name), pos));
            }
            self.emitter.emit(Instr::ALoad(prop.offset));
            let idx_pos = self.pos();
            let idx_ty = self.parse_simple()?;
            self.require_scalar_integer(&idx_ty, idx_pos)?;
            self.expect(TokenKind::RBracket)?;
        }
        self.expect(TokenKind::Gets)?;

        if !subscripted && self.at(&TokenKind::Array) {
            if !prop.val_type.is_array() {
                return Err(CompileError::new(
                    ErrorKind::IllegalArrayOperation(format!("'{}' is not declared as an array", name)),
                    pos,
                ));
            }
            self.advance()?;
            let len_pos = self.pos();
            let len_ty = self.parse_simple()?;
            self.require_scalar_integer(&len_ty, len_pos)?;
            let elem = if matches!(prop.val_type.base, BaseType::Boolean) {
                ArrayElemType::Boolean
            } else {
                ArrayElemType::Int
            };
            self.emitter.emit(Instr::NewArray(elem));
            self.emitter.emit(Instr::AStore(prop.offset));
            return Ok(());
        }

        let rhs_pos = self.pos();
        let rhs_ty = self.parse_expr()?;
        if subscripted {
            let expected = prop.val_type.element_type();
            if rhs_ty != expected {
                return Err(CompileError::new(
                    ErrorKind::IncompatibleTypes {
                        expected: expected.to_string(),
                        found: rhs_ty.to_string(),
                    },
                    rhs_pos,
                ));
            }
            self.emitter.emit(Instr::IAStore);
        } else {
            if rhs_ty != prop.val_type {
                return Err(CompileError::new(
                    ErrorKind::IncompatibleTypes {
                        expected: prop.val_type.to_string(),
                        found: rhs_ty.to_string(),
                    },
                    rhs_pos,
                ));
            }
            if prop.val_type.is_array() {
                self.emitter.emit(Instr::AStore(prop.offset));
            } else {
                self.emitter.emit(Instr::IStore(prop.offset));
            }
        }
        Ok(())
    }

    fn parse_call_stmt(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Call)?;
        let pos = self.pos();
        let name = self.expect_id()?;
        let prop = self.lookup(&name, pos)?;
        if !prop.val_type.is_procedure() {
            return Err(CompileError::new(ErrorKind::NotAProcedure(name), pos));
        }
        self.expect(TokenKind::LParen)?;
        self.parse_call_args(&prop, pos)?;
        self.expect(TokenKind::RParen)?;
        self.emitter.emit(Instr::InvokeStatic(self.call_descriptor(&name, &prop)));
        Ok(())
    }

    fn parse_if(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::If)?;
        let join = self.emitter.fresh_label();
        self.parse_if_branch(join)?;
        self.expect(TokenKind::End)?;
        self.emitter.emit(Instr::PlaceLabel(join));
        Ok(())
    }

    fn parse_if_branch(&mut self, join: u32) -> Result<(), CompileError> {
        let cond_pos = self.pos();
        let cond_ty = self.parse_expr()?;
        self.require_boolean(&cond_ty, cond_pos)?;
        self.expect(TokenKind::Then)?;

        let next = self.emitter.fresh_label();
        self.emitter.emit(Instr::LdcInt(0));
        self.emitter.emit(Instr::IfICmp(CmpOp::Eq, next));
        self.parse_statements()?;
        self.emitter.emit(Instr::Goto(join));
        self.emitter.emit(Instr::PlaceLabel(next));

        if self.at(&TokenKind::Elsif) {
            self.advance()?;
            self.parse_if_branch(join)?;
        } else if self.at(&TokenKind::Else) {
            self.advance()?;
            self.parse_statements()?;
        }
        Ok(())
    }

    fn parse_get(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Get)?;
        let pos = self.pos();
        let name = self.expect_id()?;
        let prop = self.lookup(&name, pos)?;
        if prop.val_type.is_callable() {
            return Err(CompileError::new(ErrorKind::NotAVariable(name), pos));
        }
        if self.at(&TokenKind::LBracket) {
            if !prop.val_type.is_array() {
                return Err(CompileError::new(ErrorKind::NotAnArray(name), pos));
            }
            self.advance()?;
            self.emitter.emit(Instr::ALoad(prop.offset));
            let idx_pos = self.pos();
            let idx_ty = self.parse_simple()?;
            self.require_scalar_integer(&idx_ty, idx_pos)?;
            self.expect(TokenKind::RBracket)?;
            self.emit_read(prop.val_type.base);
            self.emitter.emit(Instr::IAStore);
        } else {
            if prop.val_type.is_array() {
                return Err(CompileError::new(ErrorKind::ScalarExpected, pos));
            }
            self.emit_read(prop.val_type.base);
            self.emitter.emit(Instr::IStore(prop.offset));
        }
        Ok(())
    }

    fn emit_read(&mut self, base: BaseType) {
        match base {
            BaseType::Boolean => self.emitter.emit(Instr::ReadBool),
            _ => self.emitter.emit(Instr::ReadInt),
        }
    }

    fn parse_leave(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Leave)?;
        let expr_pos = self.pos();
        if self.starts_expr() {
            let ty = self.parse_expr()?;
            match self.return_type {
                Some(rt) => {
                    if ty != rt {
                        return Err(CompileError::new(
                            ErrorKind::IncompatibleTypes {
                                expected: rt.to_string(),
                                found: ty.to_string(),
                            },
                            expr_pos,
                        ));
                    }
                    self.has_leave_value = true;
                    if rt.is_array() {
                        self.emitter.emit(Instr::AReturn);
                    } else {
                        self.emitter.emit(Instr::IReturn);
                    }
                }
                None => {
                    return Err(CompileError::new(
                        ErrorKind::IncompatibleTypes {
                            expected: "no value (inside a procedure)".to_string(),
                            found: ty.to_string(),
                        },
                        expr_pos,
                    ));
                }
            }
        } else {
            match self.return_type {
                Some(rt) => {
                    return Err(CompileError::new(
                        ErrorKind::IncompatibleTypes {
                            expected: rt.to_string(),
                            found: "no value".to_string(),
                        },
                        expr_pos,
                    ));
                }
                None => self.emitter.emit(Instr::Return),
            }
        }
        Ok(())
    }

    fn parse_put(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::Put)?;
        self.parse_put_operand()?;
        while self.at(&TokenKind::Concatenate) {
            self.advance()?;
            self.parse_put_operand()?;
        }
        Ok(())
    }

    fn parse_put_operand(&mut self) -> Result<(), CompileError> {
        if let TokenKind::Str(s) = self.lookahead.kind.clone() {
            self.advance()?;
            let idx = self.emitter.intern_string(&s);
            self.emitter.emit(Instr::PrintStr(idx));
            return Ok(());
        }
        let pos = self.pos();
        let ty = self.parse_expr()?;
        if ty.is_array() || ty.is_callable() {
            return Err(CompileError::new(ErrorKind::ScalarExpected, pos));
        }
        match ty.base {
            BaseType::Boolean => self.emitter.emit(Instr::PrintBool),
            _ => self.emitter.emit(Instr::PrintInt),
        }
        Ok(())
    }

    fn parse_while(&mut self) -> Result<(), CompileError> {
        self.expect(TokenKind::While)?;
        let head = self.emitter.fresh_label();
        let exit = self.emitter.fresh_label();
        self.emitter.emit(Instr::PlaceLabel(head));
        let cond_pos = self.pos();
        let cond_ty = self.parse_expr()?;
        self.require_boolean(&cond_ty, cond_pos)?;
        self.emitter.emit(Instr::LdcInt(0));
        self.emitter.emit(Instr::IfICmp(CmpOp::Eq, exit));
        self.expect(TokenKind::Do)?;
        self.parse_statements()?;
        self.emitter.emit(Instr::Goto(head));
        self.emitter.emit(Instr::PlaceLabel(exit));
        self.expect(TokenKind::End)
    }

    // --- expressions -----------------------------------------------------

    fn parse_expr(&mut self) -> Result<ValType, CompileError> {
        let pos = self.pos();
        let left = self.parse_simple()?;
        let op = match self.peek_relop() {
            Some(op) => op,
            None => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_simple()?;
        let cmp = self.check_relop(op, &left, &right, pos)?;

        let ltrue = self.emitter.fresh_label();
        let lend = self.emitter.fresh_label();
        self.emitter.emit(Instr::IfICmp(cmp, ltrue));
        self.emitter.emit(Instr::LdcInt(0));
        self.emitter.emit(Instr::Goto(lend));
        self.emitter.emit(Instr::PlaceLabel(ltrue));
        self.emitter.emit(Instr::LdcInt(1));
        self.emitter.emit(Instr::PlaceLabel(lend));
        Ok(ValType::scalar(BaseType::Boolean))
    }

    fn parse_simple(&mut self) -> Result<ValType, CompileError> {
        let neg_pos = self.pos();
        let negate = self.at(&TokenKind::Minus);
        if negate {
            self.advance()?;
        }
        let mut ty = self.parse_term()?;
        if negate {
            self.require_scalar_integer(&ty, neg_pos)?;
            self.emitter.emit(Instr::INeg);
        }
        loop {
            let op = match self.peek_addop() {
                Some(op) => op,
                None => break,
            };
            let op_pos = self.pos();
            self.advance()?;
            let rhs = self.parse_term()?;
            ty = self.check_addop(op, &ty, &rhs, op_pos)?;
            self.emit_addop(op);
        }
        Ok(ty)
    }

    fn parse_term(&mut self) -> Result<ValType, CompileError> {
        let mut ty = self.parse_factor()?;
        loop {
            let op = match self.peek_mulop() {
                Some(op) => op,
                None => break,
            };
            let op_pos = self.pos();
            self.advance()?;
            let rhs = self.parse_factor()?;
            ty = self.check_mulop(op, &ty, &rhs, op_pos)?;
            self.emit_mulop(op);
        }
        Ok(ty)
    }

    fn parse_factor(&mut self) -> Result<ValType, CompileError> {
        let pos = self.pos();
        match self.lookahead.kind.clone() {
            TokenKind::Number(n) => {
                self.advance()?;
                self.emitter.emit(Instr::LdcInt(n));
                Ok(ValType::scalar(BaseType::Integer))
            }
            TokenKind::True => {
                self.advance()?;
                self.emitter.emit(Instr::LdcInt(1));
                Ok(ValType::scalar(BaseType::Boolean))
            }
            TokenKind::False => {
                self.advance()?;
                self.emitter.emit(Instr::LdcInt(0));
                Ok(ValType::scalar(BaseType::Boolean))
            }
            TokenKind::Not => {
                self.advance()?;
                let inner_pos = self.pos();
                // 1 - x flips a 0/1 boolean; pushing the constant first keeps
                // the operand order right for `isub`.
                self.emitter.emit(Instr::LdcInt(1));
                let ty = self.parse_factor()?;
                self.require_boolean(&ty, inner_pos)?;
                self.emitter.emit(Instr::ISub);
                Ok(ValType::scalar(BaseType::Boolean))
            }
            TokenKind::LParen => {
                self.advance()?;
                let ty = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(ty)
            }
            TokenKind::Id(_) => self.parse_id_factor(pos),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_id_factor(&mut self, pos: Position) -> Result<ValType, CompileError> {
        let name = self.expect_id()?;
        let prop = self.lookup(&name, pos)?;

        if self.at(&TokenKind::LBracket) {
            self.advance()?;
            if !prop.val_type.is_array() {
                return Err(CompileError::new(ErrorKind::NotAnArray(name), pos));
            }
            self.emitter.emit(Instr::ALoad(prop.offset));
            let idx_pos = self.pos();
            let idx_ty = self.parse_simple()?;
            self.require_scalar_integer(&idx_ty, idx_pos)?;
            self.expect(TokenKind::RBracket)?;
            self.emitter.emit(Instr::IALoad);
            Ok(prop.val_type.element_type())
        } else if self.at(&TokenKind::LParen) {
            if !prop.val_type.is_function() {
                return Err(CompileError::new(ErrorKind::NotAFunction(name), pos));
            }
            self.advance()?;
            self.parse_call_args(&prop, pos)?;
            self.expect(TokenKind::RParen)?;
            self.emitter.emit(Instr::InvokeStatic(self.call_descriptor(&name, &prop)));
            Ok(prop.val_type.as_value())
        } else {
            if prop.val_type.is_callable() {
                return Err(CompileError::new(ErrorKind::NotAVariable(name), pos));
            }
            if prop.val_type.is_array() {
                self.emitter.emit(Instr::ALoad(prop.offset));
            } else {
                self.emitter.emit(Instr::ILoad(prop.offset));
            }
            Ok(prop.val_type)
        }
    }

    fn parse_call_args(&mut self, expected: &IdProp, call_pos: Position) -> Result<(), CompileError> {
        let mut args: Vec<(ValType, Position)> = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                let arg_pos = self.pos();
                let ty = self.parse_expr()?;
                args.push((ty, arg_pos));
                if self.at(&TokenKind::Comma) {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        if args.len() < expected.param_types.len() {
            return Err(CompileError::new(ErrorKind::TooFewArguments, call_pos));
        }
        if args.len() > expected.param_types.len() {
            return Err(CompileError::new(ErrorKind::TooManyArguments, call_pos));
        }
        for ((ty, pos), param_ty) in args.iter().zip(expected.param_types.iter()) {
            if ty != param_ty {
                return Err(CompileError::new(
                    ErrorKind::IncompatibleTypes {
                        expected: param_ty.to_string(),
                        found: ty.to_string(),
                    },
                    *pos,
                ));
            }
        }
        Ok(())
    }

    fn call_descriptor(&self, name: &str, prop: &IdProp) -> String {
        let params: String = prop
            .param_types
            .iter()
            .map(|vt| type_descriptor(vt.base, vt.is_array))
            .collect();
        let ret = if prop.val_type.is_procedure() {
            "V".to_string()
        } else {
            type_descriptor(prop.val_type.base, prop.val_type.is_array)
        };
        format!("{}/{}({}){}", self.emitter.class_name(), name, params, ret)
    }

    // --- operator tables ---------------------------------------------------

    fn peek_addop(&self) -> Option<AddOp> {
        match self.lookahead.kind {
            TokenKind::Plus => Some(AddOp::Add),
            TokenKind::Minus => Some(AddOp::Sub),
            TokenKind::Or => Some(AddOp::Or),
            _ => None,
        }
    }

    fn check_addop(&self, op: AddOp, lhs: &ValType, rhs: &ValType, pos: Position) -> Result<ValType, CompileError> {
        match op {
            AddOp::Or => {
                self.require_boolean(lhs, pos)?;
                self.require_boolean(rhs, pos)?;
                Ok(ValType::scalar(BaseType::Boolean))
            }
            AddOp::Add | AddOp::Sub => {
                self.require_scalar_integer(lhs, pos)?;
                self.require_scalar_integer(rhs, pos)?;
                Ok(ValType::scalar(BaseType::Integer))
            }
        }
    }

    fn emit_addop(&mut self, op: AddOp) {
        self.emitter.emit(match op {
            AddOp::Add => Instr::IAdd,
            AddOp::Sub => Instr::ISub,
            AddOp::Or => Instr::IOr,
        });
    }

    fn peek_mulop(&self) -> Option<MulOp> {
        match self.lookahead.kind {
            TokenKind::Star => Some(MulOp::Mul),
            TokenKind::Slash => Some(MulOp::Div),
            TokenKind::Rem => Some(MulOp::Rem),
            TokenKind::And => Some(MulOp::And),
            _ => None,
        }
    }

    fn check_mulop(&self, op: MulOp, lhs: &ValType, rhs: &ValType, pos: Position) -> Result<ValType, CompileError> {
        match op {
            MulOp::And => {
                self.require_boolean(lhs, pos)?;
                self.require_boolean(rhs, pos)?;
                Ok(ValType::scalar(BaseType::Boolean))
            }
            MulOp::Mul | MulOp::Div | MulOp::Rem => {
                self.require_scalar_integer(lhs, pos)?;
                self.require_scalar_integer(rhs, pos)?;
                Ok(ValType::scalar(BaseType::Integer))
            }
        }
    }

    fn emit_mulop(&mut self, op: MulOp) {
        self.emitter.emit(match op {
            MulOp::Mul => Instr::IMul,
            MulOp::Div => Instr::IDiv,
            MulOp::Rem => Instr::IRem,
            MulOp::And => Instr::IAnd,
        });
    }

    fn peek_relop(&self) -> Option<RelOp> {
        match self.lookahead.kind {
            TokenKind::Eq => Some(RelOp::Eq),
            TokenKind::Ne => Some(RelOp::Ne),
            TokenKind::Lt => Some(RelOp::Lt),
            TokenKind::Le => Some(RelOp::Le),
            TokenKind::Gt => Some(RelOp::Gt),
            TokenKind::Ge => Some(RelOp::Ge),
            _ => None,
        }
    }

    fn check_relop(&self, op: RelOp, lhs: &ValType, rhs: &ValType, pos: Position) -> Result<CmpOp, CompileError> {
        match op {
            RelOp::Eq | RelOp::Ne => {
                if lhs.is_scalar() && rhs.is_scalar() && lhs.base == rhs.base {
                    Ok(if matches!(op, RelOp::Eq) { CmpOp::Eq } else { CmpOp::Ne })
                } else {
                    Err(CompileError::new(
                        ErrorKind::IncompatibleTypes {
                            expected: lhs.to_string(),
                            found: rhs.to_string(),
                        },
                        pos,
                    ))
                }
            }
            RelOp::Lt | RelOp::Le | RelOp::Gt | RelOp::Ge => {
                self.require_scalar_integer(lhs, pos)?;
                self.require_scalar_integer(rhs, pos)?;
                Ok(match op {
                    RelOp::Lt => CmpOp::Lt,
                    RelOp::Le => CmpOp::Le,
                    RelOp::Gt => CmpOp::Gt,
                    RelOp::Ge => CmpOp::Ge,
                    RelOp::Eq | RelOp::Ne => unreachable!(),
                })
            }
        }
    }
}
