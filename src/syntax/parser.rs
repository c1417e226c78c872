//! Recursive-descent parser for the configuration dialect.
//!
//! Consumes the layout-resolved token stream from [`super::lexer`] and
//! produces a [`Module`]. Operator precedence, lowest to highest:
//! lambda, conditional, `or`, `and`, `not`, comparisons (including `in` and
//! `not in`), `|`, `^`, `&`, shifts, `+ -`, `* / // %`, unary, `**`,
//! then calls, attributes and subscripts.

use super::ast::*;
use super::lexer::{tokenize, Spanned, Token};
use super::LineIndex;
use crate::error::SyntaxError;

type PResult<T> = Result<T, SyntaxError>;

/// Deepest bracket, operator or block nesting accepted. Parsing recurses
/// once per level, so untrusted input must not be allowed to exhaust the
/// stack.
const MAX_NESTING: usize = 64;

/// Parse `source` into a module. `source_name` only labels diagnostics.
pub fn parse(source: &str, source_name: &str) -> PResult<Module> {
    let index = LineIndex::new(source);
    let tokens = tokenize(source).map_err(|e| index.error(source_name, e.offset, e.message))?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        index: &index,
        source_name,
        depth: 0,
    };
    parser.parse_module()
}

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    index: &'a LineIndex,
    source_name: &'a str,
    depth: usize,
}

impl<'a> Parser<'a> {
    // -- Token cursor ---------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).map_or(&Token::Eof, |s| &s.token)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> PResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_string(&mut self) -> PResult<String> {
        match self.peek().clone() {
            Token::Str(value) => {
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("string literal")),
        }
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].span.start
    }

    fn line(&self) -> usize {
        self.index.line_col(self.offset()).0
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        self.index.error(self.source_name, offset, message)
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        self.error_at(
            self.offset(),
            format!("expected {}, found {}", expected, describe(self.peek())),
        )
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_at(self.offset(), "expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // -- Statements -----------------------------------------------------------

    fn parse_module(&mut self) -> PResult<Module> {
        let mut statements = Vec::new();
        while !self.at(&Token::Eof) {
            self.parse_statement(&mut statements)?;
        }
        Ok(Module { statements })
    }

    /// Parse one statement line. Simple statements joined by `;` push several.
    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> PResult<()> {
        match self.peek() {
            Token::Def => out.push(self.parse_def()?),
            Token::If => out.push(self.parse_if()?),
            Token::For => out.push(self.parse_for()?),
            Token::Indent => return Err(self.error_at(self.offset(), "unexpected indent")),
            _ => self.parse_simple_statements(out)?,
        }
        Ok(())
    }

    fn parse_simple_statements(&mut self, out: &mut Vec<Stmt>) -> PResult<()> {
        loop {
            out.push(self.parse_small_statement()?);
            if !self.eat(&Token::Semicolon) || self.at(&Token::Newline) {
                break;
            }
        }
        self.expect(&Token::Newline, "end of line")
    }

    fn parse_small_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();
        let kind = match self.peek() {
            Token::Pass => {
                self.advance();
                StmtKind::Pass
            }
            Token::Break => {
                self.advance();
                StmtKind::Break
            }
            Token::Continue => {
                self.advance();
                StmtKind::Continue
            }
            Token::Return => {
                self.advance();
                if matches!(self.peek(), Token::Newline | Token::Semicolon) {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expression()?))
                }
            }
            Token::Load => self.parse_load()?,
            _ => {
                let start = self.offset();
                let expr = self.parse_expression()?;
                match self.assign_op() {
                    Some(op) => {
                        if !is_assignable(&expr, op.is_none()) {
                            return Err(self.error_at(start, "cannot assign to this expression"));
                        }
                        let value = self.parse_expression()?;
                        StmtKind::Assign {
                            target: expr,
                            op,
                            value,
                        }
                    }
                    None => StmtKind::Expr(expr),
                }
            }
        };
        Ok(Stmt { kind, line })
    }

    /// Consume an assignment operator: `Some(None)` for `=`,
    /// `Some(Some(op))` for an augmented form.
    fn assign_op(&mut self) -> Option<Option<BinOp>> {
        let op = match self.peek() {
            Token::Assign => None,
            Token::PlusAssign => Some(BinOp::Add),
            Token::MinusAssign => Some(BinOp::Sub),
            Token::StarAssign => Some(BinOp::Mul),
            Token::SlashAssign => Some(BinOp::Div),
            Token::SlashSlashAssign => Some(BinOp::FloorDiv),
            Token::PercentAssign => Some(BinOp::Mod),
            Token::AmpAssign => Some(BinOp::BitAnd),
            Token::PipeAssign => Some(BinOp::BitOr),
            Token::CaretAssign => Some(BinOp::BitXor),
            Token::ShlAssign => Some(BinOp::Shl),
            Token::ShrAssign => Some(BinOp::Shr),
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_load(&mut self) -> PResult<StmtKind> {
        self.advance();
        self.expect(&Token::LParen, "'('")?;
        let module = self.expect_string()?;
        let mut symbols = Vec::new();
        while self.eat(&Token::Comma) {
            match self.peek().clone() {
                Token::RParen => break,
                Token::Str(name) => {
                    self.advance();
                    symbols.push((name.clone(), name));
                }
                Token::Ident(local) => {
                    self.advance();
                    self.expect(&Token::Assign, "'='")?;
                    let exported = self.expect_string()?;
                    symbols.push((local, exported));
                }
                _ => return Err(self.unexpected("symbol to load")),
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(StmtKind::Load { module, symbols })
    }

    fn parse_def(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let name = self.expect_ident()?;
        self.expect(&Token::LParen, "'('")?;
        let params = self.parse_params(&Token::RParen)?;
        self.expect(&Token::RParen, "')'")?;
        if self.eat(&Token::Arrow) {
            self.parse_test()?;
        }
        self.expect(&Token::Colon, "':'")?;
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::Def(Def { name, params, body }),
            line,
        })
    }

    fn parse_params(&mut self, closer: &Token) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        while !self.at(closer) {
            if self.eat(&Token::StarStar) {
                params.push(Param::Kwargs(self.expect_ident()?));
            } else if self.eat(&Token::Star) {
                let name = match self.peek() {
                    Token::Ident(_) => Some(self.expect_ident()?),
                    _ => None,
                };
                params.push(Param::Args(name));
            } else {
                let name = self.expect_ident()?;
                let default = if self.eat(&Token::Assign) {
                    Some(self.parse_test()?)
                } else {
                    None
                };
                params.push(Param::Named { name, default });
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    /// Either an indented block or simple statements on the same line.
    fn parse_suite(&mut self) -> PResult<Vec<Stmt>> {
        self.nested(Self::parse_suite_body)
    }

    fn parse_suite_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut body = Vec::new();
        if self.eat(&Token::Newline) {
            if !self.eat(&Token::Indent) {
                return Err(self.unexpected("an indented block"));
            }
            while !self.eat(&Token::Dedent) {
                if self.at(&Token::Eof) {
                    return Err(self.unexpected("end of block"));
                }
                self.parse_statement(&mut body)?;
            }
        } else {
            self.parse_simple_statements(&mut body)?;
        }
        Ok(body)
    }

    /// Parses `if` and, recursively, each `elif` as a nested `if`.
    fn parse_if(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let cond = self.parse_test()?;
        self.expect(&Token::Colon, "':'")?;
        let then = self.parse_suite()?;
        let orelse = if self.at(&Token::Elif) {
            vec![self.parse_if()?]
        } else if self.eat(&Token::Else) {
            self.expect(&Token::Colon, "':'")?;
            self.parse_suite()?
        } else {
            Vec::new()
        };
        Ok(Stmt {
            kind: StmtKind::If { cond, then, orelse },
            line,
        })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let line = self.line();
        self.advance();
        let target = self.parse_loop_target()?;
        self.expect(&Token::In, "'in'")?;
        let iter = self.parse_expression()?;
        self.expect(&Token::Colon, "':'")?;
        let body = self.parse_suite()?;
        Ok(Stmt {
            kind: StmtKind::For { target, iter, body },
            line,
        })
    }

    fn parse_loop_target(&mut self) -> PResult<Expr> {
        let first = self.parse_bitor()?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.at(&Token::In) {
                break;
            }
            items.push(self.parse_bitor()?);
        }
        Ok(Expr::Tuple(items))
    }

    // -- Expressions ----------------------------------------------------------

    /// A test, or a bare tuple of tests separated by commas.
    fn parse_expression(&mut self) -> PResult<Expr> {
        let first = self.parse_test()?;
        if !self.at(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if !starts_expression(self.peek()) {
                break;
            }
            items.push(self.parse_test()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_test(&mut self) -> PResult<Expr> {
        self.nested(Self::parse_test_body)
    }

    fn parse_test_body(&mut self) -> PResult<Expr> {
        if self.at(&Token::Lambda) {
            return self.parse_lambda();
        }
        let then = self.parse_or()?;
        if !self.eat(&Token::If) {
            return Ok(then);
        }
        let cond = self.parse_or()?;
        self.expect(&Token::Else, "'else'")?;
        let orelse = self.parse_test()?;
        Ok(Expr::Cond {
            then: Box::new(then),
            cond: Box::new(cond),
            orelse: Box::new(orelse),
        })
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        self.advance();
        let params = self.parse_params(&Token::Colon)?;
        self.expect(&Token::Colon, "':'")?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn parse_binary(
        &mut self,
        next: fn(&mut Self) -> PResult<Expr>,
        op_of: fn(&Token) -> Option<BinOp>,
    ) -> PResult<Expr> {
        let mut lhs = next(self)?;
        while let Some(op) = op_of(self.peek()) {
            self.advance();
            let rhs = next(self)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_and, |t| (*t == Token::Or).then_some(BinOp::Or))
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_not, |t| (*t == Token::And).then_some(BinOp::And))
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.eat(&Token::Not) {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitor()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinOp::Eq,
                Token::NotEq => BinOp::NotEq,
                Token::Lt => BinOp::Lt,
                Token::Gt => BinOp::Gt,
                Token::LtEq => BinOp::LtEq,
                Token::GtEq => BinOp::GtEq,
                Token::In => BinOp::In,
                Token::Not if *self.peek_at(1) == Token::In => {
                    self.advance();
                    BinOp::NotIn
                }
                _ => break,
            };
            self.advance();
            let rhs = self.parse_bitor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_bitxor, |t| (*t == Token::Pipe).then_some(BinOp::BitOr))
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_bitand, |t| (*t == Token::Caret).then_some(BinOp::BitXor))
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_shift, |t| (*t == Token::Amp).then_some(BinOp::BitAnd))
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_arith, |t| match t {
            Token::Shl => Some(BinOp::Shl),
            Token::Shr => Some(BinOp::Shr),
            _ => None,
        })
    }

    fn parse_arith(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_term, |t| match t {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        self.parse_binary(Self::parse_factor, |t| match t {
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::SlashSlash => Some(BinOp::FloorDiv),
            Token::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            Token::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.nested(Self::parse_factor)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        let base = self.parse_primary()?;
        if !self.eat(&Token::StarStar) {
            return Ok(base);
        }
        let exponent = self.nested(Self::parse_factor)?;
        Ok(Expr::Binary {
            op: BinOp::Pow,
            lhs: Box::new(base),
            rhs: Box::new(exponent),
        })
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_operand()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    expr = Expr::Attr {
                        object: Box::new(expr),
                        name,
                    };
                }
                Token::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(&Token::RParen, "')'")?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                Token::LBracket => {
                    self.advance();
                    expr = self.parse_subscript(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.at(&Token::RParen) {
            let arg = if self.eat(&Token::StarStar) {
                Arg::StarStar(self.parse_test()?)
            } else if self.eat(&Token::Star) {
                Arg::Star(self.parse_test()?)
            } else if matches!(self.peek(), Token::Ident(_)) && *self.peek_at(1) == Token::Assign {
                let name = self.expect_ident()?;
                self.advance();
                Arg::Keyword(name, self.parse_test()?)
            } else {
                Arg::Positional(self.parse_test()?)
            };
            args.push(arg);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(args)
    }

    /// Called after `[`: an index or a `start:stop:step` slice.
    fn parse_subscript(&mut self, object: Expr) -> PResult<Expr> {
        let start = if self.at(&Token::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        if let Some(index) = start.clone() {
            if !self.at(&Token::Colon) {
                self.expect(&Token::RBracket, "']'")?;
                return Ok(Expr::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                });
            }
        }
        self.expect(&Token::Colon, "':'")?;
        let stop = if matches!(self.peek(), Token::Colon | Token::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_test()?))
        };
        let step = if self.eat(&Token::Colon) && !self.at(&Token::RBracket) {
            Some(Box::new(self.parse_test()?))
        } else {
            None
        };
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::Slice {
            object: Box::new(object),
            start: start.map(Box::new),
            stop,
            step,
        })
    }

    fn parse_operand(&mut self) -> PResult<Expr> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            Token::Int(value) => {
                self.advance();
                Ok(Expr::Int(value))
            }
            Token::Float(value) => {
                self.advance();
                Ok(Expr::Float(value))
            }
            Token::Str(first) => {
                self.advance();
                let mut value = first;
                while let Token::Str(next) = self.peek() {
                    value.push_str(next);
                    self.advance();
                }
                Ok(Expr::Str(value))
            }
            Token::LParen => {
                self.advance();
                self.parse_parenthesized()
            }
            Token::LBracket => {
                self.advance();
                self.parse_list()
            }
            Token::LBrace => {
                self.advance();
                self.parse_dict()
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_parenthesized(&mut self) -> PResult<Expr> {
        if self.eat(&Token::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_test()?;
        if self.at(&Token::For) {
            let clauses = self.parse_clauses()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(Expr::Comprehension(Box::new(Comprehension {
                kind: ComprehensionKind::List(first),
                clauses,
            })));
        }
        if !self.at(&Token::Comma) {
            self.expect(&Token::RParen, "')'")?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.at(&Token::RParen) {
                break;
            }
            items.push(self.parse_test()?);
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(Expr::Tuple(items))
    }

    fn parse_list(&mut self) -> PResult<Expr> {
        if self.eat(&Token::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_test()?;
        if self.at(&Token::For) {
            let clauses = self.parse_clauses()?;
            self.expect(&Token::RBracket, "']'")?;
            return Ok(Expr::Comprehension(Box::new(Comprehension {
                kind: ComprehensionKind::List(first),
                clauses,
            })));
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if self.at(&Token::RBracket) {
                break;
            }
            items.push(self.parse_test()?);
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::List(items))
    }

    fn parse_dict(&mut self) -> PResult<Expr> {
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }
        let key = self.parse_test()?;
        self.expect(&Token::Colon, "':'")?;
        let value = self.parse_test()?;
        if self.at(&Token::For) {
            let clauses = self.parse_clauses()?;
            self.expect(&Token::RBrace, "'}'")?;
            return Ok(Expr::Comprehension(Box::new(Comprehension {
                kind: ComprehensionKind::Dict(key, value),
                clauses,
            })));
        }
        let mut entries = vec![(key, value)];
        while self.eat(&Token::Comma) {
            if self.at(&Token::RBrace) {
                break;
            }
            let key = self.parse_test()?;
            self.expect(&Token::Colon, "':'")?;
            let value = self.parse_test()?;
            entries.push((key, value));
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Expr::Dict(entries))
    }

    fn parse_clauses(&mut self) -> PResult<Vec<Clause>> {
        let mut clauses = Vec::new();
        loop {
            if self.eat(&Token::For) {
                let target = self.parse_loop_target()?;
                self.expect(&Token::In, "'in'")?;
                let iter = self.parse_or()?;
                clauses.push(Clause::For { target, iter });
            } else if self.eat(&Token::If) {
                clauses.push(Clause::If(self.parse_or()?));
            } else {
                break;
            }
        }
        Ok(clauses)
    }
}

fn starts_expression(token: &Token) -> bool {
    matches!(
        token,
        Token::Ident(_)
            | Token::Int(_)
            | Token::Float(_)
            | Token::Str(_)
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
            | Token::Minus
            | Token::Plus
            | Token::Tilde
            | Token::Not
            | Token::Lambda
    )
}

/// Plain assignment accepts names, attributes, subscripts and (nested)
/// tuples or lists of those; augmented assignment excludes the sequences.
fn is_assignable(expr: &Expr, allow_sequence: bool) -> bool {
    match expr {
        Expr::Ident(_) | Expr::Attr { .. } | Expr::Index { .. } => true,
        Expr::Tuple(items) | Expr::List(items) if allow_sequence => {
            !items.is_empty() && items.iter().all(|e| is_assignable(e, true))
        }
        _ => false,
    }
}

fn describe(token: &Token) -> String {
    let text = match token {
        Token::Newline => "end of line",
        Token::Indent => "indent",
        Token::Dedent => "dedent",
        Token::Eof => "end of file",
        Token::Ident(name) => return format!("identifier '{}'", name),
        Token::Int(_) | Token::Float(_) => "number",
        Token::Str(_) => "string literal",
        Token::And => "'and'",
        Token::Break => "'break'",
        Token::Continue => "'continue'",
        Token::Def => "'def'",
        Token::Elif => "'elif'",
        Token::Else => "'else'",
        Token::For => "'for'",
        Token::If => "'if'",
        Token::In => "'in'",
        Token::Lambda => "'lambda'",
        Token::Load => "'load'",
        Token::Not => "'not'",
        Token::Or => "'or'",
        Token::Pass => "'pass'",
        Token::Return => "'return'",
        Token::LParen => "'('",
        Token::RParen => "')'",
        Token::LBracket => "'['",
        Token::RBracket => "']'",
        Token::LBrace => "'{'",
        Token::RBrace => "'}'",
        Token::Comma => "','",
        Token::Colon => "':'",
        Token::Semicolon => "';'",
        Token::Dot => "'.'",
        Token::Arrow => "'->'",
        Token::Assign => "'='",
        _ => "operator",
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Vec<Stmt> {
        parse(source, "test.bzl").unwrap().statements
    }

    #[test]
    fn assignment_then_docstring() {
        let stmts = parse_ok("foo = rule(implementation = _impl)\n\"\"\"Doc.\"\"\"\n");
        assert_eq!(stmts.len(), 2);
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Assign { target: Expr::Ident(name), op: None, .. } if name == "foo"
        ));
        assert_eq!(stmts[1].kind, StmtKind::Expr(Expr::Str("Doc.".into())));
        assert_eq!(stmts[1].line, 2);
    }

    #[test]
    fn keyword_arguments_and_nested_calls() {
        let stmts = parse_ok("x = attr.string(default = \"a\", mandatory = True)\n");
        let StmtKind::Assign { value, .. } = &stmts[0].kind else {
            panic!("expected assignment");
        };
        let Expr::Call { func, args } = value else {
            panic!("expected call");
        };
        assert_eq!(
            **func,
            Expr::Attr {
                object: Box::new(Expr::Ident("attr".into())),
                name: "string".into()
            }
        );
        assert_eq!(args.len(), 2);
        assert_eq!(args[1], Arg::Keyword("mandatory".into(), Expr::Ident("True".into())));
    }

    #[test]
    fn def_with_defaults_and_docstring() {
        let stmts = parse_ok(
            "def my_macro(name, foo, visibility = None, *args, **kwargs):\n  \"\"\"Doc.\"\"\"\n  native.genrule(name = name)\n",
        );
        let StmtKind::Def(def) = &stmts[0].kind else {
            panic!("expected def");
        };
        assert_eq!(def.name, "my_macro");
        assert_eq!(def.params.len(), 5);
        assert_eq!(def.params[2], Param::Named { name: "visibility".into(), default: Some(Expr::Ident("None".into())) });
        assert_eq!(def.params[3], Param::Args(Some("args".into())));
        assert_eq!(def.params[4], Param::Kwargs("kwargs".into()));
        assert_eq!(def.docstring(), Some("Doc."));
        assert_eq!(def.body.len(), 2);
    }

    #[test]
    fn if_elif_else_nests() {
        let stmts = parse_ok("if a:\n  x = 1\nelif b:\n  x = 2\nelse:\n  x = 3\n");
        let StmtKind::If { orelse, .. } = &stmts[0].kind else {
            panic!("expected if");
        };
        assert!(matches!(&orelse[0].kind, StmtKind::If { orelse, .. } if orelse.len() == 1));
    }

    #[test]
    fn load_statement() {
        let stmts = parse_ok("load(\"//foo:bar.bzl\", \"a\", b = \"c\")\n");
        assert_eq!(
            stmts[0].kind,
            StmtKind::Load {
                module: "//foo:bar.bzl".into(),
                symbols: vec![("a".into(), "a".into()), ("b".into(), "c".into())],
            }
        );
    }

    #[test]
    fn precedence_of_arithmetic_and_comparison() {
        let stmts = parse_ok("x = 1 + 2 * 3 == 7 and not y\n");
        let StmtKind::Assign { value, .. } = &stmts[0].kind else {
            panic!("expected assignment");
        };
        let Expr::Binary { op: BinOp::And, lhs, .. } = value else {
            panic!("expected 'and' at the top, got {:?}", value);
        };
        assert!(matches!(**lhs, Expr::Binary { op: BinOp::Eq, .. }));
    }

    #[test]
    fn comprehensions_slices_and_conditionals() {
        let stmts = parse_ok(
            "a = [x for x in y if x]\nb = {k: v for k, v in d.items()}\nc = s[1:]\nd = 1 if t else 2\ne = x not in y\n",
        );
        assert_eq!(stmts.len(), 5);
        assert!(matches!(&stmts[2].kind, StmtKind::Assign { value: Expr::Slice { stop: None, .. }, .. }));
        assert!(matches!(&stmts[3].kind, StmtKind::Assign { value: Expr::Cond { .. }, .. }));
        assert!(matches!(&stmts[4].kind, StmtKind::Assign { value: Expr::Binary { op: BinOp::NotIn, .. }, .. }));
    }

    #[test]
    fn adjacent_strings_concatenate() {
        let stmts = parse_ok("\"a\" \"b\"\n");
        assert_eq!(stmts[0].kind, StmtKind::Expr(Expr::Str("ab".into())));
    }

    #[test]
    fn tuple_targets_and_augmented_assignment() {
        let stmts = parse_ok("a, b = 1, 2\nc += [3]\nd[\"k\"] = 4\n");
        assert!(matches!(&stmts[0].kind, StmtKind::Assign { target: Expr::Tuple(t), .. } if t.len() == 2));
        assert!(matches!(&stmts[1].kind, StmtKind::Assign { op: Some(BinOp::Add), .. }));
        assert!(matches!(&stmts[2].kind, StmtKind::Assign { target: Expr::Index { .. }, .. }));
    }

    #[test]
    fn semicolons_split_statements() {
        assert_eq!(parse_ok("a = 1; b = 2\n").len(), 2);
    }

    #[test]
    fn reports_line_and_column() {
        let err = parse("x = 1\ny = (", "bad.bzl").unwrap_err();
        assert_eq!(err.source_name, "bad.bzl");
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected"), "{}", err.message);
    }

    #[test]
    fn rejects_assignment_to_call() {
        let err = parse("f() = 1\n", "bad.bzl").unwrap_err();
        assert_eq!(err.message, "cannot assign to this expression");
    }

    #[test]
    fn limits_nesting_depth() {
        let nested = |depth: usize| format!("x = {}1{}\n", "[".repeat(depth), "]".repeat(depth));
        assert!(parse(&nested(MAX_NESTING - 2), "ok.bzl").is_ok());
        let err = parse(&nested(5000), "deep.bzl").unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
        assert_eq!(err.line, 1);

        let negations = format!("x = {}1\n", "-".repeat(5000));
        let err = parse(&negations, "deep.bzl").unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn limits_block_nesting() {
        let mut source = String::new();
        for level in 0..200 {
            source.push_str(&" ".repeat(level));
            source.push_str("if x:\n");
        }
        source.push_str(&" ".repeat(200));
        source.push_str("pass\n");
        let err = parse(&source, "deep.bzl").unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn oversized_integer_literal_parses() {
        let stmts = parse_ok("MAX = 18446744073709551615\n");
        assert!(matches!(&stmts[0].kind, StmtKind::Assign { value: Expr::Int(None), .. }));
    }

    #[test]
    fn rejects_unexpected_indent() {
        let err = parse("  x = 1\n", "bad.bzl").unwrap_err();
        assert_eq!(err.message, "unexpected indent");
        assert_eq!((err.line, err.column), (1, 3));
    }
}
