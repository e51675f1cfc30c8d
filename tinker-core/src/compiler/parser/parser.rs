use super::super::lexer::scanner::{Scanner, TemplatePart, Token, TokenValue};
use super::super::lexer::token_kind::{TokenKind, PUNCTUATORS};
use super::error::{ParseResult, ParserError, ParserErrorKind};
use super::expr::{
    Argument, ArrayElement, AssignOp, Expr, ExprKind, Pattern, PatternElement, PatternProp,
    PropertyDef, PropertyKey, UnaryOp, UpdateOp,
};
use super::stmt::{
    CatchClause, Declarator, ForBinding, ForInit, FunctionBody, FunctionNode, InterfaceDecl, Param,
    Stmt, StmtKind, SwitchCase, TypeAliasDecl, VarDecl, VarKind,
};
use super::type_expr::{FunctionTypeParam, TypeExpr, TypeLiteral, TypeMember};
use super::utils::{get_associativity, get_precedence, infix_op, InfixOp, AS_PRECEDENCE};
use crate::kit::lexer::{SourcePosition, SourceSpan};
use crate::kit::number::number_key;
use crate::kit::stack;
use std::ops::Range;
use std::rc::Rc;
use tracing::debug;

/// Deepest syntax tree the parser builds: nested constructs plus operator
/// and member chains
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Which grammar the parser accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// Plain script
    Untyped,
    /// Script plus erasable type syntax
    Typed,
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
    /// Byte ranges holding type-only syntax, in the order they were parsed
    pub erasures: Vec<Range<usize>>,
    pub source: Rc<str>,
}

/// Parse a complete source text
pub fn parse_program(source: &str, syntax: Syntax) -> ParseResult<Program> {
    let source: Rc<str> = Rc::from(source);
    let tokens = Scanner::new(&source).scan_all()?;
    let mut parser = Parser::new(tokens, syntax, source.clone());
    let body = parser.parse()?;
    debug!(
        target: "tinker::parser",
        statements = body.len(),
        erasures = parser.erasures.len(),
        ?syntax,
        "parsed program"
    );
    Ok(Program {
        body,
        erasures: parser.erasures,
        source,
    })
}

#[derive(Clone, Copy)]
struct Snapshot {
    pos: usize,
    split: usize,
    last_end: usize,
    erasures: usize,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Characters of a compound `>` token already used as type-argument closers
    split: usize,
    /// End offset of the last consumed token
    last_end: usize,
    typed: bool,
    source: Rc<str>,
    erasures: Vec<Range<usize>>,
    function_depth: usize,
    loop_depth: usize,
    switch_depth: usize,
    /// Open nested constructs, bounded by `MAX_NESTING_DEPTH`
    nesting: usize,
    /// Inside a `for` header, where `in` is not a binary operator
    no_in: bool,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, syntax: Syntax, source: Rc<str>) -> Self {
        Self {
            tokens,
            pos: 0,
            split: 0,
            last_end: 0,
            typed: syntax == Syntax::Typed,
            source,
            erasures: Vec::new(),
            function_depth: 0,
            loop_depth: 0,
            switch_depth: 0,
            nesting: 0,
            no_in: false,
        }
    }

    /// Parse statements until end of input
    pub fn parse(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while !self.check(TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    /// Parse a single type and require end of input after it
    pub fn parse_type_only(&mut self) -> ParseResult<TypeExpr> {
        let ty = self.parse_type()?;
        if !self.check(TokenKind::Eof) {
            return Err(self.error_here(ParserErrorKind::Expected {
                expected: "end of file".to_string(),
                found: self.found_text(),
            }));
        }
        Ok(ty)
    }

    // ===== token access =====

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// Kind of the current token, accounting for a partially consumed `>>`
    fn kind(&self) -> TokenKind {
        let token = self.peek();
        if self.split == 0 {
            return token.kind;
        }
        let rest = &token.text[self.split..];
        PUNCTUATORS
            .iter()
            .find(|(text, _)| *text == rest)
            .map(|(_, kind)| *kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn check_word(&self, word: &str) -> bool {
        self.split == 0 && self.peek().is_word(word)
    }

    fn current_start(&self) -> SourcePosition {
        let mut start = self.peek().span.start;
        start.byte_offset += self.split;
        start.column += self.split;
        start
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        self.split = 0;
        self.last_end = token.span.end.byte_offset;
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let expected = kind.lexeme().map(str::to_string).unwrap_or_else(|| kind.to_string());
            Err(self.error_here(ParserErrorKind::Expected {
                expected,
                found: self.found_text(),
            }))
        }
    }

    fn found_text(&self) -> String {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            token.text[self.split..].to_string()
        }
    }

    fn error_here(&self, kind: ParserErrorKind) -> ParserError {
        let coordinate = self.current_start().coordinate();
        if self.peek().kind == TokenKind::Eof {
            ParserError::at_eof(kind, coordinate)
        } else {
            ParserError::at(kind, coordinate)
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            split: self.split,
            last_end: self.last_end,
            erasures: self.erasures.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.pos = snapshot.pos;
        self.split = snapshot.split;
        self.last_end = snapshot.last_end;
        self.erasures.truncate(snapshot.erasures);
    }

    /// Parse one nested construct with `f`
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(self.error_here(ParserErrorKind::NestingTooDeep));
        }
        self.nesting += 1;
        let result = stack::guarded(|| f(self));
        self.nesting -= 1;
        result
    }

    /// Reject left-deep chains (`a.b.c…`, `1 + 2 + 3…`) that would exceed the
    /// nesting limit
    fn check_chain(&self, links: usize) -> ParseResult<()> {
        if self.nesting + links > MAX_NESTING_DEPTH {
            return Err(self.error_here(ParserErrorKind::NestingTooDeep));
        }
        Ok(())
    }

    /// Run `f` speculatively; roll back unless it yields a value
    fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<Option<T>>) -> Option<T> {
        let snapshot = self.snapshot();
        match f(self) {
            Ok(Some(value)) => Some(value),
            _ => {
                self.restore(snapshot);
                None
            }
        }
    }

    fn span_from(&self, start: SourcePosition) -> SourceSpan {
        let mut end = start;
        // recover line/column of the end from the consumed token
        if self.pos > 0 {
            let prev = &self.tokens[self.pos - 1];
            if prev.span.end.byte_offset == self.last_end {
                end = prev.span.end;
            }
        }
        if end.byte_offset < self.last_end {
            end.byte_offset = self.last_end;
        }
        SourceSpan::range(start, end)
    }

    fn erase(&mut self, range: Range<usize>) {
        if !range.is_empty() {
            self.erasures.push(range);
        }
    }

    /// Statement terminator with automatic semicolon insertion
    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        if self.check(TokenKind::RightBrace) || self.check(TokenKind::Eof) || self.peek().newline_before {
            return Ok(());
        }
        Err(self.error_here(ParserErrorKind::Expected {
            expected: ";".to_string(),
            found: self.found_text(),
        }))
    }

    fn expect_identifier(&mut self) -> ParseResult<(Rc<str>, SourceSpan)> {
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            Ok((Rc::from(token.text.as_str()), token.span))
        } else if let Some(unsupported) = self.unsupported_keyword() {
            Err(self.error_here(ParserErrorKind::Unsupported(unsupported)))
        } else {
            Err(self.error_here(ParserErrorKind::IdentifierExpected {
                found: self.found_text(),
            }))
        }
    }

    /// Identifier or keyword used as a property name
    fn expect_property_name(&mut self) -> ParseResult<(Rc<str>, SourceSpan)> {
        let kind = self.kind();
        if kind == TokenKind::Identifier || kind.is_keyword() {
            let token = self.advance();
            Ok((Rc::from(token.text.as_str()), token.span))
        } else {
            Err(self.error_here(ParserErrorKind::IdentifierExpected {
                found: self.found_text(),
            }))
        }
    }

    fn unsupported_keyword(&self) -> Option<String> {
        let what = match self.kind() {
            TokenKind::Class | TokenKind::Extends | TokenKind::Super => "Classes",
            TokenKind::This => "'this' expressions",
            TokenKind::Async | TokenKind::Await => "Async functions",
            TokenKind::Yield => "Generators",
            TokenKind::Import | TokenKind::Export => "Modules",
            TokenKind::Enum => "Enums",
            _ => return None,
        };
        Some(what.to_string())
    }

    // ===== statements =====

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        match self.kind() {
            TokenKind::LeftBrace => {
                let body = self.parse_block()?;
                Ok(Stmt::new(StmtKind::Block(body), self.span_from(start)))
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_var_decl(false)?;
                self.consume_semicolon()?;
                Ok(Stmt::new(StmtKind::VarDecl(decl), self.span_from(start)))
            }
            TokenKind::Function => {
                let node = self.parse_function(true)?;
                Ok(Stmt::new(StmtKind::Function(node), self.span_from(start)))
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::new(StmtKind::Empty, self.span_from(start)))
            }
            TokenKind::Identifier
                if self.typed
                    && self.check_word("interface")
                    && self.peek_at(1).kind == TokenKind::Identifier
                    && !self.peek_at(1).newline_before =>
            {
                self.parse_interface()
            }
            TokenKind::Identifier
                if self.typed
                    && self.check_word("type")
                    && self.peek_at(1).kind == TokenKind::Identifier
                    && matches!(self.peek_at(2).kind, TokenKind::Equal | TokenKind::Less) =>
            {
                self.parse_type_alias()
            }
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::Colon => {
                Err(self.error_here(ParserErrorKind::Unsupported("Labels".to_string())))
            }
            TokenKind::Class
            | TokenKind::Import
            | TokenKind::Export
            | TokenKind::Enum
            | TokenKind::Async => {
                let what = self.unsupported_keyword().unwrap_or_default();
                Err(self.error_here(ParserErrorKind::Unsupported(what)))
            }
            TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightBracket => {
                Err(self.error_here(ParserErrorKind::StatementExpected {
                    found: self.found_text(),
                }))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::new(StmtKind::Expr(expr), self.span_from(start)))
            }
        }
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect(TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            if self.check(TokenKind::Eof) {
                return Err(self.error_here(ParserErrorKind::Expected {
                    expected: "}".to_string(),
                    found: self.found_text(),
                }));
            }
            body.push(self.parse_statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn var_kind(&mut self) -> ParseResult<VarKind> {
        let kind = match self.kind() {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            TokenKind::Const => VarKind::Const,
            _ => {
                return Err(self.error_here(ParserErrorKind::Expected {
                    expected: "let".to_string(),
                    found: self.found_text(),
                }))
            }
        };
        self.advance();
        Ok(kind)
    }

    /// `let a = 1, b: T = 2` without the terminator
    fn parse_var_decl(&mut self, in_for_header: bool) -> ParseResult<VarDecl> {
        let kind = self.var_kind()?;
        let mut declarations = Vec::new();
        loop {
            let start = self.current_start();
            let pattern = self.parse_binding_pattern()?;
            declarations.push(self.finish_declarator(kind, pattern, start, in_for_header)?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(VarDecl { kind, declarations })
    }

    fn finish_declarator(
        &mut self,
        kind: VarKind,
        pattern: Pattern,
        start: SourcePosition,
        in_for_header: bool,
    ) -> ParseResult<Declarator> {
        if self.typed && self.check(TokenKind::Bang) {
            let bang = self.advance();
            self.erase(bang.span.bytes());
        }
        let type_ann = self.parse_type_annotation()?;
        let init = if self.eat(TokenKind::Equal) {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        if init.is_none() && !in_for_header {
            if kind == VarKind::Const {
                return Err(self.error_here(ParserErrorKind::MissingInitializer));
            }
            if !matches!(pattern, Pattern::Ident { .. }) {
                return Err(self.error_here(ParserErrorKind::Expected {
                    expected: "=".to_string(),
                    found: self.found_text(),
                }));
            }
        }
        Ok(Declarator {
            pattern,
            type_ann,
            init,
            span: self.span_from(start),
        })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        self.expect(TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::new(
            StmtKind::If {
                test,
                consequent,
                alternate,
            },
            self.span_from(start),
        ))
    }

    fn parse_loop_body(&mut self) -> ParseResult<Box<Stmt>> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        Ok(Box::new(body?))
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        self.expect(TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Stmt::new(StmtKind::While { test, body }, self.span_from(start)))
    }

    fn parse_do_while(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        let body = self.parse_loop_body()?;
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        self.eat(TokenKind::Semicolon);
        Ok(Stmt::new(StmtKind::DoWhile { body, test }, self.span_from(start)))
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        if self.check(TokenKind::Await) {
            return Err(self.error_here(ParserErrorKind::Unsupported("Async functions".to_string())));
        }
        self.expect(TokenKind::LeftParen)?;

        let mut init = None;
        if matches!(self.kind(), TokenKind::Var | TokenKind::Let | TokenKind::Const) {
            let decl_start = self.current_start();
            let kind = self.var_kind()?;
            let pattern = self.parse_binding_pattern()?;
            if self.check_word("of") || self.check(TokenKind::In) {
                return self.finish_for_each(start, ForBinding::Decl { kind, pattern });
            }
            self.no_in = true;
            let mut declarations = vec![self.finish_declarator(kind, pattern, decl_start, false)?];
            while self.eat(TokenKind::Comma) {
                let decl_start = self.current_start();
                let pattern = self.parse_binding_pattern()?;
                declarations.push(self.finish_declarator(kind, pattern, decl_start, false)?);
            }
            self.no_in = false;
            init = Some(ForInit::VarDecl(VarDecl { kind, declarations }));
        } else if !self.check(TokenKind::Semicolon) {
            self.no_in = true;
            let expr = self.parse_expression();
            self.no_in = false;
            let expr = expr?;
            if self.check_word("of") || self.check(TokenKind::In) {
                let target = self.to_pattern(expr)?;
                return self.finish_for_each(start, ForBinding::Target(target));
            }
            init = Some(ForInit::Expr(expr));
        }

        self.expect(TokenKind::Semicolon)?;
        let test = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let update = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::RightParen)?;
        let body = self.parse_loop_body()?;
        Ok(Stmt::new(
            StmtKind::For {
                init,
                test,
                update,
                body,
            },
            self.span_from(start),
        ))
    }

    fn finish_for_each(&mut self, start: SourcePosition, binding: ForBinding) -> ParseResult<Stmt> {
        let is_of = self.check_word("of");
        self.advance();
        let subject = if is_of {
            self.parse_assignment()?
        } else {
            self.parse_expression()?
        };
        self.expect(TokenKind::RightParen)?;
        let body = self.parse_loop_body()?;
        let kind = if is_of {
            StmtKind::ForOf {
                binding,
                iterable: subject,
                body,
            }
        } else {
            StmtKind::ForIn {
                binding,
                object: subject,
                body,
            }
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        if self.function_depth == 0 {
            return Err(self.error_here(ParserErrorKind::IllegalReturn));
        }
        self.advance();
        let value = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RightBrace)
            || self.check(TokenKind::Eof)
            || self.peek().newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Stmt::new(StmtKind::Return(value), self.span_from(start)))
    }

    fn parse_jump(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        let is_break = self.check(TokenKind::Break);
        if is_break && self.loop_depth == 0 && self.switch_depth == 0 {
            return Err(self.error_here(ParserErrorKind::IllegalBreak));
        }
        if !is_break && self.loop_depth == 0 {
            return Err(self.error_here(ParserErrorKind::IllegalContinue));
        }
        self.advance();
        if self.check(TokenKind::Identifier) && !self.peek().newline_before {
            return Err(self.error_here(ParserErrorKind::Unsupported("Labels".to_string())));
        }
        self.consume_semicolon()?;
        let kind = if is_break {
            StmtKind::Break
        } else {
            StmtKind::Continue
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_throw(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        if self.peek().newline_before {
            return Err(self.error_here(ParserErrorKind::ExpressionExpected {
                found: self.found_text(),
            }));
        }
        let value = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::new(StmtKind::Throw(value), self.span_from(start)))
    }

    fn parse_try(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        let block = self.parse_block()?;
        let handler = if self.eat(TokenKind::Catch) {
            let (param, type_ann) = if self.eat(TokenKind::LeftParen) {
                let param = self.parse_binding_pattern()?;
                let type_ann = self.parse_type_annotation()?;
                self.expect(TokenKind::RightParen)?;
                (Some(param), type_ann)
            } else {
                (None, None)
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                type_ann,
                body,
            })
        } else {
            None
        };
        let finalizer = if self.eat(TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here(ParserErrorKind::Expected {
                expected: "catch".to_string(),
                found: self.found_text(),
            }));
        }
        Ok(Stmt::new(
            StmtKind::Try {
                block,
                handler,
                finalizer,
            },
            self.span_from(start),
        ))
    }

    fn parse_switch(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        self.expect(TokenKind::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::LeftBrace)?;

        self.switch_depth += 1;
        let cases = self.parse_switch_cases();
        self.switch_depth -= 1;
        let cases = cases?;

        Ok(Stmt::new(
            StmtKind::Switch {
                discriminant,
                cases,
            },
            self.span_from(start),
        ))
    }

    fn parse_switch_cases(&mut self) -> ParseResult<Vec<SwitchCase>> {
        let mut cases = Vec::new();
        while !self.eat(TokenKind::RightBrace) {
            let test = if self.eat(TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.eat(TokenKind::Default) {
                None
            } else {
                return Err(self.error_here(ParserErrorKind::Expected {
                    expected: "case".to_string(),
                    found: self.found_text(),
                }));
            };
            self.expect(TokenKind::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok(cases)
    }

    fn parse_interface(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        let (name, _) = self.expect_identifier()?;
        let type_params = self.parse_type_params()?;
        let mut extends = Vec::new();
        if self.eat(TokenKind::Extends) {
            loop {
                extends.push(self.parse_type_reference()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let members = self.parse_type_members()?;
        self.erase(start.byte_offset..self.last_end);
        Ok(Stmt::new(
            StmtKind::Interface(InterfaceDecl {
                name,
                type_params,
                extends,
                members,
            }),
            self.span_from(start),
        ))
    }

    fn parse_type_alias(&mut self) -> ParseResult<Stmt> {
        let start = self.current_start();
        self.advance();
        let (name, _) = self.expect_identifier()?;
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::Equal)?;
        let ty = self.parse_type()?;
        self.consume_semicolon()?;
        self.erase(start.byte_offset..self.last_end);
        Ok(Stmt::new(
            StmtKind::TypeAlias(TypeAliasDecl {
                name,
                type_params,
                ty,
            }),
            self.span_from(start),
        ))
    }

    // ===== functions =====

    /// `function name<T>(params): R { body }`
    fn parse_function(&mut self, is_declaration: bool) -> ParseResult<Rc<FunctionNode>> {
        let start = self.current_start();
        self.expect(TokenKind::Function)?;
        if self.check(TokenKind::Star) {
            return Err(self.error_here(ParserErrorKind::Unsupported("Generators".to_string())));
        }
        let name = if is_declaration || self.check(TokenKind::Identifier) {
            Some(self.expect_identifier()?.0)
        } else {
            None
        };
        self.parse_function_rest(start, name, false)
    }

    /// Everything after the name: type parameters, parameters, return type, body
    fn parse_function_rest(
        &mut self,
        start: SourcePosition,
        name: Option<Rc<str>>,
        is_arrow: bool,
    ) -> ParseResult<Rc<FunctionNode>> {
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let return_type = self.parse_type_annotation()?;
        let body = self.parse_function_body(false)?;
        Ok(self.make_function(start, name, type_params, params, return_type, body, is_arrow))
    }

    #[allow(clippy::too_many_arguments)]
    fn make_function(
        &self,
        start: SourcePosition,
        name: Option<Rc<str>>,
        type_params: Vec<Rc<str>>,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: FunctionBody,
        is_arrow: bool,
    ) -> Rc<FunctionNode> {
        let span = self.span_from(start);
        let source = Rc::from(&self.source[span.bytes()]);
        Rc::new(FunctionNode {
            name,
            type_params,
            params,
            return_type,
            body,
            is_arrow,
            span,
            source,
        })
    }

    fn parse_function_body(&mut self, allow_expression: bool) -> ParseResult<FunctionBody> {
        let saved = (self.loop_depth, self.switch_depth, self.no_in);
        self.function_depth += 1;
        self.loop_depth = 0;
        self.switch_depth = 0;
        self.no_in = false;

        let body = if allow_expression && !self.check(TokenKind::LeftBrace) {
            self.parse_assignment().map(|e| FunctionBody::Expr(Box::new(e)))
        } else {
            self.parse_block().map(FunctionBody::Block)
        };

        self.function_depth -= 1;
        (self.loop_depth, self.switch_depth, self.no_in) = saved;
        body
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RightParen) {
            let rest = self.eat(TokenKind::Ellipsis);
            let pattern = self.parse_binding_pattern()?;
            let mut optional = false;
            if self.typed && self.check(TokenKind::Question) {
                let question = self.advance();
                self.erase(question.span.bytes());
                optional = true;
            }
            let type_ann = self.parse_type_annotation()?;
            let default = if !rest && self.eat(TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            params.push(Param {
                pattern,
                type_ann,
                default,
                optional,
                rest,
            });
            if rest || !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(params)
    }

    /// Parameters, return type and `=>` of an arrow; `None` when not an arrow
    fn parse_arrow_head(&mut self) -> ParseResult<Option<(Vec<Rc<str>>, Vec<Param>, Option<TypeExpr>)>> {
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let return_type = self.parse_type_annotation()?;
        if self.check(TokenKind::Arrow) && !self.peek().newline_before {
            Ok(Some((type_params, params, return_type)))
        } else {
            Ok(None)
        }
    }

    fn parse_arrow_body(
        &mut self,
        start: SourcePosition,
        type_params: Vec<Rc<str>>,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
    ) -> ParseResult<Expr> {
        self.expect(TokenKind::Arrow)?;
        let body = self.parse_function_body(true)?;
        let node = self.make_function(start, None, type_params, params, return_type, body, true);
        let span = node.span;
        Ok(Expr::new(ExprKind::Function(node), span))
    }

    // ===== expressions =====

    /// Comma-separated expression
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        let first = self.parse_assignment()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            items.push(self.parse_assignment()?);
        }
        Ok(Expr::new(ExprKind::Sequence(items), self.span_from(start)))
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_assignment_expr)
    }

    fn parse_assignment_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();

        // x => ...
        if self.check(TokenKind::Identifier)
            && self.peek_at(1).kind == TokenKind::Arrow
            && !self.peek_at(1).newline_before
        {
            let token = self.advance();
            let param = Param {
                pattern: Pattern::Ident {
                    name: Rc::from(token.text.as_str()),
                    span: token.span,
                },
                type_ann: None,
                default: None,
                optional: false,
                rest: false,
            };
            return self.parse_arrow_body(start, Vec::new(), vec![param], None);
        }

        // (params) => ... and <T>(params) => ...
        if self.check(TokenKind::LeftParen) || (self.typed && self.check(TokenKind::Less)) {
            if let Some((type_params, params, return_type)) = self.try_parse(|p| p.parse_arrow_head()) {
                return self.parse_arrow_body(start, type_params, params, return_type);
            }
        }

        if self.check(TokenKind::Async) {
            return Err(self.error_here(ParserErrorKind::Unsupported("Async functions".to_string())));
        }

        let left = self.parse_conditional()?;
        let kind = self.kind();
        if !kind.is_assignment() {
            return Ok(left);
        }

        let op = match kind.compound_operator() {
            None => AssignOp::Assign,
            Some(op) => match infix_op(op) {
                Some(InfixOp::Binary(b)) => AssignOp::Compound(b),
                Some(InfixOp::Logical(l)) => AssignOp::Logical(l),
                None => AssignOp::Assign,
            },
        };
        let target = if op == AssignOp::Assign {
            self.to_pattern(left)?
        } else {
            self.simple_target(left)?
        };
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            self.span_from(start),
        ))
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        let test = self.parse_binary(1)?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let saved = self.no_in;
        self.no_in = false;
        let consequent = self.parse_assignment();
        self.no_in = saved;
        let consequent = consequent?;
        self.expect(TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            self.span_from(start),
        ))
    }

    /// Precedence climbing over binary, logical and `as` operators
    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let start = self.current_start();
        let mut left = self.parse_unary()?;
        let mut links = 0;

        loop {
            links += 1;
            self.check_chain(links)?;
            if self.typed
                && (self.check_word("as") || self.check_word("satisfies"))
                && !self.peek().newline_before
                && AS_PRECEDENCE >= min_precedence
            {
                let as_start = self.current_start().byte_offset;
                self.advance();
                let ty = if self.check(TokenKind::Const) {
                    let token = self.advance();
                    TypeExpr::named("const", token.span)
                } else {
                    self.parse_type()?
                };
                self.erase(as_start..self.last_end);
                left = Expr::new(
                    ExprKind::TypeAssertion {
                        expr: Box::new(left),
                        ty,
                    },
                    self.span_from(start),
                );
                continue;
            }

            let kind = self.kind();
            let precedence = get_precedence(kind);
            if precedence == 0 || precedence < min_precedence {
                break;
            }
            if kind == TokenKind::In && self.no_in {
                break;
            }
            let Some(op) = infix_op(kind) else { break };
            self.advance();

            let next_min = if get_associativity(kind) {
                precedence + 1
            } else {
                precedence
            };
            let right = self.nested(|p| p.parse_binary(next_min))?;
            let span = self.span_from(start);
            left = match op {
                InfixOp::Binary(op) => Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                ),
                InfixOp::Logical(op) => Expr::new(
                    ExprKind::Logical {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    span,
                ),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_unary_expr)
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        let op = match self.kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                self.span_from(start),
            ));
        }

        if matches!(self.kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = if self.check(TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let operand = self.parse_unary()?;
            let target = self.update_target(operand)?;
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    target: Box::new(target),
                },
                self.span_from(start),
            ));
        }

        if self.check(TokenKind::Await) {
            return Err(self.error_here(ParserErrorKind::Unsupported("Async functions".to_string())));
        }

        let expr = self.parse_call_member()?;
        if matches!(self.kind(), TokenKind::PlusPlus | TokenKind::MinusMinus)
            && !self.peek().newline_before
        {
            let op = if self.check(TokenKind::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            let target = self.update_target(expr)?;
            self.advance();
            return Ok(Expr::new(
                ExprKind::Update {
                    op,
                    prefix: false,
                    target: Box::new(target),
                },
                self.span_from(start),
            ));
        }
        Ok(expr)
    }

    fn update_target(&self, expr: Expr) -> ParseResult<Expr> {
        match expr.unwrap_type_syntax().kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => Ok(expr),
            _ => Err(ParserError::at(
                ParserErrorKind::InvalidAssignmentTarget,
                expr.span.coordinate(),
            )),
        }
    }

    /// Member access, calls, `new`, non-null assertions and optional chains
    fn parse_call_member(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        let mut expr = if self.check(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        let mut in_optional_chain = false;
        let mut links = 0;

        loop {
            links += 1;
            self.check_chain(links)?;
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let (property, property_span) = self.expect_property_name()?;
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                            property_span,
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    in_optional_chain = true;
                    expr = match self.kind() {
                        TokenKind::LeftParen => {
                            let args = self.parse_arguments()?;
                            Expr::new(
                                ExprKind::Call {
                                    callee: Box::new(expr),
                                    type_args: Vec::new(),
                                    args,
                                    optional: true,
                                },
                                self.span_from(start),
                            )
                        }
                        TokenKind::LeftBracket => {
                            self.advance();
                            let index = self.parse_expression()?;
                            self.expect(TokenKind::RightBracket)?;
                            Expr::new(
                                ExprKind::Index {
                                    object: Box::new(expr),
                                    index: Box::new(index),
                                    optional: true,
                                },
                                self.span_from(start),
                            )
                        }
                        _ => {
                            let (property, property_span) = self.expect_property_name()?;
                            Expr::new(
                                ExprKind::Member {
                                    object: Box::new(expr),
                                    property,
                                    property_span,
                                    optional: true,
                                },
                                self.span_from(start),
                            )
                        }
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let saved = self.no_in;
                    self.no_in = false;
                    let index = self.parse_expression();
                    self.no_in = saved;
                    let index = index?;
                    self.expect(TokenKind::RightBracket)?;
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::LeftParen => {
                    let args = self.parse_arguments()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            type_args: Vec::new(),
                            args,
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::Less if self.typed => {
                    let Some(type_args) = self.try_call_type_args() else {
                        break;
                    };
                    let args = self.parse_arguments()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            type_args,
                            args,
                            optional: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::Bang if self.typed && !self.peek().newline_before => {
                    let bang = self.advance();
                    self.erase(bang.span.bytes());
                    expr = Expr::new(ExprKind::NonNull(Box::new(expr)), self.span_from(start));
                }
                TokenKind::Template => {
                    return Err(self.error_here(ParserErrorKind::Unsupported(
                        "Tagged templates".to_string(),
                    )));
                }
                _ => break,
            }
        }

        if in_optional_chain {
            expr = Expr::new(ExprKind::OptionalChain(Box::new(expr)), self.span_from(start));
        }
        Ok(expr)
    }

    /// `<T, U>` directly followed by `(`; erased when it matches
    fn try_call_type_args(&mut self) -> Option<Vec<TypeExpr>> {
        let start = self.current_start().byte_offset;
        let args = self.try_parse(|p| {
            let args = p.parse_type_args()?;
            Ok(if p.check(TokenKind::LeftParen) { Some(args) } else { None })
        })?;
        self.erase(start..self.last_end);
        Some(args)
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        self.advance();
        if self.check(TokenKind::Dot) {
            return Err(self.error_here(ParserErrorKind::Unsupported("'new.target'".to_string())));
        }

        let mut callee = if self.check(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat(TokenKind::Dot) {
                let (property, property_span) = self.expect_property_name()?;
                callee = Expr::new(
                    ExprKind::Member {
                        object: Box::new(callee),
                        property,
                        property_span,
                        optional: false,
                    },
                    self.span_from(start),
                );
            } else if self.eat(TokenKind::LeftBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RightBracket)?;
                callee = Expr::new(
                    ExprKind::Index {
                        object: Box::new(callee),
                        index: Box::new(index),
                        optional: false,
                    },
                    self.span_from(start),
                );
            } else {
                break;
            }
        }

        let type_args = if self.typed && self.check(TokenKind::Less) {
            self.try_call_type_args().unwrap_or_default()
        } else {
            Vec::new()
        };
        let args = if self.check(TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                type_args,
                args,
            },
            self.span_from(start),
        ))
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Argument>> {
        self.expect(TokenKind::LeftParen)?;
        let saved = self.no_in;
        self.no_in = false;
        let mut args = Vec::new();
        let result = (|| {
            while !self.check(TokenKind::RightParen) {
                if self.eat(TokenKind::Ellipsis) {
                    args.push(Argument::Spread(self.parse_assignment()?));
                } else {
                    args.push(Argument::Expr(self.parse_assignment()?));
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RightParen).map(|_| ())
        })();
        self.no_in = saved;
        result?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        let kind = match self.kind() {
            TokenKind::Number => {
                let token = self.advance();
                match token.value {
                    TokenValue::Number(n) => ExprKind::Number(n),
                    _ => ExprKind::Number(f64::NAN),
                }
            }
            TokenKind::String => {
                let token = self.advance();
                match token.value {
                    TokenValue::Str(s) => ExprKind::String(Rc::from(s)),
                    _ => ExprKind::String(Rc::from("")),
                }
            }
            TokenKind::Template => return self.parse_template(),
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::Null
            }
            TokenKind::Identifier => {
                let token = self.advance();
                ExprKind::Ident(Rc::from(token.text.as_str()))
            }
            TokenKind::LeftParen => {
                self.advance();
                let saved = self.no_in;
                self.no_in = false;
                let inner = self.parse_expression();
                self.no_in = saved;
                let inner = inner?;
                self.expect(TokenKind::RightParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::LeftBracket => return self.parse_array_literal(),
            TokenKind::LeftBrace => return self.parse_object_literal(),
            TokenKind::Function => {
                let node = self.parse_function(false)?;
                ExprKind::Function(node)
            }
            TokenKind::Slash | TokenKind::SlashEqual => {
                return Err(self.error_here(ParserErrorKind::Unsupported(
                    "Regular expressions".to_string(),
                )))
            }
            _ => {
                if let Some(what) = self.unsupported_keyword() {
                    return Err(self.error_here(ParserErrorKind::Unsupported(what)));
                }
                return Err(self.error_here(ParserErrorKind::ExpressionExpected {
                    found: self.found_text(),
                }));
            }
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn parse_template(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        let token = self.advance();
        let TokenValue::Template(parts) = token.value else {
            return Err(self.error_here(ParserErrorKind::ExpressionExpected {
                found: token.text,
            }));
        };

        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        for part in parts {
            match part {
                TemplatePart::Str(text) => quasis.push(Rc::from(text)),
                TemplatePart::Expr { source, start } => exprs.push(self.parse_substitution(&source, start)?),
            }
        }
        Ok(Expr::new(
            ExprKind::Template { quasis, exprs },
            self.span_from(start),
        ))
    }

    /// Parse a `${...}` body with positions relative to the whole file
    fn parse_substitution(&mut self, text: &str, base: SourcePosition) -> ParseResult<Expr> {
        let tokens = Scanner::starting_at(text, base).scan_all()?;
        let syntax = if self.typed { Syntax::Typed } else { Syntax::Untyped };
        let mut sub = Parser::new(tokens, syntax, self.source.clone());
        sub.function_depth = self.function_depth;
        if sub.check(TokenKind::Eof) {
            return Err(sub.error_here(ParserErrorKind::ExpressionExpected {
                found: "}".to_string(),
            }));
        }
        let expr = sub.parse_expression()?;
        if !sub.check(TokenKind::Eof) {
            return Err(sub.error_here(ParserErrorKind::Expected {
                expected: "}".to_string(),
                found: sub.found_text(),
            }));
        }
        self.erasures.append(&mut sub.erasures);
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        self.advance();
        let saved = self.no_in;
        self.no_in = false;
        let mut elements = Vec::new();
        let result = (|| {
            while !self.check(TokenKind::RightBracket) {
                if self.check(TokenKind::Comma) {
                    self.advance();
                    elements.push(ArrayElement::Hole);
                    continue;
                }
                if self.eat(TokenKind::Ellipsis) {
                    elements.push(ArrayElement::Spread(self.parse_assignment()?));
                } else {
                    elements.push(ArrayElement::Expr(self.parse_assignment()?));
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RightBracket).map(|_| ())
        })();
        self.no_in = saved;
        result?;
        Ok(Expr::new(ExprKind::Array(elements), self.span_from(start)))
    }

    fn parse_property_key(&mut self) -> ParseResult<PropertyKey> {
        match self.kind() {
            TokenKind::String => {
                let token = self.advance();
                match token.value {
                    TokenValue::Str(s) => Ok(PropertyKey::Named(Rc::from(s))),
                    _ => Ok(PropertyKey::Named(Rc::from(token.text.as_str()))),
                }
            }
            TokenKind::Number => {
                let token = self.advance();
                match token.value {
                    TokenValue::Number(n) => Ok(PropertyKey::Named(Rc::from(number_key(n)))),
                    _ => Ok(PropertyKey::Named(Rc::from(token.text.as_str()))),
                }
            }
            TokenKind::LeftBracket => {
                self.advance();
                let key = self.parse_assignment()?;
                self.expect(TokenKind::RightBracket)?;
                Ok(PropertyKey::Computed(Box::new(key)))
            }
            _ => Ok(PropertyKey::Named(self.expect_property_name()?.0)),
        }
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        let start = self.current_start();
        self.advance();
        let saved = self.no_in;
        self.no_in = false;
        let result = self.parse_object_members();
        self.no_in = saved;
        let props = result?;
        Ok(Expr::new(ExprKind::Object(props), self.span_from(start)))
    }

    fn parse_object_members(&mut self) -> ParseResult<Vec<PropertyDef>> {
        let mut props = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let prop_start = self.current_start();
            if self.eat(TokenKind::Ellipsis) {
                props.push(PropertyDef::Spread(self.parse_assignment()?));
            } else {
                if (self.check_word("get") || self.check_word("set"))
                    && !matches!(
                        self.peek_at(1).kind,
                        TokenKind::Colon | TokenKind::Comma | TokenKind::LeftParen | TokenKind::RightBrace
                    )
                {
                    return Err(self.error_here(ParserErrorKind::Unsupported(
                        "Getters and setters".to_string(),
                    )));
                }
                let was_identifier = self.check(TokenKind::Identifier);
                let key_token = self.peek().clone();
                let key = self.parse_property_key()?;

                if self.check(TokenKind::LeftParen) || (self.typed && self.check(TokenKind::Less)) {
                    let name = match &key {
                        PropertyKey::Named(n) => Some(n.clone()),
                        PropertyKey::Computed(_) => None,
                    };
                    let node = self.parse_function_rest(prop_start, name, false)?;
                    let span = node.span;
                    props.push(PropertyDef::Init {
                        key,
                        value: Expr::new(ExprKind::Function(node), span),
                        shorthand: false,
                        span: self.span_from(prop_start),
                    });
                } else if self.eat(TokenKind::Colon) {
                    let value = self.parse_assignment()?;
                    props.push(PropertyDef::Init {
                        key,
                        value,
                        shorthand: false,
                        span: self.span_from(prop_start),
                    });
                } else if was_identifier {
                    let name: Rc<str> = Rc::from(key_token.text.as_str());
                    let mut value = Expr::new(ExprKind::Ident(name), key_token.span);
                    // `{ a = 1 }` is only meaningful as a destructuring target
                    if self.eat(TokenKind::Equal) {
                        let default = self.parse_assignment()?;
                        value = Expr::new(
                            ExprKind::Assign {
                                op: AssignOp::Assign,
                                target: Box::new(Pattern::Ident {
                                    name: Rc::from(key_token.text.as_str()),
                                    span: key_token.span,
                                }),
                                value: Box::new(default),
                            },
                            self.span_from(prop_start),
                        );
                    }
                    props.push(PropertyDef::Init {
                        key,
                        value,
                        shorthand: true,
                        span: self.span_from(prop_start),
                    });
                } else {
                    return Err(self.error_here(ParserErrorKind::Expected {
                        expected: ":".to_string(),
                        found: self.found_text(),
                    }));
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(props)
    }

    // ===== patterns =====

    fn parse_binding_pattern(&mut self) -> ParseResult<Pattern> {
        let start = self.current_start();
        match self.kind() {
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                let mut rest = None;
                while !self.check(TokenKind::RightBracket) {
                    if self.eat(TokenKind::Comma) {
                        elements.push(None);
                        continue;
                    }
                    if self.eat(TokenKind::Ellipsis) {
                        rest = Some(Box::new(self.parse_binding_pattern()?));
                        break;
                    }
                    let pattern = self.parse_binding_pattern()?;
                    let default = if self.eat(TokenKind::Equal) {
                        Some(self.parse_assignment()?)
                    } else {
                        None
                    };
                    elements.push(Some(PatternElement { pattern, default }));
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RightBracket)?;
                Ok(Pattern::Array {
                    elements,
                    rest,
                    span: self.span_from(start),
                })
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut props = Vec::new();
                let mut rest = None;
                while !self.check(TokenKind::RightBrace) {
                    if self.eat(TokenKind::Ellipsis) {
                        rest = Some(Box::new(self.parse_binding_pattern()?));
                        break;
                    }
                    let was_identifier = self.check(TokenKind::Identifier);
                    let key_token = self.peek().clone();
                    let key = self.parse_property_key()?;
                    let value = if self.eat(TokenKind::Colon) {
                        self.parse_binding_pattern()?
                    } else if was_identifier {
                        Pattern::Ident {
                            name: Rc::from(key_token.text.as_str()),
                            span: key_token.span,
                        }
                    } else {
                        return Err(self.error_here(ParserErrorKind::Expected {
                            expected: ":".to_string(),
                            found: self.found_text(),
                        }));
                    };
                    let default = if self.eat(TokenKind::Equal) {
                        Some(self.parse_assignment()?)
                    } else {
                        None
                    };
                    props.push(PatternProp { key, value, default });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RightBrace)?;
                Ok(Pattern::Object {
                    props,
                    rest,
                    span: self.span_from(start),
                })
            }
            _ => {
                let (name, span) = self.expect_identifier()?;
                Ok(Pattern::Ident { name, span })
            }
        }
    }

    /// Reinterpret an expression as an assignment target
    fn to_pattern(&self, expr: Expr) -> ParseResult<Pattern> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Ident(name) => Ok(Pattern::Ident { name, span }),
            ExprKind::Member { .. } | ExprKind::Index { .. } => Ok(Pattern::Expr(Box::new(expr))),
            ExprKind::Paren(inner) | ExprKind::NonNull(inner) => match inner.kind {
                ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {
                    self.to_pattern(*inner)
                }
                _ => Err(ParserError::at(ParserErrorKind::InvalidAssignmentTarget, span.coordinate())),
            },
            ExprKind::TypeAssertion { expr: inner, .. } => self.to_pattern(*inner),
            ExprKind::Array(elements) => {
                let mut out = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, element) in elements.into_iter().enumerate() {
                    match element {
                        ArrayElement::Hole => out.push(None),
                        ArrayElement::Spread(e) if i + 1 == count => {
                            rest = Some(Box::new(self.to_pattern(e)?));
                        }
                        ArrayElement::Spread(e) => {
                            return Err(ParserError::at(
                                ParserErrorKind::InvalidAssignmentTarget,
                                e.span.coordinate(),
                            ))
                        }
                        ArrayElement::Expr(e) => out.push(Some(self.to_pattern_element(e)?)),
                    }
                }
                Ok(Pattern::Array {
                    elements: out,
                    rest,
                    span,
                })
            }
            ExprKind::Object(props) => {
                let mut out = Vec::new();
                let mut rest = None;
                for prop in props {
                    match prop {
                        PropertyDef::Spread(e) => rest = Some(Box::new(self.to_pattern(e)?)),
                        PropertyDef::Init { key, value, .. } => {
                            let element = self.to_pattern_element(value)?;
                            out.push(PatternProp {
                                key,
                                value: element.pattern,
                                default: element.default,
                            });
                        }
                    }
                }
                Ok(Pattern::Object {
                    props: out,
                    rest,
                    span,
                })
            }
            _ => Err(ParserError::at(ParserErrorKind::InvalidAssignmentTarget, span.coordinate())),
        }
    }

    fn to_pattern_element(&self, expr: Expr) -> ParseResult<PatternElement> {
        match expr.kind {
            ExprKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => Ok(PatternElement {
                pattern: *target,
                default: Some(*value),
            }),
            _ => Ok(PatternElement {
                pattern: self.to_pattern(expr)?,
                default: None,
            }),
        }
    }

    /// Targets of compound assignment: identifiers and property accesses only
    fn simple_target(&self, expr: Expr) -> ParseResult<Pattern> {
        let inner = expr.unwrap_type_syntax();
        match inner.kind {
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. } => {
                self.to_pattern(inner.clone())
            }
            _ => Err(ParserError::at(
                ParserErrorKind::InvalidAssignmentTarget,
                expr.span.coordinate(),
            )),
        }
    }

    // ===== types =====

    /// `: T`, erased; `None` when absent or in the untyped dialect
    fn parse_type_annotation(&mut self) -> ParseResult<Option<TypeExpr>> {
        if !self.typed || !self.check(TokenKind::Colon) {
            return Ok(None);
        }
        let start = self.current_start().byte_offset;
        self.advance();
        let ty = self.parse_type()?;
        self.erase(start..self.last_end);
        Ok(Some(ty))
    }

    /// `<T, U extends X = Y>` on declarations, erased
    fn parse_type_params(&mut self) -> ParseResult<Vec<Rc<str>>> {
        if !self.typed || !self.check(TokenKind::Less) {
            return Ok(Vec::new());
        }
        let start = self.current_start().byte_offset;
        self.advance();
        let mut names = Vec::new();
        while !self.check(TokenKind::Greater) {
            names.push(self.expect_identifier()?.0);
            if self.eat(TokenKind::Extends) {
                self.parse_type()?;
            }
            if self.eat(TokenKind::Equal) {
                self.parse_type()?;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_type_closer()?;
        self.erase(start..self.last_end);
        Ok(names)
    }

    fn parse_type_args(&mut self) -> ParseResult<Vec<TypeExpr>> {
        self.expect(TokenKind::Less)?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_type_closer()?;
        Ok(args)
    }

    /// Consume one `>`, splitting `>>`, `>>>` and `>=` when needed
    fn expect_type_closer(&mut self) -> ParseResult<()> {
        if self.eat(TokenKind::Greater) {
            return Ok(());
        }
        let token = self.peek();
        let splittable = token.kind != TokenKind::Eof && token.text[self.split..].starts_with('>');
        let start = token.span.start.byte_offset;
        if splittable {
            self.split += 1;
            self.last_end = start + self.split;
            return Ok(());
        }
        Err(self.error_here(ParserErrorKind::Expected {
            expected: ">".to_string(),
            found: self.found_text(),
        }))
    }

    pub fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        self.nested(Self::parse_type_kind)
    }

    fn parse_type_kind(&mut self) -> ParseResult<TypeExpr> {
        if self.check(TokenKind::Less) {
            // generic function type; parameters are checked as `any`
            self.parse_type_params_raw()?;
            return self
                .parse_function_type()?
                .ok_or_else(|| self.error_here(ParserErrorKind::Expected {
                    expected: "=>".to_string(),
                    found: self.found_text(),
                }));
        }

        self.eat(TokenKind::Pipe);
        let first = self.parse_intersection_type()?;
        if !self.check(TokenKind::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat(TokenKind::Pipe) {
            members.push(self.parse_intersection_type()?);
        }
        Ok(TypeExpr::Union(members))
    }

    /// Type parameter list inside a type, not recorded for erasure
    fn parse_type_params_raw(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::Less)?;
        while !self.check(TokenKind::Greater) {
            self.expect_identifier()?;
            if self.eat(TokenKind::Extends) {
                self.parse_type()?;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_type_closer()
    }

    fn parse_intersection_type(&mut self) -> ParseResult<TypeExpr> {
        self.eat(TokenKind::Amp);
        let first = self.parse_postfix_type()?;
        if !self.check(TokenKind::Amp) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat(TokenKind::Amp) {
            members.push(self.parse_postfix_type()?);
        }
        Ok(TypeExpr::Intersection(members))
    }

    fn parse_postfix_type(&mut self) -> ParseResult<TypeExpr> {
        let mut ty = self.parse_primary_type()?;
        let mut links = 0;
        while self.check(TokenKind::LeftBracket)
            && !self.peek().newline_before
            && self.peek_at(1).kind == TokenKind::RightBracket
        {
            links += 1;
            self.check_chain(links)?;
            self.advance();
            self.advance();
            ty = TypeExpr::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_primary_type(&mut self) -> ParseResult<TypeExpr> {
        match self.kind() {
            TokenKind::LeftParen => {
                if let Some(function) = self.try_parse(|p| p.parse_function_type()) {
                    return Ok(function);
                }
                self.advance();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::LeftBrace => Ok(TypeExpr::Object(self.parse_type_members()?)),
            TokenKind::LeftBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(TokenKind::RightBracket) {
                    items.push(self.parse_type()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RightBracket)?;
                Ok(TypeExpr::Tuple(items))
            }
            TokenKind::String => {
                let token = self.advance();
                let text = match token.value {
                    TokenValue::Str(s) => s,
                    _ => token.text,
                };
                Ok(TypeExpr::Literal(TypeLiteral::String(Rc::from(text))))
            }
            TokenKind::Number => Ok(TypeExpr::Literal(TypeLiteral::Number(self.number_literal()))),
            TokenKind::Minus if self.peek_at(1).kind == TokenKind::Number => {
                self.advance();
                Ok(TypeExpr::Literal(TypeLiteral::Number(-self.number_literal())))
            }
            TokenKind::True => {
                self.advance();
                Ok(TypeExpr::Literal(TypeLiteral::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(TypeExpr::Literal(TypeLiteral::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(TypeExpr::Literal(TypeLiteral::Null))
            }
            TokenKind::Void => {
                self.advance();
                Ok(TypeExpr::Literal(TypeLiteral::Void))
            }
            TokenKind::Typeof => {
                self.advance();
                let (mut name, span) = self.expect_identifier()?;
                while self.eat(TokenKind::Dot) {
                    let (part, _) = self.expect_property_name()?;
                    name = Rc::from(format!("{}.{}", name, part));
                }
                Ok(TypeExpr::Query(name, span))
            }
            TokenKind::Identifier if self.check_word("keyof") => {
                self.advance();
                Ok(TypeExpr::Keyof(Box::new(self.parse_postfix_type()?)))
            }
            TokenKind::Identifier => self.parse_type_reference(),
            _ => Err(self.error_here(ParserErrorKind::TypeExpected {
                found: self.found_text(),
            })),
        }
    }

    fn number_literal(&mut self) -> f64 {
        match self.advance().value {
            TokenValue::Number(n) => n,
            _ => f64::NAN,
        }
    }

    /// `Name`, `Ns.Name`, `Name<Args>`
    fn parse_type_reference(&mut self) -> ParseResult<TypeExpr> {
        let (mut name, span) = self.expect_identifier()?;
        while self.check(TokenKind::Dot) && self.peek_at(1).kind == TokenKind::Identifier {
            self.advance();
            let (part, _) = self.expect_identifier()?;
            name = Rc::from(format!("{}.{}", name, part));
        }
        let args = if self.check(TokenKind::Less) && !self.peek().newline_before {
            self.parse_type_args()?
        } else {
            Vec::new()
        };
        Ok(TypeExpr::Named { name, args, span })
    }

    /// `(a: A, b?: B) => R`; `None` when the parameter list is not followed by `=>`
    fn parse_function_type(&mut self) -> ParseResult<Option<TypeExpr>> {
        let params = self.parse_function_type_params()?;
        if !self.eat(TokenKind::Arrow) {
            return Ok(None);
        }
        let ret = self.parse_type()?;
        Ok(Some(TypeExpr::Function {
            params,
            ret: Box::new(ret),
        }))
    }

    fn parse_function_type_params(&mut self) -> ParseResult<Vec<FunctionTypeParam>> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RightParen) {
            let rest = self.eat(TokenKind::Ellipsis);
            let name = match self.kind() {
                TokenKind::LeftBrace | TokenKind::LeftBracket => {
                    self.parse_binding_pattern()?;
                    Rc::from("arg")
                }
                _ => self.expect_property_name()?.0,
            };
            let optional = self.eat(TokenKind::Question);
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            params.push(FunctionTypeParam {
                name,
                ty,
                optional,
                rest,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;
        Ok(params)
    }

    /// `{ a: T; b?(x: U): V; [k: string]: W }`
    fn parse_type_members(&mut self) -> ParseResult<Vec<TypeMember>> {
        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let readonly = self.check_word("readonly")
                && !matches!(
                    self.peek_at(1).kind,
                    TokenKind::Colon | TokenKind::Question | TokenKind::LeftParen
                );
            if readonly {
                self.advance();
            }

            if self.check(TokenKind::LeftBracket) {
                self.advance();
                self.expect_identifier()?;
                self.expect(TokenKind::Colon)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RightBracket)?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_type()?;
                members.push(TypeMember::Index { key, value });
            } else {
                let name = match self.parse_property_key()? {
                    PropertyKey::Named(name) => name,
                    PropertyKey::Computed(_) => {
                        return Err(self.error_here(ParserErrorKind::Unsupported(
                            "Computed type members".to_string(),
                        )))
                    }
                };
                let optional = self.eat(TokenKind::Question);
                if self.check(TokenKind::LeftParen) || self.check(TokenKind::Less) {
                    if self.check(TokenKind::Less) {
                        self.parse_type_params_raw()?;
                    }
                    let params = self.parse_function_type_params()?;
                    let ret = if self.eat(TokenKind::Colon) {
                        self.parse_type()?
                    } else {
                        TypeExpr::named("any", self.span_from(self.current_start()))
                    };
                    members.push(TypeMember::Method {
                        name,
                        params,
                        ret,
                        optional,
                    });
                } else {
                    self.expect(TokenKind::Colon)?;
                    let ty = self.parse_type()?;
                    members.push(TypeMember::Property {
                        name,
                        ty,
                        optional,
                        readonly,
                    });
                }
            }

            if !self.eat(TokenKind::Semicolon)
                && !self.eat(TokenKind::Comma)
                && !self.check(TokenKind::RightBrace)
                && !self.peek().newline_before
            {
                return Err(self.error_here(ParserErrorKind::Expected {
                    expected: ";".to_string(),
                    found: self.found_text(),
                }));
            }
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::expr::BinaryOp;

    fn parse_untyped(source: &str) -> Program {
        parse_program(source, Syntax::Untyped).unwrap()
    }

    fn parse_typed(source: &str) -> Program {
        parse_program(source, Syntax::Typed).unwrap()
    }

    fn first_expr(program: &Program) -> &Expr {
        match &program.body[0].kind {
            StmtKind::Expr(e) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse_untyped("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = &first_expr(&program).kind else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_exponent_right_associative() {
        let program = parse_untyped("2 ** 3 ** 2");
        let ExprKind::Binary { left, .. } = &first_expr(&program).kind else {
            panic!("expected binary");
        };
        assert!(matches!(left.kind, ExprKind::Number(n) if n == 2.0));
    }

    #[test]
    fn test_automatic_semicolons() {
        let program = parse_untyped("let a = 1\nlet b = 2\na + b");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_missing_semicolon_on_same_line() {
        let err = parse_program("let a = 1 let b = 2", Syntax::Untyped).unwrap_err();
        assert_eq!(err.code(), 1005);
        assert_eq!(err.message(), "';' expected.");
        assert_eq!((err.line(), err.column()), (1, 11));
    }

    #[test]
    fn test_return_newline_restriction() {
        let program = parse_untyped("function f() {\n return\n 1\n}");
        let StmtKind::Function(node) = &program.body[0].kind else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &node.body else {
            panic!("expected block body");
        };
        assert!(matches!(body[0].kind, StmtKind::Return(None)));
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_arrow_functions() {
        let program = parse_untyped("const f = (a, b = 2, ...rest) => a + b; const g = x => ({ x })");
        assert_eq!(program.body.len(), 2);
        let StmtKind::VarDecl(decl) = &program.body[0].kind else {
            panic!("expected declaration");
        };
        let Some(Expr {
            kind: ExprKind::Function(node),
            ..
        }) = &decl.declarations[0].init
        else {
            panic!("expected arrow");
        };
        assert!(node.is_arrow);
        assert_eq!(node.params.len(), 3);
        assert_eq!(node.required_params(), 1);
        assert_eq!(&*node.source, "(a, b = 2, ...rest) => a + b");
    }

    #[test]
    fn test_parenthesized_is_not_arrow() {
        let program = parse_untyped("(a, b)");
        assert!(matches!(first_expr(&program).kind, ExprKind::Paren(_)));
    }

    #[test]
    fn test_destructuring_assignment() {
        let program = parse_untyped("[a, b] = [b, a]");
        let ExprKind::Assign { target, .. } = &first_expr(&program).kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.bound_names().len(), 2);
    }

    #[test]
    fn test_optional_chain_boundary() {
        let program = parse_untyped("a?.b.c()");
        assert!(matches!(first_expr(&program).kind, ExprKind::OptionalChain(_)));
    }

    #[test]
    fn test_template_substitutions() {
        let program = parse_untyped("`x=${x + 1}, y=${y}`");
        let ExprKind::Template { quasis, exprs } = &first_expr(&program).kind else {
            panic!("expected template");
        };
        assert_eq!(quasis.len(), 3);
        assert_eq!(exprs.len(), 2);
        assert_eq!(exprs[0].span.start.byte_offset, 5);
    }

    #[test]
    fn test_for_variants() {
        let program = parse_untyped(
            "for (let i = 0; i < 3; i++) {}\nfor (const x of xs) {}\nfor (const k in o) {}\nfor (;;) { break }",
        );
        assert!(matches!(program.body[0].kind, StmtKind::For { .. }));
        assert!(matches!(program.body[1].kind, StmtKind::ForOf { .. }));
        assert!(matches!(program.body[2].kind, StmtKind::ForIn { .. }));
        assert!(matches!(program.body[3].kind, StmtKind::For { init: None, .. }));
    }

    #[test]
    fn test_unsupported_syntax() {
        let err = parse_program("class A {}", Syntax::Untyped).unwrap_err();
        assert_eq!(err.message(), "Classes are not supported.");
        let err = parse_program("const r = /ab/", Syntax::Untyped).unwrap_err();
        assert_eq!(err.message(), "Regular expressions are not supported.");
    }

    #[test]
    fn test_illegal_jumps() {
        assert_eq!(
            parse_program("return 1", Syntax::Untyped).unwrap_err().kind,
            ParserErrorKind::IllegalReturn
        );
        assert_eq!(
            parse_program("break", Syntax::Untyped).unwrap_err().kind,
            ParserErrorKind::IllegalBreak
        );
    }

    #[test]
    fn test_expression_expected() {
        let err = parse_program("let x = ;", Syntax::Untyped).unwrap_err();
        assert_eq!(err.code(), 1109);
    }

    #[test]
    fn test_type_annotations_rejected_when_untyped() {
        assert!(parse_program("let x: number = 1", Syntax::Untyped).is_err());
        assert!(parse_program("let x: number = 1", Syntax::Typed).is_ok());
    }

    #[test]
    fn test_typed_erasures_recorded() {
        let source = "let x: number = 1;";
        let program = parse_typed(source);
        assert_eq!(program.erasures, vec![5..13]);
        assert_eq!(&source[5..13], ": number");
    }

    #[test]
    fn test_interface_and_alias() {
        let program = parse_typed(
            "interface P { x: number; y?: string }\ntype Id = string | number;\nconst p: P = { x: 1 };",
        );
        assert!(matches!(program.body[0].kind, StmtKind::Interface(_)));
        assert!(matches!(program.body[1].kind, StmtKind::TypeAlias(_)));
        assert_eq!(program.erasures.len(), 3);
    }

    #[test]
    fn test_nested_generic_closer() {
        let program = parse_typed("let m: Array<Array<number>> = [];");
        let StmtKind::VarDecl(decl) = &program.body[0].kind else {
            panic!("expected declaration");
        };
        assert_eq!(
            decl.declarations[0].type_ann.as_ref().map(|t| t.to_string()),
            Some("Array<Array<number>>".to_string())
        );
    }

    #[test]
    fn test_generic_call_and_comparison() {
        let program = parse_typed("identity<number>(1); a < b;");
        let ExprKind::Call { type_args, .. } = &first_expr(&program).kind else {
            panic!("expected call");
        };
        assert_eq!(type_args.len(), 1);
        assert!(matches!(
            &program.body[1].kind,
            StmtKind::Expr(Expr {
                kind: ExprKind::Binary { op: BinaryOp::Lt, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_typed_arrow_with_return_type() {
        let program = parse_typed("const add = (a: number, b: number): number => a + b;");
        assert_eq!(program.erasures.len(), 3);
    }

    #[test]
    fn test_as_and_non_null() {
        let program = parse_typed("const n = (value as string).length + maybe!.x;");
        assert_eq!(program.erasures.len(), 2);
    }

    #[test]
    fn test_nested_type_argument_closers() {
        let source = "let arr: Array<Array<number>> = [[1]];\nlet deep: Array<Array<Array<string>>> = [];\narr";
        let program = parse_typed(source);
        assert_eq!(program.body.len(), 3);
        let erased: Vec<&str> = program.erasures.iter().map(|r| &source[r.clone()]).collect();
        assert!(erased[0].ends_with("Array<Array<number>>"), "{:?}", erased);
        assert!(erased[1].ends_with("Array<Array<Array<string>>>"), "{:?}", erased);
    }

    #[test]
    fn test_nesting_limit_is_a_syntax_error() {
        let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let chain = format!("{}1", "1 + ".repeat(20_000));
        for source in [&parens, &chain] {
            for syntax in [Syntax::Untyped, Syntax::Typed] {
                let err = parse_program(source, syntax).unwrap_err();
                assert!(matches!(err.kind, ParserErrorKind::NestingTooDeep));
                assert_eq!(err.code(), 1128);
            }
        }
        let shallow = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(parse_program(&shallow, Syntax::Untyped).is_ok());
    }
}
