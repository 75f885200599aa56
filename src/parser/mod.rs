use crate::lexer::{Span, Token, TokenStream};
use crate::symbols::SymbolTable;
use crate::vm::{Addr, ArithOp, Instr, Reg, VirtualMachine, VmError};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected {expected}, got '{found}'")]
    Unexpected { expected: &'static str, found: String, span: Span },
    #[error("expected ')' to close '(' at {open}, got '{found}'")]
    UnclosedParen { open: usize, found: String, span: Span },
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String, span: Span },
    #[error("unexpected '{found}' after complete input")]
    TrailingInput { found: String, span: Span },
    #[error("parentheses nested deeper than {limit}")]
    TooDeep { limit: usize, span: Span },
    #[error(transparent)]
    Storage(#[from] VmError),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Unexpected { span, .. }
            | ParseError::UnclosedParen { span, .. }
            | ParseError::UndefinedVariable { span, .. }
            | ParseError::TrailingInput { span, .. }
            | ParseError::TooDeep { span, .. } => Some(*span),
            ParseError::Storage(_) => None,
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

/// Storage a `def` line needs. `New` holds the address the heap will hand
/// out once the line is committed; nothing is reserved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Existing { name: String, addr: Addr },
    New { name: String, addr: Addr },
}

impl Binding {
    pub fn name(&self) -> &str {
        match self {
            Binding::Existing { name, .. } | Binding::New { name, .. } => name,
        }
    }

    pub fn addr(&self) -> Addr {
        match self {
            Binding::Existing { addr, .. } | Binding::New { addr, .. } => *addr,
        }
    }
}

/// Output of one successful parse: a halt-terminated program whose result
/// lands in register 0, and the variable it defines, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub code: Vec<Instr>,
    pub binding: Option<Binding>,
}

/// Recursive-descent parser that emits register code as it recognises the
/// grammar:
///
/// ```text
/// line   := 'def' ident '=' expr | expr
/// expr   := term exprP
/// exprP  := ('+' | '-') term exprP | ε
/// term   := factor termP
/// termP  := ('*' | '/') factor termP | ε
/// factor := '(' expr ')' | number | ident
/// ```
///
/// Every rule takes the register its caller wants the result in. Registers
/// come from the VM's counter; the heap and symbol table are only read.
pub struct Parser<'a> {
    tokens: TokenStream,
    symbols: &'a SymbolTable,
    vm: &'a mut VirtualMachine,
    code: Vec<Instr>,
    pending: Option<Binding>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: TokenStream, symbols: &'a SymbolTable, vm: &'a mut VirtualMachine, max_depth: usize) -> Self {
        Parser { tokens, symbols, vm, code: Vec::new(), pending: None, depth: 0, max_depth }
    }

    fn peek(&self) -> &Token {
        self.tokens.peek()
    }

    fn advance(&mut self) -> Token {
        self.tokens.pop().0
    }

    fn error(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self.peek().to_string(),
            span: self.tokens.peek_span(),
        }
    }

    fn expect(&mut self, expected: &Token, what: &'static str) -> Result<()> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(what))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("identifier")),
        }
    }

    fn emit(&mut self, inst: Instr) {
        tracing::trace!(%inst, "emit");
        self.code.push(inst);
    }

    // ---- Entry point ----

    /// Parse the whole stream. On success the program ends with `halt` and
    /// every token has been consumed.
    pub fn parse(mut self) -> Result<Compiled> {
        let result = self.line()?;
        if !self.tokens.at_end() {
            return Err(ParseError::TrailingInput {
                found: self.peek().to_string(),
                span: self.tokens.peek_span(),
            });
        }
        debug_assert_eq!(result, 0);
        self.emit(Instr::Halt);
        Ok(Compiled { code: self.code, binding: self.pending })
    }

    // ---- Grammar ----

    fn line(&mut self) -> Result<Reg> {
        let dest = self.vm.new_register();
        if *self.peek() == Token::Def {
            self.advance();
            let name = self.expect_ident()?;
            self.expect(&Token::Equals, "'=' after variable name")?;
            let binding = self.bind(name)?;
            self.expr(dest)?;
            self.emit(Instr::Store { addr: binding.addr(), reg: dest });
            self.pending = Some(binding);
        } else {
            self.expr(dest)?;
        }
        Ok(dest)
    }

    /// Resolve the storage for a definition. Redefinition reuses the
    /// existing address; a new name gets the next heap address, which is
    /// only reserved when the caller commits the compiled line.
    fn bind(&self, name: String) -> Result<Binding> {
        match self.symbols.lookup(&name) {
            Some(addr) => Ok(Binding::Existing { name, addr }),
            None => {
                let addr = self.vm.next_heap_address(1)?;
                Ok(Binding::New { name, addr })
            }
        }
    }

    fn expr(&mut self, dest: Reg) -> Result<()> {
        let acc = self.vm.new_register();
        self.term(acc)?;
        self.expr_rest(acc, dest)
    }

    /// exprP, with the left operand accumulated in `acc`. Each step computes
    /// into a fresh register, so `a - b - c` is `(a - b) - c`.
    fn expr_rest(&mut self, mut acc: Reg, dest: Reg) -> Result<()> {
        loop {
            match self.peek() {
                Token::Op(op @ (ArithOp::Add | ArithOp::Sub)) => {
                    let op = *op;
                    self.advance();
                    let rhs = self.vm.new_register();
                    self.term(rhs)?;
                    let next = self.vm.new_register();
                    self.emit(Instr::Binary { op, left: acc, right: rhs, dest: next });
                    acc = next;
                }
                Token::RParen | Token::Eof => break,
                _ => return Err(self.error("operator, ')' or end of input")),
            }
        }
        self.emit(Instr::Move { src: acc, dst: dest });
        Ok(())
    }

    fn term(&mut self, dest: Reg) -> Result<()> {
        let acc = self.vm.new_register();
        self.factor(acc)?;
        self.term_rest(acc, dest)
    }

    fn term_rest(&mut self, mut acc: Reg, dest: Reg) -> Result<()> {
        loop {
            match self.peek() {
                Token::Op(op @ (ArithOp::Mul | ArithOp::Div)) => {
                    let op = *op;
                    self.advance();
                    let rhs = self.vm.new_register();
                    self.factor(rhs)?;
                    let next = self.vm.new_register();
                    self.emit(Instr::Binary { op, left: acc, right: rhs, dest: next });
                    acc = next;
                }
                Token::Op(ArithOp::Add | ArithOp::Sub) | Token::RParen | Token::Eof => break,
                _ => return Err(self.error("operator, ')' or end of input")),
            }
        }
        self.emit(Instr::Move { src: acc, dst: dest });
        Ok(())
    }

    fn factor(&mut self, dest: Reg) -> Result<()> {
        match self.peek() {
            Token::LParen => {
                let open = self.tokens.peek_span();
                if self.depth >= self.max_depth {
                    return Err(ParseError::TooDeep { limit: self.max_depth, span: open });
                }
                self.advance();
                self.depth += 1;
                self.expr(dest)?;
                self.depth -= 1;
                if *self.peek() != Token::RParen {
                    return Err(ParseError::UnclosedParen {
                        open: open.start,
                        found: self.peek().to_string(),
                        span: self.tokens.peek_span(),
                    });
                }
                self.advance();
                Ok(())
            }
            Token::Number(value) => {
                let value = *value;
                self.advance();
                self.emit(Instr::LoadImm { reg: dest, value });
                Ok(())
            }
            Token::Ident(name) => {
                let Some(addr) = self.symbols.lookup(name) else {
                    return Err(ParseError::UndefinedVariable {
                        name: name.clone(),
                        span: self.tokens.peek_span(),
                    });
                };
                self.advance();
                self.emit(Instr::Load { reg: dest, addr });
                Ok(())
            }
            _ => Err(self.error("number, variable or '('")),
        }
    }
}

/// Compile a scanned line against the current symbol table.
pub fn parse(tokens: TokenStream, symbols: &SymbolTable, vm: &mut VirtualMachine, max_depth: usize) -> Result<Compiled> {
    Parser::new(tokens, symbols, vm, max_depth).parse()
}
