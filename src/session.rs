use crate::config::Config;
use crate::lexer;
use crate::parser::{self, Binding, Compiled, ParseError};
use crate::symbols::SymbolTable;
use crate::vm::{Addr, VirtualMachine, VmError};

/// The one failure callers see. Displays as `Unable to parse input` whatever
/// went wrong; the cause is kept for logs and diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("Unable to parse input")]
pub struct EvalError {
    #[source]
    reason: Reason,
}

#[derive(Debug, thiserror::Error)]
pub enum Reason {
    #[error(transparent)]
    Parse(ParseError),
    #[error(transparent)]
    Vm(VmError),
}

impl EvalError {
    pub fn reason(&self) -> &Reason {
        &self.reason
    }
}

impl From<ParseError> for EvalError {
    fn from(e: ParseError) -> Self {
        EvalError { reason: Reason::Parse(e) }
    }
}

impl From<VmError> for EvalError {
    fn from(e: VmError) -> Self {
        EvalError { reason: Reason::Vm(e) }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// A defined variable as seen from outside the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub addr: Addr,
    pub value: f64,
}

/// Interpreter state that outlives a single line: the VM's memory and heap,
/// and the names bound into it. Each `evaluate` either runs a complete
/// program or leaves this state exactly as it was.
#[derive(Debug)]
pub struct Session {
    vm: VirtualMachine,
    symbols: SymbolTable,
    config: Config,
}

impl Default for Session {
    fn default() -> Self {
        Session::with_config(Config::default())
    }
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn with_config(config: Config) -> Self {
        Session { vm: VirtualMachine::new(&config), symbols: SymbolTable::new(), config }
    }

    /// Scan, compile and run one line.
    pub fn evaluate(&mut self, line: &str) -> Result<f64> {
        let result = self.run_line(line);
        self.vm.reset_registers();
        match &result {
            Ok(value) => tracing::debug!(line, value, "evaluated"),
            Err(e) => tracing::debug!(line, reason = %e.reason(), "evaluation failed"),
        }
        result
    }

    /// Compile a line without running it or committing a definition. The
    /// program is held to the same limits `evaluate` applies when loading.
    pub fn compile(&mut self, line: &str) -> Result<Compiled> {
        let result = self.compile_line(line);
        self.vm.reset_registers();
        let compiled = result?;
        self.vm.check(&compiled.code)?;
        Ok(compiled)
    }

    /// Defined variables in order of definition, with their current values.
    pub fn variables(&self) -> Vec<Variable> {
        self.symbols
            .iter()
            .map(|(name, addr)| Variable {
                name: name.to_string(),
                addr,
                value: self.vm.read(addr).unwrap_or(f64::NAN),
            })
            .collect()
    }

    pub fn lookup(&self, name: &str) -> Option<Addr> {
        self.symbols.lookup(name)
    }

    pub fn vm(&self) -> &VirtualMachine {
        &self.vm
    }

    fn compile_line(&mut self, line: &str) -> Result<Compiled> {
        let tokens = lexer::scan(line);
        let compiled = parser::parse(tokens, &self.symbols, &mut self.vm, self.config.max_depth)?;
        tracing::debug!(
            instructions = compiled.code.len(),
            defines = compiled.binding.as_ref().map(Binding::name),
            "compiled"
        );
        Ok(compiled)
    }

    fn run_line(&mut self, line: &str) -> Result<f64> {
        let compiled = self.compile_line(line)?;
        self.vm.load(&compiled.code)?;
        if let Some(Binding::New { name, addr }) = &compiled.binding {
            let got = self.vm.allocate(1)?;
            debug_assert_eq!(got, *addr);
            self.symbols.insert(name, got);
            tracing::debug!(name = name.as_str(), addr = got, "defined variable");
        }
        Ok(self.vm.execute())
    }
}
