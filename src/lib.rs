//! Line calculator: each line is scanned, compiled to register bytecode and
//! run on a small VM whose memory keeps variables between lines.
//!
//! ```
//! use regcalc::Session;
//!
//! let mut session = Session::new();
//! session.evaluate("def x = 5").unwrap();
//! assert_eq!(session.evaluate("x + 1").unwrap(), 6.0);
//! assert!(session.evaluate("y + 1").is_err());
//! ```

pub mod config;
pub mod diagnostic;
pub mod display;
pub mod lexer;
pub mod parser;
pub mod session;
pub mod symbols;
pub mod vm;

pub use config::Config;
pub use session::{EvalError, Session};
