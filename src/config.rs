use serde::{Deserialize, Serialize};

/// Memory layout and parser limits for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// First heap address. Programs are loaded below it, so it is also the
    /// largest instruction count a single line may compile to.
    pub heap_base: usize,
    /// Where the stack region begins; the heap may not grow into it.
    pub stack_top: usize,
    /// Deepest parenthesis nesting accepted by the parser.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config { heap_base: 1_000, stack_top: 1_000_000_000, max_depth: 256 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.heap_base, 1_000);
        assert_eq!(config.stack_top, 1_000_000_000);
    }
}
