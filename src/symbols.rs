use std::collections::HashMap;

use crate::vm::Addr;

/// Variable name to heap address. Entries are never removed.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Addr>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn lookup(&self, name: &str) -> Option<Addr> {
        self.entries.get(name).copied()
    }

    /// Bind `name` to `addr`. A name keeps the address it was first given.
    pub fn insert(&mut self, name: &str, addr: Addr) -> Addr {
        *self.entries.entry(name.to_string()).or_insert(addr)
    }

    /// Entries ordered by address, i.e. by order of first definition.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Addr)> {
        let mut all: Vec<(&str, Addr)> = self.entries.iter().map(|(n, a)| (n.as_str(), *a)).collect();
        all.sort_by_key(|(_, a)| *a);
        all.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_missing() {
        let table = SymbolTable::new();
        assert_eq!(table.lookup("x"), None);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn first_address_wins() {
        let mut table = SymbolTable::new();
        assert_eq!(table.insert("x", 1000), 1000);
        assert_eq!(table.insert("x", 2000), 1000);
        assert_eq!(table.lookup("x"), Some(1000));
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut table = SymbolTable::new();
        table.insert("x", 1000);
        table.insert("X", 1001);
        assert_eq!(table.lookup("X"), Some(1001));
        assert_eq!(table.lookup("x"), Some(1000));
    }

    #[test]
    fn iter_in_address_order() {
        let mut table = SymbolTable::new();
        table.insert("b", 1001);
        table.insert("a", 1002);
        table.insert("c", 1000);
        let names: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }
}
