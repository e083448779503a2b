//! Alias tables: alias name -> canonical name
//!
//! Tables are rebuilt from declared aliases, never accumulated, so applying
//! them any number of times yields the same mapping.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, String>,
}

impl AliasTable {
    /// Rebuild the table from `(canonical, declared aliases)` pairs given in
    /// registration order.
    ///
    /// Declared aliases are applied first; a name that is already canonical
    /// or already taken is skipped, so the earlier registration wins. With
    /// `auto_short`, each canonical name then gets its first letter as an
    /// alias when that letter is still free.
    pub fn rebuild<'a, I>(&mut self, units: I, auto_short: bool)
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        self.entries.clear();
        let units: Vec<(&str, &[String])> = units.into_iter().collect();
        let canonical: BTreeSet<&str> = units.iter().map(|(name, _)| *name).collect();

        for (name, aliases) in &units {
            for alias in aliases.iter() {
                if canonical.contains(alias.as_str()) || self.entries.contains_key(alias) {
                    trace!("alias '{}' for '{}' already taken, skipped", alias, name);
                    continue;
                }
                self.entries.insert(alias.clone(), name.to_string());
            }
        }

        if auto_short {
            for (name, _) in &units {
                let Some(letter) = name.chars().next() else {
                    continue;
                };
                let short = letter.to_string();
                if canonical.contains(short.as_str()) || self.entries.contains_key(&short) {
                    continue;
                }
                trace!("auto alias '{}' -> '{}'", short, name);
                self.entries.insert(short, name.to_string());
            }
        }
    }

    /// Look up an alias. Canonical names are not in the table.
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries.get(alias).map(String::as_str)
    }

    /// Aliases pointing at `canonical`, sorted.
    pub fn aliases_of<'a>(&'a self, canonical: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, target)| target.as_str() == canonical)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn given_colliding_aliases_when_rebuilding_then_earlier_registration_wins() {
        let debug = strings(&["x"]);
        let dry = strings(&["x", "n"]);
        let mut table = AliasTable::default();

        table.rebuild([("debug", debug.as_slice()), ("dry", dry.as_slice())], false);

        assert_eq!(table.get("x"), Some("debug"));
        assert_eq!(table.get("n"), Some("dry"));
    }

    #[test]
    fn given_auto_short_when_rebuilding_then_first_free_letter_is_used() {
        let none: Vec<String> = vec![];
        let mut table = AliasTable::default();

        table.rebuild(
            [("debug", none.as_slice()), ("dry", none.as_slice()), ("v", none.as_slice())],
            true,
        );

        assert_eq!(table.get("d"), Some("debug"));
        assert_eq!(table.aliases_of("dry").count(), 0);
        assert_eq!(table.get("v"), None, "single-letter canonical names need no alias");
    }

    #[test]
    fn given_rebuilt_twice_when_comparing_then_tables_are_identical() {
        let aliases = strings(&["f"]);
        let mut first = AliasTable::default();
        first.rebuild([("force", aliases.as_slice())], true);
        let mut second = first.clone();
        second.rebuild([("force", aliases.as_slice())], true);

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
