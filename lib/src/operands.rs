/*! This module implements the [`OperandDictionary`] type.

An operand dictionary binds names to operand values before a match starts.
A `ceq` check whose name is not filled by an in-pattern capture falls back
to the dictionary, which makes it possible to search for code that uses a
*specific* field, string or constant known only at run time.

Dictionaries are plain owned maps; cloning one is cheap enough that match
results keep a copy so `next_match` sees the same bindings.
*/

use rustc_hash::FxHashMap;

use crate::il::Operand;
use crate::matcher::matches::MatchResult;
use crate::UsageError;

/// A mapping from names to operand values, consumed by `ceq` checks.
#[derive(Debug, Clone, Default)]
pub struct OperandDictionary {
    map: FxHashMap<String, Operand>,
}

impl OperandDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `operand`, replacing any previous binding.
    ///
    /// The name must be a valid operand name (a letter or underscore
    /// followed by letters, digits or underscores) and the operand must not
    /// be [`Operand::None`].
    pub fn add(
        &mut self,
        name: &str,
        operand: Operand,
    ) -> Result<(), UsageError> {
        if !is_valid_operand_name(name) {
            return Err(UsageError::InvalidOperandName(name.to_string()));
        }
        if operand.is_none() {
            return Err(UsageError::NullOperand);
        }
        self.map.insert(name.to_string(), operand);
        Ok(())
    }

    /// Imports every named operand captured by a successful match.
    pub fn add_match(
        &mut self,
        result: &MatchResult<'_>,
    ) -> Result<(), UsageError> {
        for (name, operand) in result.named_operands() {
            self.add(name, operand.clone())?;
        }
        Ok(())
    }

    /// Binds every `(name, operand)` pair produced by the iterator.
    pub fn add_operands<'o>(
        &mut self,
        operands: impl IntoIterator<Item = (&'o str, Operand)>,
    ) -> Result<(), UsageError> {
        for (name, operand) in operands {
            self.add(name, operand)?;
        }
        Ok(())
    }

    /// Looks up a binding.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Operand> {
        self.map.get(name)
    }

    /// Looks up a binding, reporting an error for absent names.
    pub fn fetch(&self, name: &str) -> Result<&Operand, UsageError> {
        self.map
            .get(name)
            .ok_or_else(|| UsageError::UndefinedOperand(name.to_string()))
    }

    /// True if `name` is bound.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if the dictionary holds no bindings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over the bindings, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Operand)> {
        self.map.iter().map(|(name, operand)| (name.as_str(), operand))
    }
}

fn is_valid_operand_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::OperandDictionary;
    use crate::il::Operand;
    use crate::UsageError;

    #[test]
    fn name_validation() {
        let mut dict = OperandDictionary::new();
        assert!(dict.add("x", Operand::Int32(1)).is_ok());
        assert!(dict.add("_x1", Operand::Int32(1)).is_ok());
        assert_eq!(
            dict.add("1x", Operand::Int32(1)),
            Err(UsageError::InvalidOperandName("1x".to_string()))
        );
        assert_eq!(
            dict.add("", Operand::Int32(1)),
            Err(UsageError::InvalidOperandName(String::new()))
        );
        assert_eq!(
            dict.add("a-b", Operand::Int32(1)),
            Err(UsageError::InvalidOperandName("a-b".to_string()))
        );
    }

    #[test]
    fn null_operands_are_rejected() {
        let mut dict = OperandDictionary::new();
        assert_eq!(dict.add("x", Operand::None), Err(UsageError::NullOperand));
    }

    #[test]
    fn lookups() {
        let mut dict = OperandDictionary::new();
        dict.add("x", Operand::string("hello")).unwrap();

        assert_eq!(dict.get("x"), Some(&Operand::string("hello")));
        assert_eq!(dict.get("y"), None);
        assert_eq!(
            dict.fetch("y").unwrap_err(),
            UsageError::UndefinedOperand("y".to_string())
        );

        // `add` replaces existing bindings.
        dict.add("x", Operand::Int32(3)).unwrap();
        assert_eq!(dict.get("x"), Some(&Operand::Int32(3)));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn bulk_insertion() {
        let mut dict = OperandDictionary::new();
        dict.add_operands([
            ("a", Operand::Int32(1)),
            ("b", Operand::string("two")),
        ])
        .unwrap();
        assert_eq!(dict.len(), 2);
        assert!(dict.contains("a"));
        assert!(dict.contains("b"));
    }
}
