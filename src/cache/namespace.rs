//! Key Namespace Module
//!
//! Builds fully qualified keys of the form `{system}:{contract}:{key}`.

/// Key prefix shared by every entry of one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    /// `{system}:{contract}` without the trailing separator
    root: String,
}

impl KeyNamespace {
    pub fn new(system_name: &str, contract_name: &str) -> Self {
        Self {
            root: format!("{}:{}", system_name, contract_name),
        }
    }

    /// Prepends the namespace to a caller key. Embedded colons are not escaped.
    pub fn complete(&self, key: &str) -> String {
        format!("{}:{}", self.root, key)
    }

    /// The `{system}:{contract}:` prefix.
    pub fn prefix(&self) -> String {
        format!("{}:", self.root)
    }

    /// Glob matching every key of this namespace that starts with `key_prefix`.
    pub fn pattern(&self, key_prefix: &str) -> String {
        format!("{}:{}*", self.root, key_prefix)
    }
}
