//! Tuple keys
//!
//! Backend keys are ordered tuples of string and integer parts, e.g.
//! `("json_data_chunk", "table1", 3)`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One component of a tuple key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Int(u64),
    Str(String),
}

impl From<&str> for KeyPart {
    fn from(s: &str) -> Self {
        KeyPart::Str(s.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(s: String) -> Self {
        KeyPart::Str(s)
    }
}

impl From<u64> for KeyPart {
    fn from(n: u64) -> Self {
        KeyPart::Int(n)
    }
}

impl From<usize> for KeyPart {
    fn from(n: usize) -> Self {
        KeyPart::Int(n as u64)
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(n) => write!(f, "{}", n),
            KeyPart::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A tuple-shaped backend key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KvKey(Vec<KeyPart>);

impl KvKey {
    /// Build a key from its parts
    pub fn new(parts: Vec<KeyPart>) -> Self {
        Self(parts)
    }

    /// The key's parts in order
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Canonical string encoding, used by persistent backends as a map key.
    ///
    /// The encoding is the compact JSON array of the parts, so
    /// `("a", 1)` and `("a", "1")` never collide.
    pub fn encode(&self) -> String {
        let mut out = String::from("[");
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            match part {
                KeyPart::Int(n) => out.push_str(&n.to_string()),
                KeyPart::Str(s) => out.push_str(&serde_json::Value::from(s.as_str()).to_string()),
            }
        }
        out.push(']');
        out
    }
}

impl fmt::Display for KvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", part)?;
        }
        write!(f, ")")
    }
}

/// Build a [`KvKey`] from a list of parts: `kv_key!("json_data", key)`
#[macro_export]
macro_rules! kv_key {
    ($($part:expr),+ $(,)?) => {
        $crate::kv::KvKey::new(vec![$($crate::kv::KeyPart::from($part)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_distinguishes_int_and_string() {
        let a = crate::kv_key!("json_data_chunk", "t", 1usize);
        let b = crate::kv_key!("json_data_chunk", "t", "1");
        assert_ne!(a.encode(), b.encode());
        assert_eq!(a.encode(), r#"["json_data_chunk","t",1]"#);
        assert_eq!(b.encode(), r#"["json_data_chunk","t","1"]"#);
    }

    #[test]
    fn test_encoding_escapes_strings() {
        let key = crate::kv_key!("json_data", "we\"ird");
        let parsed: serde_json::Value = serde_json::from_str(&key.encode()).unwrap();
        assert_eq!(parsed[1], "we\"ird");
    }

    #[test]
    fn test_display() {
        let key = crate::kv_key!("json_data_chunk", "table1", 3usize);
        assert_eq!(key.to_string(), "(json_data_chunk, table1, 3)");
    }
}
