//! Structured cache keys.

use std::fmt;

/// One component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
  Text(String),
  Int(i64),
}

impl From<&str> for KeyPart {
  fn from(s: &str) -> Self {
    KeyPart::Text(s.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(s: String) -> Self {
    KeyPart::Text(s)
  }
}

impl From<i64> for KeyPart {
  fn from(n: i64) -> Self {
    KeyPart::Int(n)
  }
}

impl From<u32> for KeyPart {
  fn from(n: u32) -> Self {
    KeyPart::Int(i64::from(n))
  }
}

impl From<u64> for KeyPart {
  fn from(n: u64) -> Self {
    KeyPart::Int(i64::try_from(n).unwrap_or(i64::MAX))
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeyPart::Text(s) => f.write_str(s),
      KeyPart::Int(n) => write!(f, "{}", n),
    }
  }
}

/// Cache key: a resource name followed by the query's parameters.
///
/// Equal parameters always produce equal keys. Prefix matching works on
/// whole parts, so `["incidents"]` covers every list page but not
/// `["incident", 3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
  pub fn new(resource: &str) -> Self {
    Self(vec![KeyPart::from(resource)])
  }

  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.0.push(part.into());
    self
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.0
  }

  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.0.starts_with(&prefix.0)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, part) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("/")?;
      }
      write!(f, "{}", part)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_identical_params_give_identical_keys() {
    let a = QueryKey::new("incidents").with(1u32).with(5u32).with("title");
    let b = QueryKey::new("incidents").with(1u32).with(5u32).with("title");
    assert_eq!(a, b);
  }

  #[test]
  fn test_prefix_matches_whole_parts() {
    let list = QueryKey::new("incidents").with(2u32);
    let detail = QueryKey::new("incident").with(3u64);
    let prefix = QueryKey::new("incidents");

    assert!(list.starts_with(&prefix));
    assert!(!detail.starts_with(&prefix));
    assert!(prefix.starts_with(&prefix));
  }

  #[test]
  fn test_display() {
    let key = QueryKey::new("incidents")
      .with(1u32)
      .with(5u32)
      .with("updatedUtc")
      .with("desc");
    assert_eq!(key.to_string(), "incidents/1/5/updatedUtc/desc");
  }
}
