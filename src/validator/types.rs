use std::fmt;

/// Adresse syntaxiquement valide, découpée sur le premier '@'.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
    raw: String,
    at: usize,
}

impl EmailAddress {
    /// Returns `None` unless `input` passes [`is_valid_syntax`](super::is_valid_syntax).
    pub fn parse(input: &str) -> Option<Self> {
        if !super::is_valid_syntax(input) {
            return None;
        }
        let at = input.find('@')?;
        Some(Self {
            raw: input.to_string(),
            at,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn local(&self) -> &str {
        &self.raw[..self.at]
    }

    pub fn domain(&self) -> &str {
        &self.raw[self.at + 1..]
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}
