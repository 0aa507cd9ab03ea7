use serde::{Deserialize, Serialize};

/// Represents ways to locate an element on a web page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Select by CSS expression (the default form)
    Css(String),
    /// Select by visible text content
    Text(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl Selector {
    /// The raw expression handed to the browser backend.
    pub fn expression(&self) -> &str {
        match self {
            Selector::Css(s) | Selector::Text(s) | Selector::Invalid(s) => s,
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{s}"),
            Selector::Text(s) => write!(f, "text:{s}"),
            Selector::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        match s {
            "" => Selector::Invalid("empty selector".to_string()),
            _ if s.to_lowercase().starts_with("css:") => Selector::Css(s[4..].trim().to_string()),
            _ if s.to_lowercase().starts_with("text:") => Selector::Text(s[5..].trim().to_string()),
            // Bare strings are CSS: `#id`, `.class`, `input[name='q']`, ...
            _ => Selector::Css(s.to_string()),
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::from(s.as_str())
    }
}

/// Parse an ordered candidate list, most-specific-first.
pub fn candidates(exprs: &[&str]) -> Vec<Selector> {
    exprs.iter().map(|e| Selector::from(*e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_is_css() {
        assert_eq!(
            Selector::from("input[name='user-name']"),
            Selector::Css("input[name='user-name']".to_string())
        );
        assert_eq!(Selector::from("#login-button"), Selector::Css("#login-button".to_string()));
    }

    #[test]
    fn prefixed_forms() {
        assert_eq!(Selector::from("css: .cart_link"), Selector::Css(".cart_link".to_string()));
        assert_eq!(Selector::from("text:Checkout"), Selector::Text("Checkout".to_string()));
    }

    #[test]
    fn empty_is_invalid() {
        assert!(matches!(Selector::from("   "), Selector::Invalid(_)));
    }

    #[test]
    fn candidate_order_is_preserved() {
        let list = candidates(&["#user-name", "input[type='email']"]);
        assert_eq!(list[0], Selector::Css("#user-name".to_string()));
        assert_eq!(list[1], Selector::Css("input[type='email']".to_string()));
    }
}
