//! Locators: immutable element queries.
//!
//! A [`Locator`] pairs a strategy with a selector string. It is a plain value,
//! owned by no session, and can be reused across sessions and pages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Query identifying zero or more elements in the current page.
///
/// Serialized as a single-key map (`css: .cookie-banner`,
/// `test_id: accept`), which reads the same in YAML and JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LocatorRepr", into = "LocatorRepr")]
pub enum Locator {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath expression
    XPath(String),
    /// Element `id` attribute
    Id(String),
    /// Element `name` attribute
    Name(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
}

impl Locator {
    /// Create a CSS locator
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath locator
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Create an id locator
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a name-attribute locator
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create a test ID locator
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Strategy label used in descriptions
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "CssSelector",
            Self::XPath(_) => "XPath",
            Self::Id(_) => "Id",
            Self::Name(_) => "Name",
            Self::TestId(_) => "TestId",
        }
    }

    /// Raw selector string
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Css(s) | Self::XPath(s) | Self::Id(s) | Self::Name(s) | Self::TestId(s) => s,
        }
    }

    /// Equivalent CSS selector, when the strategy has one.
    ///
    /// XPath has no CSS form and returns `None`.
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Css(s) => Some(s.clone()),
            Self::XPath(_) => None,
            Self::Id(id) => Some(format!("[id={}]", css_string(id))),
            Self::Name(name) => Some(format!("[name={}]", css_string(name))),
            Self::TestId(id) => Some(format!("[data-testid={}]", css_string(id))),
        }
    }
}

/// Wire form of [`Locator`]: exactly one strategy key must be set
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocatorRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xpath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    test_id: Option<String>,
}

impl TryFrom<LocatorRepr> for Locator {
    type Error = String;

    fn try_from(repr: LocatorRepr) -> Result<Self, Self::Error> {
        let candidates = [
            repr.css.map(Self::Css),
            repr.xpath.map(Self::XPath),
            repr.id.map(Self::Id),
            repr.name.map(Self::Name),
            repr.test_id.map(Self::TestId),
        ];
        let mut set = candidates.into_iter().flatten();
        match (set.next(), set.next()) {
            (Some(locator), None) => Ok(locator),
            (None, _) => Err("locator needs one of css, xpath, id, name, test_id".to_string()),
            (Some(_), Some(_)) => Err("locator must set exactly one strategy".to_string()),
        }
    }
}

impl From<Locator> for LocatorRepr {
    fn from(locator: Locator) -> Self {
        let mut repr = Self::default();
        match locator {
            Locator::Css(s) => repr.css = Some(s),
            Locator::XPath(s) => repr.xpath = Some(s),
            Locator::Id(s) => repr.id = Some(s),
            Locator::Name(s) => repr.name = Some(s),
            Locator::TestId(s) => repr.test_id = Some(s),
        }
        repr
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "By.{}: {}", self.strategy(), self.value())
    }
}

/// Quote a value for use inside a CSS attribute selector.
fn css_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
