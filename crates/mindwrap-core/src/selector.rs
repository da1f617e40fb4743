//! A deliberately small CSS selector subset, enough for the extraction rule table.
//!
//! Supported grammar (comma-separated alternatives):
//!
//! ```text
//! complex  := compound ( '>' compound )?
//! compound := tag? ( '.' class )* ( ':only-child' )?
//! ```

use crate::html::{element_children, has_class, tag_name};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    only_child: bool,
}

impl Compound {
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let (input, only_child) = match input.strip_suffix(":only-child") {
            Some(rest) => (rest, true),
            None => (input, false),
        };
        let mut parts = input.split('.');
        let tag = parts
            .next()
            .filter(|t| !t.is_empty() && *t != "*")
            .map(|t| t.to_ascii_lowercase());
        let classes = parts.filter(|c| !c.is_empty()).map(str::to_string).collect();
        Some(Self {
            tag,
            classes,
            only_child,
        })
    }

    fn matches(&self, node: roxmltree::Node<'_, '_>) -> bool {
        if !node.is_element() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if tag_name(node) != *tag {
                return false;
            }
        }
        if !self.classes.iter().all(|c| has_class(node, c)) {
            return false;
        }
        if self.only_child {
            let Some(parent) = node.parent_element() else {
                return false;
            };
            if element_children(parent).count() != 1 {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{tag}")?,
            None if self.classes.is_empty() => write!(f, "*")?,
            None => {}
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        if self.only_child {
            write!(f, ":only-child")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parent: Option<Compound>,
    subject: Compound,
}

impl Complex {
    fn matches(&self, node: roxmltree::Node<'_, '_>) -> bool {
        if !self.subject.matches(node) {
            return false;
        }
        match &self.parent {
            None => true,
            Some(parent) => node.parent_element().is_some_and(|p| parent.matches(p)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList(Vec<Complex>);

impl SelectorList {
    /// Parses a selector list. Alternatives that do not fit the supported grammar are skipped.
    pub fn parse(input: &str) -> Self {
        let mut out = Vec::new();
        for alternative in input.split(',') {
            let mut parts = alternative.split('>');
            let first = parts.next().and_then(Compound::parse);
            let second = parts.next().map(Compound::parse);
            if parts.next().is_some() {
                tracing::trace!(selector = alternative.trim(), "unsupported selector skipped");
                continue;
            }
            let complex = match (first, second) {
                (Some(subject), None) => Complex {
                    parent: None,
                    subject,
                },
                (Some(parent), Some(Some(subject))) => Complex {
                    parent: Some(parent),
                    subject,
                },
                _ => continue,
            };
            out.push(complex);
        }
        Self(out)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, node: roxmltree::Node<'_, '_>) -> bool {
        self.0.iter().any(|c| c.matches(node))
    }

    /// Returns the first descendant of `node` (excluding `node` itself) matching this list.
    pub fn query<'a, 'input>(
        &self,
        node: roxmltree::Node<'a, 'input>,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        node.descendants().skip(1).find(|d| self.matches(*d))
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, complex) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if let Some(parent) = &complex.parent {
                write!(f, "{parent}>")?;
            }
            write!(f, "{}", complex.subject)?;
        }
        Ok(())
    }
}

impl From<&str> for SelectorList {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
