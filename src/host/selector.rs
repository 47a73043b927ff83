//! Minimal structural selectors
//!
//! Supports the subset the overlay needs: `tag#id.class` compounds joined
//! by descendant combinators, e.g. `div#homeTab div.MyMedia a.cardImageContainer`.

use crate::error::{OverlayError, OverlayResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Elements the overlay is attached to
pub const CARD_SELECTORS: &[&str] = &["a.cardImageContainer", "div.listItemImage"];

/// Card contexts that never get a badge: cast members on an item detail
/// page, and the library tiles in the home tab's "My Media" row
pub const IGNORE_SELECTORS: &[&str] = &[
    "div#itemDetailPage div.detailPageContent div#castCollapsible a.cardImageContainer",
    "div#indexPage div#homeTab div.homeSectionsContainer div.MyMedia a.cardImageContainer",
];

/// One element in a host tree: tag, optional id, classes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeDescriptor {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl NodeDescriptor {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

impl FromStr for NodeDescriptor {
    type Err = OverlayError;

    fn from_str(s: &str) -> OverlayResult<Self> {
        let compound = Compound::parse(s)?;
        let tag = compound.tag.ok_or_else(|| OverlayError::SelectorInvalid {
            selector: s.to_string(),
            reason: "element needs a tag name".to_string(),
        })?;
        Ok(Self {
            tag,
            id: compound.id,
            classes: compound.classes,
        })
    }
}

impl TryFrom<String> for NodeDescriptor {
    type Error = OverlayError;

    fn try_from(value: String) -> OverlayResult<Self> {
        value.parse()
    }
}

impl From<NodeDescriptor> for String {
    fn from(node: NodeDescriptor) -> Self {
        node.to_string()
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        Ok(())
    }
}

/// A single `tag#id.class` compound
#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(s: &str) -> OverlayResult<Self> {
        let invalid = |reason: &str| OverlayError::SelectorInvalid {
            selector: s.to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(invalid("empty compound"));
        }

        let boundary = s.find(['#', '.']).unwrap_or(s.len());
        let (tag, mut rest) = s.split_at(boundary);
        let tag = match tag {
            "" | "*" => None,
            t => Some(t.to_ascii_lowercase()),
        };

        let mut id = None;
        let mut classes = Vec::new();
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return Err(invalid("empty id or class name"));
            }
            if marker == '#' {
                if id.is_some() {
                    return Err(invalid("more than one id"));
                }
                id = Some(name.to_string());
            } else {
                classes.push(name.to_string());
            }
            rest = &body[end..];
        }

        Ok(Self { tag, id, classes })
    }

    fn matches(&self, node: &NodeDescriptor) -> bool {
        self.tag
            .as_deref()
            .is_none_or(|tag| tag.eq_ignore_ascii_case(&node.tag))
            && self
                .id
                .as_deref()
                .is_none_or(|id| node.id.as_deref() == Some(id))
            && self.classes.iter().all(|class| node.has_class(class))
    }
}

/// Compounds joined by descendant combinators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<Compound>,
}

impl Selector {
    pub fn parse(s: &str) -> OverlayResult<Self> {
        let parts = s
            .split_whitespace()
            .map(Compound::parse)
            .collect::<OverlayResult<Vec<_>>>()?;

        if parts.is_empty() {
            return Err(OverlayError::SelectorInvalid {
                selector: s.to_string(),
                reason: "empty selector".to_string(),
            });
        }

        Ok(Self {
            source: s.to_string(),
            parts,
        })
    }

    /// Parse a list of selectors
    pub fn parse_all(selectors: &[&str]) -> OverlayResult<Vec<Self>> {
        selectors.iter().map(|s| Self::parse(s)).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the last node of `path` (root first) matches, like `Element.matches`
    pub fn matches(&self, path: &[NodeDescriptor]) -> bool {
        match path.split_last() {
            Some((node, ancestors)) => self.matches_at(node, ancestors),
            None => false,
        }
    }

    /// Whether any node of `path` matches, like `Element.closest`
    pub fn matches_closest(&self, path: &[NodeDescriptor]) -> bool {
        (0..path.len())
            .rev()
            .any(|i| self.matches_at(&path[i], &path[..i]))
    }

    fn matches_at(&self, node: &NodeDescriptor, ancestors: &[NodeDescriptor]) -> bool {
        let Some((subject, required)) = self.parts.split_last() else {
            return false;
        };
        if !subject.matches(node) {
            return false;
        }

        // Greedy right-to-left subsequence match is exact for descendant-only chains.
        let mut remaining = ancestors.iter().rev();
        required
            .iter()
            .rev()
            .all(|part| remaining.any(|ancestor| part.matches(ancestor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(nodes: &[&str]) -> Vec<NodeDescriptor> {
        nodes.iter().map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn parses_node_descriptor() {
        let node: NodeDescriptor = "DIV#homeTab.tabContent.is-active".parse().unwrap();
        assert_eq!(node.tag, "div");
        assert_eq!(node.id.as_deref(), Some("homeTab"));
        assert_eq!(node.classes, vec!["tabContent", "is-active"]);
        assert_eq!(node.to_string(), "div#homeTab.tabContent.is-active");
    }

    #[test]
    fn rejects_bad_compounds() {
        assert!("".parse::<NodeDescriptor>().is_err());
        assert!(".onlyClass".parse::<NodeDescriptor>().is_err());
        assert!("div..x".parse::<NodeDescriptor>().is_err());
        assert!("div#a#b".parse::<NodeDescriptor>().is_err());
        assert!(Selector::parse("   ").is_err());
    }

    #[test]
    fn card_selectors_match_cards() {
        let cards = Selector::parse_all(CARD_SELECTORS).unwrap();
        let link = path(&["div#reactRoot", "a.cardImageContainer.coveredImage"]);
        let list = path(&["div.listItem", "div.listItemImage"]);
        let other = path(&["div.cardImageContainer"]);

        assert!(cards.iter().any(|s| s.matches(&link)));
        assert!(cards.iter().any(|s| s.matches(&list)));
        assert!(!cards.iter().any(|s| s.matches(&other)));
    }

    #[test]
    fn ignore_rule_matches_cast_cards_only() {
        let rules = Selector::parse_all(IGNORE_SELECTORS).unwrap();
        let cast = path(&[
            "div#itemDetailPage.page.libraryPage",
            "div.detailPageWrapperContainer",
            "div.detailPageContent",
            "div#castCollapsible.verticalSection",
            "div.scrollSlider",
            "a.cardImageContainer",
        ]);
        let episodes = path(&[
            "div#itemDetailPage.page.libraryPage",
            "div.detailPageContent",
            "div#childrenCollapsible",
            "a.cardImageContainer",
        ]);

        assert!(rules.iter().any(|r| r.matches_closest(&cast)));
        assert!(!rules.iter().any(|r| r.matches_closest(&episodes)));
    }

    #[test]
    fn closest_matches_an_ancestor() {
        let rule = Selector::parse("div#homeTab div.MyMedia").unwrap();
        let inside = path(&["div#homeTab", "div.MyMedia.verticalSection", "a.cardImageContainer"]);
        assert!(!rule.matches(&inside));
        assert!(rule.matches_closest(&inside));
    }

    #[test]
    fn ancestors_must_appear_in_order() {
        let rule = Selector::parse("div#outer div#inner a").unwrap();
        assert!(rule.matches(&path(&["div#outer", "section", "div#inner", "a"])));
        assert!(!rule.matches(&path(&["div#inner", "div#outer", "a"])));
    }
}
