//! Diagram kinds and their declaration rules.

use std::fmt;

use serde::Serialize;

/// Supported diagram kinds.
///
/// `PlantUml` diagrams are declared inline in the document; `DrawIo` diagrams
/// are referenced by path to a `.drawio` file next to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    PlantUml,
    DrawIo,
}

impl DiagramKind {
    /// Parse kind from a code fence language tag.
    ///
    /// Returns None if the tag does not name a diagram kind. Untagged
    /// `PlantUML` blocks are recognized by content instead, see
    /// [`crate::extract`].
    #[must_use]
    pub fn from_fence_tag(tag: &str) -> Option<Self> {
        match tag {
            "plantuml" | "puml" => Some(Self::PlantUml),
            "drawio" => Some(Self::DrawIo),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlantUml => "plantuml",
            Self::DrawIo => "drawio",
        }
    }

    /// Alt text used when the declaration does not set one.
    #[must_use]
    pub fn default_alt(self) -> &'static str {
        match self {
            Self::PlantUml => "PlantUML diagram",
            Self::DrawIo => "Draw.io diagram",
        }
    }

    /// Fence attributes accepted for this kind.
    pub(crate) fn allowed_attributes(self) -> &'static [&'static str] {
        match self {
            Self::PlantUml => &["alt"],
            Self::DrawIo => &["src", "alt", "className", "width", "height"],
        }
    }

    /// Fence attributes that must be present and non-empty.
    pub(crate) fn required_attributes(self) -> &'static [&'static str] {
        match self {
            Self::PlantUml => &[],
            Self::DrawIo => &["src"],
        }
    }

    /// Fence attributes rejected outright, with the reason shown to the user.
    pub(crate) fn forbidden_attributes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::PlantUml => &[],
            Self::DrawIo => &[(
                "page",
                "only single-page .drawio files are supported",
            )],
        }
    }

    /// Namespace mixed into content hashes. Bump the version whenever
    /// canonicalization changes so old assets stop matching.
    pub(crate) fn hash_namespace(self) -> &'static str {
        match self {
            Self::PlantUml => "figura-plantuml-static:v1",
            Self::DrawIo => "figura-drawio-static:v1",
        }
    }

    /// Theme generator version stamped into dark assets.
    #[must_use]
    pub fn dark_version(self) -> &'static str {
        match self {
            Self::PlantUml => "v2",
            Self::DrawIo => "v1",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fence_tag() {
        let tags = [
            ("plantuml", Some(DiagramKind::PlantUml)),
            ("puml", Some(DiagramKind::PlantUml)),
            ("drawio", Some(DiagramKind::DrawIo)),
            ("mermaid", None),
            ("", None),
            ("PlantUML", None), // callers lowercase first
        ];

        for (tag, expected) in tags {
            assert_eq!(DiagramKind::from_fence_tag(tag), expected, "tag: {tag}");
        }
    }

    #[test]
    fn test_as_str_round_trips_through_fence_tag() {
        for kind in [DiagramKind::PlantUml, DiagramKind::DrawIo] {
            assert_eq!(DiagramKind::from_fence_tag(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_drawio_rules() {
        let kind = DiagramKind::DrawIo;
        assert!(kind.allowed_attributes().contains(&"className"));
        assert_eq!(kind.required_attributes(), &["src"]);
        assert_eq!(kind.forbidden_attributes()[0].0, "page");
    }

    #[test]
    fn test_hash_namespaces_differ() {
        assert_ne!(
            DiagramKind::PlantUml.hash_namespace(),
            DiagramKind::DrawIo.hash_namespace()
        );
    }
}
