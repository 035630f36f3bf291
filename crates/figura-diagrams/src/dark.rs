//! Dark variant generation.
//!
//! `PlantUML` has no dark mode of its own: the dark asset is rendered from a
//! rewritten source with a dark skinparam block, then the SVG is patched for
//! light defaults that older renderers ignore skinparams for.
//!
//! Every dark asset is stamped with a marker comment right after the `<svg>`
//! tag:
//!
//! ```text
//! <!-- figura-plantuml-dark:v2:0123456789abcdef -->
//! ```
//!
//! A dark asset without the current marker is stale and gets regenerated.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::DiagramKind;
use crate::hash::ContentHash;

static STARTUML_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^@startuml[^\n]*\n").unwrap());

static LIGHT_BLUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\?#LightBlue\b").unwrap());

static SVG_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<svg([^>]*)>").unwrap());

/// Light defaults patched in rendered dark SVGs.
const SVG_REPLACEMENTS: &[(&str, &str)] = &[
    ("#FEFECE", "#162238"),
    ("#A80036", "#6EA8FF"),
    ("stroke: #000000", "stroke: #6EA8FF"),
    ("fill=\"#FFFFFF\"", "fill=\"#0F172A\""),
];

const DARK_SKINPARAMS: &[&str] = &[
    "skinparam backgroundColor transparent",
    "skinparam shadowing false",
    "skinparam roundCorner 12",
    "skinparam defaultFontColor #EAF2FF",
    "skinparam hyperlinkColor #89BBFF",
    "skinparam ArrowColor #78AFFF",
    "skinparam LineColor #6EA8FF",
    "skinparam ArrowThickness 1.3",
    "skinparam NoteBackgroundColor #111A2C",
    "skinparam NoteBorderColor #5E90DA",
    "skinparam NoteFontColor #EAF2FF",
    "skinparam NoteShadowing false",
    "skinparam TitleFontColor #F4F8FF",
    "skinparam CaptionFontColor #C4D3EE",
    "skinparam LegendBackgroundColor #0F172A",
    "skinparam LegendBorderColor #5E90DA",
    "skinparam LegendFontColor #EAF2FF",
    "skinparam ActorBackgroundColor #0F172A",
    "skinparam ActorBorderColor #78AFFF",
    "skinparam ActorFontColor #EAF2FF",
    "skinparam ParticipantBackgroundColor #131C2E",
    "skinparam ParticipantBorderColor #6EA8FF",
    "skinparam ParticipantFontColor #EAF2FF",
    "skinparam LifeLineBorderColor #425675",
    "skinparam LifeLineBackgroundColor #0F172A",
    "skinparam SequenceLifeLineBorderColor #425675",
    "skinparam SequenceLifeLineBackgroundColor #0F172A",
    "skinparam SequenceGroupBorderColor #6EA8FF",
    "skinparam SequenceGroupBackgroundColor #0E1626",
    "skinparam SequenceBoxBorderColor #6EA8FF",
    "skinparam SequenceBoxBackgroundColor #0E1626",
    "skinparam SequenceReferenceBorderColor #6EA8FF",
    "skinparam SequenceReferenceBackgroundColor #131C2E",
    "skinparam PackageBackgroundColor #0F172A",
    "skinparam PackageBorderColor #6EA8FF",
    "skinparam PackageFontColor #EAF2FF",
    "skinparam FolderBackgroundColor #0F172A",
    "skinparam FolderBorderColor #6EA8FF",
    "skinparam FolderFontColor #EAF2FF",
    "skinparam FrameBackgroundColor #0F172A",
    "skinparam FrameBorderColor #6EA8FF",
    "skinparam FrameFontColor #EAF2FF",
    "skinparam NodeBackgroundColor #10192B",
    "skinparam NodeBorderColor #6EA8FF",
    "skinparam NodeFontColor #EAF2FF",
    "skinparam RectangleBackgroundColor #131C2E",
    "skinparam RectangleBorderColor #6EA8FF",
    "skinparam RectangleFontColor #EAF2FF",
    "skinparam EntityBackgroundColor #162238",
    "skinparam EntityBorderColor #6EA8FF",
    "skinparam EntityFontColor #EAF2FF",
    "skinparam ComponentBackgroundColor #162238",
    "skinparam ComponentBorderColor #6EA8FF",
    "skinparam ComponentFontColor #EAF2FF",
    "skinparam CloudBackgroundColor #17263F",
    "skinparam CloudBorderColor #78AFFF",
    "skinparam CloudFontColor #EAF2FF",
    "skinparam DatabaseBackgroundColor #162238",
    "skinparam DatabaseBorderColor #6EA8FF",
    "skinparam DatabaseFontColor #EAF2FF",
    "skinparam StorageBackgroundColor #162238",
    "skinparam StorageBorderColor #6EA8FF",
    "skinparam StorageFontColor #EAF2FF",
    "skinparam QueueBackgroundColor #162238",
    "skinparam QueueBorderColor #6EA8FF",
    "skinparam QueueFontColor #EAF2FF",
    "skinparam UsecaseBackgroundColor #17263F",
    "skinparam UsecaseBorderColor #78AFFF",
    "skinparam UsecaseFontColor #EAF2FF",
    "skinparam ActivityBackgroundColor #162238",
    "skinparam ActivityBorderColor #6EA8FF",
    "skinparam ActivityFontColor #EAF2FF",
    "skinparam DiamondBackgroundColor #17263F",
    "skinparam DiamondBorderColor #78AFFF",
    "skinparam DiamondFontColor #EAF2FF",
    "skinparam StartColor #78AFFF",
    "skinparam EndColor #78AFFF",
    "skinparam BarColor #6EA8FF",
    "skinparam StateBackgroundColor #162238",
    "skinparam StateBorderColor #6EA8FF",
    "skinparam StateFontColor #EAF2FF",
    "skinparam ClassBackgroundColor #131C2E",
    "skinparam ClassBorderColor #6EA8FF",
    "skinparam ClassFontColor #EAF2FF",
    "skinparam ClassHeaderBackgroundColor #162238",
    "skinparam ObjectBackgroundColor #131C2E",
    "skinparam ObjectBorderColor #6EA8FF",
    "skinparam ObjectFontColor #EAF2FF",
];

/// Marker identifying a current dark asset for `hash`.
#[must_use]
pub fn dark_marker(kind: DiagramKind, hash: &ContentHash) -> String {
    format!("<!-- figura-{kind}-dark:{}:{hash} -->", kind.dark_version())
}

/// Whether `svg` carries the current dark marker for `hash`.
#[must_use]
pub fn has_current_marker(svg: &str, kind: DiagramKind, hash: &ContentHash) -> bool {
    svg.contains(&dark_marker(kind, hash))
}

/// Insert the dark marker right after the first `<svg ...>` tag.
///
/// Returns `None` if the document has no `<svg>` tag.
#[must_use]
pub fn stamp_marker(svg: &str, kind: DiagramKind, hash: &ContentHash) -> Option<String> {
    if !SVG_OPEN_TAG.is_match(svg) {
        return None;
    }
    let marker = dark_marker(kind, hash);
    let stamped = SVG_OPEN_TAG.replace(svg, |caps: &Captures<'_>| {
        format!("<svg{}>\n{marker}", &caps[1])
    });
    Some(stamped.into_owned())
}

/// Rewrite `PlantUML` source for the dark render.
///
/// The skinparam block goes right after the first `@startuml` line, and
/// explicit `#LightBlue` fills are darkened.
#[must_use]
pub fn dark_plantuml_source(source: &str) -> String {
    let header = format!(
        "\n' figura dark variant {}\n{}\n\n",
        DiagramKind::PlantUml.dark_version(),
        DARK_SKINPARAMS.join("\n")
    );
    let with_params = STARTUML_LINE.replace(source, |caps: &Captures<'_>| {
        format!("{}{header}", &caps[0])
    });
    LIGHT_BLUE.replace_all(&with_params, "#1F2937").into_owned()
}

/// Patch light defaults left in a dark `PlantUML` SVG.
#[must_use]
pub fn postprocess_dark_svg(svg: &str) -> String {
    SVG_REPLACEMENTS
        .iter()
        .fold(svg.to_owned(), |out, (from, to)| out.replace(from, to))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn hash() -> ContentHash {
        ContentHash::compute(DiagramKind::PlantUml, b"@startuml\n@enduml")
    }

    #[test]
    fn test_marker_format() {
        let hash = hash();
        assert_eq!(
            dark_marker(DiagramKind::PlantUml, &hash),
            format!("<!-- figura-plantuml-dark:v2:{hash} -->")
        );
        assert_eq!(
            dark_marker(DiagramKind::DrawIo, &hash),
            format!("<!-- figura-drawio-dark:v1:{hash} -->")
        );
    }

    #[test]
    fn test_stamp_marker_after_first_svg_tag() {
        let hash = hash();
        let svg = r#"<?xml version="1.0"?><svg width="10"><g/><svg id="inner"></svg></svg>"#;

        let stamped = stamp_marker(svg, DiagramKind::PlantUml, &hash).unwrap();

        assert_eq!(
            stamped,
            format!(
                "<?xml version=\"1.0\"?><svg width=\"10\">\n{}<g/><svg id=\"inner\"></svg></svg>",
                dark_marker(DiagramKind::PlantUml, &hash)
            )
        );
        assert!(has_current_marker(&stamped, DiagramKind::PlantUml, &hash));
        assert!(!has_current_marker(&stamped, DiagramKind::DrawIo, &hash));
    }

    #[test]
    fn test_stamp_marker_without_svg() {
        assert_eq!(stamp_marker("<html/>", DiagramKind::DrawIo, &hash()), None);
    }

    #[test]
    fn test_old_marker_is_not_current() {
        let hash = hash();
        let svg = format!("<svg>\n<!-- figura-plantuml-dark:v1:{hash} --></svg>");
        assert!(!has_current_marker(&svg, DiagramKind::PlantUml, &hash));
    }

    #[test]
    fn test_dark_source_inserts_skinparams_after_startuml() {
        let source = "@startuml boot\nbox \"Ground\" #LightBlue\nA -> B\nend box\n@enduml";

        let dark = dark_plantuml_source(source);

        assert!(dark.starts_with(
            "@startuml boot\n\n' figura dark variant v2\nskinparam backgroundColor transparent\n"
        ));
        assert!(dark.contains("skinparam ObjectFontColor #EAF2FF\n\nbox \"Ground\" #1F2937\n"));
        assert!(!dark.contains("LightBlue"));
        assert!(dark.ends_with("@enduml"));
    }

    #[test]
    fn test_dark_source_escaped_light_blue() {
        let dark = dark_plantuml_source("@startuml\nrectangle X \\#LightBlue\n@enduml");
        assert!(dark.contains("rectangle X #1F2937"));
    }

    #[test]
    fn test_dark_source_without_startuml_line() {
        assert_eq!(dark_plantuml_source("A -> B"), "A -> B");
    }

    #[test]
    fn test_postprocess_dark_svg() {
        let svg = r##"<rect fill="#FFFFFF" style="stroke: #000000;"/><path fill="#FEFECE" stroke="#A80036"/>"##;

        assert_eq!(
            postprocess_dark_svg(svg),
            r##"<rect fill="#0F172A" style="stroke: #6EA8FF;"/><path fill="#162238" stroke="#6EA8FF"/>"##
        );
    }
}
