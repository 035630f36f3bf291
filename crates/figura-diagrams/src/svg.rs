//! SVG output validation.

use quick_xml::Reader;
use quick_xml::events::Event;

/// Whether `content` is an XML document whose root element is `<svg>`.
///
/// Declarations, comments, doctypes and processing instructions before the
/// root are skipped. Malformed XML before the root counts as invalid.
#[must_use]
pub fn has_svg_root(content: &str) -> bool {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                return e.local_name().as_ref() == b"svg";
            }
            Ok(Event::Eof) | Err(_) => return false,
            Ok(_) => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_root() {
        assert!(has_svg_root(
            r#"<?xml version="1.0" encoding="UTF-8"?><svg xmlns="http://www.w3.org/2000/svg"><g/></svg>"#
        ));
        assert!(has_svg_root("<!-- rendered -->\n<svg/>"));
        assert!(has_svg_root(
            r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"></svg:svg>"#
        ));
    }

    #[test]
    fn test_non_svg_root() {
        assert!(!has_svg_root("<html><svg/></html>"));
        assert!(!has_svg_root(""));
        assert!(!has_svg_root("Error: java not found"));
    }
}
