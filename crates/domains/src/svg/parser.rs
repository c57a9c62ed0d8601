//! SVG extraction from model output.

use regex::Regex;

/// Message used when a response carries no SVG.
pub const NO_SVG: &str = "No valid SVG found in LLM response";

/// The response held no usable SVG markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", NO_SVG)]
pub struct NoSvgFound;

/// First capture group of `pattern` in `text`.
fn capture(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(text)?;
    caps.get(1).map(|m| m.as_str().trim().to_string())
}

/// Extract SVG markup from a model response.
///
/// Looks, in order, for a ```` ```svg ```` or ```` ```xml ```` fence, a bare
/// ```` ``` ```` fence, then a raw `<svg ...>...</svg>` span. Fenced blocks
/// only count when they contain `<svg`.
pub fn extract_svg(response: &str) -> Result<String, NoSvgFound> {
    for fence in [r"(?s)```(?:svg|xml)\s*\n(.*?)```", r"(?s)```\s*\n(.*?)```"] {
        if let Some(block) = capture(fence, response) {
            if block.contains("<svg") {
                return Ok(block);
            }
        }
    }

    capture(r"(?s)(<svg.*?</svg>)", response).ok_or(NoSvgFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_svg_block() {
        let response = "Here's the SVG:\n\n```svg\n<svg width=\"100\" height=\"100\">\n  <circle cx=\"50\" cy=\"50\" r=\"40\" fill=\"red\"/>\n</svg>\n```\n\nHope you like it!";
        let svg = extract_svg(response).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn test_fenced_xml_block() {
        let response = "```xml\n<svg width=\"200\" height=\"200\">\n  <rect width=\"100\" height=\"100\" fill=\"blue\"/>\n</svg>\n```";
        assert!(extract_svg(response).unwrap().contains("<rect"));
    }

    #[test]
    fn test_generic_fenced_block() {
        let response = "```\n<svg width=\"100\" height=\"100\">\n  <line x1=\"0\" y1=\"0\" x2=\"100\" y2=\"100\" stroke=\"black\"/>\n</svg>\n```";
        assert!(extract_svg(response).unwrap().contains("<line"));
    }

    #[test]
    fn test_raw_svg_with_surrounding_text() {
        let response = "I've created an SVG for you.\n\n<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"512\" height=\"512\">\n  <circle cx=\"256\" cy=\"256\" r=\"100\" fill=\"coral\"/>\n</svg>\n\nThis SVG shows a coral circle.";
        let svg = extract_svg(response).unwrap();
        assert!(svg.contains("xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(!svg.contains("coral circle."));
    }

    #[test]
    fn test_fence_without_svg_falls_through() {
        let response = "```svg\njust some text\n```\nand then <svg><rect/></svg>";
        assert_eq!(extract_svg(response).unwrap(), "<svg><rect/></svg>");
    }

    #[test]
    fn test_no_svg() {
        assert_eq!(extract_svg("This response has no SVG at all."), Err(NoSvgFound));
        assert_eq!(extract_svg("```svg\njust some text\n```"), Err(NoSvgFound));
        assert_eq!(NoSvgFound.to_string(), "No valid SVG found in LLM response");
    }

    #[test]
    fn test_multiline_gradient() {
        let response = "```svg\n<svg width=\"400\" height=\"400\">\n  <defs>\n    <linearGradient id=\"grad1\">\n      <stop offset=\"0%\"/>\n    </linearGradient>\n  </defs>\n  <rect fill=\"url(#grad1)\"/>\n</svg>\n```";
        let svg = extract_svg(response).unwrap();
        assert!(svg.contains("linearGradient"));
        assert!(svg.contains("url(#grad1)"));
    }
}
