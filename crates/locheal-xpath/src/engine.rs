//! sxd-backed implementation of [`MarkupEngine`].
//!
//! XML dumps are parsed by `sxd-document` directly. In lenient mode anything
//! that is not well-formed XML goes through `scraper`'s HTML parser and the
//! resulting DOM is copied into an sxd package, so the same XPath evaluator
//! serves both dialects.

use scraper::{ElementRef, Html, Node};
use std::borrow::Cow;
use std::collections::BTreeMap;
use sxd_document::{dom, parser, Package};
use sxd_xpath::nodeset::Node as XPathNode;
use sxd_xpath::{evaluate_xpath, Value};

use locheal_core::error::{Error, Result};
use locheal_core::traits::MarkupEngine;
use locheal_core::types::{MatchedNode, ParseMode};

/// Deeper documents are refused; both the XML parser and XPath evaluation recurse per level.
pub const MAX_NESTING_DEPTH: usize = 512;

const VOID_ELEMENTS: [&str; 14] =
    ["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr"];

#[derive(Debug, Default, Clone, Copy)]
pub struct SxdEngine;

impl MarkupEngine for SxdEngine {
    type Tree = Package;

    fn parse(&self, source: &str, mode: ParseMode) -> Result<Package> {
        if exceeds_depth(source, MAX_NESTING_DEPTH) {
            return Err(Error::Parse(format!("markup nested deeper than {} levels", MAX_NESTING_DEPTH)));
        }
        match parse_xml(source) {
            Ok(package) => Ok(package),
            Err(e) if mode == ParseMode::Lenient => {
                tracing::debug!("Not well-formed XML ({}), re-parsing as HTML", e);
                Ok(html_to_package(source))
            }
            Err(e) => Err(e),
        }
    }

    fn select(&self, tree: &Package, expr: &str) -> Result<Vec<MatchedNode>> {
        if let Some(prefix) = namespace_prefix(expr) {
            return Err(Error::XPath { expr: expr.to_string(), reason: format!("unbound namespace prefix '{}'", prefix) });
        }
        let document = tree.as_document();
        let value = evaluate_xpath(&document, expr)
            .map_err(|e| Error::XPath { expr: expr.to_string(), reason: format!("{:?}", e) })?;
        match value {
            Value::Nodeset(nodes) => Ok(nodes.document_order().into_iter().map(to_matched).collect()),
            _ => Ok(Vec::new()),
        }
    }
}

fn parse_xml(source: &str) -> Result<Package> {
    parser::parse(&without_doctype(source)).map_err(|e| Error::Parse(format!("{:?}", e)))
}

/// Drops a leading `<!DOCTYPE ...>`, which sxd-document does not accept.
fn without_doctype(source: &str) -> Cow<'_, str> {
    let body = source.trim_start();
    let mut offset = source.len() - body.len();
    if body.starts_with("<?xml") {
        if let Some(end) = body.find("?>") {
            offset += end + 2;
        }
    }
    let rest = &source[offset..];
    let decl = rest.trim_start();
    if !decl.get(..9).is_some_and(|p| p.eq_ignore_ascii_case("<!doctype")) {
        return Cow::Borrowed(source);
    }
    let start = offset + (rest.len() - decl.len());
    let end = match (decl.find('['), decl.find('>')) {
        (Some(open), Some(close)) if open < close => decl.find("]>").map(|i| i + 2),
        (_, Some(close)) => Some(close + 1),
        _ => None,
    };
    match end {
        Some(end) => Cow::Owned(format!("{}{}", &source[..start], &decl[end..])),
        None => Cow::Borrowed(source),
    }
}

/// Whether element nesting in `source` goes past `limit`. A tag scan, not a
/// parse: void HTML elements and self-closing tags do not open a level.
fn exceeds_depth(source: &str, limit: usize) -> bool {
    let mut depth = 0usize;
    let mut rest = source;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else { break };
        let tag = &after[..close];
        if tag.starts_with('/') {
            depth = depth.saturating_sub(1);
        } else if tag.starts_with(|c: char| c.is_ascii_alphabetic()) && !tag.ends_with('/') {
            let name = tag.split(|c: char| c.is_whitespace() || c == '/').next().unwrap_or_default();
            if !VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
        }
        rest = &after[close + 1..];
    }
    false
}

/// First `prefix` of a `prefix:name` or `prefix:*` name test outside string
/// literals. sxd-xpath cannot resolve prefixes without a namespace context.
fn namespace_prefix(expr: &str) -> Option<&str> {
    let bytes = expr.as_bytes();
    let mut quote: Option<u8> = None;
    let mut name_start: Option<usize> = None;
    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => {
                quote = Some(b);
                name_start = None;
            }
            b':' => {
                let axis = bytes.get(i + 1) == Some(&b':') || (i > 0 && bytes[i - 1] == b':');
                let local = bytes.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic() || *n == b'_' || *n == b'*' || *n >= 0x80);
                if let (Some(start), false, true) = (name_start, axis, local) {
                    return Some(&expr[start..i]);
                }
                name_start = None;
            }
            _ if is_name_byte(b) => {
                if name_start.is_none() && !(b.is_ascii_digit() || b == b'-' || b == b'.') {
                    name_start = Some(i);
                }
            }
            _ => name_start = None,
        }
    }
    None
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.') || b >= 0x80
}

fn to_matched(node: XPathNode<'_>) -> MatchedNode {
    let text = node.string_value();
    match node {
        XPathNode::Element(element) => MatchedNode {
            name: element.name().local_part().to_string(),
            attributes: element
                .attributes()
                .iter()
                .map(|a| (a.name().local_part().to_string(), a.value().to_string()))
                .collect(),
            text,
        },
        XPathNode::Attribute(attribute) => MatchedNode {
            name: format!("@{}", attribute.name().local_part()),
            attributes: BTreeMap::new(),
            text,
        },
        _ => MatchedNode { name: String::new(), attributes: BTreeMap::new(), text },
    }
}

fn html_to_package(source: &str) -> Package {
    let html = Html::parse_document(source);
    let package = Package::new();
    {
        let document = package.as_document();
        let root = html.root_element();
        let top = copy_element(&document, root);
        document.root().append_child(top);

        let mut pending = vec![(root, top)];
        while let Some((parent, target)) = pending.pop() {
            for child in parent.children() {
                match child.value() {
                    Node::Element(_) => {
                        if let Some(child_element) = ElementRef::wrap(child) {
                            let copy = copy_element(&document, child_element);
                            target.append_child(copy);
                            pending.push((child_element, copy));
                        }
                    }
                    Node::Text(text) => {
                        let content: &str = text;
                        target.append_child(document.create_text(content));
                    }
                    _ => {}
                }
            }
        }
    }
    package
}

/// Copies name and attributes; children are filled in by the caller.
fn copy_element<'d>(document: &dom::Document<'d>, source: ElementRef<'_>) -> dom::Element<'d> {
    let value = source.value();
    let element = document.create_element(value.name());
    for (name, attr_value) in value.attrs() {
        element.set_attribute_value(name, attr_value);
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_fallback_keeps_attributes_and_text() {
        let engine = SxdEngine;
        let tree = engine.parse("<div><p class=x>hi &nbsp;there<br></div>", ParseMode::Lenient).expect("lenient parse");
        let nodes = engine.select(&tree, "//p[@class='x']").expect("select");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "p");
        assert!(nodes[0].text.starts_with("hi"));
    }

    #[test]
    fn strict_mode_rejects_html() {
        assert!(SxdEngine.parse("<div><br></div>", ParseMode::StrictXml).is_err());
    }

    #[test]
    fn doctype_is_dropped_before_xml_parsing() {
        assert_eq!(without_doctype("<!DOCTYPE html><a/>"), "<a/>");
        assert_eq!(without_doctype("<?xml version=\"1.0\"?>\n<!doctype html>\n<a/>"), "<?xml version=\"1.0\"?>\n\n<a/>");
        assert_eq!(without_doctype("<!DOCTYPE x [<!ENTITY e \"v\">]><a/>"), "<a/>");
        assert_eq!(without_doctype("<a/>"), "<a/>");
    }

    #[test]
    fn nesting_depth_scan() {
        let deep = format!("{}{}", "<d>".repeat(600), "</d>".repeat(600));
        assert!(exceeds_depth(&deep, MAX_NESTING_DEPTH));
        assert!(!exceeds_depth(&"<p><br><img src=x><i/></p>".repeat(1000), MAX_NESTING_DEPTH));
        assert!(!exceeds_depth("<a><b></b></a>", 2));
        assert!(exceeds_depth("<a><b><c>", 2));
    }

    #[test]
    fn prefixed_name_tests_are_detected() {
        assert_eq!(namespace_prefix("com.app:id/name"), Some("com.app"));
        assert_eq!(namespace_prefix("//android:node"), Some("android"));
        assert_eq!(namespace_prefix("//svg:*"), Some("svg"));
        assert_eq!(namespace_prefix("//*[@resource-id='com.app:id/go']"), None);
        assert_eq!(namespace_prefix("child::node/descendant-or-self::*"), None);
        assert_eq!(namespace_prefix("//a[@x=\"a:b\"]"), None);
    }

    #[test]
    fn prefixed_expressions_fail_instead_of_panicking() {
        let tree = SxdEngine.parse("<hierarchy><node resource-id='a'/></hierarchy>", ParseMode::StrictXml).expect("parse");
        assert!(matches!(SxdEngine.select(&tree, "com.app:id/name"), Err(Error::XPath { .. })));
        assert_eq!(SxdEngine.select(&tree, "//node[@resource-id='a']").expect("select").len(), 1);
    }

    #[test]
    fn non_nodeset_results_are_empty() {
        let tree = SxdEngine.parse("<a/>", ParseMode::StrictXml).expect("parse");
        assert!(SxdEngine.select(&tree, "1 + 1").expect("evaluate").is_empty());
    }
}
