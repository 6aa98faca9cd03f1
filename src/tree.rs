// Copyright 2026 Viktor Reusch
//
// This file is part of tcx_json_convert.
//
// tcx_json_convert is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// tcx_json_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with tcx_json_convert. If not, see <https://www.gnu.org/licenses/>.

//! Minimal in-memory XML element tree.
//!
//! Only what the TCX reader needs is kept: qualified element names, the text
//! before the first child, and the children in document order. Attributes,
//! comments, and tail text are dropped.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::tcx::Error;

/// A single XML element with its resolved namespace.
#[derive(Debug, Default)]
pub(crate) struct Element {
    /// Namespace URI, if the element name is bound to one.
    namespace: Option<String>,
    /// Local part of the element name.
    name: String,
    /// Text content up to the first child element.
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Whether this element is `namespace`:`name`.
    pub(crate) fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Text content of the element up to its first child, if any.
    pub(crate) fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Follow `path` through direct children and return the first match.
    ///
    /// Every step is matched against `namespace`. An empty `path` yields
    /// `self`.
    pub(crate) fn find(&self, namespace: &str, path: &[&str]) -> Option<&Element> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        self.children
            .iter()
            .filter(|c| c.is(namespace, first))
            .find_map(|c| c.find(namespace, rest))
    }

    /// All elements named `namespace`:`name` below `self` in pre-order.
    ///
    /// `self` is never part of the result.
    pub(crate) fn descendants<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
        .filter(move |e| e.is(namespace, name))
    }
}

/// Read a complete XML document from `source` and return its root element.
///
/// The document encoding is taken from its declaration or byte order mark.
pub(crate) fn parse(source: impl BufRead) -> Result<Element, Error> {
    let mut reader = NsReader::from_reader(source);
    let mut buf = Vec::new();

    // Elements that are still open. The last one is the innermost.
    let mut open: Vec<Element> = vec![];
    let mut root = None;

    loop {
        let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
        let namespace = namespace_uri(resolved)?;
        match event {
            Event::Start(start) | Event::Empty(start) if root.is_some() => {
                return Err(Error::Malformed(format!(
                    "second root element <{}>",
                    String::from_utf8_lossy(start.name().as_ref())
                )));
            }
            Event::Start(start) => {
                open.push(new_element(namespace, start.local_name().as_ref()));
            }
            Event::Empty(start) => {
                let element = new_element(namespace, start.local_name().as_ref());
                close(element, &mut open, &mut root);
            }
            Event::End(_) => {
                // quick-xml checks that end tags match their start tags.
                let element = open
                    .pop()
                    .ok_or_else(|| Error::Malformed("unexpected end tag".to_string()))?;
                close(element, &mut open, &mut root);
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                push_text(&mut open, &text)?;
            }
            Event::CData(cdata) => {
                let text = reader.decoder().decode(&cdata).map_err(quick_xml::Error::from)?;
                push_text(&mut open, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(unclosed) = open.last() {
        return Err(Error::Malformed(format!("unclosed element <{}>", unclosed.name)));
    }
    root.ok_or_else(|| Error::Malformed("no root element".to_string()))
}

/// Namespace URI of a resolved name. Undeclared prefixes are an error.
fn namespace_uri(resolved: ResolveResult) -> Result<Option<String>, Error> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Malformed(format!(
            "unbound prefix {}",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn new_element(namespace: Option<String>, name: &[u8]) -> Element {
    Element {
        namespace,
        name: String::from_utf8_lossy(name).into_owned(),
        ..Default::default()
    }
}

/// Attach a finished `element` to its parent, or make it the root.
fn close(element: Element, open: &mut [Element], root: &mut Option<Element>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Append `text` to the innermost open element unless it already has
/// children.
///
/// Only whitespace may appear outside of the root element.
fn push_text(open: &mut [Element], text: &str) -> Result<(), Error> {
    match open.last_mut() {
        Some(current) if current.children.is_empty() => {
            current.text.get_or_insert_with(String::new).push_str(text);
        }
        Some(_) => {}
        None if text.trim().is_empty() => {}
        None => {
            return Err(Error::Malformed(format!(
                "text outside of the root element: {:?}",
                text.trim()
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    fn parse_str(xml: &str) -> Result<Element, Error> {
        parse(xml.as_bytes())
    }

    #[test]
    fn find_follows_child_path() {
        let root = parse_str(
            r#"<a xmlns="urn:test"><b><c>first</c><c>second</c></b><c>top</c></a>"#,
        )
        .unwrap();

        assert_eq!(root.find(NS, &["b", "c"]).unwrap().text(), Some("first"));
        assert_eq!(root.find(NS, &["c"]).unwrap().text(), Some("top"));
        assert!(root.find(NS, &["b", "d"]).is_none());
        assert!(root.find("urn:other", &["b"]).is_none());
    }

    #[test]
    fn find_tries_every_matching_step() {
        let root =
            parse_str(r#"<a xmlns="urn:test"><b/><b><c>deep</c></b></a>"#).unwrap();
        assert_eq!(root.find(NS, &["b", "c"]).unwrap().text(), Some("deep"));
    }

    #[test]
    fn descendants_are_pre_order_and_exclude_self() {
        let root = parse_str(
            r#"<x:n xmlns:x="urn:test"><x:n>1<x:n>2</x:n></x:n><x:m><x:n>3</x:n></x:m></x:n>"#,
        )
        .unwrap();

        let texts: Vec<_> = root.descendants(NS, "n").map(Element::text).collect();
        assert_eq!(texts, [Some("1"), Some("2"), Some("3")]);
    }

    #[test]
    fn text_is_unescaped_and_kept_verbatim() {
        let root = parse_str(r#"<a xmlns="urn:test"> 1 &amp; 2 <![CDATA[<3>]]></a>"#).unwrap();
        assert_eq!(root.text(), Some(" 1 & 2 <3>"));
    }

    #[test]
    fn empty_elements_have_no_text() {
        let root = parse_str(r#"<a xmlns="urn:test"><b/><c></c><d> </d></a>"#).unwrap();
        assert_eq!(root.find(NS, &["b"]).unwrap().text(), None);
        assert_eq!(root.find(NS, &["c"]).unwrap().text(), None);
        assert_eq!(root.find(NS, &["d"]).unwrap().text(), Some(" "));
    }

    #[test]
    fn whitespace_around_root_is_allowed() {
        let root = parse_str("<?xml version=\"1.0\"?>\n<a xmlns=\"urn:test\"/>\n\n").unwrap();
        assert!(root.is(NS, "a"));
    }

    #[test]
    fn unprefixed_elements_without_default_namespace_do_not_match() {
        let root = parse_str("<a><b>x</b></a>").unwrap();
        assert!(root.find(NS, &["b"]).is_none());
        assert_eq!(root.descendants(NS, "b").count(), 0);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(parse_str("<a><b></a>").is_err());
        assert!(parse_str("<a><b>").is_err());
        assert!(parse_str("<a/><b/>").is_err());
        assert!(parse_str("").is_err());
        assert!(parse_str("just text").is_err());
        assert!(matches!(
            parse_str("<a><b/></a>junk"),
            Err(Error::Malformed(_))
        ));
        assert!(matches!(
            parse_str("junk<a/>"),
            Err(Error::Malformed(_))
        ));
        assert!(parse_str(r#"<a xmlns="urn:test"><x:b/></a>"#).is_err());
    }
}
