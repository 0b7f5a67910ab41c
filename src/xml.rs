// Generic XML tree.
//
// The parser turns report text into a tree of `XmlNode`s and nothing more:
// attribute values stay strings, no element is given any meaning here.
// Numeric interpretation belongs to the extractor.
use crate::error::ParseError;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str;

/// Key holding attributes in the object view when they are not merged.
pub const ATTR_KEY: &str = "$";
/// Key holding element text in the object view.
pub const TEXT_KEY: &str = "_";

/// Parser options.
///
/// `explicit_array` and `merge_attrs` only shape the object view produced
/// by [`XmlNode::to_value`]; the tree itself always keeps attributes and
/// children apart and always stores children as a sequence.
/// `strip_attr_marker` is applied while parsing: a leading occurrence of
/// the marker character is removed from every attribute name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub explicit_array: bool,
    pub merge_attrs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_attr_marker: Option<char>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            explicit_array: true,
            merge_attrs: false,
            strip_attr_marker: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlNode {
    pub name: String,
    pub attrs: IndexMap<String, String>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        XmlNode {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// First child element with the given tag name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every child element with the given tag name, in document order.
    pub fn children_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a XmlNode> + 'n
    where
        'a: 'n,
    {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Object view of the tree: `{ "<root>": { ... } }`.
    ///
    /// Children sharing a tag name are grouped under that name, in document
    /// order. With `explicit_array` every group is an array; without it a
    /// group of one is stored as the bare object. With `merge_attrs`
    /// attributes are written flat into the element's object first and a
    /// child element with the same name then replaces the attribute.
    pub fn to_value(&self, opts: &ParseOptions) -> Value {
        let mut root = Map::new();
        root.insert(self.name.clone(), self.body_value(opts));
        Value::Object(root)
    }

    fn body_value(&self, opts: &ParseOptions) -> Value {
        if self.attrs.is_empty() && self.children.is_empty() {
            return Value::String(self.text.clone());
        }

        let mut obj = Map::new();
        if !self.attrs.is_empty() {
            let attrs = self
                .attrs
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())));
            if opts.merge_attrs {
                obj.extend(attrs);
            } else {
                obj.insert(ATTR_KEY.to_string(), Value::Object(attrs.collect()));
            }
        }
        if !self.text.is_empty() {
            obj.insert(TEXT_KEY.to_string(), Value::String(self.text.clone()));
        }

        let mut groups: IndexMap<&str, Vec<Value>> = IndexMap::new();
        for child in &self.children {
            groups
                .entry(child.name.as_str())
                .or_default()
                .push(child.body_value(opts));
        }
        for (name, mut values) in groups {
            let value = if values.len() == 1 && !opts.explicit_array {
                values.swap_remove(0)
            } else {
                Value::Array(values)
            };
            if obj.insert(name.to_string(), value).is_some() {
                log::debug!("<{}> child element replaces attribute {name}", self.name);
            }
        }
        Value::Object(obj)
    }
}

pub fn parse(xml: &str) -> Result<XmlNode, ParseError> {
    parse_with(xml, &ParseOptions::default())
}

/// Parse `xml` into a tree. Fails only on malformed input.
pub fn parse_with(xml: &str, opts: &ParseOptions) -> Result<XmlNode, ParseError> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(start_node(&e, opts)?);
            }
            Event::Empty(e) => {
                let node = start_node(&e, opts)?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::End(e) => {
                let name = str::from_utf8(e.name().as_ref())?.to_string();
                let node = stack.pop().ok_or_else(|| ParseError::MismatchedEnd {
                    expected: String::new(),
                    found: name.clone(),
                })?;
                if node.name != name {
                    return Err(ParseError::MismatchedEnd {
                        expected: node.name,
                        found: name,
                    });
                }
                attach(node, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                push_text(&text, &mut stack)?;
            }
            Event::CData(c) => {
                let text = str::from_utf8(&c)?;
                push_text(text, &mut stack)?;
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed(open.name));
    }
    root.ok_or(ParseError::Empty)
}

fn start_node(e: &BytesStart<'_>, opts: &ParseOptions) -> Result<XmlNode, ParseError> {
    let mut node = XmlNode::new(str::from_utf8(e.name().as_ref())?);
    for a in e.attributes() {
        let a = a?;
        let raw = str::from_utf8(a.key.as_ref())?;
        let key = match opts.strip_attr_marker {
            Some(marker) => raw.strip_prefix(marker).unwrap_or(raw),
            None => raw,
        };
        let value = a.unescape_value()?.into_owned();
        node.attrs.insert(key.to_string(), value);
    }
    Ok(node)
}

fn attach(
    node: XmlNode,
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => return Err(ParseError::MultipleRoots),
        None => *root = Some(node),
    }
    Ok(())
}

fn push_text(text: &str, stack: &mut [XmlNode]) -> Result<(), ParseError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(node) => {
            node.text.push_str(text);
            Ok(())
        }
        None => Err(ParseError::TextOutsideRoot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_attributed_tree() {
        let root = parse(r#"<Report Textbox19="120"><A x="1"/><A x="2"><B>hi</B></A></Report>"#)
            .unwrap();
        assert_eq!(root.name, "Report");
        assert_eq!(root.attr("Textbox19"), Some("120"));
        assert_eq!(root.children_named("A").count(), 2);
        assert_eq!(root.child("A").and_then(|a| a.attr("x")), Some("1"));
        let b = &root.children[1].children[0];
        assert_eq!(b.text, "hi");
    }

    #[test]
    fn attribute_values_stay_strings() {
        let root = parse(r#"<Report n="007" p="12.5%"/>"#).unwrap();
        assert_eq!(root.attr("n"), Some("007"));
        assert_eq!(root.attr("p"), Some("12.5%"));
    }

    #[test]
    fn unescapes_entities() {
        let root = parse(r#"<Report><D Optionskey="Work &amp; Life"/></Report>"#).unwrap();
        assert_eq!(root.children[0].attr("Optionskey"), Some("Work & Life"));
    }

    #[test]
    fn ignores_declaration_comments_and_bom() {
        let xml = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- export -->\n<Report/>";
        assert_eq!(parse(xml).unwrap().name, "Report");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("<not-xml").is_err());
        assert!(parse("<a><b></a>").is_err());
        assert!(matches!(parse("<a><b>"), Err(ParseError::Unclosed(_))));
        assert!(parse("<a>&bogus;</a>").is_err());
        assert!(matches!(parse(""), Err(ParseError::Empty)));
        assert!(matches!(parse("<a/><b/>"), Err(ParseError::MultipleRoots)));
        assert!(matches!(parse("junk<a/>"), Err(ParseError::TextOutsideRoot)));
    }

    #[test]
    fn strips_attribute_marker() {
        let opts = ParseOptions {
            strip_attr_marker: Some('_'),
            ..Default::default()
        };
        let root = parse_with(r#"<Report _Textbox19="5" PD_="1"/>"#, &opts).unwrap();
        assert_eq!(root.attr("Textbox19"), Some("5"));
        assert_eq!(root.attr("PD_"), Some("1"));
    }

    #[test]
    fn object_view_wraps_children_in_arrays_by_default() {
        let root = parse(r#"<Report a="1"><C v="x"/></Report>"#).unwrap();
        let value = root.to_value(&ParseOptions::default());
        assert_eq!(
            value,
            json!({ "Report": { "$": { "a": "1" }, "C": [ { "$": { "v": "x" } } ] } })
        );
    }

    #[test]
    fn object_view_merges_attributes_and_tolerates_collisions() {
        let opts = ParseOptions {
            explicit_array: false,
            merge_attrs: true,
            strip_attr_marker: None,
        };
        let root = parse(r#"<Report Detail="attr"><Detail k="v"/><Other>t</Other></Report>"#)
            .unwrap();
        let value = root.to_value(&opts);
        assert_eq!(
            value,
            json!({ "Report": { "Detail": { "k": "v" }, "Other": "t" } })
        );
    }
}
