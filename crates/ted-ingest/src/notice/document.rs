//! Parsed notice documents and the field accessor
//!
//! A payload is parsed once, with `quick-xml`'s namespace-aware reader, into
//! a small owned tree: an arena of elements holding local name, resolved
//! namespace URI, attributes and mixed content. Field lookups then run against
//! that tree through [`FieldPath`], a declarative `STEP/STEP/@ATTR`-style path,
//! read with one of three cardinalities:
//!
//! | method                         | cardinality      | missing value          |
//! |--------------------------------|------------------|------------------------|
//! | [`NoticeDocument::required`]   | required scalar  | `SchemaViolation`      |
//! | [`NoticeDocument::optional`]   | optional scalar  | `None`                 |
//! | [`NoticeDocument::list`]       | optional list    | empty `Vec`            |
//!
//! Path steps match elements by local name within the namespace of the
//! document's root element; elements from any other namespace are invisible
//! to paths. Whitespace-only text nodes are never selected.

use crate::error::{ExtractError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::reader::NsReader;
use std::collections::BTreeMap;
use std::fmt;

/// Index of an element inside its [`NoticeDocument`]
pub type NodeId = usize;

#[derive(Debug, Clone)]
enum Content {
    Element(NodeId),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    content: Vec<Content>,
}

/// Namespace declarations made on one element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    default: Option<String>,
    prefixed: BTreeMap<String, String>,
}

impl Namespaces {
    /// The `xmlns="..."` declaration, if any
    pub fn default_namespace(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Whether `xmlns:<prefix>` is declared
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefixed.contains_key(prefix)
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixed.get(prefix).map(String::as_str)
    }
}

/// What a [`FieldPath`] selects from the elements its steps reach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    /// An attribute value (`/@NAME`)
    Attribute(&'static str),
    /// Direct text children (`/text()`)
    Text,
    /// All descendant text nodes in document order (`//text()`)
    DescendantText,
}

/// Declarative path from a context element to a value
///
/// A step of `*` matches any element in the document namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
    pub steps: &'static [&'static str],
    pub select: Select,
}

impl FieldPath {
    pub const fn attribute(steps: &'static [&'static str], name: &'static str) -> Self {
        Self {
            steps,
            select: Select::Attribute(name),
        }
    }

    pub const fn text(steps: &'static [&'static str]) -> Self {
        Self {
            steps,
            select: Select::Text,
        }
    }

    pub const fn descendant_text(steps: &'static [&'static str]) -> Self {
        Self {
            steps,
            select: Select::DescendantText,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.steps.join("/"))?;
        match self.select {
            Select::Attribute(name) => write!(f, "/@{name}"),
            Select::Text => write!(f, "/text()"),
            Select::DescendantText => write!(f, "//text()"),
        }
    }
}

/// A parsed notice payload
#[derive(Debug, Clone)]
pub struct NoticeDocument {
    elements: Vec<Element>,
    root: NodeId,
    root_namespaces: Namespaces,
}

impl NoticeDocument {
    /// Parse a payload; anything that is not a single well-formed element
    /// tree is a `MalformedDocument`.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut reader = NsReader::from_reader(payload);
        let mut buf = Vec::new();

        let mut elements: Vec<Element> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root: Option<(NodeId, Namespaces)> = None;
        // Text and CDATA only join when adjacent; a comment or PI splits them
        let mut after_text = false;

        loop {
            let (resolved, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(ExtractError::malformed)?;
            let namespace = match resolved {
                ResolveResult::Bound(ns) => Some(utf8(ns.as_ref())?),
                ResolveResult::Unbound => None,
                ResolveResult::Unknown(prefix) => {
                    return Err(ExtractError::malformed(format!(
                        "undeclared namespace prefix '{}'",
                        String::from_utf8_lossy(&prefix)
                    )))
                },
            };

            let is_text = matches!(event, Event::Text(_) | Event::CData(_));
            match event {
                Event::Start(start) => {
                    let id = open_element(&mut elements, &stack, &mut root, &start, namespace)?;
                    stack.push(id);
                },
                Event::Empty(start) => {
                    open_element(&mut elements, &stack, &mut root, &start, namespace)?;
                },
                Event::End(_) => {
                    stack
                        .pop()
                        .ok_or_else(|| ExtractError::malformed("closing tag without opening tag"))?;
                },
                Event::Text(text) => {
                    let text = text.unescape().map_err(ExtractError::malformed)?;
                    push_text(&mut elements, &stack, &text, after_text)?;
                },
                Event::CData(data) => {
                    let text = String::from_utf8(data.into_inner().into_owned())
                        .map_err(ExtractError::malformed)?;
                    push_text(&mut elements, &stack, &text, after_text)?;
                },
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {},
            }
            after_text = is_text;
            buf.clear();
        }

        if let Some(&open) = stack.last() {
            return Err(ExtractError::malformed(format!(
                "unexpected end of document inside <{}>",
                elements[open].name
            )));
        }
        let (root, root_namespaces) =
            root.ok_or_else(|| ExtractError::malformed("document has no root element"))?;

        Ok(Self {
            elements,
            root,
            root_namespaces,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Namespace declarations on the root element
    pub fn namespaces(&self) -> &Namespaces {
        &self.root_namespaces
    }

    /// Namespace URI of the root element, which paths are resolved in
    pub fn namespace(&self) -> Option<&str> {
        self.elements[self.root].namespace.as_deref()
    }

    /// Local name of an element
    pub fn name(&self, node: NodeId) -> &str {
        &self.elements[node].name
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.elements[node]
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Elements reached by following `steps` from `from`, in document order
    pub fn elements(&self, from: NodeId, steps: &[&str]) -> Vec<NodeId> {
        let mut current = vec![from];
        for step in steps {
            current = current
                .into_iter()
                .flat_map(|node| self.children(node))
                .filter(|&child| self.matches(child, step))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// First element reached by `steps`, if any
    pub fn element(&self, from: NodeId, steps: &[&str]) -> Option<NodeId> {
        self.elements(from, steps).into_iter().next()
    }

    /// Like [`element`](Self::element) but absence is a schema violation
    pub fn required_element(&self, from: NodeId, steps: &[&str]) -> Result<NodeId> {
        self.element(from, steps).ok_or_else(|| {
            ExtractError::schema(format!(
                "{}/{} is missing",
                self.name(from),
                steps.join("/")
            ))
        })
    }

    pub fn exists(&self, from: NodeId, steps: &[&str]) -> bool {
        self.element(from, steps).is_some()
    }

    /// Every value selected by `path`, in document order
    pub fn list(&self, from: NodeId, path: &FieldPath) -> Vec<String> {
        let nodes = self.elements(from, path.steps);
        let mut values = Vec::new();
        for node in nodes {
            match path.select {
                Select::Attribute(name) => {
                    if let Some(value) = self.attribute(node, name) {
                        values.push(value.to_string());
                    }
                },
                Select::Text => values.extend(self.direct_text(node).map(str::to_string)),
                Select::DescendantText => self.collect_text(node, &mut values),
            }
        }
        values
    }

    /// First value selected by `path`
    pub fn optional(&self, from: NodeId, path: &FieldPath) -> Option<String> {
        // Scalars are rare enough that collecting the full list is fine.
        self.list(from, path).into_iter().next()
    }

    /// First value selected by `path`; absence is a `SchemaViolation`
    pub fn required(&self, from: NodeId, path: &FieldPath) -> Result<String> {
        self.optional(from, path).ok_or_else(|| {
            ExtractError::schema(format!("{}/{} is missing", self.name(from), path))
        })
    }

    fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.elements[node].content.iter().filter_map(|c| match c {
            Content::Element(id) => Some(*id),
            Content::Text(_) => None,
        })
    }

    fn matches(&self, node: NodeId, step: &str) -> bool {
        let element = &self.elements[node];
        element.namespace.as_deref() == self.namespace() && (step == "*" || element.name == step)
    }

    fn direct_text(&self, node: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.elements[node].content.iter().filter_map(|c| match c {
            Content::Text(text) if !is_blank(text) => Some(text.as_str()),
            _ => None,
        })
    }

    fn collect_text(&self, node: NodeId, out: &mut Vec<String>) {
        for content in &self.elements[node].content {
            match content {
                Content::Element(child) => self.collect_text(*child, out),
                Content::Text(text) if !is_blank(text) => out.push(text.clone()),
                Content::Text(_) => {},
            }
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(ExtractError::malformed)
}

fn open_element(
    elements: &mut Vec<Element>,
    stack: &[NodeId],
    root: &mut Option<(NodeId, Namespaces)>,
    start: &BytesStart<'_>,
    namespace: Option<String>,
) -> Result<NodeId> {
    let name = utf8(start.local_name().as_ref())?;
    let mut attributes = Vec::new();
    let mut declarations = Namespaces::default();

    for attr in start.attributes() {
        let attr = attr.map_err(ExtractError::malformed)?;
        let value = attr
            .unescape_value()
            .map_err(ExtractError::malformed)?
            .into_owned();
        match attr.key.as_namespace_binding() {
            Some(PrefixDeclaration::Default) => declarations.default = Some(value),
            Some(PrefixDeclaration::Named(prefix)) => {
                declarations.prefixed.insert(utf8(prefix)?, value);
            },
            None => attributes.push((utf8(attr.key.local_name().as_ref())?, value)),
        }
    }

    let id = elements.len();
    elements.push(Element {
        name,
        namespace,
        attributes,
        content: Vec::new(),
    });

    match stack.last() {
        Some(&parent) => elements[parent].content.push(Content::Element(id)),
        None if root.is_some() => {
            return Err(ExtractError::malformed("more than one root element"));
        },
        None => *root = Some((id, declarations)),
    }

    Ok(id)
}

/// Append text to the open element; `merge` joins it to a preceding text node
fn push_text(elements: &mut [Element], stack: &[NodeId], text: &str, merge: bool) -> Result<()> {
    let Some(&parent) = stack.last() else {
        if is_blank(text) {
            return Ok(());
        }
        return Err(ExtractError::malformed("text outside the root element"));
    };

    let content = &mut elements[parent].content;
    match content.last_mut() {
        Some(Content::Text(existing)) if merge => existing.push_str(text),
        _ => content.push(Content::Text(text.to_string())),
    }
    Ok(())
}
