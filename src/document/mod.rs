//! Definition documents.
//!
//! Only definitions are durable; computed outputs are never saved. The
//! definition document looks like:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <customMathEquations>
//!   <snippet name="speed_kmh">
//!     <linkedPlot>speed</linkedPlot>
//!     <global></global>
//!     <equation>value * 3.6</equation>
//!   </snippet>
//! </customMathEquations>
//! ```
//!
//! Parsing uses `roxmltree` (for line numbers in errors), writing uses
//! `quick-xml`'s indenting writer. Text content is trimmed on parse.

pub mod snippets;

pub use snippets::{snippets_from_xml, snippets_to_xml, Snippet, SnippetMap, SNIPPETS_ROOT};

use crate::error::{Result, TransformError};
use crate::transform::Definition;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

/// Root element of a definition document
pub const DEFINITIONS_ROOT: &str = "customMathEquations";

/// Definitions keyed by name
pub type DefinitionMap = BTreeMap<String, Definition>;

/// Serialize definitions to an XML document
pub fn definitions_to_xml(definitions: &DefinitionMap) -> Result<String> {
    let mut writer = XmlWriter::new()?;
    writer.start(DEFINITIONS_ROOT, None)?;
    for definition in definitions.values() {
        writer.start("snippet", Some(definition.name()))?;
        writer.text_element("linkedPlot", definition.linked_series())?;
        writer.text_element("global", definition.global_vars())?;
        writer.text_element("equation", definition.expression())?;
        writer.end("snippet")?;
    }
    writer.end(DEFINITIONS_ROOT)?;
    writer.finish()
}

/// Parse definitions from an XML document.
///
/// Empty text yields no definitions. A malformed document yields an error
/// and no definitions at all. Later definitions replace earlier ones with
/// the same name.
pub fn definitions_from_xml(text: &str) -> Result<DefinitionMap> {
    let mut definitions = DefinitionMap::new();
    let Some(doc) = parse_document(text)? else {
        return Ok(definitions);
    };

    let root = doc.root_element();
    if !root.has_tag_name(DEFINITIONS_ROOT) {
        return Err(TransformError::Document {
            line: line_of(&doc, &root),
            message: format!(
                "expected root element <{}>, found <{}>",
                DEFINITIONS_ROOT,
                root.tag_name().name()
            ),
        });
    }

    for node in root.children().filter(|n| n.has_tag_name("snippet")) {
        let name = element_name(&doc, &node)?;
        let definition = Definition::new(
            name.clone(),
            child_text(&node, "linkedPlot"),
            child_text(&node, "global"),
            child_text(&node, "equation"),
        );
        if definitions.insert(name.clone(), definition).is_some() {
            tracing::warn!("Duplicate definition '{}', keeping the last one", name);
        }
    }

    Ok(definitions)
}

/// Read a definition document from disk
pub fn load_definitions(path: impl AsRef<Path>) -> Result<DefinitionMap> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let definitions = definitions_from_xml(&text)?;
    tracing::info!("Loaded {} definitions from {:?}", definitions.len(), path);
    Ok(definitions)
}

/// Write a definition document to disk
pub fn save_definitions(path: impl AsRef<Path>, definitions: &DefinitionMap) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, definitions_to_xml(definitions)?)?;
    tracing::info!("Saved {} definitions to {:?}", definitions.len(), path);
    Ok(())
}

/// Parse `text`, returning None when it is blank
pub(crate) fn parse_document(text: &str) -> Result<Option<Document<'_>>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    Document::parse(text)
        .map(Some)
        .map_err(|e| TransformError::Document {
            line: e.pos().row,
            message: e.to_string(),
        })
}

/// The `name` attribute of a snippet element
pub(crate) fn element_name(doc: &Document, node: &Node) -> Result<String> {
    node.attribute("name")
        .map(str::to_string)
        .ok_or_else(|| TransformError::Document {
            line: line_of(doc, node),
            message: "<snippet> element without a name attribute".to_string(),
        })
}

/// Trimmed text of the first child element called `tag` ("" if absent)
pub(crate) fn child_text(node: &Node, tag: &str) -> String {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .map(|child| {
            child
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect::<String>()
        })
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn line_of(doc: &Document, node: &Node) -> u32 {
    doc.text_pos_at(node.range().start).row
}

fn write_error(e: impl std::fmt::Display) -> TransformError {
    TransformError::Serialization(format!("failed to write XML: {}", e))
}

/// Indenting writer shared by the definition and snippet documents
pub(crate) struct XmlWriter {
    inner: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub(crate) fn new() -> Result<Self> {
        let mut inner = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        Ok(Self { inner })
    }

    /// Open `tag`, with a `name` attribute if given
    pub(crate) fn start(&mut self, tag: &str, name: Option<&str>) -> Result<()> {
        let mut element = BytesStart::new(tag);
        if let Some(name) = name {
            element.push_attribute(("name", name));
        }
        self.inner
            .write_event(Event::Start(element))
            .map_err(write_error)
    }

    pub(crate) fn end(&mut self, tag: &str) -> Result<()> {
        self.inner
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(write_error)
    }

    /// `<tag>text</tag>`
    pub(crate) fn text_element(&mut self, tag: &str, text: &str) -> Result<()> {
        self.inner
            .write_event(Event::Start(BytesStart::new(tag)))
            .map_err(write_error)?;
        self.inner
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
        self.end(tag)
    }

    pub(crate) fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner().into_inner()).map_err(write_error)
    }
}
