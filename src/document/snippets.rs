//! Snippet library documents.
//!
//! A snippet is a reusable `{name, global_vars, equation}` template without a
//! linked series. The library is stored as:
//!
//! ```xml
//! <snippets>
//!   <snippet name="derivative">
//!     <global>let prev = 0.0;</global>
//!     <equation>...</equation>
//!   </snippet>
//! </snippets>
//! ```

use super::{child_text, element_name, parse_document, XmlWriter};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root element of a snippet library document
pub const SNIPPETS_ROOT: &str = "snippets";

/// A reusable expression template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub name: String,
    pub global_vars: String,
    pub equation: String,
}

impl Snippet {
    pub fn new(
        name: impl Into<String>,
        global_vars: impl Into<String>,
        equation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            global_vars: global_vars.into(),
            equation: equation.into(),
        }
    }
}

/// Snippets keyed by name
pub type SnippetMap = BTreeMap<String, Snippet>;

/// Parse a snippet library. Later snippets replace earlier ones with the same name.
pub fn snippets_from_xml(text: &str) -> Result<SnippetMap> {
    let mut snippets = SnippetMap::new();
    let Some(doc) = parse_document(text)? else {
        return Ok(snippets);
    };

    for node in doc.root_element().children().filter(|n| n.has_tag_name("snippet")) {
        let name = element_name(&doc, &node)?;
        let snippet = Snippet::new(
            name.clone(),
            child_text(&node, "global"),
            child_text(&node, "equation"),
        );
        snippets.insert(name, snippet);
    }

    Ok(snippets)
}

/// Serialize a snippet library
pub fn snippets_to_xml(snippets: &SnippetMap) -> Result<String> {
    let mut writer = XmlWriter::new()?;
    writer.start(SNIPPETS_ROOT, None)?;
    for snippet in snippets.values() {
        writer.start("snippet", Some(&snippet.name))?;
        writer.text_element("global", &snippet.global_vars)?;
        writer.text_element("equation", &snippet.equation)?;
        writer.end("snippet")?;
    }
    writer.end(SNIPPETS_ROOT)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::builtins;

    #[test]
    fn test_builtin_library_roundtrip() {
        let library: SnippetMap = builtins::all()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        let xml = snippets_to_xml(&library).unwrap();
        let parsed = snippets_from_xml(&xml).unwrap();

        assert_eq!(parsed.len(), library.len());
        let derivative = &parsed["derivative"];
        assert_eq!(derivative.global_vars, builtins::PREV_SAMPLE_GLOBALS.trim());
        assert_eq!(derivative.equation, builtins::DERIVATIVE.trim());
    }

    #[test]
    fn test_missing_children_read_empty() {
        let parsed = snippets_from_xml("<snippets><snippet name=\"bare\"/></snippets>").unwrap();
        assert_eq!(parsed["bare"], Snippet::new("bare", "", ""));
    }

    #[test]
    fn test_empty_text() {
        assert!(snippets_from_xml("").unwrap().is_empty());
    }
}
