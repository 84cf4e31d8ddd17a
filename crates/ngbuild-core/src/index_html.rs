//! Default document generation.
//!
//! When the application unit does not emit `/index.html` itself, the
//! pipeline builds one from a source HTML file by referencing every initial
//! global style and script bundle.

use crate::entries::NamedEntry;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Virtual path of the default document.
pub const INDEX_PATH: &str = "/index.html";

/// Source document plus the bundles it must reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    /// Source HTML file, absolute or relative to the workspace root
    pub source: PathBuf,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
}

impl IndexDocument {
    /// Reference every initial style and script bucket.
    pub fn from_entries(source: impl Into<PathBuf>, styles: &[NamedEntry], scripts: &[NamedEntry]) -> Self {
        let initial = |entries: &[NamedEntry], ext: &str| -> Vec<String> {
            entries
                .iter()
                .filter(|entry| entry.initial)
                .map(|entry| format!("/{}.{ext}", entry.name))
                .collect()
        };
        Self {
            source: source.into(),
            stylesheets: initial(styles, "css"),
            scripts: initial(scripts, "js"),
        }
    }

    /// Read the source document and inject the bundle references.
    pub async fn render(&self, root: &std::path::Path) -> Result<Vec<u8>> {
        let path = root.join(&self.source);
        let html = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        Ok(inject_bundles(&html, &self.stylesheets, &self.scripts).into_bytes())
    }
}

/// Insert stylesheet links before `</head>` and deferred scripts before `</body>`.
///
/// Missing closing tags fall back to prepending links and appending scripts.
pub fn inject_bundles(html: &str, stylesheets: &[String], scripts: &[String]) -> String {
    let links: String = stylesheets
        .iter()
        .map(|href| format!("<link rel=\"stylesheet\" href=\"{href}\">"))
        .collect();
    let tags: String = scripts
        .iter()
        .map(|src| format!("<script src=\"{src}\" defer></script>"))
        .collect();

    let mut result = String::with_capacity(html.len() + links.len() + tags.len());
    match html.find("</head>") {
        Some(pos) => {
            result.push_str(&html[..pos]);
            result.push_str(&links);
            result.push_str(&html[pos..]);
        }
        None => {
            result.push_str(&links);
            result.push_str(html);
        }
    }

    match result.rfind("</body>") {
        Some(pos) => result.insert_str(pos, &tags),
        None => result.push_str(&tags),
    }
    result
}
