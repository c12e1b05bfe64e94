//! Document rendering for repairlog.
//!
//! A [`DocumentRenderer`] turns a [`FlattenedContext`] into a [`Document`].
//! The bundled [`TagTemplateRenderer`] reads a template artifact from disk
//! and substitutes `{{key}}` tags.
//!
//! Rendering has three outcomes:
//! - `Ok(Some(document))`: the document was produced.
//! - `Ok(None)`: the template artifact is missing. Callers should warn and
//!   carry on without a document.
//! - `Err(_)`: the template is malformed or references a key the context
//!   does not have. No partial document is returned.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::flatten::FlattenedContext;

/// Well-known file name of the template artifact.
pub const DEFAULT_TEMPLATE_NAME: &str = "report_template.txt";

/// MIME type of every exported document.
pub const DOCUMENT_MIME_TYPE: &str = "text/plain; charset=utf-8";

/// File extension of every exported document.
pub const DOCUMENT_EXTENSION: &str = "txt";

/// Pattern for a well-formed substitution tag.
const TAG_PATTERN: &str = r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}";

/// A rendered document ready for download or writing to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type of the content.
    pub mime_type: &'static str,
    /// Rendered content.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Write the document into `dir`, creating the directory if needed.
    ///
    /// Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        debug!("Wrote {} bytes to {}", self.bytes.len(), path.display());
        Ok(path)
    }
}

/// Build the download file name for a record.
///
/// `<prefix>_<sn>_<date>.txt`, or `<prefix>_<sn>.txt` when `date` is `None`
/// or blank. Characters outside `[A-Za-z0-9._-]` in the serial number and
/// date are replaced by `_`.
#[must_use]
pub fn document_file_name(prefix: &str, sn: &str, date: Option<&str>) -> String {
    let sn = sanitize(sn);
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(date) => format!("{prefix}_{sn}_{}.{DOCUMENT_EXTENSION}", sanitize(date)),
        None => format!("{prefix}_{sn}.{DOCUMENT_EXTENSION}"),
    }
}

fn sanitize(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Something that can render a flattened record into a document.
pub trait DocumentRenderer {
    /// Whether the template artifact can currently be found.
    fn template_available(&self) -> bool;

    /// Render `context` into a document named `file_name`.
    ///
    /// Returns `Ok(None)` when the template artifact is missing.
    ///
    /// # Errors
    ///
    /// Returns a render error if the template is malformed or references a
    /// tag missing from `context`, or an I/O error if the template exists
    /// but cannot be read.
    fn render(&self, context: &FlattenedContext, file_name: &str) -> Result<Option<Document>>;
}

/// Renderer for plain-text templates with `{{key}}` tags.
///
/// Whitespace inside the braces is allowed (`{{ sn }}`). Every tag in the
/// template must be present in the context; extra context keys are ignored.
#[derive(Debug, Clone)]
pub struct TagTemplateRenderer {
    template_path: PathBuf,
    tag: Regex,
}

impl TagTemplateRenderer {
    /// Create a renderer for the template at `template_path`.
    ///
    /// The template is read on every render, so it may appear or change
    /// while the renderer is alive.
    ///
    /// # Panics
    ///
    /// Panics if the built-in tag pattern fails to compile.
    #[must_use]
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            tag: Regex::new(TAG_PATTERN).expect("Invalid tag pattern"),
        }
    }

    /// Path of the template artifact.
    #[must_use]
    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Tag names used by `template`, in order of first appearance.
    #[must_use]
    pub fn tags(&self, template: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for caps in self.tag.captures_iter(template) {
            let name = &caps[1];
            if !tags.iter().any(|t| t == name) {
                tags.push(name.to_string());
            }
        }
        tags
    }

    /// Substitute every tag in `template` from `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateMalformed`] for stray `{{` or `}}`, and
    /// [`Error::TemplateTag`] for a tag missing from `context`.
    pub fn fill(&self, template: &str, context: &FlattenedContext) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;

        for caps in self.tag.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let literal = &template[last..whole.start()];
            check_literal(literal, last)?;
            out.push_str(literal);

            let name = &caps[1];
            let value = context.get(name).ok_or_else(|| Error::TemplateTag {
                tag: name.to_string(),
            })?;
            out.push_str(&value.to_string());
            last = whole.end();
        }

        let tail = &template[last..];
        check_literal(tail, last)?;
        out.push_str(tail);
        Ok(out)
    }
}

/// Reject tag delimiters left over outside well-formed tags.
fn check_literal(literal: &str, offset: usize) -> Result<()> {
    for delimiter in ["{{", "}}"] {
        if let Some(pos) = literal.find(delimiter) {
            return Err(Error::template_malformed(format!(
                "stray '{delimiter}' at byte {}",
                offset + pos
            )));
        }
    }
    Ok(())
}

impl TagTemplateRenderer {
    /// Tags in the template that are not among `keys`.
    ///
    /// Returns `Ok(None)` when the template artifact is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the template exists but cannot be read.
    pub fn unresolved_tags(&self, keys: &[String]) -> Result<Option<Vec<String>>> {
        let Some(template) = self.read_template()? else {
            return Ok(None);
        };
        let unresolved = self
            .tags(&template)
            .into_iter()
            .filter(|tag| !keys.contains(tag))
            .collect();
        Ok(Some(unresolved))
    }

    fn read_template(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.template_path) {
            Ok(template) => Ok(Some(template)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::FileRead {
                path: self.template_path.clone(),
                source,
            }),
        }
    }
}

impl DocumentRenderer for TagTemplateRenderer {
    fn template_available(&self) -> bool {
        self.template_path.is_file()
    }

    fn render(&self, context: &FlattenedContext, file_name: &str) -> Result<Option<Document>> {
        let Some(template) = self.read_template()? else {
            warn!(
                "Template not found at {}, no document produced",
                self.template_path.display()
            );
            return Ok(None);
        };

        let rendered = self.fill(&template, context)?;
        debug!("Rendered {} ({} bytes)", file_name, rendered.len());
        Ok(Some(Document {
            file_name: file_name.to_string(),
            mime_type: DOCUMENT_MIME_TYPE,
            bytes: rendered.into_bytes(),
        }))
    }
}
