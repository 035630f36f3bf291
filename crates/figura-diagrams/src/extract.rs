//! Declaration extraction.
//!
//! Scans documents for fenced code blocks and turns the diagram ones into
//! [`Declaration`]s:
//!
//! - ```` ```plantuml ```` / ```` ```puml ````: inline `PlantUML`, optional `alt`
//! - ```` ```drawio src="flow.drawio" ````: referenced Draw.io file
//! - any other fence whose body contains both `@startuml` and `@enduml`:
//!   inline `PlantUML`, metadata ignored
//!
//! Extraction is fail-fast: the first rule violation aborts with the document,
//! line, and rule. No partial results are returned.

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::declaration::{Declaration, DeclarationSource, ImageAttrs};
use crate::error::{DeclarationError, DiagramError, Rule};
use crate::hash::canonical_inline;
use crate::meta::{FenceMeta, MetaValue};
use crate::DiagramKind;

/// Directory never descended into while scanning.
const SKIPPED_DIR: &str = "node_modules";

/// A fenced code block as seen in a document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFence<'a> {
    /// Full info string, e.g. `drawio src="a.drawio"`.
    pub info: &'a str,
    pub body: &'a str,
    /// 1-based line of the opening fence.
    pub line: usize,
}

/// Where and what to scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory scanned recursively for documents.
    pub content_dir: PathBuf,
    /// Referenced sources must resolve inside this directory.
    pub allowed_root: PathBuf,
    /// Document extensions without the leading dot.
    pub extensions: Vec<String>,
}

/// Scan every document under the content directory.
///
/// Documents are visited in sorted path order so the first declaration of a
/// diagram is deterministic. A missing content directory yields no
/// declarations.
pub fn scan_documents(options: &ScanOptions) -> Result<Vec<Declaration>, DiagramError> {
    if !options.content_dir.is_dir() {
        tracing::debug!(dir = %options.content_dir.display(), "content directory missing");
        return Ok(Vec::new());
    }

    let walker = WalkBuilder::new(&options.content_dir)
        .standard_filters(false)
        .hidden(true)
        .filter_entry(|entry| entry.file_name() != SKIPPED_DIR)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut declarations = Vec::new();
    let mut documents = 0usize;
    for entry in walker {
        let entry = entry.map_err(|e| {
            DiagramError::io("scan", &options.content_dir, std::io::Error::other(e))
        })?;
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) || !is_document(path, &options.extensions)
        {
            continue;
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| DiagramError::io("read", path, e))?;
        declarations.extend(extract_declarations(path, &content, &options.allowed_root)?);
        documents += 1;
    }

    tracing::debug!(
        documents,
        declarations = declarations.len(),
        "scanned content directory"
    );
    Ok(declarations)
}

fn is_document(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}

/// Extract declarations from one markdown document.
pub fn extract_declarations(
    document: &Path,
    markdown: &str,
    allowed_root: &Path,
) -> Result<Vec<Declaration>, DeclarationError> {
    let mut declarations = Vec::new();
    for fence in code_fences(markdown) {
        if let Some(declaration) = classify(document, &fence.as_fence(), allowed_root)? {
            declarations.push(declaration);
        }
    }
    Ok(declarations)
}

/// Owned counterpart of [`CodeFence`], collected from parser events.
struct CollectedFence {
    info: String,
    body: String,
    line: usize,
}

impl CollectedFence {
    fn as_fence(&self) -> CodeFence<'_> {
        CodeFence {
            info: &self.info,
            body: &self.body,
            line: self.line,
        }
    }
}

/// Collect fenced code blocks with their line numbers.
fn code_fences(markdown: &str) -> Vec<CollectedFence> {
    let mut fences = Vec::new();
    let mut current: Option<CollectedFence> = None;

    for (event, range) in Parser::new_ext(markdown, Options::empty()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                current = Some(CollectedFence {
                    info: info.into_string(),
                    body: String::new(),
                    line: line_of(markdown, range.start),
                });
            }
            Event::Text(text) => {
                if let Some(fence) = current.as_mut() {
                    fence.body.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(fence) = current.take() {
                    fences.push(fence);
                }
            }
            _ => {}
        }
    }

    fences
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|&b| b == b'\n').count() + 1
}

/// Split an info string into lowercase language tag and metadata.
fn split_info(info: &str) -> (String, &str) {
    let info = info.trim();
    match info.find(char::is_whitespace) {
        Some(pos) => (info[..pos].to_lowercase(), info[pos..].trim()),
        None => (info.to_lowercase(), ""),
    }
}

fn looks_like_plantuml(body: &str) -> bool {
    body.contains("@startuml") && body.contains("@enduml")
}

/// Turn a code fence into a declaration, if it declares a diagram.
pub fn classify(
    document: &Path,
    fence: &CodeFence<'_>,
    allowed_root: &Path,
) -> Result<Option<Declaration>, DeclarationError> {
    let fail = |rule: Rule| DeclarationError {
        document: document.to_path_buf(),
        line: fence.line,
        rule,
    };

    let (tag, meta_str) = split_info(fence.info);
    let Some(kind) = DiagramKind::from_fence_tag(&tag) else {
        if !looks_like_plantuml(fence.body) {
            return Ok(None);
        }
        return Ok(Some(Declaration {
            document: document.to_path_buf(),
            line: fence.line,
            source: DeclarationSource::Inline {
                text: canonical_inline(fence.body),
            },
            attrs: ImageAttrs {
                alt: DiagramKind::PlantUml.default_alt().to_owned(),
                ..ImageAttrs::default()
            },
        }));
    };

    let meta = FenceMeta::parse(meta_str).map_err(|e| fail(e.into()))?;
    check_attributes(kind, &meta).map_err(fail)?;

    let source = match kind {
        DiagramKind::PlantUml => {
            let text = canonical_inline(fence.body);
            if text.is_empty() {
                return Err(fail(Rule::EmptySource { kind }));
            }
            DeclarationSource::Inline { text }
        }
        DiagramKind::DrawIo => {
            // Presence checked above
            let src = meta.text("src").map(str::trim).unwrap_or_default();
            resolve_reference(document, src, allowed_root).map_err(fail)?
        }
    };

    let attrs = ImageAttrs {
        alt: meta
            .text("alt")
            .map_or_else(|| kind.default_alt().to_owned(), ToOwned::to_owned),
        class_name: meta.text("className").map(ToOwned::to_owned),
        width: meta.text("width").map(ToOwned::to_owned),
        height: meta.text("height").map(ToOwned::to_owned),
    };

    Ok(Some(Declaration {
        document: document.to_path_buf(),
        line: fence.line,
        source,
        attrs,
    }))
}

/// Apply the forbidden, allowed, and required attribute rules of `kind`.
fn check_attributes(kind: DiagramKind, meta: &FenceMeta) -> Result<(), Rule> {
    for (attribute, reason) in kind.forbidden_attributes() {
        if meta.get(attribute).is_some() {
            return Err(Rule::ForbiddenAttribute {
                kind,
                attribute: (*attribute).to_owned(),
                reason: *reason,
            });
        }
    }

    if let Some(unknown) = meta
        .keys()
        .find(|key| !kind.allowed_attributes().contains(key))
    {
        return Err(Rule::UnknownAttribute {
            kind,
            attribute: unknown.to_owned(),
        });
    }

    for attribute in kind.required_attributes() {
        let present = matches!(meta.get(attribute), Some(MetaValue::Text(v)) if !v.trim().is_empty());
        if !present {
            return Err(Rule::MissingAttribute {
                kind,
                attribute: *attribute,
            });
        }
    }

    Ok(())
}

/// Resolve `src` relative to the document and check it against the rules.
fn resolve_reference(
    document: &Path,
    src: &str,
    allowed_root: &Path,
) -> Result<DeclarationSource, Rule> {
    let base = document.parent().unwrap_or(Path::new(""));
    let resolved = normalize(&base.join(src));

    if resolved.extension().and_then(|e| e.to_str()) != Some("drawio") {
        return Err(Rule::WrongExtension {
            src: src.to_owned(),
        });
    }

    let root = normalize(allowed_root);
    if !resolved.starts_with(&root) {
        return Err(Rule::OutsideRoot {
            src: src.to_owned(),
            resolved,
            root,
        });
    }

    if !resolved.is_file() {
        return Err(Rule::MissingSource {
            src: src.to_owned(),
            resolved,
        });
    }

    Ok(DeclarationSource::Referenced {
        src: src.to_owned(),
        path: resolved,
    })
}

/// Lexically normalize a path, resolving `.` and `..` components.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
