//! Per-format document loading.
//!
//! Files dispatch on extension; directories are scanned one level deep and
//! per-file failures are logged and skipped so one broken file cannot abort
//! a batch. PDF extraction shells out to the `pdftotext` binary (poppler);
//! DOCX extraction reads `word/document.xml` out of the zip container.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use docshelf_core::types::RawDocument;
use docshelf_core::{Error, Result};

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "txt", "docx", "md"];

/// Loads supported document formats into [`RawDocument`] units.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Resolves a file-or-directory path into loaded units.
    pub fn load(&self, path: &Path) -> Result<Vec<RawDocument>> {
        if path.is_file() {
            self.load_file(path)
        } else if path.is_dir() {
            self.load_directory(path)
        } else {
            Err(Error::NotFound(path.display().to_string()))
        }
    }

    /// Loads one file, dispatching on its extension.
    pub fn load_file(&self, path: &Path) -> Result<Vec<RawDocument>> {
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let extension = extension_of(path)
            .ok_or_else(|| Error::UnsupportedFormat("<none>".to_string()))?;
        let units = match extension.as_str() {
            "txt" | "md" => load_plain_text(path),
            "pdf" => load_pdf(path),
            "docx" => load_docx(path),
            other => return Err(Error::UnsupportedFormat(format!(".{other}"))),
        }?;
        info!(
            file = %path.display(),
            units = units.len(),
            "loaded document"
        );
        Ok(units)
    }

    /// Loads every supported file directly inside `dir` (non-recursive).
    /// Sub-directories and unsupported extensions are skipped silently;
    /// per-file load failures are logged and excluded from the batch.
    pub fn load_directory(&self, dir: &Path) -> Result<Vec<RawDocument>> {
        if !dir.exists() {
            return Err(Error::NotFound(dir.display().to_string()));
        }
        info!(dir = %dir.display(), "scanning directory");

        let mut units = Vec::new();
        let mut loaded = 0usize;
        let mut failed = 0usize;
        for entry in walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let supported = extension_of(path)
                .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
            if !supported {
                debug!(file = %path.display(), "skipping unsupported entry");
                continue;
            }
            match self.load_file(path) {
                Ok(file_units) => {
                    loaded += 1;
                    units.extend(file_units);
                }
                Err(err) => {
                    failed += 1;
                    warn!(file = %path.display(), error = %err, "skipping file");
                }
            }
        }

        if failed > 0 {
            warn!(failed, "some files could not be loaded");
        }
        if units.is_empty() {
            warn!(dir = %dir.display(), "no supported documents found");
        } else {
            info!(files = loaded, units = units.len(), "directory scan complete");
        }
        Ok(units)
    }
}

impl docshelf_core::traits::Loader for DocumentLoader {
    fn load(&self, path: &Path) -> Result<Vec<RawDocument>> {
        DocumentLoader::load(self, path)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

fn load_failed(path: &Path, detail: impl Into<String>) -> Error {
    Error::LoadFailed { path: path.display().to_string(), detail: detail.into() }
}

fn load_plain_text(path: &Path) -> Result<Vec<RawDocument>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            let bytes = fs::read(path).map_err(|e| load_failed(path, e.to_string()))?;
            String::from_utf8_lossy(&bytes).to_string()
        }
    };
    Ok(vec![RawDocument {
        content,
        source_path: path.display().to_string(),
        page: None,
    }])
}

/// One unit per non-empty page; pages arrive separated by form-feed.
fn load_pdf(path: &Path) -> Result<Vec<RawDocument>> {
    let output = Command::new("pdftotext")
        .args(["-layout", "-enc", "UTF-8"])
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| load_failed(path, format!("could not run pdftotext: {e} (is poppler installed?)")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(load_failed(path, format!("pdftotext failed: {}", stderr.trim())));
    }

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let units: Vec<RawDocument> = text
        .split('\u{c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(idx, page)| RawDocument {
            content: page.to_string(),
            source_path: path.display().to_string(),
            page: Some(idx as u32 + 1),
        })
        .collect();

    if units.is_empty() {
        return Err(load_failed(path, "pdftotext produced no text output"));
    }
    Ok(units)
}

fn load_docx(path: &Path) -> Result<Vec<RawDocument>> {
    let file = fs::File::open(path).map_err(|e| load_failed(path, e.to_string()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| load_failed(path, format!("not a docx archive: {e}")))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| load_failed(path, "word/document.xml missing from archive"))?
        .read_to_string(&mut xml)
        .map_err(|e| load_failed(path, e.to_string()))?;

    let content = plain_text_from_document_xml(&xml);
    if content.trim().is_empty() {
        return Err(load_failed(path, "document contains no extractable text"));
    }
    Ok(vec![RawDocument {
        content,
        source_path: path.display().to_string(),
        page: None,
    }])
}

/// Strips WordprocessingML down to plain text: paragraph ends and explicit
/// breaks become newlines, every other tag is dropped, entities decoded.
fn plain_text_from_document_xml(xml: &str) -> String {
    let mut out = String::new();
    let mut tag = String::new();
    let mut in_tag = false;
    for ch in xml.chars() {
        if in_tag {
            if ch == '>' {
                if tag == "/w:p" || tag.starts_with("w:br") {
                    out.push('\n');
                }
                tag.clear();
                in_tag = false;
            } else {
                tag.push(ch);
            }
        } else if ch == '<' {
            in_tag = true;
        } else {
            out.push(ch);
        }
    }
    decode_xml_entities(&out)
}

fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
