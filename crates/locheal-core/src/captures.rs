use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::page::detect_automation_type;
use crate::types::AutomationType;

const CAPTURE_EXTENSIONS: [&str; 3] = ["xml", "html", "htm"];

/// A page source saved to disk, e.g. by a test run's failure hook.
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub path: PathBuf,
    pub source: String,
    pub automation_type: AutomationType,
}

/// Reads a page source, falling back to lossy UTF-8 for odd encodings.
pub fn read_page_source(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::NotFound(path.display().to_string()).into());
    }
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}

/// All capture files below `root`, sorted by path.
pub fn list_captures(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        let is_capture = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| CAPTURE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_capture { files.push(path.to_path_buf()); }
    }
    files.sort();
    files
}

pub fn load_captures(root: &Path) -> Result<Vec<PageCapture>> {
    let files = list_captures(root);
    if files.is_empty() {
        tracing::warn!("No page captures found under {}", root.display());
        return Ok(vec![]);
    }
    let mut captures = Vec::with_capacity(files.len());
    for (index, path) in files.iter().enumerate() {
        tracing::debug!("Loading capture {}/{}: {}", index + 1, files.len(), path.display());
        let source = read_page_source(path)?;
        let automation_type = detect_automation_type(&source);
        captures.push(PageCapture { path: path.clone(), source, automation_type });
    }
    Ok(captures)
}
