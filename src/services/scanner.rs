use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// An input image. `key` is its path relative to the input root with `/`
/// separators; it doubles as the correlation key of its request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputImage {
    pub key: String,
    pub path: PathBuf,
}

impl InputImage {
    pub fn mime_type(&self) -> &'static str {
        mime_type_for(&self.path)
    }
}

const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
}

pub fn mime_type_for(path: &Path) -> &'static str {
    match extension_lower(path).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Images directly under `root`, sorted by key. Subfolders are not scanned,
/// which keeps keys unique by construction.
pub fn scan_inputs(root: &Path) -> Result<Vec<InputImage>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::FolderNotFound(root.display().to_string()));
    }

    let mut images: Vec<InputImage> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            extension_lower(e.path())
                .map(|ext| INPUT_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false)
        })
        .map(|e| InputImage {
            key: e.file_name().to_string_lossy().to_string(),
            path: e.path().to_path_buf(),
        })
        .collect();

    images.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(images)
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Input folder not found: {0}")]
    FolderNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_missing_folder() {
        assert!(scan_inputs(Path::new("/nonexistent/input_images")).is_err());
    }

    #[test]
    fn test_scan_picks_images_only_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.PNG", "a.jpg", "b.webp", "notes.txt", "d.JPEG"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("e.png"), b"x").unwrap();

        let keys: Vec<String> = scan_inputs(dir.path())
            .unwrap()
            .into_iter()
            .map(|i| i.key)
            .collect();

        assert_eq!(keys, vec!["a.jpg", "b.webp", "c.PNG", "d.JPEG"]);
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for(Path::new("a")), "application/octet-stream");
    }
}
