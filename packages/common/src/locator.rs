use std::collections::HashMap;
use std::path::PathBuf;

/// Resource abstraction for `@include` resolution and testing.
///
/// Consulted only while included documents are registered, never during
/// per-declaration evaluation.
pub trait ResourceLocator {
    /// Resolve a URL/path reference to its byte content.
    fn locate(&self, path: &str) -> Result<Vec<u8>, std::io::Error>;
}

/// Locator that resolves references relative to a base directory.
pub struct FileSystemLocator {
    base_dir: PathBuf,
}

impl FileSystemLocator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl ResourceLocator for FileSystemLocator {
    fn locate(&self, path: &str) -> Result<Vec<u8>, std::io::Error> {
        std::fs::read(self.base_dir.join(path))
    }
}

/// In-memory locator for testing
#[derive(Default)]
pub struct MockLocator {
    pub resources: HashMap<String, Vec<u8>>,
}

impl MockLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.resources.insert(path.into(), content.into());
    }
}

impl ResourceLocator for MockLocator {
    fn locate(&self, path: &str) -> Result<Vec<u8>, std::io::Error> {
        self.resources.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("resource not found: {}", path),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_locator_roundtrip() {
        let mut locator = MockLocator::new();
        locator.add_resource("theme.xcss", "@define { accent: #ff0000; }");

        let bytes = locator.locate("theme.xcss").unwrap();
        assert_eq!(bytes, b"@define { accent: #ff0000; }");
        assert!(locator.locate("missing.xcss").is_err());
    }
}
