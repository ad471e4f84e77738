//! Upload validation run before any file reaches the reconciler.

/// Extensions accepted by [`ExtensionValidator`].
pub const PRINTABLE_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "odt", "ppt", "pptx", "xls", "xlsx", "txt", "png", "jpg", "jpeg",
];

/// Accept/reject decision for one uploaded file.
pub trait FileValidator: Send + Sync {
    /// `Err` carries the human-readable rejection reason.
    fn validate(&self, file_name: &str, bytes: &[u8]) -> Result<(), String>;
}

/// Accepts printable document and image types by extension.
///
/// Zero-byte uploads pass: they stand for physical originals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionValidator;

impl FileValidator for ExtensionValidator {
    fn validate(&self, file_name: &str, _bytes: &[u8]) -> Result<(), String> {
        let name = file_name.trim();
        if name.is_empty() {
            return Err("file name is empty".into());
        }
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(format!("file name '{name}' must not contain path separators"));
        }
        let ext = match name.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            None => return Err(format!("file '{name}' has no extension")),
        };
        if PRINTABLE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(())
        } else {
            Err(format!(
                "unsupported file type '.{ext}'. Supported: {}",
                PRINTABLE_EXTENSIONS.join(", ")
            ))
        }
    }
}
