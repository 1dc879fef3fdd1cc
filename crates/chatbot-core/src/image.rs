//! Image attachments
//!
//! The upload control only accepts jpg/jpeg/png files. An image is "valid"
//! when its bytes carry a PNG or JPEG signature; invalid images are never
//! sent to the remote API.

use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// File extensions the upload control accepts
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const JPEG_SIGNATURE: &[u8] = &[0xff, 0xd8, 0xff];

#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Load an image from disk, rejecting unsupported extensions and
    /// files that are not actually PNG/JPEG data.
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(anyhow!(
                "Unsupported file type '{}'. Allowed: {}",
                path.display(),
                ALLOWED_EXTENSIONS.join(", ")
            ));
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("Could not read image {}", path.display()))?;

        let mime_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let image = Self::new(name, mime_type, bytes);
        if !image.is_valid() {
            return Err(anyhow!("{} is not a valid PNG or JPEG image", path.display()));
        }

        tracing::debug!(name = %image.name, size = image.bytes.len(), "loaded image");
        Ok(image)
    }

    pub fn is_valid(&self) -> bool {
        self.bytes.starts_with(PNG_SIGNATURE) || self.bytes.starts_with(JPEG_SIGNATURE)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn sample_png() -> Image {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend_from_slice(b"not really pixels");
    Image::new("photo.png", "image/png", bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cat.PNG");
        fs::write(&path, &sample_png().bytes).unwrap();

        let image = Image::load(&path).unwrap();
        assert_eq!(image.name, "cat.PNG");
        assert_eq!(image.mime_type, "image/png");
        assert!(image.is_valid());
    }

    #[test]
    fn test_load_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dog.jpg");
        fs::write(&path, [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]).unwrap();

        let image = Image::load(&path).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn test_rejects_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("anim.gif");
        fs::write(&path, b"GIF89a").unwrap();

        let err = Image::load(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }

    #[test]
    fn test_rejects_bad_signature() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.png");
        fs::write(&path, b"plain text pretending").unwrap();

        assert!(Image::load(&path).is_err());
    }

    #[test]
    fn test_base64() {
        let image = Image::new("x.png", "image/png", b"abc".to_vec());
        assert_eq!(image.to_base64(), "YWJj");
        assert!(!image.is_valid());
    }
}
