use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use crate::validation::{ValidationError, MAX_IMAGE_BYTES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlaceholder {
    pub id: &'static str,
    pub description: &'static str,
    pub image_url: &'static str,
    pub image_hint: &'static str,
}

pub static PLACEHOLDER_IMAGES: &[ImagePlaceholder] = &[
    ImagePlaceholder {
        id: "contestant-1",
        description: "Portrait of a smiling woman",
        image_url: "https://picsum.photos/seed/contestant1/400/400",
        image_hint: "woman portrait",
    },
    ImagePlaceholder {
        id: "contestant-2",
        description: "Portrait of a man with glasses",
        image_url: "https://picsum.photos/seed/contestant2/400/400",
        image_hint: "man portrait",
    },
    ImagePlaceholder {
        id: "contestant-3",
        description: "Portrait of a person in a hoodie",
        image_url: "https://picsum.photos/seed/contestant3/400/400",
        image_hint: "person portrait",
    },
    ImagePlaceholder {
        id: "contestant-4",
        description: "Portrait of an athlete",
        image_url: "https://picsum.photos/seed/contestant4/400/400",
        image_hint: "athlete portrait",
    },
    ImagePlaceholder {
        id: "team-logo-1",
        description: "Round blue crest",
        image_url: "https://picsum.photos/seed/teamlogo1/200/200",
        image_hint: "sports logo",
    },
    ImagePlaceholder {
        id: "team-logo-2",
        description: "Red shield emblem",
        image_url: "https://picsum.photos/seed/teamlogo2/200/200",
        image_hint: "shield logo",
    },
];

pub fn placeholder_by_id(id: &str) -> Option<&'static ImagePlaceholder> {
    PLACEHOLDER_IMAGES.iter().find(|p| p.id == id)
}

/// Where an image reference stored on a contestant points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Inline { mime: &'a str, size: usize },
    Placeholder(&'static ImagePlaceholder),
    Remote(&'a str),
}

impl<'a> ImageSource<'a> {
    pub fn classify(reference: &'a str) -> Result<Self, ValidationError> {
        if let Some(rest) = reference.strip_prefix("data:") {
            return Self::classify_inline(rest);
        }

        if let Some(placeholder) = PLACEHOLDER_IMAGES.iter()
            .find(|p| p.image_url == reference || p.id == reference)
        {
            return Ok(ImageSource::Placeholder(placeholder));
        }

        if reference.starts_with("https://") && reference.len() > "https://".len() {
            return Ok(ImageSource::Remote(reference));
        }

        Err(ValidationError::InvalidImage("expected a data URL, a placeholder or an https URL".into()))
    }

    fn classify_inline(rest: &'a str) -> Result<Self, ValidationError> {
        let (header, payload) = rest.split_once(',')
            .ok_or_else(|| ValidationError::InvalidImage("data URL without payload".into()))?;
        let mime = header.strip_suffix(";base64")
            .ok_or_else(|| ValidationError::InvalidImage("data URL must be base64 encoded".into()))?;

        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(ValidationError::InvalidImage(format!("unsupported media type {mime:?}")));
        }

        // Cheap upper bound before decoding anything.
        if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
            return Err(ValidationError::ImageTooLarge);
        }

        let bytes = STANDARD.decode(payload)
            .map_err(|e| ValidationError::InvalidImage(format!("bad base64 payload: {e}")))?;
        if bytes.is_empty() {
            return Err(ValidationError::InvalidImage("empty image payload".into()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge);
        }

        Ok(ImageSource::Inline { mime, size: bytes.len() })
    }
}
