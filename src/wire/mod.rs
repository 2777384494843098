//! Conversion between the in-memory entry model and the storage API's wire
//! format: multipart fields on write, JSON entry records on read.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, NoneAsEmptyString};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::canvas::{CanvasView, ImageId, ImagePlacement, ImageSource, PendingImage, Rect};
use crate::entry::{lenient, Draft, EntryId, EntryStyle, EntryView, ValidationError};

/// Name shared by every binary image part.
pub const IMAGES_FIELD: &str = "images";
const ANONYMOUS_AUTHOR: &str = "Anonymous";

pub fn image_data_field(index: usize) -> String {
    format!("imageData{index}")
}

/// Per-image layout metadata sent alongside the binary parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLayout {
    pub id: ImageId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageLayout {
    fn of(placement: &ImagePlacement) -> Self {
        Self {
            id: placement.id,
            x: placement.rect.x,
            y: placement.rect.y,
            width: placement.rect.width,
            height: placement.rect.height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePart {
    /// Canvas position; matches the `imageData{index}` metadata part.
    pub index: usize,
    pub image: PendingImage,
}

/// A fully encoded entry, ready to become a multipart request body.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryUpload {
    pub fields: Vec<(&'static str, String)>,
    pub images: Vec<ImagePart>,
    pub layouts: Vec<ImageLayout>,
}

impl EntryUpload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `(imageData{index}, json)` pairs in canvas order.
    pub fn layout_fields(&self) -> serde_json::Result<Vec<(String, String)>> {
        self.layouts
            .iter()
            .enumerate()
            .map(|(index, layout)| Ok((image_data_field(index), serde_json::to_string(layout)?)))
            .collect()
    }
}

pub fn encode(draft: &Draft) -> Result<EntryUpload, ValidationError> {
    draft.validate()?;

    let style = &draft.style;
    let fields = vec![
        ("title", draft.title.clone()),
        ("name", draft.author.clone()),
        ("text", draft.text.clone()),
        ("fontFamily", style.font_family.clone()),
        ("fontSize", style.font_size.to_string()),
        ("fontStyle", style.font_style.to_string()),
        ("fontWeight", style.font_weight.to_string()),
        ("color", style.color.to_string()),
    ];

    let mut images = Vec::new();
    let mut layouts = Vec::with_capacity(draft.canvas.len());
    for (index, placement) in draft.canvas.images().enumerate() {
        match &placement.source {
            ImageSource::Pending(image) => images.push(ImagePart {
                index,
                image: image.clone(),
            }),
            ImageSource::Remote(url) => {
                tracing::debug!(id = %placement.id, url, "image already stored, sending layout only");
            }
        }
        layouts.push(ImageLayout::of(placement));
    }

    Ok(EntryUpload {
        fields,
        images,
        layouts,
    })
}

/// Entry record as returned by `GET /entries`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    #[serde(alias = "_id")]
    pub id: EntryId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "author")]
    pub name: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub date: Option<String>,
    #[serde_as(as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde_as(as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(default)]
    pub font_size: Option<String>,
    #[serde_as(as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(default)]
    pub font_style: Option<String>,
    #[serde_as(as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(default)]
    pub font_weight: Option<String>,
    #[serde_as(as = "DefaultOnNull<NoneAsEmptyString>")]
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub images: Vec<StoredImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub image_url: String,
}

/// Joins a server-relative path onto the API base address. Absolute URLs
/// pass through untouched.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn decode(stored: StoredEntry, base_url: &str) -> EntryView {
    let fallback = EntryStyle::default();
    let style = EntryStyle {
        font_family: stored.font_family.unwrap_or(fallback.font_family),
        font_size: stored
            .font_size
            .map_or(fallback.font_size, |raw| lenient(&raw, "font size", fallback.font_size)),
        font_style: stored
            .font_style
            .map_or(fallback.font_style, |raw| lenient(&raw, "font style", fallback.font_style)),
        font_weight: stored.font_weight.map_or(fallback.font_weight, |raw| {
            lenient(&raw, "font weight", fallback.font_weight)
        }),
        color: stored
            .color
            .map_or_else(|| fallback.color.clone(), |raw| lenient(&raw, "color", fallback.color.clone())),
    };

    let created_at = stored.date.as_deref().and_then(|raw| {
        OffsetDateTime::parse(raw, &Rfc3339)
            .map_err(|err| tracing::warn!(?err, entry = %stored.id, raw, "unparsable entry date"))
            .ok()
    });

    let images = stored
        .images
        .into_iter()
        .enumerate()
        .map(|(index, image)| ImagePlacement {
            id: ImageId::from_index(index),
            source: ImageSource::Remote(resolve_url(base_url, &image.image_url)),
            rect: Rect::new(image.x, image.y, image.width, image.height),
        })
        .collect();

    EntryView {
        id: stored.id,
        title: stored.title,
        text: stored.text,
        author: stored
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
        created_at,
        style,
        canvas: CanvasView::new(images),
    }
}

pub fn decode_all(stored: Vec<StoredEntry>, base_url: &str) -> Vec<EntryView> {
    stored
        .into_iter()
        .map(|entry| decode(entry, base_url))
        .collect()
}
