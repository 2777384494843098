use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::CanvasOptions;

pub mod controller;

pub use controller::{HitTarget, InteractionController, PointerEvent, PointerOutcome};

/// Session-scoped identifier for an image on the editing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(u64);

impl ImageId {
    pub fn from_index(index: usize) -> Self {
        Self(index as u64)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binary payload selected by the user that has not been uploaded yet.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl PendingImage {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

impl fmt::Debug for PendingImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingImage")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Pending(PendingImage),
    /// Absolute URL of an image the storage API already holds.
    Remote(String),
}

impl ImageSource {
    pub fn pending(&self) -> Option<&PendingImage> {
        match self {
            ImageSource::Pending(image) => Some(image),
            ImageSource::Remote(_) => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ImageSource::Remote(url) => Some(url),
            ImageSource::Pending(_) => None,
        }
    }
}

/// Position and size in canvas-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Square hotspot of side `size` anchored in the bottom-right corner.
    pub fn bottom_right_square(&self, size: f64) -> Rect {
        Rect::new(self.right() - size, self.bottom() - size, size, size)
    }

    /// Square hotspot of side `size` anchored in the top-right corner.
    pub fn top_right_square(&self, size: f64) -> Rect {
        Rect::new(self.right() - size, self.y, size, size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlacement {
    pub id: ImageId,
    pub source: ImageSource,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging(ImageId),
    Resizing(ImageId),
}

impl InteractionState {
    pub fn active_image(&self) -> Option<ImageId> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Dragging(id) | InteractionState::Resizing(id) => Some(*id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }
}

/// Authoritative layout of one entry being composed: the ordered image
/// placements plus the single active gesture, if any.
#[derive(Debug, Clone)]
pub struct CanvasState {
    options: CanvasOptions,
    images: IndexMap<ImageId, ImagePlacement>,
    interaction: InteractionState,
    next_id: u64,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new(CanvasOptions::default())
    }
}

impl CanvasState {
    pub fn new(options: CanvasOptions) -> Self {
        Self {
            options,
            images: IndexMap::new(),
            interaction: InteractionState::Idle,
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, id: ImageId) -> Option<&ImagePlacement> {
        self.images.get(&id)
    }

    /// Placements in insertion order; later entries render above earlier ones.
    pub fn images(&self) -> impl DoubleEndedIterator<Item = &ImagePlacement> + ExactSizeIterator {
        self.images.values()
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction
    }

    /// The text layer beneath the images only takes pointer input while no
    /// gesture is in progress.
    pub fn text_accepts_pointer(&self) -> bool {
        self.interaction.is_idle()
    }

    pub fn add_image(&mut self, image: PendingImage) -> &ImagePlacement {
        let id = ImageId(self.next_id);
        self.next_id += 1;
        let rect = Rect::new(
            self.options.default_x,
            self.options.default_y,
            self.options.default_width,
            self.options.default_height,
        );
        tracing::debug!(%id, file = %image.file_name, "image added to canvas");
        let placement = ImagePlacement {
            id,
            source: ImageSource::Pending(image),
            rect,
        };
        self.images.entry(id).or_insert(placement)
    }

    pub fn add_images<I>(&mut self, images: I) -> Vec<ImageId>
    where
        I: IntoIterator<Item = PendingImage>,
    {
        images
            .into_iter()
            .map(|image| self.add_image(image).id)
            .collect()
    }

    pub fn move_image(&mut self, id: ImageId, dx: f64, dy: f64) -> bool {
        if self.interaction != InteractionState::Dragging(id) {
            tracing::trace!(%id, state = ?self.interaction, "move ignored outside drag");
            return false;
        }
        let Some(placement) = self.images.get_mut(&id) else {
            tracing::trace!(%id, "move ignored for unknown image");
            return false;
        };
        placement.rect.x = (placement.rect.x + dx).max(0.0);
        placement.rect.y = (placement.rect.y + dy).max(0.0);
        true
    }

    pub fn resize_image(&mut self, id: ImageId, proposed_width: f64, proposed_height: f64) -> bool {
        if self.interaction != InteractionState::Resizing(id) {
            tracing::trace!(%id, state = ?self.interaction, "resize ignored outside resize");
            return false;
        }
        let min = self.options.min_size;
        let Some(placement) = self.images.get_mut(&id) else {
            tracing::trace!(%id, "resize ignored for unknown image");
            return false;
        };
        placement.rect.width = proposed_width.max(min);
        placement.rect.height = proposed_height.max(min);
        true
    }

    pub fn remove_image(&mut self, id: ImageId) -> Option<ImagePlacement> {
        let removed = self.images.shift_remove(&id)?;
        if self.interaction.active_image() == Some(id) {
            self.interaction = InteractionState::Idle;
        }
        tracing::debug!(%id, "image removed from canvas");
        Some(removed)
    }

    pub fn begin_drag(&mut self, id: ImageId) -> bool {
        self.begin(InteractionState::Dragging(id))
    }

    pub fn begin_resize(&mut self, id: ImageId) -> bool {
        self.begin(InteractionState::Resizing(id))
    }

    pub fn end_interaction(&mut self) {
        if !self.interaction.is_idle() {
            tracing::debug!(state = ?self.interaction, "gesture ended");
        }
        self.interaction = InteractionState::Idle;
    }

    /// Drops every image and any gesture; the id counter keeps running so
    /// identifiers stay unique for the lifetime of the canvas.
    pub fn clear(&mut self) {
        self.images.clear();
        self.interaction = InteractionState::Idle;
    }

    fn begin(&mut self, next: InteractionState) -> bool {
        if !self.interaction.is_idle() {
            return false;
        }
        let Some(id) = next.active_image() else {
            return false;
        };
        if !self.images.contains_key(&id) {
            return false;
        }
        tracing::debug!(state = ?next, "gesture started");
        self.interaction = next;
        true
    }
}

/// Read-only canvas produced when displaying a stored entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasView {
    images: Vec<ImagePlacement>,
}

impl CanvasView {
    pub fn new(images: Vec<ImagePlacement>) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &[ImagePlacement] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> PendingImage {
        PendingImage::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    #[test]
    fn added_images_use_default_placement_and_fresh_ids() {
        let mut canvas = CanvasState::default();
        let first = canvas.add_image(image("a.png")).clone();
        let second = canvas.add_image(image("b.png")).clone();

        assert_eq!(first.rect, Rect::new(50.0, 50.0, 150.0, 150.0));
        assert_ne!(first.id, second.id);
        let order: Vec<_> = canvas.images().map(|img| img.id).collect();
        assert_eq!(order, vec![first.id, second.id]);
    }

    #[test]
    fn drag_by_delta_moves_image() {
        let mut canvas = CanvasState::default();
        let id = canvas.add_image(image("a.png")).id;
        assert!(canvas.begin_drag(id));
        assert!(canvas.move_image(id, 20.0, 30.0));
        let rect = canvas.get(id).unwrap().rect;
        assert_eq!((rect.x, rect.y), (70.0, 80.0));
    }

    #[test]
    fn negative_drag_clamps_to_origin() {
        let mut canvas = CanvasState::default();
        let id = canvas.add_image(image("a.png")).id;
        canvas.begin_drag(id);
        assert!(canvas.move_image(id, -90.0, -60.0));
        let rect = canvas.get(id).unwrap().rect;
        assert_eq!((rect.x, rect.y), (0.0, 0.0));
    }

    #[test]
    fn repeated_moves_never_go_negative() {
        let mut canvas = CanvasState::default();
        let id = canvas.add_image(image("a.png")).id;
        canvas.begin_drag(id);
        for (dx, dy) in [
            (-1_000.0, 5.0),
            (3.0, -1e9),
            (250.0, 250.0),
            (-f64::MAX, -f64::MAX),
            (f64::NAN, 1.0),
        ] {
            canvas.move_image(id, dx, dy);
            let rect = canvas.get(id).unwrap().rect;
            assert!(rect.x >= 0.0 && rect.y >= 0.0, "went negative: {rect:?}");
        }
    }

    #[test]
    fn resize_clamps_to_minimum() {
        let mut canvas = CanvasState::default();
        let id = canvas.add_image(image("a.png")).id;
        assert!(canvas.begin_resize(id));
        for (w, h) in [(10.0, 400.0), (-30.0, -30.0), (230.0, 320.0), (49.9, 50.0)] {
            canvas.resize_image(id, w, h);
            let rect = canvas.get(id).unwrap().rect;
            assert!(rect.width >= 50.0 && rect.height >= 50.0);
        }
        canvas.resize_image(id, 230.0, 320.0);
        let rect = canvas.get(id).unwrap().rect;
        assert_eq!((rect.width, rect.height), (230.0, 320.0));
    }

    #[test]
    fn move_and_resize_require_matching_gesture() {
        let mut canvas = CanvasState::default();
        let a = canvas.add_image(image("a.png")).id;
        let b = canvas.add_image(image("b.png")).id;

        assert!(!canvas.move_image(a, 10.0, 10.0));
        assert!(!canvas.resize_image(a, 300.0, 300.0));

        canvas.begin_drag(a);
        assert!(!canvas.move_image(b, 10.0, 10.0));
        assert!(!canvas.resize_image(a, 300.0, 300.0));
        assert_eq!(canvas.get(b).unwrap().rect, Rect::new(50.0, 50.0, 150.0, 150.0));
    }

    #[test]
    fn only_one_gesture_at_a_time() {
        let mut canvas = CanvasState::default();
        let a = canvas.add_image(image("a.png")).id;
        let b = canvas.add_image(image("b.png")).id;

        assert!(canvas.begin_drag(a));
        assert!(!canvas.begin_drag(b));
        assert!(!canvas.begin_resize(a));
        assert!(!canvas.begin_resize(b));
        assert_eq!(canvas.interaction(), InteractionState::Dragging(a));

        canvas.end_interaction();
        assert!(canvas.begin_resize(b));
        assert!(!canvas.begin_drag(a));
        assert_eq!(canvas.interaction(), InteractionState::Resizing(b));
    }

    #[test]
    fn end_interaction_is_unconditional() {
        let mut canvas = CanvasState::default();
        canvas.end_interaction();
        assert!(canvas.interaction().is_idle());

        let id = canvas.add_image(image("a.png")).id;
        canvas.begin_resize(id);
        canvas.end_interaction();
        assert!(canvas.interaction().is_idle());
        assert!(canvas.text_accepts_pointer());
    }

    #[test]
    fn gestures_on_unknown_ids_are_ignored() {
        let mut canvas = CanvasState::default();
        let ghost = ImageId(42);
        assert!(!canvas.begin_drag(ghost));
        assert!(!canvas.begin_resize(ghost));
        assert!(canvas.interaction().is_idle());
    }

    #[test]
    fn removing_active_image_returns_to_idle() {
        let mut canvas = CanvasState::default();
        let id = canvas.add_image(image("a.png")).id;
        canvas.begin_drag(id);
        assert!(!canvas.text_accepts_pointer());

        assert!(canvas.remove_image(id).is_some());
        assert!(canvas.interaction().is_idle());
        assert!(!canvas.move_image(id, 5.0, 5.0));
    }

    #[test]
    fn removing_first_image_leaves_second_untouched() {
        let mut canvas = CanvasState::default();
        let first = canvas.add_image(image("a.png")).id;
        let second = canvas.add_image(image("b.png")).id;

        canvas.begin_drag(second);
        canvas.move_image(second, 100.0, 40.0);
        canvas.end_interaction();
        canvas.begin_resize(second);
        canvas.resize_image(second, 80.0, 90.0);
        canvas.end_interaction();
        let before = canvas.get(second).cloned().unwrap();

        canvas.remove_image(first);

        assert_eq!(canvas.len(), 1);
        assert_eq!(canvas.get(second), Some(&before));
        assert_eq!(before.rect, Rect::new(150.0, 90.0, 80.0, 90.0));
    }

    #[test]
    fn removing_other_image_keeps_gesture() {
        let mut canvas = CanvasState::default();
        let a = canvas.add_image(image("a.png")).id;
        let b = canvas.add_image(image("b.png")).id;
        canvas.begin_drag(a);
        canvas.remove_image(b);
        assert_eq!(canvas.interaction(), InteractionState::Dragging(a));
    }

    #[test]
    fn ids_stay_unique_after_clear() {
        let mut canvas = CanvasState::default();
        let before = canvas.add_image(image("a.png")).id;
        canvas.clear();
        let after = canvas.add_image(image("b.png")).id;
        assert_ne!(before, after);
    }
}
