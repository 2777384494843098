use crate::canvas::{CanvasState, ImageId, InteractionState};
use crate::config::CanvasOptions;

/// Pointer input in canvas-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    ResizeHandle(ImageId),
    DeleteControl(ImageId),
    Body(ImageId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    Ignored,
    DragStarted(ImageId),
    ResizeStarted(ImageId),
    Moved(ImageId),
    Resized(ImageId),
    Removed(ImageId),
    Released(ImageId),
}

/// Turns raw pointer events into gestures against a [`CanvasState`].
#[derive(Debug, Clone)]
pub struct InteractionController {
    handle_size: f64,
    delete_size: f64,
    grab_offset: (f64, f64),
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(&CanvasOptions::default())
    }
}

impl InteractionController {
    pub fn new(options: &CanvasOptions) -> Self {
        Self {
            handle_size: options.handle_size,
            delete_size: options.delete_size,
            grab_offset: (0.0, 0.0),
        }
    }

    /// Topmost image wins; within one image the resize handle sits above the
    /// delete control, which sits above the body.
    pub fn hit_test(&self, canvas: &CanvasState, x: f64, y: f64) -> Option<HitTarget> {
        canvas.images().rev().find_map(|image| {
            let rect = image.rect;
            if rect.bottom_right_square(self.handle_size).contains(x, y) {
                Some(HitTarget::ResizeHandle(image.id))
            } else if rect.top_right_square(self.delete_size).contains(x, y) {
                Some(HitTarget::DeleteControl(image.id))
            } else if rect.contains(x, y) {
                Some(HitTarget::Body(image.id))
            } else {
                None
            }
        })
    }

    pub fn handle(&mut self, canvas: &mut CanvasState, event: PointerEvent) -> PointerOutcome {
        match event {
            PointerEvent::Down { x, y } => self.pointer_down(canvas, x, y),
            PointerEvent::Move { x, y } => self.pointer_move(canvas, x, y),
            PointerEvent::Up | PointerEvent::Leave => {
                let active = canvas.interaction().active_image();
                canvas.end_interaction();
                active.map_or(PointerOutcome::Ignored, PointerOutcome::Released)
            }
        }
    }

    /// Explicit per-image delete, usable whatever gesture is in progress.
    pub fn delete(&mut self, canvas: &mut CanvasState, id: ImageId) -> bool {
        canvas.remove_image(id).is_some()
    }

    fn pointer_down(&mut self, canvas: &mut CanvasState, x: f64, y: f64) -> PointerOutcome {
        if !canvas.interaction().is_idle() {
            return PointerOutcome::Ignored;
        }
        match self.hit_test(canvas, x, y) {
            Some(HitTarget::ResizeHandle(id)) => {
                if canvas.begin_resize(id) {
                    PointerOutcome::ResizeStarted(id)
                } else {
                    PointerOutcome::Ignored
                }
            }
            Some(HitTarget::DeleteControl(id)) => {
                if self.delete(canvas, id) {
                    PointerOutcome::Removed(id)
                } else {
                    PointerOutcome::Ignored
                }
            }
            Some(HitTarget::Body(id)) => {
                let Some(rect) = canvas.get(id).map(|image| image.rect) else {
                    return PointerOutcome::Ignored;
                };
                if !canvas.begin_drag(id) {
                    return PointerOutcome::Ignored;
                }
                self.grab_offset = (x - rect.x, y - rect.y);
                PointerOutcome::DragStarted(id)
            }
            None => PointerOutcome::Ignored,
        }
    }

    fn pointer_move(&mut self, canvas: &mut CanvasState, x: f64, y: f64) -> PointerOutcome {
        match canvas.interaction() {
            InteractionState::Idle => PointerOutcome::Ignored,
            InteractionState::Dragging(id) => {
                let Some(rect) = canvas.get(id).map(|image| image.rect) else {
                    return PointerOutcome::Ignored;
                };
                let target_x = x - self.grab_offset.0;
                let target_y = y - self.grab_offset.1;
                if canvas.move_image(id, target_x - rect.x, target_y - rect.y) {
                    PointerOutcome::Moved(id)
                } else {
                    PointerOutcome::Ignored
                }
            }
            InteractionState::Resizing(id) => {
                let Some(rect) = canvas.get(id).map(|image| image.rect) else {
                    return PointerOutcome::Ignored;
                };
                if canvas.resize_image(id, x - rect.x, y - rect.y) {
                    PointerOutcome::Resized(id)
                } else {
                    PointerOutcome::Ignored
                }
            }
        }
    }
}
