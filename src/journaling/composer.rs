use thiserror::Error;
use time::OffsetDateTime;

use crate::api::{ApiError, EntryStore};
use crate::canvas::{ImageId, InteractionController, PendingImage, PointerEvent, PointerOutcome};
use crate::config::{AppConfig, CanvasOptions};
use crate::entry::{Draft, EntryId, EntryStyle, ValidationError};
use crate::session::AuthSession;
use crate::wire::{self, EntryUpload};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in flight")]
    SubmitInFlight,
    #[error("submitting entry failed: {0}")]
    Store(#[from] ApiError),
    #[error("the editor was reset before the submission finished")]
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitStatus {
    Idle,
    InFlight {
        since: OffsetDateTime,
    },
    Failed {
        message: String,
        retryable: bool,
        occurred_at: OffsetDateTime,
    },
    Submitted {
        entry_id: Option<EntryId>,
        at: OffsetDateTime,
    },
}

/// Proof of an in-flight submission; only the editing generation that
/// issued it may apply its result.
#[must_use = "pass the ticket to `complete_submit` once the request resolves"]
#[derive(Debug)]
pub struct SubmitTicket {
    generation: u64,
}

#[derive(Debug)]
pub enum SubmitEvent {
    Submitted { entry_id: Option<EntryId> },
    Failed(ApiError),
    /// The result belonged to an editing session that no longer exists.
    Discarded,
}

/// One entry-editing session: the draft, its pointer controller and the
/// submit lifecycle.
#[derive(Debug)]
pub struct Composer {
    author: String,
    default_style: EntryStyle,
    canvas_options: CanvasOptions,
    draft: Draft,
    controller: InteractionController,
    generation: u64,
    in_flight: bool,
    status: SubmitStatus,
}

impl Composer {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_defaults(
            config.author.clone(),
            EntryStyle::from_defaults(&config.style),
            config.canvas.clone(),
        )
    }

    pub fn with_defaults(
        author: impl Into<String>,
        default_style: EntryStyle,
        canvas_options: CanvasOptions,
    ) -> Self {
        let author = author.into();
        let draft = Draft::new(author.clone(), default_style.clone(), canvas_options.clone());
        Self {
            controller: InteractionController::new(&canvas_options),
            author,
            default_style,
            canvas_options,
            draft,
            generation: 0,
            in_flight: false,
            status: SubmitStatus::Idle,
        }
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn style_mut(&mut self) -> &mut EntryStyle {
        &mut self.draft.style
    }

    pub fn add_image(&mut self, image: PendingImage) -> ImageId {
        self.draft.canvas.add_image(image).id
    }

    pub fn add_images(&mut self, images: impl IntoIterator<Item = PendingImage>) -> Vec<ImageId> {
        self.draft.canvas.add_images(images)
    }

    pub fn remove_image(&mut self, id: ImageId) -> bool {
        self.controller.delete(&mut self.draft.canvas, id)
    }

    pub fn pointer(&mut self, event: PointerEvent) -> PointerOutcome {
        self.controller.handle(&mut self.draft.canvas, event)
    }

    pub fn text_accepts_pointer(&self) -> bool {
        self.draft.canvas.text_accepts_pointer()
    }

    pub fn status(&self) -> &SubmitStatus {
        &self.status
    }

    /// False while a submission is awaiting its response.
    pub fn can_submit(&self) -> bool {
        !self.in_flight
    }

    /// Validates and encodes the draft, then marks it in flight. Nothing is
    /// sent and nothing changes when validation fails.
    pub fn prepare_submit(&mut self) -> Result<(SubmitTicket, EntryUpload), ComposeError> {
        if self.in_flight {
            return Err(ComposeError::SubmitInFlight);
        }
        let upload = wire::encode(&self.draft)?;
        self.in_flight = true;
        self.status = SubmitStatus::InFlight {
            since: OffsetDateTime::now_utc(),
        };
        tracing::debug!(
            generation = self.generation,
            images = upload.images.len(),
            "submission prepared"
        );
        Ok((
            SubmitTicket {
                generation: self.generation,
            },
            upload,
        ))
    }

    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        result: Result<Option<EntryId>, ApiError>,
    ) -> SubmitEvent {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding result for replaced editor"
            );
            return SubmitEvent::Discarded;
        }
        self.in_flight = false;
        let now = OffsetDateTime::now_utc();
        match result {
            Ok(entry_id) => {
                tracing::info!(entry = ?entry_id, "entry submitted");
                self.draft = self.fresh_draft();
                self.status = SubmitStatus::Submitted {
                    entry_id: entry_id.clone(),
                    at: now,
                };
                SubmitEvent::Submitted { entry_id }
            }
            Err(err) => {
                tracing::warn!(%err, "entry submission failed, draft kept for retry");
                self.status = SubmitStatus::Failed {
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                    occurred_at: now,
                };
                SubmitEvent::Failed(err)
            }
        }
    }

    pub async fn submit(
        &mut self,
        store: &dyn EntryStore,
        session: &AuthSession,
    ) -> Result<Option<EntryId>, ComposeError> {
        let (ticket, upload) = self.prepare_submit()?;
        let result = store.create_entry(session, upload).await;
        match self.complete_submit(ticket, result) {
            SubmitEvent::Submitted { entry_id } => Ok(entry_id),
            SubmitEvent::Failed(err) => Err(ComposeError::Store(err)),
            SubmitEvent::Discarded => Err(ComposeError::Superseded),
        }
    }

    /// Abandons the current draft. Results of submissions issued before the
    /// reset are discarded when they arrive.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.in_flight = false;
        self.status = SubmitStatus::Idle;
        self.draft = self.fresh_draft();
    }

    fn fresh_draft(&self) -> Draft {
        Draft::new(
            self.author.clone(),
            self.default_style.clone(),
            self.canvas_options.clone(),
        )
    }
}
