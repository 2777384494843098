pub mod composer;

pub use composer::{ComposeError, Composer, SubmitEvent, SubmitStatus, SubmitTicket};
