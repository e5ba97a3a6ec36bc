//! Yes/no/cancel prompts raised while checking a document.

/// Answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Cancel,
}

/// Asks the user to confirm a destructive step.
pub trait ConfirmationService {
    fn confirm(&self, message: &str) -> Confirmation;
}

/// Always gives the same answer. Used by headless runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub Confirmation);

impl ConfirmationService for FixedAnswer {
    fn confirm(&self, message: &str) -> Confirmation {
        tracing::debug!("auto-answering {:?}: {}", self.0, message);
        self.0
    }
}

impl<F> ConfirmationService for F
where
    F: Fn(&str) -> Confirmation,
{
    fn confirm(&self, message: &str) -> Confirmation {
        self(message)
    }
}
