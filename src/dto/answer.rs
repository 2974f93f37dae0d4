use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{validate_choice, validate_display_name},
    store::models::AnswerRow,
};

/// Payload a player device sends to answer the live question.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// The submitting player's display name.
    pub name: String,
    /// The picked option.
    pub choice: String,
    /// Question the device believes is live; rejected when it does not match
    /// the authoritative index.
    pub question_index: usize,
    /// Milliseconds left on the device's round clock at pick time. Clamped
    /// server-side, so it only ever lowers the speed bonus.
    pub time_remaining_ms: u64,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }
        if let Err(e) = validate_choice(&self.choice) {
            errors.add("choice", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Acknowledgement of a recorded answer. Deliberately omits `is_correct` and
/// `score`: the reveal happens on the results screen, not on the player's
/// device.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerAck {
    /// Question the answer was recorded for.
    pub question_index: usize,
    /// The recorded pick, echoed back.
    pub choice: String,
    /// True when this submission was the last one outstanding and the round
    /// is being concluded early.
    pub round_concluded: bool,
}

impl AnswerAck {
    /// Build the acknowledgement for a freshly recorded row.
    pub fn for_row(row: &AnswerRow, round_concluded: bool) -> Self {
        Self {
            question_index: row.question_index,
            choice: row.choice.clone(),
            round_concluded,
        }
    }
}
