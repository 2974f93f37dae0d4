use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_display_name,
    services::scoring::PlayerScore,
    store::models::{GameStateRow, Phase, PlayerRow, SessionRow, SessionSnapshot, Team},
};

/// Payload used to create a brand-new session.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Display name for team A; defaults to "Blue".
    #[serde(default)]
    pub team_a_name: Option<String>,
    /// Display name for team B; defaults to "Red".
    #[serde(default)]
    pub team_b_name: Option<String>,
}

impl Validate for CreateSessionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref name) = self.team_a_name {
            if let Err(e) = validate_display_name(name) {
                errors.add("team_a_name", e);
            }
        }
        if let Some(ref name) = self.team_b_name {
            if let Err(e) = validate_display_name(name) {
                errors.add("team_b_name", e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Summary returned once a session has been created or looked up.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// The join code players type (and the QR link embeds).
    pub code: String,
    /// Display name for team A.
    pub team_a_name: String,
    /// Display name for team B.
    pub team_b_name: String,
    /// Cumulative total for team A.
    pub team_a_total: u32,
    /// Cumulative total for team B.
    pub team_b_total: u32,
    /// Phase the session is currently in.
    pub phase: Phase,
}

impl From<(SessionRow, GameStateRow)> for SessionSummary {
    fn from((session, state): (SessionRow, GameStateRow)) -> Self {
        Self {
            code: session.code,
            team_a_name: session.team_a_name,
            team_b_name: session.team_b_name,
            team_a_total: session.team_a_total,
            team_b_total: session.team_b_total,
            phase: state.phase,
        }
    }
}

/// Payload a player device sends to join a session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Display name; joining again under the same name recovers the existing
    /// identity instead of creating a duplicate.
    pub name: String,
    /// Team to join; fixed for the rest of the session.
    pub team: Team,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_display_name(&self.name) {
            errors.add("name", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Identity handed back to a joining (or re-joining) device.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// The definitive roster row for this player.
    pub player: PlayerRow,
    /// True when the name was already on the roster and the existing
    /// identity was returned.
    pub rejoined: bool,
}

/// One leaderboard row.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Player display name.
    pub name: String,
    /// Team the player scored for.
    pub team: Team,
    /// Total points across the session so far.
    pub score: u32,
}

impl From<PlayerScore> for LeaderboardEntry {
    fn from(score: PlayerScore) -> Self {
        Self {
            name: score.name,
            team: score.team,
            score: score.score,
        }
    }
}

/// Timing constants every client animates against. Served with the snapshot
/// so countdowns and round clocks look the same on every device.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundTiming {
    /// How long a round accepts answers, in milliseconds.
    pub round_ms: u64,
    /// Length of the pre-round countdown, in seconds.
    pub countdown_seconds: u32,
    /// Breather between results and the next countdown, in milliseconds.
    pub intermission_ms: u64,
}

/// Catch-up payload for an attaching client: the full session snapshot plus
/// the derived leaderboard and the timing constants.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotResponse {
    /// Session registry, game state, roster, and current-question answers.
    pub snapshot: SessionSnapshot,
    /// Top players by total points.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Timing constants for rendering countdowns and round clocks.
    pub timing: RoundTiming,
}
