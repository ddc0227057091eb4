//! Match outcome resolution and the scoring rules that turn an outcome into seeding points.

use std::{collections::HashSet, str::FromStr};

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{MatchEntity, ScoringPolicy};

/// One side of the net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Team1,
    Team2,
}

/// Games won by each side, parsed from a `games1-games2` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub team1_games: u32,
    pub team2_games: u32,
}

/// Reasons a match cannot be scored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("score `{0}` is not of the form `games1-games2`")]
    InvalidScore(String),
    #[error("expected {expected} player(s) per side, got {team1} and {team2}")]
    ParticipantCount {
        expected: usize,
        team1: usize,
        team2: usize,
    },
    #[error("player `{0}` appears more than once in the match")]
    DuplicateParticipant(Uuid),
    #[error("winner `{0}` does not designate a side of the match")]
    InvalidWinner(String),
}

impl FromStr for Score {
    type Err = OutcomeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || OutcomeError::InvalidScore(value.to_owned());
        let (left, right) = value.trim().split_once('-').ok_or_else(invalid)?;
        let team1_games = left.trim().parse::<u32>().map_err(|_| invalid())?;
        let team2_games = right.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self {
            team1_games,
            team2_games,
        })
    }
}

/// Validated result of a match: who won and how many games each side took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    pub winner: Side,
    pub score: Score,
}

impl MatchOutcome {
    /// Validate the match layout and resolve its declared winner.
    ///
    /// `winner` is `team1`/`team2` (case-insensitive) for any match type; singles also
    /// accept the id of one of the two players.
    pub fn from_match(game: &MatchEntity) -> Result<Self, OutcomeError> {
        let expected = game.match_type.players_per_side();
        if game.team1.len() != expected || game.team2.len() != expected {
            return Err(OutcomeError::ParticipantCount {
                expected,
                team1: game.team1.len(),
                team2: game.team2.len(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = game.participants().find(|id| !seen.insert(**id)) {
            return Err(OutcomeError::DuplicateParticipant(*duplicate));
        }

        let score = game.score.parse::<Score>()?;
        let winner = resolve_winner(game, expected)?;
        Ok(Self { winner, score })
    }

    /// Whether a player on `side` belongs to the winning side.
    pub fn is_winner(&self, side: Side) -> bool {
        self.winner == side
    }

    /// Games taken by the winning and the losing side respectively.
    ///
    /// Result entry is not consistent about which side is written first, so the
    /// winner is credited with the larger count.
    pub fn winner_and_loser_games(&self) -> (u32, u32) {
        let Score {
            team1_games,
            team2_games,
        } = self.score;
        (team1_games.max(team2_games), team1_games.min(team2_games))
    }
}

fn resolve_winner(game: &MatchEntity, expected: usize) -> Result<Side, OutcomeError> {
    let raw = game.winner.trim();
    if raw.eq_ignore_ascii_case("team1") {
        return Ok(Side::Team1);
    }
    if raw.eq_ignore_ascii_case("team2") {
        return Ok(Side::Team2);
    }

    let invalid = || OutcomeError::InvalidWinner(game.winner.clone());
    if expected != 1 {
        return Err(invalid());
    }
    let id = Uuid::parse_str(raw).map_err(|_| invalid())?;
    if game.team1.contains(&id) {
        Ok(Side::Team1)
    } else if game.team2.contains(&id) {
        Ok(Side::Team2)
    } else {
        Err(invalid())
    }
}

/// Points handed to every player of the winning and the losing side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidePoints {
    pub winner: u32,
    pub loser: u32,
}

impl SidePoints {
    /// Points for a player on `side` given the outcome.
    pub fn for_side(&self, outcome: &MatchOutcome, side: Side) -> u32 {
        if outcome.is_winner(side) {
            self.winner
        } else {
            self.loser
        }
    }
}

/// Strategy mapping a match outcome to seeding points.
pub trait ScoringRule {
    fn side_points(&self, outcome: &MatchOutcome) -> SidePoints;
}

impl ScoringRule for ScoringPolicy {
    fn side_points(&self, outcome: &MatchOutcome) -> SidePoints {
        match *self {
            ScoringPolicy::Fixed {
                winner_points,
                loser_points,
            } => SidePoints {
                winner: winner_points,
                loser: loser_points,
            },
            ScoringPolicy::GamesWon => {
                let (winner, loser) = outcome.winner_and_loser_games();
                SidePoints { winner, loser }
            }
        }
    }
}
