// Error taxonomy shared by normalization, resolution and ranking.
//
// Recoverable issues (data-quality warnings, integrity errors) are plain data
// that get logged and counted. Fatal issues (configuration, empty input) are
// `thiserror` enums that abort the run.

use std::fmt;

use thiserror::Error;

use crate::record::{Position, PositionGroup, StatCategory};

// ---------------------------------------------------------------------------
// Recoverable
// ---------------------------------------------------------------------------

/// A per-row or per-category issue. The row or category is excluded and the
/// batch carries on.
#[derive(Debug, Clone, PartialEq)]
pub enum DataQualityWarning {
    UnparsableNumber {
        player: String,
        column: String,
        value: String,
    },
    UnknownPosition {
        player: String,
        code: String,
    },
    MissingTeam {
        player: String,
    },
    /// A goalie in a skater table or a skater in a goalie table.
    WrongGroup {
        player: String,
        position: Position,
        group: PositionGroup,
    },
    /// A combined row that lacks a category one of the per-team rows carries.
    MissingCombinedCategory {
        player: String,
        season: u16,
        category: StatCategory,
    },
    /// Per-game ranking needs games played; the record was left out.
    NoGamesPlayed {
        player: String,
    },
    /// The record carries none of the configured categories.
    NoScoredCategories {
        player: String,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::UnparsableNumber {
                player,
                column,
                value,
            } => write!(f, "{player}: unparsable value '{value}' in column '{column}'"),
            DataQualityWarning::UnknownPosition { player, code } => {
                write!(f, "{player}: unknown position code '{code}'")
            }
            DataQualityWarning::MissingTeam { player } => write!(f, "{player}: missing team"),
            DataQualityWarning::WrongGroup {
                player,
                position,
                group,
            } => write!(f, "{player}: position {position} does not belong in the {group} table"),
            DataQualityWarning::MissingCombinedCategory {
                player,
                season,
                category,
            } => write!(
                f,
                "{player} ({season}): combined row is missing '{category}' present on a team row"
            ),
            DataQualityWarning::NoGamesPlayed { player } => {
                write!(f, "{player}: no games played, excluded from per-game ranking")
            }
            DataQualityWarning::NoScoredCategories { player } => {
                write!(f, "{player}: missing every scored category")
            }
        }
    }
}

/// More rows than the source data allows for one player-season. Resolved by
/// keeping the row with the most games played.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityError {
    pub player: String,
    pub season: u16,
    /// How many competing rows were found.
    pub competing_rows: usize,
    /// Whether the competing rows were combined ("NTM") rows.
    pub combined: bool,
    pub kept_games_played: f64,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.combined { "combined" } else { "single-team" };
        write!(
            f,
            "{} ({}): {} {} rows, kept the one with {} games played",
            self.player, self.season, self.competing_rows, kind, self.kept_games_played
        )
    }
}

// ---------------------------------------------------------------------------
// Fatal
// ---------------------------------------------------------------------------

/// A scoring configuration the input cannot satisfy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("scoring configuration for {group} lists no categories")]
    NoCategories { group: PositionGroup },

    #[error("category '{category}' is listed more than once")]
    DuplicateCategory { category: StatCategory },

    #[error("category '{category}' does not belong to the {group} schema")]
    WrongGroup {
        category: StatCategory,
        group: PositionGroup,
    },

    #[error("category '{category}' has invalid weight {weight}")]
    InvalidWeight { category: StatCategory, weight: f64 },

    #[error("category '{category}' has a multiplier for {position}, which is not in the {group} schema")]
    MultiplierOutsideGroup {
        category: StatCategory,
        position: Position,
        group: PositionGroup,
    },

    #[error("position {position} is not part of the {group} schema")]
    PositionOutsideGroup {
        position: Position,
        group: PositionGroup,
    },

    #[error("category '{category}' is not present in the input table")]
    CategoryNotInInput { category: StatCategory },
}

/// Zero records reached a stage that needs at least one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("empty input: {context}")]
pub struct EmptyInputError {
    pub context: String,
}

impl EmptyInputError {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }
}
