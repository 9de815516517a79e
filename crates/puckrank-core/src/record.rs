// Typed player-season records and the closed enumerations they are built on.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Hockey positions as they appear in the source tables.
///
/// Deserializes through `from_str_pos`, so config keys such as `lw` and `LW`
/// name the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Position {
    C,
    LW,
    RW,
    D,
    G,
}

impl Position {
    pub const ALL: [Position; 5] = [Position::C, Position::LW, Position::RW, Position::D, Position::G];

    /// Parse a source position abbreviation. Returns `None` for anything
    /// outside the fixed enumeration; callers report those as data-quality
    /// warnings instead of coercing them.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" => Some(Position::C),
            "LW" => Some(Position::LW),
            "RW" => Some(Position::RW),
            "D" => Some(Position::D),
            "G" => Some(Position::G),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::C => "C",
            Position::LW => "LW",
            Position::RW => "RW",
            Position::D => "D",
            Position::G => "G",
        }
    }

    /// The stat schema this position reports under.
    pub fn group(&self) -> PositionGroup {
        match self {
            Position::G => PositionGroup::Goalies,
            _ => PositionGroup::Skaters,
        }
    }
}

impl TryFrom<String> for Position {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Position::from_str_pos(&value).ok_or_else(|| format!("unknown position '{value}'"))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Skaters and goalies are ranked separately and use disjoint stat schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionGroup {
    Skaters,
    Goalies,
}

impl PositionGroup {
    pub fn from_str_group(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "skaters" | "skater" => Some(PositionGroup::Skaters),
            "goalies" | "goalie" => Some(PositionGroup::Goalies),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            PositionGroup::Skaters => "skaters",
            PositionGroup::Goalies => "goalies",
        }
    }

    /// Singular form used in file names (`skater_data_2023_2025.csv`).
    pub fn singular(&self) -> &'static str {
        match self {
            PositionGroup::Skaters => "skater",
            PositionGroup::Goalies => "goalie",
        }
    }

    /// Stat columns written for this group, in output order.
    pub fn categories(&self) -> &'static [StatCategory] {
        match self {
            PositionGroup::Skaters => SKATER_CATEGORIES,
            PositionGroup::Goalies => GOALIE_CATEGORIES,
        }
    }
}

impl fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Stat categories
// ---------------------------------------------------------------------------

/// Whether a category is a running total or a per-unit rate.
///
/// Counting stats may be zero-filled when missing and are divided by games
/// played in per-game rankings. Rate stats are never zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Counting,
    Rate,
}

/// Which schema a category belongs to. `GamesPlayed` is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryScope {
    Skater,
    Goalie,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatCategory {
    GamesPlayed,
    // skaters
    Goals,
    Assists,
    Points,
    PlusMinus,
    PenaltyMinutes,
    PowerPlayGoals,
    PowerPlayPoints,
    ShortHandedGoals,
    ShortHandedPoints,
    GameWinningGoals,
    Shots,
    ShootingPercentage,
    TimeOnIce,
    Hits,
    BlockedShots,
    FaceOffWins,
    FaceOffPercentage,
    // goalies
    GamesStarted,
    Wins,
    Losses,
    Ties,
    OvertimeLosses,
    Saves,
    ShotsAgainst,
    GoalsAgainst,
    SavePercentage,
    GoalsAgainstAverage,
    Shutouts,
}

const SKATER_CATEGORIES: &[StatCategory] = &[
    StatCategory::GamesPlayed,
    StatCategory::Goals,
    StatCategory::Assists,
    StatCategory::Points,
    StatCategory::PlusMinus,
    StatCategory::PenaltyMinutes,
    StatCategory::PowerPlayGoals,
    StatCategory::PowerPlayPoints,
    StatCategory::ShortHandedGoals,
    StatCategory::ShortHandedPoints,
    StatCategory::GameWinningGoals,
    StatCategory::Shots,
    StatCategory::ShootingPercentage,
    StatCategory::TimeOnIce,
    StatCategory::Hits,
    StatCategory::BlockedShots,
    StatCategory::FaceOffWins,
    StatCategory::FaceOffPercentage,
];

const GOALIE_CATEGORIES: &[StatCategory] = &[
    StatCategory::GamesPlayed,
    StatCategory::GamesStarted,
    StatCategory::Wins,
    StatCategory::Losses,
    StatCategory::Ties,
    StatCategory::OvertimeLosses,
    StatCategory::Saves,
    StatCategory::ShotsAgainst,
    StatCategory::SavePercentage,
    StatCategory::GoalsAgainstAverage,
    StatCategory::GoalsAgainst,
    StatCategory::Shutouts,
];

impl StatCategory {
    /// Canonical snake_case key, used as the CSV column and database stat name.
    pub fn key(&self) -> &'static str {
        match self {
            StatCategory::GamesPlayed => "games_played",
            StatCategory::Goals => "goals",
            StatCategory::Assists => "assists",
            StatCategory::Points => "points",
            StatCategory::PlusMinus => "plus_minus",
            StatCategory::PenaltyMinutes => "penalty_minutes",
            StatCategory::PowerPlayGoals => "power_play_goals",
            StatCategory::PowerPlayPoints => "power_play_points",
            StatCategory::ShortHandedGoals => "short_handed_goals",
            StatCategory::ShortHandedPoints => "short_handed_points",
            StatCategory::GameWinningGoals => "game_winning_goals",
            StatCategory::Shots => "shots",
            StatCategory::ShootingPercentage => "shooting_percentage",
            StatCategory::TimeOnIce => "time_on_ice_avg",
            StatCategory::Hits => "hits",
            StatCategory::BlockedShots => "blocked_shots",
            StatCategory::FaceOffWins => "face_off_wins",
            StatCategory::FaceOffPercentage => "face_off_percentage",
            StatCategory::GamesStarted => "games_started",
            StatCategory::Wins => "wins",
            StatCategory::Losses => "losses",
            StatCategory::Ties => "ties",
            StatCategory::OvertimeLosses => "overtime_losses",
            StatCategory::Saves => "saves",
            StatCategory::ShotsAgainst => "shots_against",
            StatCategory::GoalsAgainst => "goals_against",
            StatCategory::SavePercentage => "save_percentage",
            StatCategory::GoalsAgainstAverage => "goals_against_average",
            StatCategory::Shutouts => "shutouts",
        }
    }

    /// Column labels this category may appear under, in lookup order.
    ///
    /// Includes the canonical key plus the `data-stat` names used by
    /// Hockey-Reference tables (current and older page layouts). The
    /// season-total `time_on_ice` column is not an alias: only the
    /// per-game average is stored.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            StatCategory::GamesPlayed => &["games_played", "games", "games_goalie"],
            StatCategory::Goals => &["goals"],
            StatCategory::Assists => &["assists"],
            StatCategory::Points => &["points"],
            StatCategory::PlusMinus => &["plus_minus"],
            StatCategory::PenaltyMinutes => &["penalty_minutes", "pen_min"],
            StatCategory::PowerPlayGoals => &["power_play_goals", "goals_pp"],
            StatCategory::PowerPlayPoints => &["power_play_points", "points_pp"],
            StatCategory::ShortHandedGoals => &["short_handed_goals", "goals_sh"],
            StatCategory::ShortHandedPoints => &["short_handed_points", "points_sh"],
            StatCategory::GameWinningGoals => &["game_winning_goals", "goals_gw"],
            StatCategory::Shots => &["shots"],
            StatCategory::ShootingPercentage => &["shooting_percentage", "shot_pct"],
            StatCategory::TimeOnIce => &["time_on_ice_avg", "avg_time_on_ice"],
            StatCategory::Hits => &["hits"],
            StatCategory::BlockedShots => &["blocked_shots", "blocks"],
            StatCategory::FaceOffWins => &["face_off_wins", "faceoff_wins"],
            StatCategory::FaceOffPercentage => &["face_off_percentage", "faceoff_percentage"],
            StatCategory::GamesStarted => &["games_started", "starts_goalie", "starts"],
            StatCategory::Wins => &["wins", "wins_goalie"],
            StatCategory::Losses => &["losses", "losses_goalie"],
            StatCategory::Ties => &["ties", "ties_goalie"],
            StatCategory::OvertimeLosses => &["overtime_losses", "ot_losses", "ot_losses_goalie"],
            StatCategory::Saves => &["saves"],
            StatCategory::ShotsAgainst => &["shots_against"],
            StatCategory::GoalsAgainst => &["goals_against"],
            StatCategory::SavePercentage => &["save_percentage", "save_pct"],
            StatCategory::GoalsAgainstAverage => &["goals_against_average", "goals_against_avg"],
            StatCategory::Shutouts => &["shutouts"],
        }
    }

    /// Look up a category by its canonical key or any alias.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.key() == key || c.aliases().contains(&key))
    }

    pub fn kind(&self) -> StatKind {
        match self {
            StatCategory::ShootingPercentage
            | StatCategory::TimeOnIce
            | StatCategory::FaceOffPercentage
            | StatCategory::SavePercentage
            | StatCategory::GoalsAgainstAverage => StatKind::Rate,
            _ => StatKind::Counting,
        }
    }

    pub fn is_counting(&self) -> bool {
        self.kind() == StatKind::Counting
    }

    pub fn scope(&self) -> CategoryScope {
        match self {
            StatCategory::GamesPlayed => CategoryScope::Both,
            StatCategory::GamesStarted
            | StatCategory::Wins
            | StatCategory::Losses
            | StatCategory::Ties
            | StatCategory::OvertimeLosses
            | StatCategory::Saves
            | StatCategory::ShotsAgainst
            | StatCategory::GoalsAgainst
            | StatCategory::SavePercentage
            | StatCategory::GoalsAgainstAverage
            | StatCategory::Shutouts => CategoryScope::Goalie,
            _ => CategoryScope::Skater,
        }
    }

    /// Whether this category is part of the given group's schema.
    pub fn applies_to(&self, group: PositionGroup) -> bool {
        matches!(
            (self.scope(), group),
            (CategoryScope::Both, _)
                | (CategoryScope::Skater, PositionGroup::Skaters)
                | (CategoryScope::Goalie, PositionGroup::Goalies)
        )
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

const ALL_CATEGORIES: &[StatCategory] = &[
    StatCategory::GamesPlayed,
    StatCategory::Goals,
    StatCategory::Assists,
    StatCategory::Points,
    StatCategory::PlusMinus,
    StatCategory::PenaltyMinutes,
    StatCategory::PowerPlayGoals,
    StatCategory::PowerPlayPoints,
    StatCategory::ShortHandedGoals,
    StatCategory::ShortHandedPoints,
    StatCategory::GameWinningGoals,
    StatCategory::Shots,
    StatCategory::ShootingPercentage,
    StatCategory::TimeOnIce,
    StatCategory::Hits,
    StatCategory::BlockedShots,
    StatCategory::FaceOffWins,
    StatCategory::FaceOffPercentage,
    StatCategory::GamesStarted,
    StatCategory::Wins,
    StatCategory::Losses,
    StatCategory::Ties,
    StatCategory::OvertimeLosses,
    StatCategory::Saves,
    StatCategory::ShotsAgainst,
    StatCategory::GoalsAgainst,
    StatCategory::SavePercentage,
    StatCategory::GoalsAgainstAverage,
    StatCategory::Shutouts,
];

// ---------------------------------------------------------------------------
// Team markers
// ---------------------------------------------------------------------------

/// Team column of a season row: a real team code, or a multi-team total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamMarker {
    Team(String),
    /// Season totals across several teams ("2TM", "3TM", or the legacy "TOT",
    /// which does not say how many teams were involved).
    Combined { teams: Option<u8> },
}

impl TeamMarker {
    /// Parse a team cell. Returns `None` for a blank cell.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let upper = s.to_uppercase();
        if upper == "TOT" {
            return Some(TeamMarker::Combined { teams: None });
        }
        if let Some(count) = upper.strip_suffix("TM") {
            if !count.is_empty() && count.chars().all(|c| c.is_ascii_digit()) {
                return Some(TeamMarker::Combined {
                    teams: count.parse().ok(),
                });
            }
        }
        Some(TeamMarker::Team(upper))
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, TeamMarker::Combined { .. })
    }
}

impl fmt::Display for TeamMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamMarker::Team(code) => write!(f, "{code}"),
            TeamMarker::Combined { teams: Some(n) } => write!(f, "{n}TM"),
            TeamMarker::Combined { teams: None } => write!(f, "TOT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Player-season record
// ---------------------------------------------------------------------------

/// Normalize a display name into the key used to match rows of the same player.
///
/// Lowercases, drops the Hall-of-Fame asterisk Hockey-Reference appends, and
/// collapses internal whitespace.
pub fn player_key(name: &str) -> String {
    name.replace('*', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One player's stat line for one season on one team (or combined teams).
///
/// A category absent from `stats` is missing, which is distinct from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonRecord {
    pub name: String,
    pub player_key: String,
    pub season: u16,
    pub team: TeamMarker,
    pub position: Position,
    pub age: Option<u32>,
    pub stats: BTreeMap<StatCategory, f64>,
}

impl PlayerSeasonRecord {
    pub fn new(name: &str, season: u16, team: TeamMarker, position: Position) -> Self {
        let name = name.replace('*', "").trim().to_string();
        Self {
            player_key: player_key(&name),
            name,
            season,
            team,
            position,
            age: None,
            stats: BTreeMap::new(),
        }
    }

    /// Builder-style setter, handy for fixtures.
    pub fn with_stat(mut self, category: StatCategory, value: f64) -> Self {
        self.stats.insert(category, value);
        self
    }

    pub fn get(&self, category: StatCategory) -> Option<f64> {
        self.stats.get(&category).copied()
    }

    pub fn is_combined(&self) -> bool {
        self.team.is_combined()
    }

    pub fn group(&self) -> PositionGroup {
        self.position.group()
    }

    /// Games played, treating a missing value as zero.
    pub fn games_played(&self) -> f64 {
        self.get(StatCategory::GamesPlayed).unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Ranking output
// ---------------------------------------------------------------------------

/// How one category fed into a player's composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryContribution {
    pub category: StatCategory,
    /// Value as stored on the record (`None` when missing).
    pub raw: Option<f64>,
    /// Value actually scored, after zero-fill and per-game conversion.
    pub value: Option<f64>,
    /// Value after the strategy's scale (percentile, z-score, ...), before weighting.
    pub scaled: f64,
    /// Weighted, direction-adjusted amount added to the composite.
    pub weighted: f64,
}

/// A player's place in one ranking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub name: String,
    pub player_key: String,
    pub season: u16,
    pub position: Position,
    pub team: TeamMarker,
    pub games_played: f64,
    pub score: f64,
    pub rank: usize,
    pub contributions: Vec<CategoryContribution>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parsing_is_case_insensitive() {
        assert_eq!(Position::from_str_pos("lw"), Some(Position::LW));
        assert_eq!(Position::from_str_pos(" D "), Some(Position::D));
        assert_eq!(Position::from_str_pos("G"), Some(Position::G));
    }

    #[test]
    fn unknown_position_is_rejected() {
        assert_eq!(Position::from_str_pos("F"), None);
        assert_eq!(Position::from_str_pos(""), None);
        assert_eq!(Position::from_str_pos("1B"), None);
    }

    #[test]
    fn team_marker_detects_multi_team_rows() {
        assert_eq!(TeamMarker::parse("2TM"), Some(TeamMarker::Combined { teams: Some(2) }));
        assert_eq!(TeamMarker::parse("3tm"), Some(TeamMarker::Combined { teams: Some(3) }));
        assert_eq!(TeamMarker::parse("TOT"), Some(TeamMarker::Combined { teams: None }));
        assert_eq!(TeamMarker::parse("VAN"), Some(TeamMarker::Team("VAN".into())));
        assert_eq!(TeamMarker::parse("   "), None);
    }

    #[test]
    fn team_marker_without_count_is_a_team() {
        // "TM" alone is not a multi-team marker.
        assert_eq!(TeamMarker::parse("TM"), Some(TeamMarker::Team("TM".into())));
        assert!(!TeamMarker::parse("NYI").unwrap().is_combined());
    }

    #[test]
    fn team_marker_display_round_trips() {
        for s in ["2TM", "TOT", "EDM"] {
            assert_eq!(TeamMarker::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn player_key_normalizes_names() {
        assert_eq!(player_key("Wayne Gretzky*"), "wayne gretzky");
        assert_eq!(player_key("  Bo   Horvat "), "bo horvat");
    }

    #[test]
    fn category_lookup_by_alias() {
        assert_eq!(StatCategory::from_key("blocks"), Some(StatCategory::BlockedShots));
        assert_eq!(StatCategory::from_key("goals_against_average"), Some(StatCategory::GoalsAgainstAverage));
        assert_eq!(StatCategory::from_key("nonsense"), None);
    }

    #[test]
    fn category_scope_matches_group() {
        assert!(StatCategory::GamesPlayed.applies_to(PositionGroup::Goalies));
        assert!(StatCategory::GamesPlayed.applies_to(PositionGroup::Skaters));
        assert!(StatCategory::Hits.applies_to(PositionGroup::Skaters));
        assert!(!StatCategory::Hits.applies_to(PositionGroup::Goalies));
        assert!(!StatCategory::Saves.applies_to(PositionGroup::Skaters));
    }

    #[test]
    fn group_categories_respect_scope() {
        for group in [PositionGroup::Skaters, PositionGroup::Goalies] {
            assert!(group.categories().iter().all(|c| c.applies_to(group)));
        }
    }

    #[test]
    fn rate_stats_are_not_counting() {
        assert!(!StatCategory::SavePercentage.is_counting());
        assert!(!StatCategory::TimeOnIce.is_counting());
        assert!(StatCategory::Goals.is_counting());
    }

    #[test]
    fn record_strips_asterisk_from_name() {
        let rec = PlayerSeasonRecord::new("Sidney Crosby*", 2024, TeamMarker::Team("PIT".into()), Position::C);
        assert_eq!(rec.name, "Sidney Crosby");
        assert_eq!(rec.player_key, "sidney crosby");
        assert_eq!(rec.games_played(), 0.0);
    }
}
