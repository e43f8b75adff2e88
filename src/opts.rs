use std::str::FromStr;

use structopt::StructOpt;
use thiserror::Error;

use crate::solver::{enumerate::MAX_FRONTIER, DEFAULT_FRONTIER_CAP};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("at least one game must be played")]
    NoGames,
    #[error("a {rows}x{cols} board has no squares")]
    EmptyBoard { rows: usize, cols: usize },
    #[error("the board must be larger than one square")]
    SingleSquare,
    #[error("the board must have at least one mine")]
    NoMines,
    #[error("{mines} mines leave no safe square on a board of {squares}")]
    TooManyMines { mines: usize, squares: usize },
    #[error("rows, columns and mines must be given together")]
    PartialLayout,
    #[error("frontier cap {0} must be between 1 and 64")]
    FrontierCap(usize),
    #[error("unknown strategy {0:?}, expected \"inference\" or \"random\"")]
    UnknownStrategy(String),
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Strategy {
    Inference,
    Random,
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inference" => Ok(Self::Inference),
            "random" => Ok(Self::Random),
            _ => Err(ConfigError::UnknownStrategy(s.to_owned())),
        }
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = "minesweeper-solver", about = "Plays games of Minesweeper automatically.")]
pub struct Opts {
    /// Number of games to play.
    games: usize,
    /// Board rows. Without rows, cols and mines every game gets a random board.
    rows: Option<usize>,
    /// Board columns.
    cols: Option<usize>,
    /// Mines per board.
    mines: Option<usize>,
    /// Seed for mine placement and tie-breaks.
    #[structopt(long)]
    seed: Option<u64>,
    /// "inference" or "random".
    #[structopt(long, default_value = "inference")]
    strategy: Strategy,
    /// Largest frontier enumerated exactly; bigger ones are estimated.
    #[structopt(long, default_value = "24")]
    frontier_cap: usize,
    /// Only print the final statistics.
    #[structopt(short, long)]
    quiet: bool,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Layout {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
}

/// Options that passed validation.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct GameConfig {
    pub games: usize,
    /// `None` picks a random layout per game.
    pub layout: Option<Layout>,
    pub seed: Option<u64>,
    pub strategy: Strategy,
    pub frontier_cap: usize,
    pub quiet: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            games: 1,
            layout: None,
            seed: None,
            strategy: Strategy::Inference,
            frontier_cap: DEFAULT_FRONTIER_CAP,
            quiet: false,
        }
    }
}

impl Opts {
    pub fn validate(&self) -> Result<GameConfig, ConfigError> {
        if self.games == 0 {
            return Err(ConfigError::NoGames);
        }
        if self.frontier_cap == 0 || self.frontier_cap > MAX_FRONTIER {
            return Err(ConfigError::FrontierCap(self.frontier_cap));
        }

        let layout = match (self.rows, self.cols, self.mines) {
            (None, None, None) => None,
            (Some(rows), Some(cols), Some(mines)) => Some(Layout::new(rows, cols, mines)?),
            _ => return Err(ConfigError::PartialLayout),
        };

        Ok(GameConfig {
            games: self.games,
            layout,
            seed: self.seed,
            strategy: self.strategy,
            frontier_cap: self.frontier_cap,
            quiet: self.quiet,
        })
    }
}

impl Layout {
    pub fn new(rows: usize, cols: usize, mines: usize) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyBoard { rows, cols });
        }
        let squares = rows * cols;
        if squares == 1 {
            return Err(ConfigError::SingleSquare);
        }
        if mines == 0 {
            return Err(ConfigError::NoMines);
        }
        if mines >= squares {
            return Err(ConfigError::TooManyMines { mines, squares });
        }
        Ok(Self { rows, cols, mines })
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> Result<GameConfig, ConfigError> {
        let opts = Opts::from_iter_safe(std::iter::once("minesweeper-solver").chain(args.iter().copied()))
            .expect("arguments to parse.");
        opts.validate()
    }

    #[test]
    fn fixed_layout() {
        let config = parse(&["3", "9", "9", "10", "--seed", "42", "--quiet"]).expect("a valid config.");
        assert_eq!(config, GameConfig {
            games: 3,
            layout: Some(Layout { rows: 9, cols: 9, mines: 10 }),
            seed: Some(42),
            quiet: true,
            ..GameConfig::default()
        });
    }

    #[test]
    fn random_layout_when_dimensions_are_missing() {
        let config = parse(&["5", "--strategy", "random"]).expect("a valid config.");
        assert_eq!(config.layout, None);
        assert_eq!(config.strategy, Strategy::Random);
        assert_eq!(config.frontier_cap, DEFAULT_FRONTIER_CAP);
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        assert_eq!(parse(&["0"]), Err(ConfigError::NoGames));
        assert_eq!(parse(&["1", "0", "5", "1"]), Err(ConfigError::EmptyBoard { rows: 0, cols: 5 }));
        assert_eq!(parse(&["1", "1", "1", "1"]), Err(ConfigError::SingleSquare));
        assert_eq!(parse(&["1", "3", "3", "0"]), Err(ConfigError::NoMines));
        assert_eq!(parse(&["1", "3", "3", "9"]), Err(ConfigError::TooManyMines { mines: 9, squares: 9 }));
        assert_eq!(parse(&["1", "3", "3"]), Err(ConfigError::PartialLayout));
        assert_eq!(parse(&["1", "--frontier-cap", "65"]), Err(ConfigError::FrontierCap(65)));
    }

    #[test]
    fn largest_legal_mine_count() {
        assert_eq!(Layout::new(1, 2, 1), Ok(Layout { rows: 1, cols: 2, mines: 1 }));
    }

    #[test]
    fn unknown_strategy_fails_to_parse() {
        let parsed = Opts::from_iter_safe(&["minesweeper-solver", "1", "--strategy", "psychic"]);
        assert!(parsed.is_err());
        assert_eq!("psychic".parse::<Strategy>(), Err(ConfigError::UnknownStrategy("psychic".to_owned())));
    }
}
