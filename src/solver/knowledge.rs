use indexmap::IndexSet;

use crate::{
    solver::{Deduction, Fact, GameView, SolverError},
    util::{self, Loc},
};

/// What the solver believes about one square.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Square {
    Unknown,
    /// Proven safe, not revealed yet.
    Safe,
    /// Proven to hold a mine.
    Mine,
    /// Revealed, showing its adjacent mine count.
    Numbered(u8),
}

impl Default for Square {
    fn default() -> Self {
        Self::Unknown
    }
}

/// The solver's single source of truth. Squares only move forward:
/// `Unknown` to `Safe`/`Mine`, and `Unknown`/`Safe` to `Numbered`.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    squares: Box<[Box<[Square]>]>,
    dims: (usize, usize),
    total_mines: usize,
    safe: IndexSet<Loc>,
    mines: IndexSet<Loc>,
}

// Construction and queries.
impl KnowledgeBase {
    pub fn new(dims: (usize, usize), total_mines: usize) -> Self {
        let squares = vec![vec![Square::default(); dims.1].into_boxed_slice(); dims.0].into_boxed_slice();
        Self {
            squares,
            dims,
            total_mines,
            safe: IndexSet::new(),
            mines: IndexSet::new(),
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    pub fn total_mines(&self) -> usize {
        self.total_mines
    }

    pub fn square(&self, (row, col): Loc) -> Square {
        self.squares[row][col]
    }

    /// Mines not yet accounted for by a confirmed mine.
    pub fn budget(&self) -> usize {
        self.total_mines.saturating_sub(self.mines.len())
    }

    /// Proven safe squares that are still waiting to be revealed.
    pub fn safe(&self) -> &IndexSet<Loc> {
        &self.safe
    }

    pub fn mines(&self) -> &IndexSet<Loc> {
        &self.mines
    }

    pub fn is_unknown(&self, loc: Loc) -> bool {
        self.square(loc) == Square::Unknown
    }

    pub fn number(&self, loc: Loc) -> Option<u8> {
        match self.square(loc) {
            Square::Numbered(n) => Some(n),
            _ => None,
        }
    }

    pub fn neighbours(&self, loc: Loc) -> impl Iterator<Item = Loc> {
        util::surroundings(self.dims, loc)
    }

    pub fn unknowns(&self) -> impl Iterator<Item = Loc> + '_ {
        util::all_locs(self.dims).filter(move |&loc| self.is_unknown(loc))
    }

    pub fn has_numbered(&self) -> bool {
        util::all_locs(self.dims).any(|loc| self.number(loc).is_some())
    }

    /// Whether `loc` sits next to at least one revealed number.
    pub fn touches_number(&self, loc: Loc) -> bool {
        self.neighbours(loc).any(|l| self.number(l).is_some())
    }

    /// Numbered squares whose neighbourhood could overlap with that of `loc`.
    pub fn numbered_within(&self, loc: Loc, radius: usize) -> impl Iterator<Item = Loc> + '_ {
        let rows = loc.0.saturating_sub(radius)..(loc.0 + radius + 1).min(self.dims.0);
        let cols = loc.1.saturating_sub(radius)..(loc.1 + radius + 1).min(self.dims.1);
        rows.flat_map(move |row| cols.clone().map(move |col| (row, col)))
            .filter(move |&l| l != loc && self.number(l).is_some())
    }

    /// Every numbered square in `locs` plus every numbered neighbour of them.
    pub fn numbered_around(&self, locs: &[Loc]) -> Vec<Loc> {
        let mut found = IndexSet::new();
        for &loc in locs {
            if self.number(loc).is_some() {
                found.insert(loc);
            }
            found.extend(self.neighbours(loc).filter(|&l| self.number(l).is_some()));
        }
        found.into_iter().collect()
    }
}

// Updates.
impl KnowledgeBase {
    /// Copies newly revealed numbers out of the view, returning the squares
    /// that became numbered.
    pub fn sync(&mut self, view: &dyn GameView) -> Result<Vec<Loc>, SolverError> {
        let mut revealed = vec![];
        for loc in util::all_locs(self.dims) {
            let n = match view.number(loc) {
                Some(n) => n,
                None => continue,
            };
            match self.square(loc) {
                Square::Numbered(_) => continue,
                Square::Mine => return Err(SolverError::RevealedMine { loc }),
                Square::Safe => {
                    self.safe.shift_remove(&loc);
                }
                Square::Unknown => (),
            }
            self.squares[loc.0][loc.1] = Square::Numbered(n);
            revealed.push(loc);
        }
        Ok(revealed)
    }

    /// Records `loc` as safe. Returns whether this is new information.
    pub fn mark_safe(&mut self, loc: Loc) -> Result<bool, SolverError> {
        match self.square(loc) {
            Square::Unknown => {
                self.squares[loc.0][loc.1] = Square::Safe;
                self.safe.insert(loc);
                Ok(true)
            }
            Square::Safe | Square::Numbered(_) => Ok(false),
            Square::Mine => Err(SolverError::Contradiction { loc }),
        }
    }

    /// Records `loc` as a mine. Returns whether this is new information.
    pub fn mark_mine(&mut self, loc: Loc) -> Result<bool, SolverError> {
        match self.square(loc) {
            Square::Unknown => {
                if self.mines.len() >= self.total_mines {
                    return Err(SolverError::TooManyMines { loc, total: self.total_mines });
                }
                self.squares[loc.0][loc.1] = Square::Mine;
                self.mines.insert(loc);
                Ok(true)
            }
            Square::Mine => Ok(false),
            Square::Safe | Square::Numbered(_) => Err(SolverError::Contradiction { loc }),
        }
    }

    pub fn apply(&mut self, deduction: &Deduction) -> Result<bool, SolverError> {
        match deduction.fact {
            Fact::Safe => self.mark_safe(deduction.loc),
            Fact::Mine => self.mark_mine(deduction.loc),
        }
    }
}
