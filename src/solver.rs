use std::fmt;

use log::debug;
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

use crate::util::{self, pos, Loc, Pos};

pub mod enumerate;
pub mod estimate;
pub mod frontier;
pub mod knowledge;
pub mod propagate;
pub mod region;
pub mod select;

use self::{estimate::Estimate, knowledge::KnowledgeBase};

/// Frontiers with more unknown squares than this are estimated instead of enumerated.
pub const DEFAULT_FRONTIER_CAP: usize = 24;

/// Read-only view of a game in progress.
pub trait GameView {
    /// `(rows, cols)`
    fn dims(&self) -> (usize, usize);
    /// The adjacent mine count of a revealed square, `None` while hidden.
    fn number(&self, loc: Loc) -> Option<u8>;
    fn total_mines(&self) -> usize;
    fn revealed_count(&self) -> usize;

    fn is_revealed(&self, loc: Loc) -> bool {
        self.number(loc).is_some()
    }
}

/// Raised when the board state contradicts itself. None of these are reachable from legal play.
#[derive(Debug, Error, PartialEq, Eq, Copy, Clone)]
pub enum SolverError {
    #[error("square {} was deduced to be both safe and a mine", pos(.loc))]
    Contradiction { loc: Loc },
    #[error("square {} shows {number} but has {flagged} known mines and {unknown} unknown neighbours", pos(.loc))]
    Unsatisfiable { loc: Loc, number: u8, flagged: usize, unknown: usize },
    #[error("numbered squares {} and {} cannot both be satisfied", pos(.at), pos(.with))]
    Conflict { at: Loc, with: Loc },
    #[error("frontier {index} (first square {}) admits no mine placement", pos(.anchor))]
    NoSolutions { index: usize, anchor: Loc },
    #[error("{budget} mines remain but the board can only hold between {min} and {max}")]
    Conservation { budget: usize, min: usize, max: usize },
    #[error("square {} was revealed after being deduced as a mine", pos(.loc))]
    RevealedMine { loc: Loc },
    #[error("marking {} as a mine exceeds the board's {total} mines", pos(.loc))]
    TooManyMines { loc: Loc, total: usize },
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum Fact {
    Safe,
    Mine,
}

/// Why a square was marked.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Rule {
    /// The numbered square already touches all of its mines.
    Satisfied { at: Loc, number: u8 },
    /// The numbered square needs every unknown neighbour to be a mine.
    Saturated { at: Loc, number: u8 },
    /// Two numbered squares share unknown neighbours.
    Overlap { at: Loc, with: Loc },
    /// One numbered square accounts for every mine left on the board.
    GlobalBudget { at: Loc, remaining: usize },
    /// Every placement consistent with the frontier agrees.
    Enumerated { frontier: usize, solutions: usize },
    /// The frontiers need every remaining mine even at their minimum.
    FrontierMinimum { budget: usize },
    /// The frontiers' maximum leaves one mine for every square outside them.
    FrontierMaximum { budget: usize, outside: usize },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Rule::Satisfied { at, number } =>
                write!(f, "{} shows {} and already touches that many mines", Pos(at), number),
            Rule::Saturated { at, number } =>
                write!(f, "{} shows {} and has no other unknown neighbours left", Pos(at), number),
            Rule::Overlap { at, with } =>
                write!(f, "comparing the shared neighbours of {} and {}", Pos(at), Pos(with)),
            Rule::GlobalBudget { at, remaining } =>
                write!(f, "{} needs all {} remaining mines", Pos(at), remaining),
            Rule::Enumerated { frontier, solutions } =>
                write!(f, "all {} placements of frontier {} agree", solutions, frontier),
            Rule::FrontierMinimum { budget } =>
                write!(f, "the frontiers hold all {} remaining mines at their minimum", budget),
            Rule::FrontierMaximum { budget, outside } =>
                write!(f, "{} mines remain and the frontiers leave {} for the {} squares outside them", budget, outside, outside),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Deduction {
    pub loc: Loc,
    pub fact: Fact,
    pub rule: Rule,
}

impl Deduction {
    pub fn safe(loc: Loc, rule: Rule) -> Self {
        Self { loc, fact: Fact::Safe, rule }
    }

    pub fn mine(loc: Loc, rule: Rule) -> Self {
        Self { loc, fact: Fact::Mine, rule }
    }
}

impl fmt::Display for Deduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fact = match self.fact {
            Fact::Safe => "safe",
            Fact::Mine => "a mine",
        };
        write!(f, "{} is {}: {}", Pos(self.loc), fact, self.rule)
    }
}

/// What one call to [`Solver::analyze_board`] learned.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Analysis {
    pub deductions: Vec<Deduction>,
    pub frontiers: usize,
}

impl Analysis {
    pub fn safe(&self) -> impl Iterator<Item = Loc> + '_ {
        self.facts(Fact::Safe)
    }

    pub fn mines(&self) -> impl Iterator<Item = Loc> + '_ {
        self.facts(Fact::Mine)
    }

    fn facts(&self, fact: Fact) -> impl Iterator<Item = Loc> + '_ {
        self.deductions.iter().filter(move |d| d.fact == fact).map(|d| d.loc)
    }
}

/// A move-picking strategy. The driver only talks to solvers through this trait.
pub trait Solver {
    fn name(&self) -> &'static str;

    /// Forgets everything learned about the previous game.
    fn new_game(&mut self, view: &dyn GameView);

    /// Updates what the solver knows after the board changed.
    fn analyze_board(&mut self, view: &dyn GameView) -> Result<Analysis, SolverError>;

    /// Picks the next square to reveal, `None` once nothing is left to reveal.
    fn determine_move(&mut self, view: &dyn GameView) -> Option<Loc>;
}

/// Reveals a uniformly random hidden square every turn.
pub struct RandomSolver<R> {
    rng: R,
}

impl<R: Rng> RandomSolver<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Solver for RandomSolver<R> {
    fn name(&self) -> &'static str {
        "random"
    }

    fn new_game(&mut self, _: &dyn GameView) {}

    fn analyze_board(&mut self, _: &dyn GameView) -> Result<Analysis, SolverError> {
        Ok(Analysis::default())
    }

    fn determine_move(&mut self, view: &dyn GameView) -> Option<Loc> {
        let hidden = util::all_locs(view.dims())
            .filter(|&loc| !view.is_revealed(loc))
            .collect::<Vec<_>>();
        hidden.choose(&mut self.rng).copied()
    }
}

/// Constraint propagation plus per-frontier enumeration.
pub struct InferenceSolver<R> {
    kb: KnowledgeBase,
    estimate: Option<Estimate>,
    rng: R,
    frontier_cap: usize,
}

impl<R: Rng> InferenceSolver<R> {
    pub fn new(rng: R) -> Self {
        Self {
            kb: KnowledgeBase::new((0, 0), 0),
            estimate: None,
            rng,
            frontier_cap: DEFAULT_FRONTIER_CAP,
        }
    }

    pub fn with_frontier_cap(mut self, frontier_cap: usize) -> Self {
        self.frontier_cap = frontier_cap.min(enumerate::MAX_FRONTIER);
        self
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// One full propagate, enumerate and estimate pass. Returns the squares
    /// that were marked by the estimate.
    fn refine(&mut self, deductions: &mut Vec<Deduction>) -> Result<Vec<Loc>, SolverError> {
        let frontiers = frontier::build(&self.kb);
        let budget = self.kb.budget();
        let partials = frontiers
            .into_iter()
            .enumerate()
            .map(|(index, f)| enumerate::enumerate(&self.kb, index, f, budget, self.frontier_cap))
            .collect::<Result<Vec<_>, _>>()?;
        let estimate = Estimate::new(&self.kb, partials)?;
        debug!(
            "{} frontiers, mines between {} and {} (expected {:.2}) of {} left, {} squares outside",
            estimate.frontiers.len(),
            estimate.total_min,
            estimate.total_max,
            estimate.total_expected,
            estimate.budget,
            estimate.outside.len(),
        );

        let mut learned = vec![];
        for deduction in estimate.certainties() {
            if self.kb.apply(&deduction)? {
                debug!("{}", deduction);
                learned.push(deduction.loc);
                deductions.push(deduction);
            }
        }
        self.estimate = Some(estimate);
        Ok(learned)
    }
}

impl<R: Rng> Solver for InferenceSolver<R> {
    fn name(&self) -> &'static str {
        "inference"
    }

    fn new_game(&mut self, view: &dyn GameView) {
        self.kb = KnowledgeBase::new(view.dims(), view.total_mines());
        self.estimate = None;
    }

    fn analyze_board(&mut self, view: &dyn GameView) -> Result<Analysis, SolverError> {
        if self.kb.dims() != view.dims() || self.kb.total_mines() != view.total_mines() {
            self.new_game(view);
        }

        let mut deductions = vec![];
        let revealed = self.kb.sync(view)?;
        let mut seeds = self.kb.numbered_around(&revealed);
        loop {
            propagate::propagate(&mut self.kb, seeds, &mut deductions)?;
            let learned = self.refine(&mut deductions)?;
            if learned.is_empty() {
                break;
            }
            seeds = self.kb.numbered_around(&learned);
        }

        Ok(Analysis {
            deductions,
            frontiers: self.estimate.as_ref().map_or(0, |e| e.frontiers.len()),
        })
    }

    fn determine_move(&mut self, _: &dyn GameView) -> Option<Loc> {
        select::choose(&self.kb, self.estimate.as_ref(), &mut self.rng)
    }
}
