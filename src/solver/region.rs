use indexmap::IndexSet;

use crate::{
    solver::{knowledge::{KnowledgeBase, Square}, Deduction, Rule, SolverError},
    util::{split_sets, Loc},
};

/// The unknown neighbours of a numbered square, which hold exactly `mines` mines.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Region {
    pub origin: Loc,
    pub number: u8,
    pub mines: usize,
    pub hidden: IndexSet<Loc>,
}

// Construction.
impl Region {
    /// The region watched by `origin`, or `None` if it is not a revealed number.
    pub fn around(kb: &KnowledgeBase, origin: Loc) -> Result<Option<Region>, SolverError> {
        let number = match kb.number(origin) {
            Some(n) => n,
            None => return Ok(None),
        };

        let mut flagged = 0;
        let mut hidden = IndexSet::new();
        for watched in kb.neighbours(origin) {
            match kb.square(watched) {
                Square::Mine => flagged += 1,
                Square::Unknown => {
                    hidden.insert(watched);
                }
                Square::Safe | Square::Numbered(_) => (),
            }
        }

        let number_mines = number as usize;
        if flagged > number_mines || number_mines - flagged > hidden.len() {
            return Err(SolverError::Unsatisfiable { loc: origin, number, flagged, unknown: hidden.len() });
        }

        Ok(Some(Region { origin, number, mines: number_mines - flagged, hidden }))
    }
}

// Single region rules.
impl Region {
    pub fn is_all_mines(&self) -> bool {
        self.hidden.len() == self.mines
    }

    pub fn is_all_empty(&self) -> bool {
        self.mines == 0
    }

    /// Deductions that follow from this region alone.
    pub fn deductions(&self) -> Vec<Deduction> {
        if self.hidden.is_empty() {
            return vec![];
        }
        if self.is_all_empty() {
            let rule = Rule::Satisfied { at: self.origin, number: self.number };
            return self.hidden.iter().map(|&loc| Deduction::safe(loc, rule)).collect();
        }
        if self.is_all_mines() {
            let rule = Rule::Saturated { at: self.origin, number: self.number };
            return self.hidden.iter().map(|&loc| Deduction::mine(loc, rule)).collect();
        }
        vec![]
    }
}

/// Two regions that share unknown squares, split into the part only the
/// first sees (`r0`), the shared part (`rs`) and the part only the second
/// sees (`r1`).
#[derive(Debug)]
pub struct LinkedRegions {
    pub at: Loc,
    pub with: Loc,
    pub r0: IndexSet<Loc>,
    pub rs: IndexSet<Loc>,
    pub r1: IndexSet<Loc>,
    pub p0_mines: usize,
    pub p1_mines: usize,
    /// Fewest mines the shared part can hold.
    pub rs_min: usize,
    /// Most mines the shared part can hold.
    pub rs_max: usize,
}

impl LinkedRegions {
    /// `None` when the regions share nothing.
    pub fn link(parent0: &Region, parent1: &Region) -> Result<Option<LinkedRegions>, SolverError> {
        let (r0, rs, r1) = split_sets(&parent0.hidden, &parent1.hidden);
        if rs.is_empty() {
            return Ok(None);
        }

        let (p0_mines, p1_mines) = (parent0.mines, parent1.mines);
        // Bounded by the shared squares and by either parent's count.
        let rs_max = rs.len().min(p0_mines).min(p1_mines);
        // Whatever does not fit in a parent's own part must be shared.
        let rs_min = p0_mines.saturating_sub(r0.len()).max(p1_mines.saturating_sub(r1.len()));
        if rs_min > rs_max {
            return Err(SolverError::Conflict { at: parent0.origin, with: parent1.origin });
        }

        Ok(Some(LinkedRegions {
            at: parent0.origin,
            with: parent1.origin,
            r0,
            rs,
            r1,
            p0_mines,
            p1_mines,
            rs_min,
            rs_max,
        }))
    }

    /// Parts of the link whose mine count is pinned to zero or to their size.
    pub fn deductions(&self) -> Vec<Deduction> {
        let rule = Rule::Overlap { at: self.at, with: self.with };
        let mut found = vec![];
        let mut settle = |part: &IndexSet<Loc>, min: usize, max: usize| {
            if part.is_empty() {
                return;
            }
            if max == 0 {
                found.extend(part.iter().map(|&loc| Deduction::safe(loc, rule)));
            } else if min == part.len() {
                found.extend(part.iter().map(|&loc| Deduction::mine(loc, rule)));
            }
        };

        settle(&self.r0, self.p0_mines - self.rs_max, self.p0_mines - self.rs_min);
        settle(&self.rs, self.rs_min, self.rs_max);
        settle(&self.r1, self.p1_mines - self.rs_max, self.p1_mines - self.rs_min);
        found
    }
}
