use std::collections::VecDeque;

use indexmap::IndexSet;
use log::{debug, trace};

use crate::{
    solver::{
        knowledge::KnowledgeBase,
        region::{LinkedRegions, Region},
        Deduction,
        Rule,
        SolverError,
    },
    util::Loc,
};

/// Numbered squares waiting to be re-checked. A square is queued at most once at a time.
#[derive(Debug, Default)]
struct Worklist {
    queue: VecDeque<Loc>,
    queued: IndexSet<Loc>,
}

impl Worklist {
    fn push(&mut self, loc: Loc) {
        if self.queued.insert(loc) {
            self.queue.push_back(loc);
        }
    }

    fn pop(&mut self) -> Option<Loc> {
        let loc = self.queue.pop_front()?;
        self.queued.shift_remove(&loc);
        Some(loc)
    }
}

/// Applies the local rules until nothing changes, starting from the numbered
/// squares in `seeds`. New facts are appended to `deductions`. Returns how many were found.
pub fn propagate<I>(kb: &mut KnowledgeBase, seeds: I, deductions: &mut Vec<Deduction>) -> Result<usize, SolverError>
where
    I: IntoIterator<Item = Loc>,
{
    let before = deductions.len();
    let mut work = Worklist::default();
    for seed in seeds {
        work.push(seed);
    }

    loop {
        while let Some(at) = work.pop() {
            let region = match Region::around(kb, at)? {
                Some(region) => region,
                None => continue,
            };
            if region.hidden.is_empty() {
                continue;
            }

            let mut found = region.deductions();
            if found.is_empty() {
                found = overlaps(kb, &region)?;
            }
            record(kb, found, &mut work, deductions)?;
        }

        // The queue is drained, so every region is locally consistent. Now
        // check whether any single region needs the whole remaining budget.
        let found = global(kb)?;
        if found.is_empty() {
            break;
        }
        record(kb, found, &mut work, deductions)?;
    }

    Ok(deductions.len() - before)
}

/// Deductions from the first neighbouring region whose overlap settles anything.
fn overlaps(kb: &KnowledgeBase, region: &Region) -> Result<Vec<Deduction>, SolverError> {
    for partner in kb.numbered_within(region.origin, 2) {
        let other = match Region::around(kb, partner)? {
            Some(other) => other,
            None => continue,
        };
        let link = match LinkedRegions::link(region, &other)? {
            Some(link) => link,
            None => continue,
        };
        let found = link.deductions();
        if !found.is_empty() {
            trace!("{:?} and {:?} share {} squares", region.origin, partner, link.rs.len());
            return Ok(found);
        }
    }
    Ok(vec![])
}

fn global(kb: &KnowledgeBase) -> Result<Vec<Deduction>, SolverError> {
    let remaining = kb.budget();
    if remaining == 0 {
        return Ok(vec![]);
    }
    let numbered = kb.unknowns()
        .flat_map(|loc| kb.neighbours(loc))
        .filter(|&l| kb.number(l).is_some())
        .collect::<IndexSet<_>>();
    for at in numbered {
        let region = match Region::around(kb, at)? {
            Some(region) => region,
            None => continue,
        };
        if region.mines != remaining {
            continue;
        }
        let rule = Rule::GlobalBudget { at, remaining };
        let found = kb.unknowns()
            .filter(|loc| !region.hidden.contains(loc))
            .map(|loc| Deduction::safe(loc, rule))
            .collect::<Vec<_>>();
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(vec![])
}

/// Stores new facts and queues every numbered square they touch.
fn record(
    kb: &mut KnowledgeBase,
    found: Vec<Deduction>,
    work: &mut Worklist,
    deductions: &mut Vec<Deduction>,
) -> Result<(), SolverError> {
    for deduction in found {
        if !kb.apply(&deduction)? {
            continue;
        }
        debug!("{}", deduction);
        for at in kb.numbered_around(&[deduction.loc]) {
            work.push(at);
        }
        deductions.push(deduction);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rand::{seq::SliceRandom, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::{
        board::{Board, CellCategory},
        solver::{Fact, GameView},
        util,
    };

    fn synced(board: &Board) -> (KnowledgeBase, Vec<Loc>) {
        let mut kb = KnowledgeBase::new(board.dims(), board.total_mines());
        let numbered = kb.sync(board).expect("a consistent board.");
        (kb, numbered)
    }

    fn sorted(set: &IndexSet<Loc>) -> Vec<Loc> {
        let mut v = set.iter().copied().collect::<Vec<_>>();
        v.sort();
        v
    }

    #[test]
    fn one_with_a_single_unknown_is_a_mine() {
        // (1, 1) shows 1 and (0, 0) is its only unknown neighbour.
        let board = Board::from_save(b"x..\n...\n...\n").expect("a valid fixture.");
        let (mut kb, seeds) = synced(&board);
        let mut deductions = vec![];
        propagate(&mut kb, seeds, &mut deductions).expect("a consistent board.");
        assert_eq!(sorted(kb.mines()), vec![(0, 0)]);
        assert!(matches!(deductions[0].rule, Rule::Saturated { .. }));
    }

    #[test]
    fn zero_clears_its_neighbours() {
        // (2, 2) shows 0 with hidden neighbours on every side.
        let board = Board::from_save(b"xHHHH\nHHHHH\nHH.HH\nHHHHH\nHHHHH\n").expect("a valid fixture.");
        let (mut kb, seeds) = synced(&board);
        let mut deductions = vec![];
        propagate(&mut kb, seeds, &mut deductions).expect("a consistent board.");
        assert_eq!(deductions.len(), 8);
        assert!(deductions.iter().all(|d| d.fact == Fact::Safe));
        assert!(deductions.iter().all(|d| util::distance(d.loc, (2, 2)) == 1));
        assert_eq!(deductions[0].rule, Rule::Satisfied { at: (2, 2), number: 0 });
    }

    #[test]
    fn one_two_one_resolves_row() {
        let board = Board::from_save(include_bytes!("../../testing/boards/one_two_one.txt"))
            .expect("a valid fixture.");
        let (mut kb, seeds) = synced(&board);
        let mut deductions = vec![];
        propagate(&mut kb, seeds, &mut deductions).expect("a consistent board.");
        assert_eq!(sorted(kb.mines()), vec![(0, 0), (0, 2)]);
        assert!(kb.safe().contains(&(0, 1)));
        assert!(deductions.iter().any(|d| matches!(d.rule, Rule::Overlap { .. })));
    }

    #[test]
    fn region_holding_whole_budget_clears_board() {
        let board = Board::from_save(include_bytes!("../../testing/boards/budget.txt"))
            .expect("a valid fixture.");
        let (mut kb, seeds) = synced(&board);
        let mut deductions = vec![];
        propagate(&mut kb, seeds, &mut deductions).expect("a consistent board.");
        assert!(deductions.iter().any(|d| matches!(d.rule, Rule::GlobalBudget { remaining: 1, .. })));
        assert!(kb.safe().contains(&(4, 4)));
        assert!(kb.mines().is_empty());
    }

    #[test]
    fn propagation_is_order_independent() {
        let fixtures: [&[u8]; 4] = [
            include_bytes!("../../testing/boards/basic.txt"),
            include_bytes!("../../testing/boards/one_two_one.txt"),
            include_bytes!("../../testing/boards/islands.txt"),
            include_bytes!("../../testing/boards/budget.txt"),
        ];
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
        for fixture in fixtures.iter() {
            let board = Board::from_save(fixture).expect("a valid fixture.");
            let (mut kb, seeds) = synced(&board);
            propagate(&mut kb, seeds.clone(), &mut vec![]).expect("a consistent board.");
            let expected = (sorted(kb.safe()), sorted(kb.mines()));

            for _ in 0..10 {
                let mut shuffled = seeds.clone();
                shuffled.shuffle(&mut rng);
                let (mut kb, _) = synced(&board);
                propagate(&mut kb, shuffled, &mut vec![]).expect("a consistent board.");
                assert_eq!((sorted(kb.safe()), sorted(kb.mines())), expected);
            }
        }
    }

    #[test]
    fn propagation_is_sound_mid_game() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(41);
        for _ in 0..30 {
            let mut board = Board::new(10, 12, 18, &mut rng).expect("board to be created.");
            let mut hidden = util::all_locs(board.dims())
                .filter(|&l| board.cell(l).category != CellCategory::Mine)
                .collect::<Vec<_>>();
            hidden.shuffle(&mut rng);
            for &loc in hidden.iter().take(6) {
                if board.in_progress() && board.number(loc).is_none() {
                    board.reveal(loc).expect("a safe reveal.");
                }
            }

            let (mut kb, seeds) = synced(&board);
            propagate(&mut kb, seeds, &mut vec![]).expect("a consistent board.");
            for &loc in kb.mines() {
                assert_eq!(board.cell(loc).category, CellCategory::Mine);
            }
            for &loc in kb.safe() {
                assert_ne!(board.cell(loc).category, CellCategory::Mine);
            }
        }
    }

    #[test]
    fn worklist_deduplicates() {
        let mut work = Worklist::default();
        work.push((0, 0));
        work.push((0, 0));
        work.push((1, 0));
        assert_eq!(work.pop(), Some((0, 0)));
        work.push((0, 0));
        assert_eq!(work.pop(), Some((1, 0)));
        assert_eq!(work.pop(), Some((0, 0)));
        assert_eq!(work.pop(), None);
    }
}
