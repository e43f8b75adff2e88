use std::fmt;

use indexmap::IndexSet;

/// A board coordinate as `(row, col)`.
pub type Loc = (usize, usize);

/// Displays a coordinate 1-based, matching the rendered board headings.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Pos(pub Loc);

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, col) = self.0;
        write!(f, "({}, {})", row + 1, col + 1)
    }
}

pub fn pos(loc: &Loc) -> Pos {
    Pos(*loc)
}

/// Splits two sets into (only in `aa`, in both, only in `bb`).
pub fn split_sets<T: Eq + std::hash::Hash + Copy>(aa: &IndexSet<T>, bb: &IndexSet<T>) -> (IndexSet<T>, IndexSet<T>, IndexSet<T>) {
    (
        aa.difference(bb).cloned().collect(),
        aa.intersection(bb).cloned().collect(),
        bb.difference(aa).cloned().collect(),
    )
}

/// The up-to-eight squares adjacent to `loc` on a board of `dims = (rows, cols)`.
pub fn surroundings(dims: (usize, usize), loc: Loc) -> impl Iterator<Item = Loc> {
    (0..9)
        .map(|i| (i / 3, i % 3))
        // Remove out of bounds and loc.
        .filter(move |offset| {
            if *offset == (1, 1) {
                return false;
            }

            // check row
            if offset.0 == 0 && loc.0 == 0 {
                return false;
            }
            if offset.0 == 2 && loc.0 + 1 >= dims.0 {
                return false;
            }

            // check col
            if offset.1 == 0 && loc.1 == 0 {
                return false;
            }
            if offset.1 == 2 && loc.1 + 1 >= dims.1 {
                return false;
            }

            true
        })
        // offset
        // 0 means decrement
        // 1 means ignore
        // 2 means increment
        .map(move |offset| {
            let row = match offset.0 {
                0 => loc.0 - 1,
                2 => loc.0 + 1,
                _ => loc.0,
            };
            let col = match offset.1 {
                0 => loc.1 - 1,
                2 => loc.1 + 1,
                _ => loc.1,
            };
            (row, col)
        })
}

/// Row-major iterator over every coordinate of a board.
pub fn all_locs(dims: (usize, usize)) -> impl Iterator<Item = Loc> {
    let cols = dims.1;
    (0..dims.0).flat_map(move |row| (0..cols).map(move |col| (row, col)))
}

/// Chebyshev distance between two squares.
pub fn distance(a: Loc, b: Loc) -> usize {
    let dr = if a.0 > b.0 { a.0 - b.0 } else { b.0 - a.0 };
    let dc = if a.1 > b.1 { a.1 - b.1 } else { b.1 - a.1 };
    dr.max(dc)
}

pub fn is_corner(dims: (usize, usize), (row, col): Loc) -> bool {
    (row == 0 || row + 1 == dims.0) && (col == 0 || col + 1 == dims.1)
}

pub fn is_edge(dims: (usize, usize), (row, col): Loc) -> bool {
    row == 0 || col == 0 || row + 1 == dims.0 || col + 1 == dims.1
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn surroundings_clip_to_board() {
        let dims = (3, 4);
        assert_eq!(surroundings(dims, (0, 0)).count(), 3);
        assert_eq!(surroundings(dims, (0, 2)).count(), 5);
        assert_eq!(surroundings(dims, (1, 1)).count(), 8);
        assert_eq!(surroundings(dims, (2, 3)).count(), 3);
        assert!(surroundings(dims, (1, 1)).all(|l| l != (1, 1)));
    }

    #[test]
    fn surroundings_on_single_row() {
        let around: Vec<_> = surroundings((1, 3), (0, 1)).collect();
        assert_eq!(around, vec![(0, 0), (0, 2)]);
    }

    #[test]
    fn split_sets_partitions() {
        let aa: IndexSet<_> = vec![1, 2, 3].into_iter().collect();
        let bb: IndexSet<_> = vec![2, 3, 4].into_iter().collect();
        let (a, s, b) = split_sets(&aa, &bb);
        assert_eq!(a.into_iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(s.into_iter().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(b.into_iter().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn corners_and_edges() {
        let dims = (4, 5);
        assert!(is_corner(dims, (0, 0)));
        assert!(is_corner(dims, (3, 4)));
        assert!(!is_corner(dims, (0, 2)));
        assert!(is_edge(dims, (0, 2)));
        assert!(is_edge(dims, (2, 4)));
        assert!(!is_edge(dims, (1, 1)));
        assert_eq!(distance((0, 0), (2, 1)), 2);
    }

    #[test]
    fn positions_display_one_based() {
        assert_eq!(Pos((0, 4)).to_string(), "(1, 5)");
    }
}
