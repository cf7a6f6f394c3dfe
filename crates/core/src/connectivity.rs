//! Start-to-goal reachability over free cells.
//! Breadth-first search on the undirected 4-neighbour grid graph; no diagonals.

use std::collections::VecDeque;

use crate::grid::Grid;
use crate::types::Cell;

/// Returns whether a path of free cells joins `start` and `goal`.
///
/// Blocked or out-of-bounds endpoints are never reachable. Identical
/// endpoints are reachable without a search. Cells are marked visited when
/// enqueued, so each one is queued at most once.
pub fn reachable(grid: &Grid, start: Cell, goal: Cell) -> bool {
    if !grid.is_free(start) || !grid.is_free(goal) {
        return false;
    }
    if start == goal {
        return true;
    }

    let mut visited = vec![false; grid.height() * grid.width()];
    let mut queue = VecDeque::new();
    visited[grid.index(start)] = true;
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            return true;
        }
        for next in grid.neighbors(current) {
            let index = grid.index(next);
            if visited[index] || !grid.is_free(next) {
                continue;
            }
            visited[index] = true;
            queue.push_back(next);
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::CellState;

    fn grid_from_rows(rows: &[&str]) -> Grid {
        let height = rows.len();
        let width = rows[0].len();
        let mut grid = Grid::new(height, width);
        for (row, line) in rows.iter().enumerate() {
            for (col, tile) in line.chars().enumerate() {
                if tile == '#' {
                    grid.set(Cell { row, col }, CellState::Obstacle);
                }
            }
        }
        grid
    }

    #[test]
    fn open_grid_connects_opposite_corners() {
        let grid = Grid::new(4, 5);
        assert!(reachable(&grid, Cell::new(0, 0), Cell::new(3, 4)));
    }

    #[test]
    fn blocked_endpoint_is_never_reachable() {
        let grid = grid_from_rows(&["#..", "...", "..#"]);
        assert!(!reachable(&grid, Cell::new(0, 0), Cell::new(1, 1)));
        assert!(!reachable(&grid, Cell::new(1, 1), Cell::new(2, 2)));
        assert!(!reachable(&grid, Cell::new(0, 0), Cell::new(0, 0)));
    }

    #[test]
    fn identical_free_endpoints_are_reachable_even_when_walled_in() {
        let grid = grid_from_rows(&["###", "#.#", "###"]);
        assert!(reachable(&grid, Cell::new(1, 1), Cell::new(1, 1)));
    }

    #[test]
    fn diagonal_gap_does_not_connect() {
        let grid = grid_from_rows(&[".#", "#."]);
        assert!(!reachable(&grid, Cell::new(0, 0), Cell::new(1, 1)));
    }

    #[test]
    fn wall_with_single_gap_still_connects() {
        let grid = grid_from_rows(&[".....", "####.", ".....", ".####", "....."]);
        assert!(reachable(&grid, Cell::new(0, 0), Cell::new(4, 4)));
    }

    #[test]
    fn full_wall_separates_halves() {
        let grid = grid_from_rows(&["..#..", "..#..", "..#.."]);
        assert!(!reachable(&grid, Cell::new(0, 0), Cell::new(2, 4)));
        assert!(reachable(&grid, Cell::new(0, 0), Cell::new(2, 1)));
    }

    #[test]
    fn out_of_bounds_endpoint_is_not_reachable() {
        let grid = Grid::new(2, 2);
        assert!(!reachable(&grid, Cell::new(0, 0), Cell::new(2, 0)));
    }

    fn arb_grid() -> impl Strategy<Value = Grid> {
        (1_usize..=8, 1_usize..=8).prop_flat_map(|(height, width)| {
            proptest::collection::vec(any::<bool>(), height * width).prop_map(move |blocked| {
                let mut grid = Grid::new(height, width);
                for (index, is_blocked) in blocked.into_iter().enumerate() {
                    if is_blocked {
                        grid.set(grid.cell_at(index), CellState::Obstacle);
                    }
                }
                grid
            })
        })
    }

    fn arb_grid_with_endpoints() -> impl Strategy<Value = (Grid, Cell, Cell)> {
        arb_grid().prop_flat_map(|grid| {
            let cells = grid.height() * grid.width();
            (Just(grid), 0..cells, 0..cells).prop_map(|(grid, a, b)| {
                let start = grid.cell_at(a);
                let goal = grid.cell_at(b);
                (grid, start, goal)
            })
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]
        #[test]
        fn reachability_is_symmetric((grid, start, goal) in arb_grid_with_endpoints()) {
            prop_assert_eq!(reachable(&grid, start, goal), reachable(&grid, goal, start));
        }

        #[test]
        fn free_cell_reaches_itself((grid, start, _goal) in arb_grid_with_endpoints()) {
            prop_assert_eq!(reachable(&grid, start, start), grid.is_free(start));
        }

        #[test]
        fn blocked_endpoint_blocks_search((grid, start, goal) in arb_grid_with_endpoints()) {
            if !grid.is_free(start) || !grid.is_free(goal) {
                prop_assert!(!reachable(&grid, start, goal));
            }
        }
    }
}
