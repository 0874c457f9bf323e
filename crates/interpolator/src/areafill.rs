//! 2-D gap filling over a spatial grid.

use std::collections::VecDeque;

/// Fill enclosed NaN regions of a grid with their boundary mean.
///
/// Each maximal 8-connected component of NaN cells is flood-filled once.
/// While walking the component, every non-NaN neighbor value encountered is
/// collected; a boundary cell adjacent to several cells of the component is
/// therefore counted once per adjacency. Components that touch the grid
/// border are left as NaN: an unbounded region has no defensible fill
/// value. Non-NaN cells are never modified.
pub fn area_fill(grid: &mut [Vec<f32>]) {
    let rows = grid.len();
    if rows == 0 {
        return;
    }
    let cols = grid[0].len();
    if cols == 0 {
        return;
    }

    let mut visited = vec![vec![false; cols]; rows];

    for start_row in 0..rows {
        for start_col in 0..cols {
            if visited[start_row][start_col] || !grid[start_row][start_col].is_nan() {
                continue;
            }

            let mut component = Vec::new();
            let mut boundary_values = Vec::new();
            let mut touches_edge = false;

            let mut queue = VecDeque::new();
            visited[start_row][start_col] = true;
            queue.push_back((start_row, start_col));

            while let Some((row, col)) = queue.pop_front() {
                component.push((row, col));

                for d_row in -1i64..=1 {
                    for d_col in -1i64..=1 {
                        if d_row == 0 && d_col == 0 {
                            continue;
                        }
                        let n_row = row as i64 + d_row;
                        let n_col = col as i64 + d_col;
                        if n_row < 0 || n_col < 0 || n_row >= rows as i64 || n_col >= cols as i64 {
                            touches_edge = true;
                            continue;
                        }
                        let (n_row, n_col) = (n_row as usize, n_col as usize);

                        if grid[n_row][n_col].is_nan() {
                            if !visited[n_row][n_col] {
                                visited[n_row][n_col] = true;
                                queue.push_back((n_row, n_col));
                            }
                        } else {
                            boundary_values.push(grid[n_row][n_col]);
                        }
                    }
                }
            }

            if !touches_edge && !boundary_values.is_empty() {
                let mean = boundary_values.iter().sum::<f32>() / boundary_values.len() as f32;
                for (row, col) in component {
                    grid[row][col] = mean;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAN: f32 = f32::NAN;

    fn grid(rows: &[&[f32]]) -> Vec<Vec<f32>> {
        rows.iter().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_empty_grid() {
        let mut g: Vec<Vec<f32>> = Vec::new();
        area_fill(&mut g);
        assert!(g.is_empty());
    }

    #[test]
    fn test_grid_of_empty_rows() {
        let mut g: Vec<Vec<f32>> = vec![Vec::new(), Vec::new()];
        area_fill(&mut g);
        assert!(g[0].is_empty());
    }

    #[test]
    fn test_enclosed_single_nan() {
        let mut g = grid(&[
            &[1.0, 1.0, 1.0],
            &[1.0, NAN, 1.0],
            &[1.0, 1.0, 1.0],
        ]);
        area_fill(&mut g);
        assert_eq!(g[1][1], 1.0);
    }

    #[test]
    fn test_enclosed_single_nan_mean_of_all_eight_neighbors() {
        let mut g = grid(&[
            &[1.0, 2.0, 3.0],
            &[4.0, NAN, 5.0],
            &[6.0, 7.0, 8.0],
        ]);
        area_fill(&mut g);
        assert!((g[1][1] - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_enclosed_component_with_boundary_multiplicity() {
        // The two-cell component sees 2.0, 3.0, 8.0 and 9.0 twice each:
        // both component cells are adjacent to them. Mean of the multiset
        // {1,2,2,3,3,4,5,6,7,8,8,9,9,10} is 5.5.
        let mut g = grid(&[
            &[1.0, 2.0, 3.0, 4.0],
            &[5.0, NAN, NAN, 6.0],
            &[7.0, 8.0, 9.0, 10.0],
        ]);
        area_fill(&mut g);
        assert!((g[1][1] - 5.5).abs() < 1e-6);
        assert!((g[1][2] - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_edge_touching_component_left_nan() {
        let mut g = grid(&[
            &[1.0, NAN, 1.0],
            &[1.0, 1.0, 1.0],
            &[1.0, 1.0, 1.0],
        ]);
        area_fill(&mut g);
        assert!(g[0][1].is_nan());
    }

    #[test]
    fn test_edge_component_stays_while_interior_fills() {
        let mut g = grid(&[
            &[NAN, 2.0, 2.0, 2.0],
            &[2.0, 2.0, NAN, 2.0],
            &[2.0, 2.0, 2.0, 2.0],
        ]);
        area_fill(&mut g);
        assert!(g[0][0].is_nan());
        assert_eq!(g[1][2], 2.0);
    }

    #[test]
    fn test_diagonal_connectivity_reaches_edge() {
        // The interior NaN connects diagonally to a border NaN, so the
        // whole component is edge-touching and must stay unfilled.
        let mut g = grid(&[
            &[NAN, 1.0, 1.0],
            &[1.0, NAN, 1.0],
            &[1.0, 1.0, 1.0],
        ]);
        area_fill(&mut g);
        assert!(g[0][0].is_nan());
        assert!(g[1][1].is_nan());
    }

    #[test]
    fn test_two_separate_components() {
        let mut g = grid(&[
            &[1.0, 1.0, 1.0, 3.0, 3.0, 3.0],
            &[1.0, NAN, 1.0, 3.0, NAN, 3.0],
            &[1.0, 1.0, 1.0, 3.0, 3.0, 3.0],
        ]);
        area_fill(&mut g);
        assert_eq!(g[1][1], 1.0);
        assert_eq!(g[1][4], 3.0);
    }

    #[test]
    fn test_never_mutates_real_cells() {
        let original = grid(&[
            &[1.0, 2.0, 3.0],
            &[4.0, NAN, 5.0],
            &[6.0, 7.0, 8.0],
        ]);
        let mut g = original.clone();
        area_fill(&mut g);
        for (r, row) in original.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_nan() {
                    assert_eq!(g[r][c], *value);
                }
            }
        }
    }

    #[test]
    fn test_all_nan_grid_unchanged() {
        let mut g = grid(&[&[NAN, NAN], &[NAN, NAN]]);
        area_fill(&mut g);
        for row in &g {
            for v in row {
                assert!(v.is_nan());
            }
        }
    }
}
