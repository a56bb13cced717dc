//! Line-scan helpers shared by the square-grid games.

use stakemate_types::Seat;

/// The four scan directions as (row, col) steps: horizontal, vertical and
/// both diagonals. Each is walked both ways from the anchor cell.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Find a run of at least `win_len` cells owned by the occupant of `last`,
/// passing through `last`, on an `n`×`n` row-major board. Returns exactly
/// `win_len` cells of the run when found.
pub(crate) fn winning_run(
    board: &[Option<Seat>],
    n: usize,
    last: usize,
    win_len: usize,
) -> Option<Vec<usize>> {
    let owner = board[last]?;
    let (row, col) = ((last / n) as isize, (last % n) as isize);

    for (dr, dc) in DIRECTIONS {
        let mut run = vec![last];
        for sign in [1isize, -1] {
            let (mut r, mut c) = (row + dr * sign, col + dc * sign);
            while in_bounds(r, c, n) && board[(r as usize) * n + c as usize] == Some(owner) {
                run.push((r as usize) * n + c as usize);
                r += dr * sign;
                c += dc * sign;
            }
        }
        if run.len() >= win_len {
            run.sort_unstable();
            run.truncate(win_len);
            return Some(run);
        }
    }
    None
}

fn in_bounds(r: isize, c: isize, n: usize) -> bool {
    r >= 0 && c >= 0 && (r as usize) < n && (c as usize) < n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_run() {
        let mut board = vec![None; 9];
        board[0] = Some(0);
        board[1] = Some(0);
        board[2] = Some(0);
        let run = winning_run(&board, 3, 1, 3).expect("run through middle cell");
        assert_eq!(run, vec![0, 1, 2]);
    }

    #[test]
    fn test_anti_diagonal_run() {
        let mut board = vec![None; 9];
        board[2] = Some(1);
        board[4] = Some(1);
        board[6] = Some(1);
        assert!(winning_run(&board, 3, 4, 3).is_some());
    }

    #[test]
    fn test_no_run_across_row_wrap() {
        // Cells 2 and 3 are adjacent in memory but on different rows.
        let mut board = vec![None; 9];
        board[1] = Some(0);
        board[2] = Some(0);
        board[3] = Some(0);
        assert!(winning_run(&board, 3, 2, 3).is_none());
    }

    #[test]
    fn test_run_longer_than_needed_is_trimmed() {
        let mut board = vec![None; 25];
        for cell in [0, 1, 2, 3, 4] {
            board[cell] = Some(0);
        }
        let run = winning_run(&board, 5, 2, 4).expect("five in a row contains four");
        assert_eq!(run.len(), 4);
    }
}
