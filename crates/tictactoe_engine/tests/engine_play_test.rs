//! Engine behaviour over whole games.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tictactoe_engine::{Board, GameSession, GameStatus, MoveEngine, Symbol};

fn board_with(xs: &[usize], os: &[usize]) -> Board {
    let mut board = Board::new(3).unwrap();
    for &i in xs {
        board.place(i, Symbol::X).unwrap();
    }
    for &i in os {
        board.place(i, Symbol::O).unwrap();
    }
    board
}

#[test]
fn test_blocks_near_win() {
    let board = board_with(&[4], &[0, 1]);
    let position = MoveEngine::new().select_move(&board, Symbol::X).unwrap();
    assert_eq!(position, 2);
}

#[test]
fn test_completes_own_line() {
    let board = board_with(&[0, 1], &[]);
    let position = MoveEngine::new().select_move(&board, Symbol::X).unwrap();
    assert_eq!(position, 2);
}

#[test]
fn test_caller_board_is_untouched() {
    let board = board_with(&[0, 8], &[4]);
    let copy = board.clone();
    MoveEngine::new().select_move(&board, Symbol::O).unwrap();
    assert_eq!(board, copy);
}

#[test]
fn test_full_search_self_play_draws() {
    for seed in 0..3 {
        let mut rng = StdRng::seed_from_u64(seed);
        let engine = MoveEngine::new();
        let mut session = GameSession::new(3, Symbol::X).unwrap();
        while !session.is_terminal() {
            let position = engine
                .select_move_with_rng(session.board(), session.current_player(), &mut rng)
                .unwrap();
            session.apply_move(position).unwrap();
        }
        assert_eq!(session.status(), GameStatus::Drawn);
    }
}

#[test]
fn test_larger_boards_finish_within_budget() {
    let engine = MoveEngine::with_budget(Duration::from_secs(5));
    for size in [4, 5, 6] {
        let mut rng = StdRng::seed_from_u64(size as u64);
        let mut session = GameSession::new(size, Symbol::X).unwrap();
        while !session.is_terminal() {
            let position = engine
                .select_move_with_rng(session.board(), session.current_player(), &mut rng)
                .unwrap();
            session.apply_move(position).unwrap();
        }
        assert!(session.history().len() <= size * size);
    }
}
