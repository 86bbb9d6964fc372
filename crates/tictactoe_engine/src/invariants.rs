//! First-class invariants for game sessions.
//!
//! Invariants are logical properties that must hold after every session
//! operation. They are checked with `debug_assert!` inside `GameSession`
//! and can be tested independently.

use crate::session::GameSession;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }
        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = match <(I1, I2) as InvariantSet<S>>::check_all(state) {
            Ok(()) => Vec::new(),
            Err(violations) => violations,
        };
        if !I3::holds(state) {
            violations.push(InvariantViolation::new(I3::description()));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Invariant: the board holds exactly size² cells.
pub struct BoardShape;

impl Invariant<GameSession> for BoardShape {
    fn holds(session: &GameSession) -> bool {
        let board = session.board();
        board.cell_count() == board.size() * board.size()
    }

    fn description() -> &'static str {
        "Board holds exactly size * size cells"
    }
}

/// Invariant: every history move is on the board and nothing else was added.
///
/// Occupied cells equal the snapshot cells plus one per history move, and each
/// history cell still holds its mover's symbol.
pub struct HistoryConsistent;

impl Invariant<GameSession> for HistoryConsistent {
    fn holds(session: &GameSession) -> bool {
        let board = session.board();
        let counts_match = board.occupied() == session.preset_cells() + session.history().len();
        counts_match
            && session
                .history()
                .iter()
                .all(|m| board.get(m.position) == Some(m.player))
    }

    fn description() -> &'static str {
        "History length matches cells occupied during this session"
    }
}

/// Invariant: players alternate, and the turn follows the last mover.
pub struct AlternatingTurns;

impl Invariant<GameSession> for AlternatingTurns {
    fn holds(session: &GameSession) -> bool {
        let history = session.history();
        let alternates = history
            .windows(2)
            .all(|pair| pair[1].player == pair[0].player.opponent());
        let turn_follows = match history.last() {
            None => true,
            Some(last) if session.is_terminal() => session.current_player() == last.player,
            Some(last) => session.current_player() == last.player.opponent(),
        };
        alternates && turn_follows
    }

    fn description() -> &'static str {
        "Players alternate and the turn passes to the last mover's opponent"
    }
}

/// All session invariants.
pub type SessionInvariants = (BoardShape, HistoryConsistent, AlternatingTurns);
