use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{GameEvent, GameState, Mark, Outcome, Position};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveRejection {
    OutOfBounds,
    Occupied,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("cannot play ({row}, {col}): {reason:?}")]
    InvalidMove {
        row: usize,
        col: usize,
        reason: MoveRejection,
    },
    #[error("no move can be chosen from a finished position")]
    InvalidState,
    #[error("board size {size} cannot host lines of {win_length}")]
    InvalidConfig { size: usize, win_length: usize },
    #[error("the game is already over")]
    GameFinished,
    #[error("it is not the player's turn")]
    NotPlayerTurn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub events: Vec<GameEvent>,
    pub outcome: Outcome,
}

impl RuleResolution {
    pub fn new(state: GameState, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.result();
        if outcome.is_decided() {
            let has_event = events
                .iter()
                .any(|event| matches!(event, GameEvent::GameOver { .. }));
            if !has_event {
                events.push(GameEvent::GameOver { outcome });
            }
        }

        Self {
            state,
            events,
            outcome,
        }
    }
}

/// 在 `GameState::apply_move` 之上加一层对局规则：终局后拒绝落子，落子后立即结算。
pub struct RuleEngine;

impl RuleEngine {
    pub fn play_move(state: &mut GameState, position: Position) -> Result<Vec<GameEvent>, RuleError> {
        if state.result().is_decided() {
            return Err(RuleError::GameFinished);
        }

        let mark = state.turn();
        state.apply_move(position.row, position.col)?;

        let mut events = vec![GameEvent::MovePlayed {
            mark,
            row: position.row,
            col: position.col,
        }];

        let outcome = state.settle();
        if outcome.is_decided() {
            events.push(GameEvent::GameOver { outcome });
        }
        Ok(events)
    }

    pub fn play_as(
        state: &mut GameState,
        mark: Mark,
        position: Position,
    ) -> Result<Vec<GameEvent>, RuleError> {
        if state.turn() != mark {
            return Err(match mark {
                Mark::Player => RuleError::NotPlayerTurn,
                Mark::Opponent => RuleError::InvalidState,
            });
        }
        Self::play_move(state, position)
    }
}
