//! AI 落子（穷举 minimax + 难度分级）。

pub mod minimax;

pub use minimax::{
    available_actions, minimax_value, sort_actions_asc, sort_actions_desc, AiAgent, AiDecision,
    AiDifficulty, ScoredMove,
};
