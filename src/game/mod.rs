//! 井字棋核心状态与规则。

pub mod rules;
pub mod state;

pub use rules::{MoveRejection, RuleEngine, RuleError, RuleResolution};
pub use state::{GameConfig, GameEvent, GameState, Mark, Outcome, Position};
