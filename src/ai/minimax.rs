use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{GameState, Position, RuleError};

/// 中等难度下选择最优着法的概率，其余情况退而取次优。
const MIXED_BEST_PROBABILITY: f64 = 0.40;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Random,
    #[default]
    Mixed,
    Optimal,
}

impl AiDifficulty {
    pub fn from_tier(tier: u8) -> Self {
        match tier {
            0 => AiDifficulty::Random,
            1 => AiDifficulty::Mixed,
            _ => AiDifficulty::Optimal,
        }
    }

    pub fn tier(self) -> u8 {
        match self {
            AiDifficulty::Random => 0,
            AiDifficulty::Mixed => 1,
            AiDifficulty::Optimal => 2,
        }
    }
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        if let Ok(tier) = value.parse::<u8>() {
            return Ok(AiDifficulty::from_tier(tier));
        }
        match value.as_str() {
            "easy" | "random" | "blind" => Ok(AiDifficulty::Random),
            "medium" | "normal" | "mixed" | "novice" => Ok(AiDifficulty::Mixed),
            "hard" | "optimal" | "expert" | "master" => Ok(AiDifficulty::Optimal),
            _ => Err(()),
        }
    }
}

/// 候选着法及其 minimax 评分。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredMove {
    pub score: i32,
    pub position: Position,
}

/// 稳定排序，同分保持原有顺序。
pub fn sort_actions_asc(actions: &mut [ScoredMove]) {
    actions.sort_by(|a, b| a.score.cmp(&b.score));
}

pub fn sort_actions_desc(actions: &mut [ScoredMove]) {
    actions.sort_by(|a, b| b.score.cmp(&a.score));
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    pub position: Position,
    /// 随机难度不做搜索，没有评分。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<i32>,
    /// 所选着法在排序后的候选列表中的名次，0 为最优。
    pub rank: usize,
    pub nodes: u64,
    pub difficulty: AiDifficulty,
}

#[derive(Default)]
struct SearchStats {
    nodes: u64,
}

pub struct AiAgent {
    difficulty: AiDifficulty,
    rng: SmallRng,
}

impl AiAgent {
    pub fn new(difficulty: AiDifficulty) -> Self {
        Self {
            difficulty,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(difficulty: AiDifficulty, seed: u64) -> Self {
        Self {
            difficulty,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn difficulty(&self) -> AiDifficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: AiDifficulty) {
        self.difficulty = difficulty;
    }

    pub fn choose_move(&mut self, state: &GameState) -> Result<Position, RuleError> {
        self.decide(state).map(|decision| decision.position)
    }

    pub fn decide(&mut self, state: &GameState) -> Result<AiDecision, RuleError> {
        if state.evaluate().is_decided() {
            return Err(RuleError::InvalidState);
        }
        let available = state.available_moves();
        if available.is_empty() {
            return Err(RuleError::InvalidState);
        }

        match self.difficulty {
            AiDifficulty::Random => {
                let position = *available
                    .choose(&mut self.rng)
                    .ok_or(RuleError::InvalidState)?;
                Ok(AiDecision {
                    position,
                    evaluation: None,
                    rank: 0,
                    nodes: 0,
                    difficulty: self.difficulty,
                })
            }
            AiDifficulty::Mixed => {
                let mut stats = SearchStats::default();
                let actions = ranked_actions(state, &mut stats);
                let rank = if actions.len() < 2 || self.rng.gen_bool(MIXED_BEST_PROBABILITY) {
                    0
                } else {
                    1
                };
                self.pick(&actions, rank, &stats)
            }
            AiDifficulty::Optimal => {
                let mut stats = SearchStats::default();
                let actions = ranked_actions(state, &mut stats);
                self.pick(&actions, 0, &stats)
            }
        }
    }

    fn pick(
        &self,
        actions: &[ScoredMove],
        rank: usize,
        stats: &SearchStats,
    ) -> Result<AiDecision, RuleError> {
        let chosen = actions.get(rank).ok_or(RuleError::InvalidState)?;
        Ok(AiDecision {
            position: chosen.position,
            evaluation: Some(chosen.score),
            rank,
            nodes: stats.nodes,
            difficulty: self.difficulty,
        })
    }
}

/// 对每个可下位置求 minimax 值并排序：轮到对手（AI）时降序，否则升序。
pub fn available_actions(state: &GameState) -> Vec<ScoredMove> {
    let mut stats = SearchStats::default();
    ranked_actions(state, &mut stats)
}

pub fn minimax_value(state: &GameState) -> i32 {
    let mut stats = SearchStats::default();
    minimax_rec(state, &mut stats)
}

fn ranked_actions(state: &GameState, stats: &mut SearchStats) -> Vec<ScoredMove> {
    let mut actions: Vec<ScoredMove> = state
        .available_moves()
        .into_iter()
        .filter_map(|position| {
            simulate_move(state, position).ok().map(|next_state| ScoredMove {
                score: minimax_rec(&next_state, stats),
                position,
            })
        })
        .collect();

    if state.is_opponent_turn() {
        sort_actions_desc(&mut actions);
    } else {
        sort_actions_asc(&mut actions);
    }
    actions
}

fn minimax_rec(state: &GameState, stats: &mut SearchStats) -> i32 {
    stats.nodes += 1;

    let outcome = state.evaluate();
    if outcome.is_decided() {
        return state.score_of(outcome);
    }

    let maximizing = state.is_opponent_turn();
    let mut best: Option<i32> = None;
    for position in state.available_moves() {
        let Ok(next_state) = simulate_move(state, position) else {
            continue;
        };
        let value = minimax_rec(&next_state, stats);
        best = Some(match best {
            None => value,
            Some(current) if maximizing => current.max(value),
            Some(current) => current.min(value),
        });
    }

    best.unwrap_or_else(|| state.score_of(outcome))
}

fn simulate_move(state: &GameState, position: Position) -> Result<GameState, RuleError> {
    let mut next_state = state.clone();
    next_state.apply_move(position.row, position.col)?;
    Ok(next_state)
}
