//! 一局接一局的人机对战：玩家落子后 AI 立即应答，并累计比分。

use serde::{Deserialize, Serialize};

use crate::ai::{AiAgent, AiDifficulty};
use crate::game::{
    GameConfig, GameEvent, GameState, Mark, Outcome, Position, RuleEngine, RuleError,
    RuleResolution,
};
use crate::utils;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scoreboard {
    pub player_wins: u32,
    pub opponent_wins: u32,
    pub draws: u32,
}

impl Scoreboard {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::PlayerWon => self.player_wins += 1,
            Outcome::OpponentWon => self.opponent_wins += 1,
            Outcome::Draw => self.draws += 1,
            Outcome::Undecided => {}
        }
    }

    pub fn rounds(&self) -> u32 {
        self.player_wins + self.opponent_wins + self.draws
    }
}

pub struct Session {
    config: GameConfig,
    first_turn: Mark,
    state: GameState,
    agent: AiAgent,
    scoreboard: Scoreboard,
}

impl Session {
    pub fn new(config: GameConfig, difficulty: AiDifficulty) -> Result<Self, RuleError> {
        Self::with_agent(config, AiAgent::new(difficulty))
    }

    pub fn with_agent(config: GameConfig, agent: AiAgent) -> Result<Self, RuleError> {
        Ok(Self {
            config,
            first_turn: Mark::Player,
            state: GameState::new(config)?,
            agent,
            scoreboard: Scoreboard::default(),
        })
    }

    /// 设置先手方并开新局，比分保留。
    pub fn with_first_turn(mut self, mark: Mark) -> Self {
        self.first_turn = mark;
        self.restart();
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn scoreboard(&self) -> Scoreboard {
        self.scoreboard
    }

    pub fn difficulty(&self) -> AiDifficulty {
        self.agent.difficulty()
    }

    pub fn set_difficulty(&mut self, difficulty: AiDifficulty) {
        self.agent.set_difficulty(difficulty);
    }

    pub fn is_over(&self) -> bool {
        self.state.result().is_decided()
    }

    /// 玩家落子；若对局未结束，AI 随即应答。
    pub fn play(&mut self, row: usize, col: usize) -> Result<RuleResolution, RuleError> {
        if self.is_over() {
            return Err(RuleError::GameFinished);
        }

        let position = Position::new(row, col);
        let mut events = RuleEngine::play_as(&mut self.state, Mark::Player, position)?;
        if !self.is_over() {
            let mut reply = self.reply()?;
            events.append(&mut reply);
        }

        Ok(self.finish(events))
    }

    /// AI 先手或轮到 AI 时单独驱动一步。
    pub fn ai_move(&mut self) -> Result<RuleResolution, RuleError> {
        if self.is_over() {
            return Err(RuleError::GameFinished);
        }
        if !self.state.is_opponent_turn() {
            return Err(RuleError::InvalidState);
        }
        let events = self.reply()?;
        Ok(self.finish(events))
    }

    pub fn restart(&mut self) {
        self.state = GameState::new(self.config)
            .unwrap_or_default()
            .with_first_turn(self.first_turn);
    }

    fn reply(&mut self) -> Result<Vec<GameEvent>, RuleError> {
        let position = self.agent.choose_move(&self.state)?;
        RuleEngine::play_as(&mut self.state, Mark::Opponent, position)
    }

    fn finish(&mut self, events: Vec<GameEvent>) -> RuleResolution {
        for event in &events {
            if let GameEvent::GameOver { outcome } = event {
                self.scoreboard.record(*outcome);
                utils::log(&format!(
                    "round over: {outcome:?} (you {} : ai {})",
                    self.scoreboard.player_wins, self.scoreboard.opponent_wins
                ));
            }
        }
        RuleResolution::new(self.state.clone(), events)
    }
}
