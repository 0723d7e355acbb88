pub mod ai;
pub mod game;
pub mod session;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_json;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{
    available_actions, minimax_value, sort_actions_asc, sort_actions_desc, AiAgent, AiDecision,
    AiDifficulty, ScoredMove,
};
pub use game::{
    GameConfig, GameEvent, GameState, Mark, MoveRejection, Outcome, Position, RuleEngine,
    RuleError, RuleResolution,
};
pub use session::{Scoreboard, Session};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_difficulty(difficulty: Option<&str>) -> AiDifficulty {
    difficulty
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or_default()
}

fn parse_config(config_json: Option<&str>) -> Result<GameConfig, JsValue> {
    let config = match config_json {
        Some(json) => serde_json::from_str(json).map_err(serde_to_js_error)?,
        None => GameConfig::default(),
    };
    config.validate().map_err(to_js_error)?;
    Ok(config)
}

/// 从 JS 传入的状态需通过完整性检查后才能参与计算。
fn state_from_js(state: JsValue) -> Result<GameState, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state.integrity_check().map_err(to_js_error)?;
    Ok(state)
}

#[derive(Serialize)]
struct EvaluationResponse {
    outcome: Outcome,
    terminal: bool,
    score: i32,
}

/// 一个完整的人机对局，供前端场景直接持有。
#[wasm_bindgen]
pub struct GameEngine {
    session: Session,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: Option<String>,
        difficulty: Option<String>,
        ai_first: Option<bool>,
    ) -> Result<GameEngine, JsValue> {
        let config = parse_config(config_json.as_deref())?;
        let difficulty = parse_difficulty(difficulty.as_deref());
        let mut session = Session::new(config, difficulty).map_err(to_js_error)?;
        if ai_first.unwrap_or(false) {
            session = session.with_first_turn(Mark::Opponent);
        }
        utils::log(&format!(
            "new {}x{} game, difficulty {:?}",
            config.size, config.size, difficulty
        ));
        Ok(GameEngine { session })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.state()).map_err(serde_to_js_error)
    }

    pub fn scoreboard_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.scoreboard()).map_err(serde_to_js_error)
    }

    pub fn is_over(&self) -> bool {
        self.session.is_over()
    }

    pub fn set_difficulty(&mut self, difficulty: &str) -> Result<(), JsValue> {
        let difficulty = AiDifficulty::from_str(difficulty)
            .map_err(|_| JsValue::from_str(&format!("unknown difficulty: {difficulty}")))?;
        self.session.set_difficulty(difficulty);
        Ok(())
    }

    /// 玩家点击 (row, col)；返回包含 AI 应答的结算结果。
    pub fn play_json(&mut self, row: usize, col: usize) -> Result<String, JsValue> {
        let resolution = self.session.play(row, col).map_err(to_js_error)?;
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    pub fn ai_move_json(&mut self) -> Result<String, JsValue> {
        let resolution = self.session.ai_move().map_err(to_js_error)?;
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    pub fn restart(&mut self) {
        self.session.restart();
    }

    /// 延迟 `delay_ms` 后给出 AI 建议，不修改当前对局。
    pub fn think_ai(&self, difficulty: Option<String>, delay_ms: Option<u32>) -> Promise {
        let state = self.session.state().clone();
        let difficulty = difficulty
            .as_deref()
            .and_then(|value| AiDifficulty::from_str(value).ok())
            .unwrap_or_else(|| self.session.difficulty());
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(difficulty);
            let decision = agent.decide(&state).map_err(to_js_error)?;
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state(config: JsValue, ai_first: Option<bool>) -> Result<JsValue, JsValue> {
    let config: GameConfig = if config.is_undefined() || config.is_null() {
        GameConfig::default()
    } else {
        from_value(config).map_err(JsValue::from)?
    };
    let mut state = GameState::new(config).map_err(to_js_error)?;
    if ai_first.unwrap_or(false) {
        state = state.with_first_turn(Mark::Opponent);
    }
    to_value(&state).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "applyMove")]
pub fn apply_move(state: JsValue, row: usize, col: usize) -> Result<JsValue, JsValue> {
    let mut state = state_from_js(state)?;
    let events = RuleEngine::play_move(&mut state, Position::new(row, col)).map_err(to_js_error)?;
    to_value(&RuleResolution::new(state, events)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "evaluateState")]
pub fn evaluate_state(state: JsValue) -> Result<JsValue, JsValue> {
    let mut state = state_from_js(state)?;
    let terminal = state.is_terminal();
    let response = EvaluationResponse {
        outcome: state.result(),
        terminal,
        score: state.score(),
    };
    to_value(&response).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "availableMoves")]
pub fn available_moves(state: JsValue) -> Result<JsValue, JsValue> {
    let state = state_from_js(state)?;
    to_value(&state.available_moves()).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(state: JsValue, difficulty: Option<String>) -> Result<JsValue, JsValue> {
    let state = state_from_js(state)?;
    let mut agent = AiAgent::new(parse_difficulty(difficulty.as_deref()));
    let decision = agent.decide(&state).map_err(to_js_error)?;
    to_value(&decision).map_err(JsValue::from)
}
