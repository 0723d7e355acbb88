use serde::{Deserialize, Serialize};

use super::rules::{MoveRejection, RuleError};

const DEFAULT_BOARD_SIZE: usize = 3;
const DEFAULT_WIN_LENGTH: usize = 3;

/// 落子标记：玩家（O）或 AI 对手（X）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Player,
    Opponent,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Mark::Player => Mark::Opponent,
            Mark::Opponent => Mark::Player,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Mark::Player => 'O',
            Mark::Opponent => 'X',
        }
    }
}

/// 棋盘坐标（从 0 开始）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// 对局结果。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum Outcome {
    #[default]
    Undecided,
    PlayerWon,
    OpponentWon,
    Draw,
}

impl Outcome {
    pub fn won_by(mark: Mark) -> Self {
        match mark {
            Mark::Player => Outcome::PlayerWon,
            Mark::Opponent => Outcome::OpponentWon,
        }
    }

    pub fn is_decided(self) -> bool {
        !matches!(self, Outcome::Undecided)
    }
}

/// 棋盘尺寸与连子数配置。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default = "default_board_size")]
    pub size: usize,
    #[serde(default = "default_win_length")]
    pub win_length: usize,
}

fn default_board_size() -> usize {
    DEFAULT_BOARD_SIZE
}

fn default_win_length() -> usize {
    DEFAULT_WIN_LENGTH
}

impl GameConfig {
    pub fn new(size: usize, win_length: usize) -> Result<Self, RuleError> {
        let config = Self { size, win_length };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.size == 0 || self.win_length == 0 || self.win_length > self.size {
            return Err(RuleError::InvalidConfig {
                size: self.size,
                win_length: self.win_length,
            });
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_BOARD_SIZE,
            win_length: DEFAULT_WIN_LENGTH,
        }
    }
}

/// 固定尺寸的方形棋盘，按行优先存储。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Mark>>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.size && col < self.size).then(|| row * self.size + col)
    }

    /// 越界返回 `None`；空格返回 `Some(None)`。
    pub fn get(&self, row: usize, col: usize) -> Option<Option<Mark>> {
        self.index(row, col).map(|idx| self.cells[idx])
    }

    fn place(&mut self, row: usize, col: usize, mark: Mark) -> Result<(), RuleError> {
        let idx = self.index(row, col).ok_or(RuleError::InvalidMove {
            row,
            col,
            reason: MoveRejection::OutOfBounds,
        })?;
        if self.cells[idx].is_some() {
            return Err(RuleError::InvalidMove {
                row,
                col,
                reason: MoveRejection::Occupied,
            });
        }
        self.cells[idx] = Some(mark);
        Ok(())
    }

    pub fn empty_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(idx, _)| Position::new(idx / self.size, idx % self.size))
            .collect()
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// 在给定格子序列中寻找长度为 `win_length` 的同色连线。
    fn run_in(&self, line: impl Iterator<Item = (usize, usize)>, win_length: usize) -> Option<Mark> {
        let mut current: Option<Mark> = None;
        let mut run = 0;
        for (row, col) in line {
            let cell = self.cells[row * self.size + col];
            match cell {
                Some(mark) if current == Some(mark) => run += 1,
                Some(_) => run = 1,
                None => run = 0,
            }
            current = cell;
            if run >= win_length {
                return current;
            }
        }
        None
    }

    /// 依次检查：各列、各行、主对角线方向、反对角线方向。
    fn winning_mark(&self, win_length: usize) -> Option<Mark> {
        let n = self.size;
        if n == 0 {
            return None;
        }

        for col in 0..n {
            if let Some(mark) = self.run_in((0..n).map(|row| (row, col)), win_length) {
                return Some(mark);
            }
        }

        for row in 0..n {
            if let Some(mark) = self.run_in((0..n).map(|col| (row, col)), win_length) {
                return Some(mark);
            }
        }

        // 主对角线 (0,0) 起步，之后是其余平行线
        for start in diagonal_starts(n, win_length) {
            let line = diagonal(n, start, |(row, col)| (row + 1, col + 1));
            if let Some(mark) = self.run_in(line.into_iter(), win_length) {
                return Some(mark);
            }
        }

        // 反对角线自左下向右上
        for start in diagonal_starts(n, win_length) {
            let (row, col) = (n - 1 - start.0, start.1);
            let line = diagonal(n, (row, col), |(row, col)| {
                (row.wrapping_sub(1), col + 1)
            });
            if let Some(mark) = self.run_in(line.into_iter(), win_length) {
                return Some(mark);
            }
        }

        None
    }
}

/// 足够长的对角线起点，(0,0) 最先。
fn diagonal_starts(n: usize, win_length: usize) -> Vec<(usize, usize)> {
    let reach = n.saturating_sub(win_length);
    let mut starts = Vec::with_capacity(2 * reach + 1);
    starts.push((0, 0));
    for offset in 1..=reach {
        starts.push((offset, 0));
    }
    for offset in 1..=reach {
        starts.push((0, offset));
    }
    starts
}

fn diagonal(
    n: usize,
    start: (usize, usize),
    step: impl Fn((usize, usize)) -> (usize, usize),
) -> Vec<(usize, usize)> {
    let mut cells = Vec::with_capacity(n);
    let mut cursor = start;
    while cursor.0 < n && cursor.1 < n {
        cells.push(cursor);
        cursor = step(cursor);
    }
    cells
}

/// 游戏事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MovePlayed { mark: Mark, row: usize, col: usize },
    GameOver { outcome: Outcome },
}

/// 一个局面：棋盘、轮到谁、AI 已走步数以及缓存的结果。
///
/// `Clone` 会深拷贝棋盘，搜索依赖这一点在副本上推演。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    turn: Mark,
    opponent_move_count: u32,
    #[serde(default)]
    result: Outcome,
    win_length: usize,
}

impl GameState {
    pub fn new(config: GameConfig) -> Result<Self, RuleError> {
        config.validate()?;
        Ok(Self {
            board: Board::new(config.size),
            turn: Mark::Player,
            opponent_move_count: 0,
            result: Outcome::Undecided,
            win_length: config.win_length,
        })
    }

    /// 反序列化得到的状态需先检查尺寸是否自洽。
    pub fn integrity_check(&self) -> Result<(), RuleError> {
        GameConfig {
            size: self.board.size,
            win_length: self.win_length,
        }
        .validate()?;
        let expected = self.board.size.checked_mul(self.board.size);
        if expected != Some(self.board.cells.len()) {
            return Err(RuleError::InvalidState);
        }
        Ok(())
    }

    pub fn with_first_turn(mut self, mark: Mark) -> Self {
        self.turn = mark;
        self
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    pub fn win_length(&self) -> usize {
        self.win_length
    }

    pub fn turn(&self) -> Mark {
        self.turn
    }

    pub fn is_opponent_turn(&self) -> bool {
        self.turn == Mark::Opponent
    }

    pub fn opponent_move_count(&self) -> u32 {
        self.opponent_move_count
    }

    /// 最近一次 `settle` 记录的结果。
    pub fn result(&self) -> Outcome {
        self.result
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Option<Mark>> {
        self.board.get(row, col)
    }

    pub fn filled_count(&self) -> usize {
        self.board.filled_count()
    }

    pub fn score_base(&self) -> i32 {
        self.board.cell_count() as i32
    }

    pub fn apply_move(&mut self, row: usize, col: usize) -> Result<&mut Self, RuleError> {
        self.board.place(row, col, self.turn)?;
        if self.turn == Mark::Opponent {
            self.opponent_move_count += 1;
        }
        self.turn = self.turn.other();
        Ok(self)
    }

    /// 纯查询：不修改缓存的结果。
    pub fn evaluate(&self) -> Outcome {
        if let Some(mark) = self.board.winning_mark(self.win_length) {
            return Outcome::won_by(mark);
        }
        if self.board.is_full() {
            return Outcome::Draw;
        }
        Outcome::Undecided
    }

    /// 评估并记录结果。
    pub fn settle(&mut self) -> Outcome {
        self.result = self.evaluate();
        self.result
    }

    /// 会通过 `settle` 写入 `result`；只读判断请用 `evaluate`。
    pub fn is_terminal(&mut self) -> bool {
        self.settle().is_decided()
    }

    pub fn available_moves(&self) -> Vec<Position> {
        self.board.empty_positions()
    }

    /// 基于已记录的结果计分；未 `settle` 过的局面恒为 0。
    pub fn score(&self) -> i32 {
        self.score_of(self.result)
    }

    pub fn score_of(&self, outcome: Outcome) -> i32 {
        let moves = self.opponent_move_count as i32;
        match outcome {
            Outcome::OpponentWon => self.score_base() - moves,
            Outcome::PlayerWon => -self.score_base() + moves,
            Outcome::Draw | Outcome::Undecided => 0,
        }
    }

    /// 逐行渲染，空格用 `.` 表示。
    pub fn render(&self) -> String {
        let n = self.size();
        let mut out = String::with_capacity(n * (n + 1));
        for row in 0..n {
            for col in 0..n {
                let symbol = match self.board.get(row, col).flatten() {
                    Some(mark) => mark.symbol(),
                    None => '.',
                };
                out.push(symbol);
            }
            out.push('\n');
        }
        out
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            board: Board::new(DEFAULT_BOARD_SIZE),
            turn: Mark::Player,
            opponent_move_count: 0,
            result: Outcome::Undecided,
            win_length: DEFAULT_WIN_LENGTH,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 按顺序交替落子，轮次由状态自己推进。
    pub(crate) fn play_sequence(state: &mut GameState, moves: &[(usize, usize)]) {
        for &(row, col) in moves {
            state.apply_move(row, col).expect("move should be legal");
        }
    }

    fn opponent_first() -> GameState {
        GameState::default().with_first_turn(Mark::Opponent)
    }

    #[test]
    fn player_moves_first_by_default() {
        let state = GameState::default();
        assert_eq!(state.turn(), Mark::Player);
        assert_eq!(state.available_moves().len(), 9);
        assert_eq!(state.result(), Outcome::Undecided);
    }

    #[test]
    fn apply_move_alternates_turns_and_counts_opponent_moves() {
        let mut state = GameState::default();
        state.apply_move(0, 0).expect("player move");
        assert_eq!(state.turn(), Mark::Opponent);
        assert_eq!(state.opponent_move_count(), 0);

        state.apply_move(1, 1).expect("opponent move");
        assert_eq!(state.turn(), Mark::Player);
        assert_eq!(state.opponent_move_count(), 1);
        assert_eq!(state.cell(1, 1), Some(Some(Mark::Opponent)));
    }

    #[test]
    fn occupied_cell_is_rejected() {
        let mut state = GameState::default();
        state.apply_move(2, 2).expect("first move");
        let err = state.apply_move(2, 2).unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidMove {
                row: 2,
                col: 2,
                reason: MoveRejection::Occupied
            }
        );
        assert_eq!(state.turn(), Mark::Opponent, "failed move must not pass the turn");
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut state = GameState::default();
        let err = state.apply_move(3, 0).unwrap_err();
        assert!(matches!(
            err,
            RuleError::InvalidMove {
                reason: MoveRejection::OutOfBounds,
                ..
            }
        ));
        assert_eq!(state.cell(0, 7), None);
        assert_eq!(state.filled_count(), 0);
    }

    #[test]
    fn available_plus_filled_covers_board() {
        let mut state = GameState::default();
        let moves = [(0, 0), (1, 1), (2, 2), (0, 2), (2, 0)];
        for &(row, col) in &moves {
            state.apply_move(row, col).expect("legal move");
            assert_eq!(
                state.available_moves().len() + state.filled_count(),
                9,
                "every cell is either empty or filled"
            );
        }
    }

    #[test]
    fn available_moves_scan_row_major() {
        let mut state = GameState::default();
        play_sequence(&mut state, &[(0, 1), (1, 0)]);
        let moves = state.available_moves();
        assert_eq!(moves[0], Position::new(0, 0));
        assert_eq!(moves[1], Position::new(0, 2));
        assert_eq!(moves[2], Position::new(1, 1));
        assert_eq!(moves.last(), Some(&Position::new(2, 2)));
    }

    #[test]
    fn clone_is_independent_of_original() {
        let mut original = GameState::default();
        original.apply_move(0, 0).expect("move");
        let mut copy = original.clone();

        copy.apply_move(1, 1).expect("move on copy");
        assert_eq!(original.cell(1, 1), Some(None), "original untouched by copy");
        assert_eq!(original.turn(), Mark::Opponent);

        original.apply_move(2, 2).expect("move on original");
        assert_eq!(copy.cell(2, 2), Some(None), "copy untouched by original");
    }

    #[test]
    fn full_board_without_line_is_draw() {
        // O X O
        // O X X
        // X O O
        let mut state = GameState::default();
        play_sequence(
            &mut state,
            &[
                (0, 0),
                (0, 1),
                (0, 2),
                (1, 1),
                (1, 0),
                (1, 2),
                (2, 1),
                (2, 0),
                (2, 2),
            ],
        );
        assert!(state.is_terminal());
        assert_eq!(state.result(), Outcome::Draw);
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn column_row_and_diagonals_are_detected() {
        let mut column = opponent_first();
        play_sequence(&mut column, &[(0, 2), (0, 0), (1, 2), (1, 0), (2, 2)]);
        assert_eq!(column.evaluate(), Outcome::OpponentWon);

        let mut row = GameState::default();
        play_sequence(&mut row, &[(1, 0), (0, 0), (1, 1), (0, 1), (1, 2)]);
        assert_eq!(row.evaluate(), Outcome::PlayerWon);

        let mut main_diagonal = GameState::default();
        play_sequence(&mut main_diagonal, &[(0, 0), (0, 1), (1, 1), (0, 2), (2, 2)]);
        assert_eq!(main_diagonal.evaluate(), Outcome::PlayerWon);

        let mut anti_diagonal = opponent_first();
        play_sequence(&mut anti_diagonal, &[(2, 0), (0, 0), (1, 1), (0, 1), (0, 2)]);
        assert_eq!(anti_diagonal.evaluate(), Outcome::OpponentWon);
    }

    #[test]
    fn evaluate_does_not_touch_cached_result() {
        let mut state = GameState::default();
        play_sequence(&mut state, &[(1, 0), (0, 0), (1, 1), (0, 1), (1, 2)]);
        assert_eq!(state.evaluate(), Outcome::PlayerWon);
        assert_eq!(state.result(), Outcome::Undecided);
        assert_eq!(state.score(), 0, "unsettled states score zero");

        assert_eq!(state.settle(), Outcome::PlayerWon);
        assert_eq!(state.score(), -9 + 2);
    }

    #[test]
    fn faster_opponent_win_scores_higher() {
        let mut quick = opponent_first();
        play_sequence(&mut quick, &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)]);
        assert!(quick.is_terminal());
        assert_eq!(quick.score(), 9 - 3);

        let mut slow = GameState::default();
        play_sequence(
            &mut slow,
            &[(1, 0), (0, 0), (2, 2), (0, 1), (1, 1), (2, 0), (1, 2)],
        );
        assert!(slow.is_terminal());
        assert_eq!(slow.result(), Outcome::PlayerWon);
        assert_eq!(slow.score(), -9 + 3);
    }

    #[test]
    fn undecided_state_is_not_terminal() {
        let mut state = GameState::default();
        state.apply_move(1, 1).expect("move");
        assert!(!state.is_terminal());
        assert_eq!(state.result(), Outcome::Undecided);
    }

    #[test]
    fn larger_board_uses_win_length() {
        let config = GameConfig::new(5, 4).expect("valid config");
        let mut state = GameState::new(config).expect("state");
        assert_eq!(state.score_base(), 25);

        // O on an off-centre anti-diagonal: (4,1) (3,2) (2,3) (1,4)
        play_sequence(
            &mut state,
            &[(4, 1), (0, 0), (3, 2), (0, 1), (2, 3), (0, 2)],
        );
        assert_eq!(state.evaluate(), Outcome::Undecided);
        state.apply_move(1, 4).expect("winning move");
        assert_eq!(state.evaluate(), Outcome::PlayerWon);
    }

    #[test]
    fn run_must_be_contiguous() {
        let config = GameConfig::new(4, 3).expect("valid config");
        let mut state = GameState::new(config).expect("state");
        // row 0: O O X O
        play_sequence(
            &mut state,
            &[(0, 0), (0, 2), (0, 1), (3, 3), (0, 3)],
        );
        assert_eq!(state.evaluate(), Outcome::Undecided);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            GameConfig::new(3, 4),
            Err(RuleError::InvalidConfig { size: 3, win_length: 4 })
        ));
        assert!(GameConfig::new(0, 0).is_err());
        assert!(GameState::new(GameConfig { size: 2, win_length: 0 }).is_err());
    }

    #[test]
    fn integrity_check_catches_mismatched_cells() {
        let json = r#"{"board":{"size":3,"cells":[null,null]},"turn":"player","opponent_move_count":0,"win_length":3}"#;
        let state: GameState = serde_json::from_str(json).expect("json should parse");
        assert_eq!(state.integrity_check(), Err(RuleError::InvalidState));
        assert!(GameState::default().integrity_check().is_ok());
    }

    #[test]
    fn integrity_check_rejects_oversized_board() {
        // size * size 溢出时必须报错而不是 panic 或回绕
        for size in [usize::MAX / 2 + 1, usize::MAX] {
            let json = format!(
                r#"{{"board":{{"size":{size},"cells":[]}},"turn":"player","opponent_move_count":0,"win_length":3}}"#
            );
            let state: GameState = serde_json::from_str(&json).expect("json should parse");
            assert_eq!(state.integrity_check(), Err(RuleError::InvalidState));
        }
    }

    #[test]
    fn mark_other_swaps_sides() {
        assert_eq!(Mark::Player.other(), Mark::Opponent);
        assert_eq!(Mark::Opponent.other(), Mark::Player);

        let mut state = GameState::default().with_first_turn(Mark::Opponent);
        state.apply_move(0, 0).expect("opponent move");
        assert_eq!(state.turn(), Mark::Opponent.other());
        assert_eq!(state.opponent_move_count(), 1);
    }

    #[test]
    fn render_draws_symbols() {
        let mut state = GameState::default();
        play_sequence(&mut state, &[(0, 0), (1, 1)]);
        assert_eq!(state.render(), "O..\n.X.\n...\n");
    }
}
