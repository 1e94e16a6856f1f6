//! Headless Snake simulation.
//!
//! The board is a torus of square cells. Positions and velocities are in
//! pixels and always multiples of the cell size. Nothing here touches the
//! canvas; `SnakeGame` reads state for rendering and turns `SnakeEvent`s into
//! sounds and page events.

use std::collections::VecDeque;

use folio_engine::{FrameCounter, Rng};
use glam::IVec2;

/// Lifecycle of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Idle,
    Running,
    Paused,
    Over,
}

impl GameState {
    /// Numeric code sent to the page.
    pub fn code(self) -> u32 {
        match self {
            GameState::Idle => 0,
            GameState::Running => 1,
            GameState::Paused => 2,
            GameState::Over => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::Left | Direction::Right => Axis::Horizontal,
            Direction::Up | Direction::Down => Axis::Vertical,
        }
    }

    pub fn sign(self) -> i32 {
        match self {
            Direction::Left | Direction::Up => -1,
            Direction::Right | Direction::Down => 1,
        }
    }

    /// Velocity for this direction at the given cell size.
    pub fn velocity(self, cell_size: i32) -> IVec2 {
        match self.axis() {
            Axis::Horizontal => IVec2::new(self.sign() * cell_size, 0),
            Axis::Vertical => IVec2::new(0, self.sign() * cell_size),
        }
    }
}

/// Where a new gem may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GemPlacement {
    /// Any cell, chosen per axis. A gem can land under the body.
    Anywhere,
    /// Any cell the snake does not occupy. Falls back to `Anywhere` on a full board.
    AvoidSnake,
}

#[derive(Debug, Clone)]
pub struct SnakeConfig {
    /// Board width in pixels.
    pub board_width: i32,
    /// Board height in pixels.
    pub board_height: i32,
    /// Side of one grid cell in pixels.
    pub cell_size: i32,
    pub start_pos: IVec2,
    pub start_direction: Direction,
    /// Length the snake grows to before it has eaten anything.
    pub initial_max_cells: usize,
    /// Repaint signals per movement step.
    pub frames_per_step: u32,
    pub seed: u64,
    pub gem_placement: GemPlacement,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            board_width: 400,
            board_height: 400,
            cell_size: 16,
            start_pos: IVec2::new(160, 160),
            start_direction: Direction::Right,
            initial_max_cells: 4,
            frames_per_step: 10,
            seed: 0x5eed_cafe,
            gem_placement: GemPlacement::AvoidSnake,
        }
    }
}

impl SnakeConfig {
    /// Number of whole cells along each axis.
    pub fn grid_size(&self) -> IVec2 {
        IVec2::new(
            (self.board_width / self.cell_size).max(1),
            (self.board_height / self.cell_size).max(1),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Snake {
    /// Head position in pixels.
    pub head: IVec2,
    /// One axis is zero, the other is ±cell size.
    pub velocity: IVec2,
    /// Occupied cells, head first.
    cells: VecDeque<IVec2>,
    max_cells: usize,
}

impl Snake {
    fn new(head: IVec2, velocity: IVec2, max_cells: usize) -> Self {
        Self {
            head,
            velocity,
            cells: VecDeque::with_capacity(max_cells + 1),
            max_cells,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &IVec2> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn max_cells(&self) -> usize {
        self.max_cells
    }

    pub fn occupies(&self, pos: IVec2) -> bool {
        self.cells.iter().any(|c| *c == pos)
    }

    /// True when the head cell also appears further down the body.
    fn head_hits_body(&self) -> bool {
        match self.cells.front() {
            Some(head) => self.cells.iter().skip(1).any(|c| c == head),
            None => false,
        }
    }
}

/// Side effects of engine operations, drained by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakeEvent {
    Started,
    Ate { score: u32 },
    Paused,
    Resumed,
    GameOver { score: u32 },
}

pub struct SnakeEngine {
    config: SnakeConfig,
    snake: Snake,
    gem: IVec2,
    state: GameState,
    score: u32,
    rng: Rng,
    frames: FrameCounter,
    events: Vec<SnakeEvent>,
}

impl SnakeEngine {
    pub fn new(config: SnakeConfig) -> Self {
        let snake = Snake::new(
            config.start_pos,
            config.start_direction.velocity(config.cell_size),
            config.initial_max_cells,
        );
        Self {
            rng: Rng::new(config.seed),
            frames: FrameCounter::new(config.frames_per_step),
            gem: IVec2::ZERO,
            snake,
            state: GameState::Idle,
            score: 0,
            events: Vec::new(),
            config,
        }
    }

    /// Start a new game. No-op while a game is in progress (running or paused).
    /// Returns whether a game was started.
    pub fn start(&mut self) -> bool {
        if matches!(self.state, GameState::Running | GameState::Paused) {
            return false;
        }

        self.score = 0;
        self.snake = Snake::new(
            self.config.start_pos,
            self.config.start_direction.velocity(self.config.cell_size),
            self.config.initial_max_cells,
        );
        self.gem = self.random_cell();
        self.frames.reset();
        self.state = GameState::Running;
        self.events.push(SnakeEvent::Started);
        log::info!("snake: game started, gem at ({}, {})", self.gem.x, self.gem.y);
        true
    }

    /// Change heading along `axis` towards `sign` (negative = left/up).
    ///
    /// Accepted only while a game is in progress and the snake is not already
    /// moving along that axis, so it can never reverse into itself. The new
    /// velocity applies to the next step.
    pub fn set_direction(&mut self, axis: Axis, sign: i32) -> bool {
        if !matches!(self.state, GameState::Running | GameState::Paused) || sign == 0 {
            return false;
        }
        let step = sign.signum() * self.config.cell_size;
        let v = &mut self.snake.velocity;
        match axis {
            Axis::Horizontal if v.x == 0 => *v = IVec2::new(step, 0),
            Axis::Vertical if v.y == 0 => *v = IVec2::new(0, step),
            _ => return false,
        }
        true
    }

    pub fn steer(&mut self, direction: Direction) -> bool {
        self.set_direction(direction.axis(), direction.sign())
    }

    /// Flip between running and paused. Returns false in any other state.
    pub fn toggle_pause(&mut self) -> bool {
        match self.state {
            GameState::Running => {
                self.state = GameState::Paused;
                self.events.push(SnakeEvent::Paused);
                log::debug!("snake: paused");
            }
            GameState::Paused => {
                self.state = GameState::Running;
                self.events.push(SnakeEvent::Resumed);
                log::debug!("snake: resumed");
            }
            GameState::Idle | GameState::Over => return false,
        }
        true
    }

    /// One repaint signal. Moves the snake once every `frames_per_step`
    /// signals while running. Returns whether a step happened.
    pub fn tick(&mut self) -> bool {
        if self.state != GameState::Running {
            return false;
        }
        if !self.frames.tick() {
            return false;
        }
        self.step();
        true
    }

    /// Advance the simulation by exactly one movement step.
    pub fn step(&mut self) {
        if self.state != GameState::Running {
            return;
        }

        let head = self.wrap(self.snake.head + self.snake.velocity);
        self.snake.head = head;
        self.snake.cells.push_front(head);
        if self.snake.cells.len() > self.snake.max_cells {
            self.snake.cells.pop_back();
        }

        if head == self.gem {
            self.snake.max_cells += 1;
            self.score += 1;
            self.events.push(SnakeEvent::Ate { score: self.score });
            self.gem = self.next_gem();
        }

        if self.snake.head_hits_body() {
            self.game_over();
        }
    }

    fn game_over(&mut self) {
        self.state = GameState::Over;
        self.events.push(SnakeEvent::GameOver { score: self.score });
        log::info!("snake: game over, score {}", self.score);
    }

    /// Toroidal wrap, each axis independently.
    fn wrap(&self, mut pos: IVec2) -> IVec2 {
        let cell = self.config.cell_size;
        if pos.x < 0 {
            pos.x = self.config.board_width - cell;
        } else if pos.x >= self.config.board_width {
            pos.x = 0;
        }
        if pos.y < 0 {
            pos.y = self.config.board_height - cell;
        } else if pos.y >= self.config.board_height {
            pos.y = 0;
        }
        pos
    }

    fn random_cell(&mut self) -> IVec2 {
        let grid = self.config.grid_size();
        let cell = self.config.cell_size;
        IVec2::new(self.rng.range(0, grid.x) * cell, self.rng.range(0, grid.y) * cell)
    }

    fn next_gem(&mut self) -> IVec2 {
        match self.config.gem_placement {
            GemPlacement::Anywhere => self.random_cell(),
            GemPlacement::AvoidSnake => {
                let grid = self.config.grid_size();
                let cell = self.config.cell_size;
                let free: Vec<IVec2> = (0..grid.y)
                    .flat_map(|y| (0..grid.x).map(move |x| IVec2::new(x * cell, y * cell)))
                    .filter(|pos| !self.snake.occupies(*pos))
                    .collect();
                match self.rng.pick(&free) {
                    Some(pos) => *pos,
                    None => self.random_cell(),
                }
            }
        }
    }

    /// Take the side effects produced since the last call.
    pub fn drain_events(&mut self) -> Vec<SnakeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn gem(&self) -> IVec2 {
        self.gem
    }

    pub fn config(&self) -> &SnakeConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn place_gem(&mut self, pos: IVec2) {
        self.gem = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(config: SnakeConfig) -> SnakeEngine {
        let mut e = SnakeEngine::new(config);
        assert!(e.start());
        // keep the gem out of the way unless a test places it
        e.place_gem(IVec2::new(-100, -100));
        e
    }

    fn default_engine() -> SnakeEngine {
        engine(SnakeConfig::default())
    }

    #[test]
    fn ten_repaints_move_one_cell() {
        let mut e = default_engine();
        for _ in 0..9 {
            assert!(!e.tick());
        }
        assert!(e.tick());
        assert_eq!(e.snake().head, IVec2::new(176, 160));
        assert_eq!(e.snake().len(), 1);
        assert_eq!(e.score(), 0);
    }

    #[test]
    fn ticks_do_nothing_unless_running() {
        let mut e = SnakeEngine::new(SnakeConfig::default());
        for _ in 0..50 {
            assert!(!e.tick());
        }
        assert_eq!(e.state(), GameState::Idle);

        e.start();
        e.toggle_pause();
        for _ in 0..50 {
            assert!(!e.tick());
        }
        assert!(e.snake().is_empty());
    }

    #[test]
    fn start_is_noop_while_running() {
        let mut e = default_engine();
        e.step();
        assert!(!e.start());
        assert_eq!(e.snake().len(), 1);
    }

    #[test]
    fn reversal_is_rejected() {
        let mut e = default_engine();
        // moving right
        assert!(!e.set_direction(Axis::Horizontal, -1));
        assert!(!e.steer(Direction::Right));
        assert_eq!(e.snake().velocity, IVec2::new(16, 0));

        assert!(e.steer(Direction::Up));
        assert_eq!(e.snake().velocity, IVec2::new(0, -16));
        assert!(!e.steer(Direction::Down));
        assert!(e.steer(Direction::Left));
        assert_eq!(e.snake().velocity, IVec2::new(-16, 0));
    }

    #[test]
    fn velocity_never_has_two_axes() {
        let mut e = default_engine();
        let dirs = [Direction::Up, Direction::Left, Direction::Down, Direction::Down, Direction::Right, Direction::Left];
        for d in dirs.iter().cycle().take(40) {
            e.steer(*d);
            let v = e.snake().velocity;
            assert!((v.x == 0) != (v.y == 0), "bad velocity {:?}", v);
            assert_eq!(v.x.abs() + v.y.abs(), 16);
            e.step();
            if e.state() == GameState::Over {
                break;
            }
        }
    }

    #[test]
    fn direction_ignored_before_start() {
        let mut e = SnakeEngine::new(SnakeConfig::default());
        assert!(!e.steer(Direction::Up));
    }

    #[test]
    fn length_tracks_steps_up_to_capacity() {
        let mut e = default_engine();
        for n in 1..=10 {
            e.step();
            assert_eq!(e.snake().len(), n.min(4));
        }
    }

    #[test]
    fn wraps_off_right_edge_to_zero() {
        let mut e = engine(SnakeConfig {
            start_pos: IVec2::new(384, 160),
            ..SnakeConfig::default()
        });
        e.step();
        assert_eq!(e.snake().head, IVec2::new(0, 160));
    }

    #[test]
    fn wraps_off_left_edge_to_last_cell() {
        let mut e = engine(SnakeConfig {
            start_pos: IVec2::new(0, 160),
            start_direction: Direction::Left,
            ..SnakeConfig::default()
        });
        e.step();
        assert_eq!(e.snake().head, IVec2::new(384, 160));
    }

    #[test]
    fn wraps_vertically() {
        let mut e = engine(SnakeConfig {
            start_pos: IVec2::new(160, 0),
            start_direction: Direction::Up,
            ..SnakeConfig::default()
        });
        e.step();
        assert_eq!(e.snake().head, IVec2::new(160, 384));

        let mut e = engine(SnakeConfig {
            start_pos: IVec2::new(160, 384),
            start_direction: Direction::Down,
            ..SnakeConfig::default()
        });
        e.step();
        assert_eq!(e.snake().head, IVec2::new(160, 0));
    }

    #[test]
    fn eating_gem_grows_and_scores() {
        let mut e = default_engine();
        e.place_gem(IVec2::new(208, 160));
        e.drain_events();

        let mut steps = 0;
        while e.score() == 0 && steps < 10 {
            e.step();
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(e.score(), 1);
        assert_eq!(e.snake().max_cells(), 5);
        assert_ne!(e.gem(), IVec2::new(208, 160));
        assert!(!e.snake().occupies(e.gem()));
        assert_eq!(e.drain_events(), vec![SnakeEvent::Ate { score: 1 }]);
    }

    #[test]
    fn n_meals_add_n_cells() {
        let mut e = default_engine();
        for n in 1..=3u32 {
            let ahead = e.snake().head + e.snake().velocity;
            e.place_gem(ahead);
            e.step();
            assert_eq!(e.score(), n);
            assert_eq!(e.snake().max_cells(), 4 + n as usize);
        }
    }

    #[test]
    fn self_collision_ends_game() {
        let mut e = engine(SnakeConfig {
            initial_max_cells: 5,
            ..SnakeConfig::default()
        });
        e.step();
        e.steer(Direction::Down);
        e.step();
        e.steer(Direction::Left);
        e.step();
        e.steer(Direction::Up);
        e.step();
        e.steer(Direction::Right);
        e.drain_events();
        e.step();

        assert_eq!(e.state(), GameState::Over);
        assert_eq!(e.drain_events(), vec![SnakeEvent::GameOver { score: 0 }]);

        let head = e.snake().head;
        for _ in 0..30 {
            assert!(!e.tick());
        }
        assert_eq!(e.snake().head, head);

        assert!(e.start());
        assert_eq!(e.state(), GameState::Running);
        assert!(e.snake().is_empty());
    }

    #[test]
    fn short_snake_chases_its_tail_safely() {
        let mut e = default_engine();
        for d in [Direction::Down, Direction::Left, Direction::Up, Direction::Right] {
            e.step();
            e.steer(d);
        }
        e.step();
        assert_eq!(e.state(), GameState::Running);
    }

    #[test]
    fn pause_toggles_only_during_a_game() {
        let mut e = SnakeEngine::new(SnakeConfig::default());
        assert!(!e.toggle_pause());
        e.start();
        assert!(e.toggle_pause());
        assert_eq!(e.state(), GameState::Paused);
        assert!(e.toggle_pause());
        assert_eq!(e.state(), GameState::Running);
        let events = e.drain_events();
        assert_eq!(events, vec![SnakeEvent::Started, SnakeEvent::Paused, SnakeEvent::Resumed]);
    }

    #[test]
    fn anywhere_placement_stays_on_grid() {
        let mut e = engine(SnakeConfig {
            gem_placement: GemPlacement::Anywhere,
            ..SnakeConfig::default()
        });
        for _ in 0..50 {
            let ahead = e.snake().head + e.snake().velocity;
            e.place_gem(e.wrap(ahead));
            e.step();
            let gem = e.gem();
            assert_eq!(gem.x % 16, 0);
            assert_eq!(gem.y % 16, 0);
            assert!(gem.x >= 0 && gem.x < 400 && gem.y >= 0 && gem.y < 400);
            if e.state() == GameState::Over {
                break;
            }
        }
    }

    #[test]
    fn seed_decides_the_first_gem() {
        let first_gem = |seed: u64| {
            let mut e = SnakeEngine::new(SnakeConfig { seed, ..SnakeConfig::default() });
            e.start();
            e.gem()
        };
        assert_eq!(first_gem(7), first_gem(7));
        assert_ne!(first_gem(1), first_gem(2));
    }
}
