use shared::{
    BallSnapshot, MoveCommand, PaddleSnapshot, BALL_BASE_SPEED, BALL_SPEED_CAP, CANVAS_HEIGHT,
    CANVAS_WIDTH, PADDLE_HIT_COOLDOWN, PADDLE_SPEED,
};

use crate::board::Board;
use crate::physics::{Rect, Vector2};

pub const BALL_COLOR: &str = "#FFFFFF";
pub const PADDLE_COLORS: [&str; 2] = ["#00CCFF", "#FFCC00"];

/// Gap in pixels between a paddle and the pawn row it guards.
const PADDLE_GAP: f32 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub position: Vector2,
    pub velocity: Vector2,
    pub radius: f32,
    pub speed_cap: f32,
    /// Nominal launch speed, reported to clients.
    pub speed: f32,
    pub special_ready: bool,
    pub special_active: bool,
}

impl Ball {
    /// A stationary ball at the canvas center, sized for `board`.
    pub fn for_board(board: &Board) -> Self {
        let radius = if board.active_cols == 2 {
            (board.cell_size * 0.10).floor().max(3.0)
        } else {
            (board.cell_size * 0.2).floor().max(6.0)
        };

        Ball {
            position: Vector2::new(CANVAS_WIDTH / 2.0, CANVAS_HEIGHT / 2.0),
            velocity: Vector2::ZERO,
            radius,
            speed_cap: BALL_SPEED_CAP,
            speed: BALL_BASE_SPEED,
            special_ready: false,
            special_active: false,
        }
    }

    // Update ball position based on velocity and delta time
    pub fn integrate(&mut self, dt: f32) {
        self.position = self.position.add(&self.velocity.scale(dt));
    }

    pub fn snapshot(&self) -> BallSnapshot {
        BallSnapshot {
            x: self.position.x,
            y: self.position.y,
            dx: self.velocity.x,
            dy: self.velocity.y,
            radius: self.radius,
            color: BALL_COLOR.to_string(),
            speed: self.speed,
            special_ready: self.special_ready,
            special_active: self.special_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    /// Center x, the only coordinate that moves.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub velocity_x: f32,
    pub command: MoveCommand,
    pub color: &'static str,
    /// Simulation time of the last ball deflection.
    pub last_hit_at: Option<f32>,
}

impl Paddle {
    /// Paddle for `side` (0 = top, 1 = bottom), placed just inside that
    /// side's pawn row.
    pub fn for_side(board: &Board, side: usize) -> Self {
        let cell = board.cell_size;
        let (width, height) = if board.active_cols == 2 {
            (cell.floor(), (cell * 0.08).floor().max(3.0))
        } else {
            (cell * 1.75, cell * 0.25)
        };

        let y = if side == 0 {
            board.y + cell * 2.0 + height / 2.0 + PADDLE_GAP
        } else {
            board.y + cell * f32::from(board.rows - 2) - height / 2.0 - PADDLE_GAP
        };

        Paddle {
            x: CANVAS_WIDTH / 2.0,
            y,
            width,
            height,
            speed: PADDLE_SPEED,
            velocity_x: 0.0,
            command: MoveCommand::Stop,
            color: PADDLE_COLORS[side.min(1)],
            last_hit_at: None,
        }
    }

    pub fn apply_command(&mut self, command: MoveCommand) {
        self.command = command;
        self.velocity_x = command.direction() * self.speed;
    }

    /// Moves the paddle and keeps it fully inside `[left, right]`.
    pub fn update(&mut self, dt: f32, left: f32, right: f32) {
        self.x += self.velocity_x * dt;
        let half = self.width / 2.0;
        self.x = self.x.max(left + half).min(right - half);
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(Vector2::new(self.x, self.y), self.width, self.height)
    }

    pub fn can_deflect(&self, now: f32) -> bool {
        self.last_hit_at
            .map_or(true, |last| now - last >= PADDLE_HIT_COOLDOWN)
    }

    pub fn snapshot(&self) -> PaddleSnapshot {
        PaddleSnapshot {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            color: self.color.to_string(),
            speed: self.speed,
            command: self.command,
        }
    }
}
