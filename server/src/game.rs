//! Authoritative simulation: ball, paddles, pieces and the piercing power.
//!
//! [`GameState::update`] advances the match by one fixed step. It never
//! fails; inputs that make no sense for the current phase are ignored.

use log::{debug, info};
use shared::{
    GameOverSnapshot, MoveCommand, PieceColor, PieceType, Trajectory, BALL_BASE_SPEED,
    PIECE_HIT_COOLDOWN,
};

use crate::board::{Board, Piece};
use crate::entity::{Ball, Paddle};
use crate::physics::{Rect, Vector2};
use crate::power::{PowerState, PowerTunables};

/// Vertical speed added per unit of offset when the ball hits a paddle end.
const SIDE_DEFLECTION: f32 = 50.0;
/// Horizontal speed added per unit of offset when the ball hits a paddle face.
const FACE_DEFLECTION: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    AwaitingTrajectory,
    Running,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOver {
    /// 0 = top side, 1 = bottom side.
    pub winner: u8,
    pub king_color: PieceColor,
}

impl GameOver {
    pub fn snapshot(&self) -> GameOverSnapshot {
        GameOverSnapshot {
            winner: self.winner,
            king_color: self.king_color,
        }
    }
}

/// How a trajectory choice becomes the launch velocity. Angles are in
/// degrees, measured in screen space (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchConfig {
    pub base_speed: f32,
    pub left_degrees: f32,
    pub center_degrees: f32,
    pub right_degrees: f32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            base_speed: BALL_BASE_SPEED,
            left_degrees: 225.0,
            center_degrees: 270.0,
            right_degrees: 315.0,
        }
    }
}

impl LaunchConfig {
    pub fn angle_for(&self, trajectory: Trajectory) -> f32 {
        match trajectory {
            Trajectory::Angle(degrees) => degrees,
            Trajectory::Left => self.left_degrees,
            Trajectory::Center => self.center_degrees,
            Trajectory::Right => self.right_degrees,
        }
    }

    pub fn velocity_for(&self, trajectory: Trajectory) -> Vector2 {
        Vector2::from_angle_degrees(self.angle_for(trajectory), self.base_speed)
    }
}

/// Everything the engine consumes for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickCommands {
    /// Index 0 drives the top paddle, index 1 the bottom one.
    pub paddles: [MoveCommand; 2],
    pub trajectory: Option<Trajectory>,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub launched: bool,
    pub wall_hit: bool,
    pub piece_contact: bool,
    pub paddle_hit: bool,
    pub damage_dealt: u32,
    pub pieces_destroyed: u32,
    pub game_over: Option<GameOver>,
}

/// A piece touched by the ball this tick.
#[derive(Debug, Clone, Copy)]
struct Contact {
    index: usize,
    rect: Rect,
    overlap_x: f32,
    overlap_y: f32,
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u32,
    /// Simulation time in seconds, the sum of every `dt` seen.
    pub clock: f32,
    pub board: Board,
    pub ball: Ball,
    pub paddles: [Paddle; 2],
    pub pieces: Vec<Piece>,
    pub power: PowerState,
    pub phase: MatchPhase,
    pub game_over: Option<GameOver>,
    pub launch: LaunchConfig,
}

impl GameState {
    pub fn new(
        board: Board,
        pieces: Vec<Piece>,
        tunables: PowerTunables,
        launch: LaunchConfig,
    ) -> Self {
        let ball = Ball::for_board(&board);
        let paddles = [Paddle::for_side(&board, 0), Paddle::for_side(&board, 1)];

        Self {
            tick: 0,
            clock: 0.0,
            board,
            ball,
            paddles,
            pieces,
            power: PowerState::new(tunables),
            phase: MatchPhase::AwaitingTrajectory,
            game_over: None,
            launch,
        }
    }

    pub fn waiting_trajectory(&self) -> bool {
        self.phase == MatchPhase::AwaitingTrajectory
    }

    pub fn is_over(&self) -> bool {
        self.phase == MatchPhase::GameOver
    }

    pub fn piece(&self, id: u32) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    /// Advances the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32, commands: &TickCommands) -> TickReport {
        let mut report = TickReport::default();
        if self.is_over() {
            return report;
        }

        self.tick += 1;
        self.clock += dt;

        if self.waiting_trajectory() {
            match commands.trajectory {
                Some(trajectory) => {
                    self.accept_trajectory(trajectory);
                    report.launched = true;
                }
                None => {
                    self.move_paddles(dt, &commands.paddles);
                    return report;
                }
            }
        }

        self.move_paddles(dt, &commands.paddles);
        self.ball.integrate(dt);

        report.wall_hit = self.reflect_off_walls();
        if report.wall_hit && self.power.piercing {
            debug!(
                "Piercing shot hit a wall, discarding {} damage",
                self.power.remaining_damage
            );
            self.power.reset_charge();
        }

        self.resolve_piece_collisions(&mut report);

        if let Some(over) = self.remove_destroyed_pieces(&mut report) {
            self.finish(over);
            report.game_over = Some(over);
            self.sync_ball_flags();
            return report;
        }

        report.paddle_hit = self.resolve_paddle_collisions();
        self.ball.velocity = self.ball.velocity.clamp_magnitude(self.ball.speed_cap);
        self.sync_ball_flags();

        report
    }

    fn accept_trajectory(&mut self, trajectory: Trajectory) {
        self.ball.velocity = self.launch.velocity_for(trajectory);
        self.phase = MatchPhase::Running;
        info!(
            "Ball launched: {:?}, velocity=({:.1}, {:.1})",
            trajectory, self.ball.velocity.x, self.ball.velocity.y
        );
    }

    fn move_paddles(&mut self, dt: f32, commands: &[MoveCommand; 2]) {
        let bounds = self.board.bounds();
        for (paddle, &command) in self.paddles.iter_mut().zip(commands) {
            paddle.apply_command(command);
            paddle.update(dt, bounds.left, bounds.right);
        }
    }

    /// Bounces the ball off the four board edges.
    fn reflect_off_walls(&mut self) -> bool {
        let bounds = self.board.bounds();
        let r = self.ball.radius;
        let pos = &mut self.ball.position;
        let vel = &mut self.ball.velocity;
        let mut hit = false;

        if pos.x - r < bounds.left {
            pos.x = bounds.left + r;
            vel.x = -vel.x;
            hit = true;
        }
        if pos.x + r > bounds.right {
            pos.x = bounds.right - r;
            vel.x = -vel.x;
            hit = true;
        }
        if pos.y - r < bounds.top {
            pos.y = bounds.top + r;
            vel.y = -vel.y;
            hit = true;
        }
        if pos.y + r > bounds.bottom {
            pos.y = bounds.bottom - r;
            vel.y = -vel.y;
            hit = true;
        }
        hit
    }

    fn find_contacts(&self) -> Vec<Contact> {
        let center = self.ball.position;
        self.pieces
            .iter()
            .enumerate()
            .filter(|(_, piece)| piece.is_alive())
            .filter_map(|(index, piece)| {
                let rect = self.board.cell_rect(piece.col, piece.row);
                rect.intersects_circle(center, self.ball.radius)
                    .then(|| Contact {
                        index,
                        rect,
                        overlap_x: rect.overlap_x(center),
                        overlap_y: rect.overlap_y(center),
                    })
            })
            .collect()
    }

    fn resolve_piece_collisions(&mut self, report: &mut TickReport) {
        let contacts = self.find_contacts();
        if contacts.is_empty() {
            return;
        }
        report.piece_contact = true;

        let now = self.clock;
        let eligible: Vec<usize> = contacts
            .iter()
            .map(|c| c.index)
            .filter(|&i| self.pieces[i].can_take_hit(now, PIECE_HIT_COOLDOWN))
            .collect();

        if self.power.ready && !eligible.is_empty() {
            info!(
                "Piercing power triggered with {} damage",
                self.power.special_damage
            );
            self.power.begin_piercing();
        }

        let bounce = if self.power.piercing {
            for &i in &eligible {
                if self.power.is_exhausted() {
                    break;
                }
                let piece = &mut self.pieces[i];
                let dealt = self.power.draw(piece.hp);
                piece.take_damage(dealt, now);
                report.damage_dealt += dealt;
            }

            let survivor = contacts.iter().any(|c| self.pieces[c.index].is_alive());
            let bounce = self.power.is_exhausted() || survivor;
            if bounce {
                self.power.reset_charge();
            }
            bounce
        } else {
            for &i in &eligible {
                let dealt = self.pieces[i].take_damage(1, now);
                self.power.record_damage(dealt);
                report.damage_dealt += dealt;
            }
            true
        };

        if bounce {
            self.bounce_off_pieces(&contacts);
        }
    }

    /// Reflects the ball off the union of every touched cell along the axis
    /// with the smaller total overlap.
    fn bounce_off_pieces(&mut self, contacts: &[Contact]) {
        let count = contacts.len() as f32;
        let sum_x: f32 = contacts.iter().map(|c| c.overlap_x).sum();
        let sum_y: f32 = contacts.iter().map(|c| c.overlap_y).sum();
        let avg_x = contacts.iter().map(|c| c.rect.center().x).sum::<f32>() / count;
        let avg_y = contacts.iter().map(|c| c.rect.center().y).sum::<f32>() / count;

        let r = self.ball.radius;
        let ball = &mut self.ball;

        if sum_x < sum_y {
            if ball.position.x < avg_x {
                let leftmost = contacts.iter().map(|c| c.rect.left).fold(f32::INFINITY, f32::min);
                ball.position.x = leftmost - r;
            } else {
                let rightmost = contacts
                    .iter()
                    .map(|c| c.rect.right)
                    .fold(f32::NEG_INFINITY, f32::max);
                ball.position.x = rightmost + r;
            }
            ball.velocity.x = -ball.velocity.x;
        } else {
            if ball.position.y < avg_y {
                let topmost = contacts.iter().map(|c| c.rect.top).fold(f32::INFINITY, f32::min);
                ball.position.y = topmost - r;
            } else {
                let bottommost = contacts
                    .iter()
                    .map(|c| c.rect.bottom)
                    .fold(f32::NEG_INFINITY, f32::max);
                ball.position.y = bottommost + r;
            }
            ball.velocity.y = -ball.velocity.y;
        }
    }

    /// Drops dead pieces. Returns the match result if a king was among them.
    fn remove_destroyed_pieces(&mut self, report: &mut TickReport) -> Option<GameOver> {
        let mut fallen_king = None;
        let mut destroyed = 0;

        self.pieces.retain(|piece| {
            if piece.is_alive() {
                return true;
            }
            destroyed += 1;
            debug!(
                "Destroyed {} {} at ({}, {})",
                piece.color.as_str(),
                piece.kind.symbol(),
                piece.col,
                piece.row
            );
            if piece.kind == PieceType::King && fallen_king.is_none() {
                fallen_king = Some(piece.color);
            }
            false
        });

        report.pieces_destroyed = destroyed;
        fallen_king.map(|king_color| GameOver {
            winner: 1 - king_color.home_side(),
            king_color,
        })
    }

    fn finish(&mut self, over: GameOver) {
        info!(
            "Game over: {} king destroyed, winner side {}",
            over.king_color.as_str(),
            over.winner
        );
        self.phase = MatchPhase::GameOver;
        self.game_over = Some(over);
    }

    /// Deflects the ball off paddles, keeping its speed but adding spin
    /// proportional to where it struck.
    fn resolve_paddle_collisions(&mut self) -> bool {
        let now = self.clock;
        let r = self.ball.radius;
        let mut hit = false;

        for paddle in self.paddles.iter_mut() {
            let rect = paddle.rect();
            let pos = self.ball.position;
            if !rect.intersects_circle(pos, r) || !paddle.can_deflect(now) {
                continue;
            }
            paddle.last_hit_at = Some(now);

            let speed_before = self.ball.velocity.magnitude();
            let vel = &mut self.ball.velocity;

            if rect.overlap_x(pos) < rect.overlap_y(pos) {
                self.ball.position.x = if pos.x < paddle.x {
                    rect.left - r
                } else {
                    rect.right + r
                };
                vel.x = -vel.x;
                let offset = (pos.y - paddle.y) / (paddle.height / 2.0);
                vel.y += offset * SIDE_DEFLECTION;
            } else {
                if pos.y < paddle.y {
                    self.ball.position.y = rect.top - r;
                    vel.y = -vel.y.abs();
                } else {
                    self.ball.position.y = rect.bottom + r;
                    vel.y = vel.y.abs();
                }
                let offset = (pos.x - paddle.x) / (paddle.width / 2.0);
                vel.x += offset * FACE_DEFLECTION;
            }

            if speed_before > 0.0 && vel.magnitude() > 0.0 {
                *vel = vel.with_magnitude(speed_before);
            }
            hit = true;
        }
        hit
    }

    fn sync_ball_flags(&mut self) {
        self.ball.special_ready = self.power.ready;
        self.ball.special_active = self.power.piercing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{build_pieces, HpSnapshot};
    use assert_approx_eq::assert_approx_eq;

    const DT: f32 = 1.0 / 30.0;

    fn piece(id: u32, kind: PieceType, color: PieceColor, col: u8, row: u8, hp: u32) -> Piece {
        Piece {
            id,
            kind,
            color,
            col,
            row,
            hp,
            max_hp: hp,
            last_damaged_at: None,
        }
    }

    fn running_game(pieces: Vec<Piece>, tunables: PowerTunables) -> GameState {
        let mut game = GameState::new(Board::new(8), pieces, tunables, LaunchConfig::default());
        game.phase = MatchPhase::Running;
        game
    }

    fn idle() -> TickCommands {
        TickCommands::default()
    }

    #[test]
    fn test_new_game_waits_for_trajectory() {
        let board = Board::new(8);
        let pieces = build_pieces(&board, &HpSnapshot::default());
        let mut game = GameState::new(board, pieces, PowerTunables::default(), LaunchConfig::default());

        assert!(game.waiting_trajectory());
        let before = game.ball.position;
        let commands = TickCommands {
            paddles: [MoveCommand::Left, MoveCommand::Right],
            trajectory: None,
        };
        game.update(DT, &commands);

        assert_eq!(game.ball.position, before);
        assert!(game.paddles[0].x < 400.0);
        assert!(game.paddles[1].x > 400.0);
        assert!(game.waiting_trajectory());
    }

    #[test]
    fn test_trajectory_labels_and_angles() {
        let launch = LaunchConfig::default();
        assert_eq!(launch.angle_for(Trajectory::Left), 225.0);
        assert_eq!(launch.angle_for(Trajectory::Center), 270.0);
        assert_eq!(launch.angle_for(Trajectory::Right), 315.0);
        assert_eq!(launch.angle_for(Trajectory::Angle(-400.0)), -400.0);

        let v = launch.velocity_for(Trajectory::Center);
        assert_approx_eq!(v.x, 0.0, 1e-3);
        assert_approx_eq!(v.y, -350.0, 1e-3);
    }

    #[test]
    fn test_launch_convention_is_configurable() {
        let launch = LaunchConfig {
            center_degrees: 90.0,
            ..LaunchConfig::default()
        };
        let mut game = GameState::new(Board::new(8), vec![], PowerTunables::default(), launch);
        let report = game.update(
            DT,
            &TickCommands {
                trajectory: Some(Trajectory::Center),
                ..idle()
            },
        );

        assert!(report.launched);
        assert_eq!(game.phase, MatchPhase::Running);
        assert!(game.ball.velocity.y > 0.0);
        assert!(game.ball.position.y > 300.0);
    }

    #[test]
    fn test_trajectory_accepted_once() {
        let mut game = GameState::new(Board::new(8), vec![], PowerTunables::default(), LaunchConfig::default());
        game.update(
            DT,
            &TickCommands {
                trajectory: Some(Trajectory::Angle(0.0)),
                ..idle()
            },
        );
        assert_approx_eq!(game.ball.velocity.x, 350.0, 1e-3);

        game.update(
            DT,
            &TickCommands {
                trajectory: Some(Trajectory::Angle(180.0)),
                ..idle()
            },
        );
        assert!(game.ball.velocity.x > 0.0);
    }

    #[test]
    fn test_wall_reflection() {
        let mut game = running_game(vec![], PowerTunables::default());
        let bounds = game.board.bounds();
        game.ball.position = Vector2::new(bounds.right - 15.0, 300.0);
        game.ball.velocity = Vector2::new(300.0, 0.0);

        let report = game.update(DT, &idle());
        assert!(report.wall_hit);
        assert_approx_eq!(game.ball.position.x, bounds.right - game.ball.radius, 1e-4);
        assert!(game.ball.velocity.x < 0.0);
    }

    #[test]
    fn test_single_piece_destroyed_and_ball_bounces() {
        let pieces = vec![piece(0, PieceType::Pawn, PieceColor::Black, 0, 0, 1)];
        let mut game = running_game(pieces, PowerTunables::default());
        game.ball.position = Vector2::new(155.0, 110.0);
        game.ball.velocity = Vector2::new(0.0, -350.0);

        let report = game.update(DT, &idle());

        assert!(report.piece_contact);
        assert_eq!(report.pieces_destroyed, 1);
        assert!(game.pieces.is_empty());
        assert_approx_eq!(game.ball.velocity.y, 350.0, 1e-3);
        assert_approx_eq!(game.ball.position.y, 90.0 + game.ball.radius, 1e-3);
        assert_eq!(game.power.charge, 1);
    }

    #[test]
    fn test_cooldown_prevents_double_counting() {
        let pieces = vec![piece(0, PieceType::Rook, PieceColor::Black, 3, 3, 5)];
        let mut game = running_game(pieces, PowerTunables::default());
        let rect = game.board.cell_rect(3, 3);
        game.ball.position = rect.center();
        game.ball.velocity = Vector2::ZERO;

        game.update(DT, &idle());
        assert_eq!(game.pieces[0].hp, 4);
        // Sustained overlap inside the cooldown window.
        for _ in 0..3 {
            game.ball.position = rect.center();
            game.update(DT, &idle());
            assert_eq!(game.pieces[0].hp, 4);
        }
        // Four ticks after the first hit the window has passed.
        game.ball.position = rect.center();
        game.update(DT, &idle());
        assert_eq!(game.pieces[0].hp, 3);
    }

    #[test]
    fn test_simultaneous_contacts_all_take_damage() {
        let pieces = vec![
            piece(0, PieceType::Rook, PieceColor::Black, 2, 3, 5),
            piece(1, PieceType::Rook, PieceColor::Black, 3, 3, 5),
        ];
        let mut game = running_game(pieces, PowerTunables::default());
        let left = game.board.cell_rect(2, 3);
        // Ball straddling the shared edge, just below the row.
        game.ball.position = Vector2::new(left.right, left.bottom + 8.0);
        game.ball.velocity = Vector2::new(0.0, -30.0);

        let report = game.update(DT, &idle());

        assert_eq!(report.damage_dealt, 2);
        assert!(game.pieces.iter().all(|p| p.hp == 4));
        assert!(game.ball.velocity.y > 0.0);
        assert_approx_eq!(game.ball.position.y, left.bottom + game.ball.radius, 1e-3);
        assert_eq!(game.power.charge, 2);
    }

    #[test]
    fn test_charge_then_piercing() {
        let tunables = PowerTunables {
            charge_max: 3,
            charge_per_hit: 1,
            special_damage: 5,
        };
        let pieces = vec![
            piece(0, PieceType::King, PieceColor::Black, 0, 3, 10),
            piece(1, PieceType::Pawn, PieceColor::Black, 5, 3, 2),
        ];
        let mut game = running_game(pieces, tunables);
        let king_cell = game.board.cell_rect(0, 3);

        for expected in 1..=3 {
            game.ball.position = king_cell.center();
            game.ball.velocity = Vector2::ZERO;
            game.update(0.2, &idle());
            assert_eq!(game.power.charge, expected);
        }
        assert!(game.power.ready);
        assert!(game.ball.special_ready);
        assert_eq!(game.piece(0).unwrap().hp, 7);

        // Next collision with the pawn enters piercing: the pawn absorbs 2 of
        // the 5 damage, dies, and the ball keeps going.
        let pawn_cell = game.board.cell_rect(5, 3);
        game.ball.position = pawn_cell.center();
        game.ball.velocity = Vector2::new(0.0, -100.0);
        let report = game.update(0.2, &idle());

        assert_eq!(report.damage_dealt, 2);
        assert!(game.piece(1).is_none());
        assert!(game.power.piercing);
        assert!(!game.power.ready);
        assert_eq!(game.power.charge, 0);
        assert_eq!(game.power.remaining_damage, 3);
        assert!(game.ball.special_active);
        assert!(game.ball.velocity.y < 0.0);

        // The king survives the remaining 3 damage, so the ball bounces and
        // the power resets.
        game.ball.position = king_cell.center();
        let report = game.update(0.2, &idle());
        assert_eq!(report.damage_dealt, 3);
        assert_eq!(game.piece(0).unwrap().hp, 4);
        assert!(!game.power.piercing);
        assert_eq!(game.power.remaining_damage, 0);
        assert_eq!(game.power.charge, 0);
    }

    #[test]
    fn test_piercing_shared_pool_across_pieces() {
        let tunables = PowerTunables {
            charge_max: 1,
            charge_per_hit: 1,
            special_damage: 3,
        };
        let pieces = vec![
            piece(0, PieceType::Pawn, PieceColor::White, 2, 4, 2),
            piece(1, PieceType::Pawn, PieceColor::White, 3, 4, 2),
        ];
        let mut game = running_game(pieces, tunables);
        game.power.record_damage(1);
        assert!(game.power.ready);

        let left = game.board.cell_rect(2, 4);
        game.ball.position = Vector2::new(left.right, left.center().y);
        game.ball.velocity = Vector2::ZERO;
        let report = game.update(DT, &idle());

        assert_eq!(report.damage_dealt, 3);
        assert!(report.damage_dealt <= tunables.special_damage);
        // First piece absorbs 2, the second gets the last point and survives.
        assert!(game.piece(0).is_none());
        assert_eq!(game.piece(1).unwrap().hp, 1);
        assert!(!game.power.piercing);
    }

    #[test]
    fn test_piercing_cancelled_by_wall() {
        let mut game = running_game(vec![], PowerTunables::default());
        game.power.record_damage(10);
        game.power.begin_piercing();
        let bounds = game.board.bounds();
        game.ball.position = Vector2::new(bounds.left + 15.0, 300.0);
        game.ball.velocity = Vector2::new(-300.0, 0.0);

        game.update(DT, &idle());

        assert!(!game.power.piercing);
        assert_eq!(game.power.remaining_damage, 0);
        assert_eq!(game.power.charge, 0);
        assert!(!game.ball.special_active);
    }

    #[test]
    fn test_king_destruction_ends_match() {
        let pieces = vec![
            piece(0, PieceType::King, PieceColor::White, 4, 7, 1),
            piece(1, PieceType::Pawn, PieceColor::White, 0, 6, 2),
        ];
        let mut game = running_game(pieces, PowerTunables::default());
        let king_cell = game.board.cell_rect(4, 7);
        game.ball.position = Vector2::new(king_cell.center().x, king_cell.top - 5.0);
        game.ball.velocity = Vector2::new(0.0, 200.0);

        let report = game.update(DT, &idle());

        let over = report.game_over.expect("king destroyed");
        assert_eq!(over.king_color, PieceColor::White);
        assert_eq!(over.winner, 0);
        assert!(game.is_over());

        let frozen_ball = game.ball.clone();
        let frozen_pieces = game.pieces.clone();
        let later = game.update(
            DT,
            &TickCommands {
                paddles: [MoveCommand::Left, MoveCommand::Left],
                trajectory: None,
            },
        );
        assert_eq!(later, TickReport::default());
        assert_eq!(game.ball, frozen_ball);
        assert_eq!(game.pieces, frozen_pieces);
    }

    #[test]
    fn test_black_king_gives_bottom_side_the_win() {
        let pieces = vec![piece(0, PieceType::King, PieceColor::Black, 4, 0, 1)];
        let mut game = running_game(pieces, PowerTunables::default());
        game.ball.position = game.board.cell_rect(4, 0).center();
        let report = game.update(DT, &idle());
        assert_eq!(report.game_over.map(|o| o.winner), Some(1));
    }

    #[test]
    fn test_paddle_face_hit_preserves_speed() {
        let mut game = running_game(vec![], PowerTunables::default());
        let paddle = game.paddles[1].clone();
        game.ball.position = Vector2::new(paddle.x + 30.0, paddle.rect().top - 10.0);
        game.ball.velocity = Vector2::new(0.0, 300.0);

        let report = game.update(DT, &idle());

        assert!(report.paddle_hit);
        assert!(game.ball.velocity.y < 0.0);
        assert!(game.ball.velocity.x > 0.0);
        assert_approx_eq!(game.ball.velocity.magnitude(), 300.0, 1e-2);
        assert_approx_eq!(
            game.ball.position.y,
            paddle.rect().top - game.ball.radius,
            1e-3
        );
    }

    #[test]
    fn test_paddle_side_hit() {
        let mut game = running_game(vec![], PowerTunables::default());
        let rect = game.paddles[0].rect();
        game.ball.position = Vector2::new(rect.left - 10.0, game.paddles[0].y);
        game.ball.velocity = Vector2::new(150.0, 0.0);

        let report = game.update(DT, &idle());

        assert!(report.paddle_hit);
        assert!(game.ball.velocity.x < 0.0);
        assert_approx_eq!(game.ball.velocity.magnitude(), 150.0, 1e-2);
        assert_approx_eq!(game.ball.position.x, rect.left - game.ball.radius, 1e-3);
    }

    #[test]
    fn test_speed_is_capped() {
        let mut game = running_game(vec![], PowerTunables::default());
        game.ball.velocity = Vector2::new(1000.0, 1000.0);
        game.update(1.0 / 1000.0, &idle());
        assert!(game.ball.velocity.magnitude() <= game.ball.speed_cap + 1e-3);
    }

    #[test]
    fn test_charge_invariant_over_long_run() {
        let board = Board::new(8);
        let pieces = build_pieces(&board, &HpSnapshot::default());
        let tunables = PowerTunables {
            charge_max: 4,
            charge_per_hit: 1,
            special_damage: 6,
        };
        let mut game = GameState::new(board, pieces, tunables, LaunchConfig::default());
        game.update(
            DT,
            &TickCommands {
                trajectory: Some(Trajectory::Angle(250.0)),
                ..idle()
            },
        );

        for _ in 0..3000 {
            let report = game.update(DT, &idle());
            assert!(game.power.charge <= game.power.max_charge);
            assert!(game.ball.velocity.magnitude() <= game.ball.speed_cap + 1e-3);
            assert!(game.pieces.iter().all(|p| p.hp > 0));
            // At most four cells touch the ball in normal mode.
            assert!(report.damage_dealt <= tunables.special_damage.max(4));
            if game.is_over() {
                break;
            }
        }
    }
}
