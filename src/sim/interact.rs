//! Interaction resolver
//!
//! Runs once per tick after every entity has moved. Score, coins and cues are
//! accumulated into `Effects` and folded into the game state by the caller.

use glam::Vec2;
use rand::Rng;

use super::collision::Aabb;
use super::enemy::{Enemy, EnemyKind, HitOutcome, StompOutcome};
use super::items::{CoinPop, Particle, ParticleKind, PowerUp, PowerUpKind, Projectile};
use super::player::{DamageOutcome, Player};
use super::state::StageSession;
use super::tile::{BumpOutcome, TileCoord};
use crate::audio::SoundCue;
use crate::consts::*;

/// Side effects of one tick, applied to the game state afterwards
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub score: u64,
    pub coins: u32,
    /// Extra lives from hidden blocks (coin lives are counted by the state)
    pub lives: u8,
    pub cues: Vec<SoundCue>,
}

impl Effects {
    pub fn cue(&mut self, cue: SoundCue) {
        self.cues.push(cue);
    }

    fn award(&mut self, points: u64) {
        self.score += points;
    }
}

/// How the player's box meets an enemy this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    None,
    Stomp,
    Side,
}

/// Stomp needs downward motion and feet no lower than the target's center
/// plus tolerance. Hazards only ever take side contact.
pub fn classify(player: &Aabb, player_vy: f32, enemy: &Enemy) -> Contact {
    let target = enemy.bounds();
    if !player.overlaps(&target) {
        Contact::None
    } else if !enemy.is_hazard()
        && player_vy > 0.0
        && player.bottom() <= target.center().y + STOMP_TOLERANCE
    {
        Contact::Stomp
    } else {
        Contact::Side
    }
}

/// Apply the bump-from-below contract at `at` and spawn its results
pub fn apply_bump(session: &mut StageSession, at: TileCoord, fx: &mut Effects) {
    let big = session.player.is_big();
    match session.grid.bump(at, big) {
        BumpOutcome::Coin => {
            session.coin_pops.push(CoinPop::from_tile(at));
            fx.award(SCORE_COIN);
            fx.coins += 1;
            fx.cue(SoundCue::Coin);
        }
        BumpOutcome::PowerUp => {
            let kind = if big {
                PowerUpKind::Flower
            } else {
                PowerUpKind::Mushroom
            };
            session.powerups.push(PowerUp::from_tile(kind, at));
            fx.cue(SoundCue::Coin);
        }
        BumpOutcome::Star => {
            session.powerups.push(PowerUp::from_tile(PowerUpKind::Star, at));
            fx.cue(SoundCue::Coin);
        }
        BumpOutcome::BrickBroken => {
            let at_px = Vec2::new(at.col as f32 * TILE + TILE * 0.5, at.row as f32 * TILE);
            session
                .particles
                .extend(Particle::burst(ParticleKind::Brick, at_px, 6, &mut session.rng));
            fx.award(SCORE_BRICK);
            fx.cue(SoundCue::BrickBreak);
        }
        BumpOutcome::OneUp => {
            fx.lives += 1;
            fx.cue(SoundCue::OneUp);
        }
        BumpOutcome::BrickBumped => fx.cue(SoundCue::BrickBreak),
        BumpOutcome::Inert => {}
    }
}

/// Run every interaction rule once, in a fixed order
pub fn resolve(session: &mut StageSession, fx: &mut Effects) {
    player_vs_powerups(session, fx);
    fireballs_vs_enemies(session, fx);
    shots_vs_player(session, fx);
    shells_vs_enemies(session, fx);
    player_vs_enemies(session, fx);
    player_vs_flagpole(session, fx);
}

fn debris<R: Rng>(particles: &mut Vec<Particle>, enemy: &Enemy, count: usize, rng: &mut R) {
    particles.extend(Particle::burst(
        ParticleKind::Enemy,
        enemy.bounds().center(),
        count,
        rng,
    ));
}

fn player_damaged(player: &mut Player, fx: &mut Effects) {
    if player.damage() == DamageOutcome::Died {
        fx.cue(SoundCue::Death);
    }
}

/// Score and cue for a projectile hit or Starred contact
fn hit_enemy<R: Rng>(
    enemy: &mut Enemy,
    from_contact: bool,
    particles: &mut Vec<Particle>,
    rng: &mut R,
    fx: &mut Effects,
) {
    match enemy.hit(from_contact) {
        HitOutcome::Killed => {
            fx.award(SCORE_CONTACT_KILL);
            debris(particles, enemy, 1, rng);
        }
        HitOutcome::BossHurt { hp_left } => {
            log::debug!("Boss hit, {} hp left", hp_left);
            fx.cue(SoundCue::BossHit);
        }
        HitOutcome::BossDefeated => {
            log::info!("Boss defeated");
            fx.award(SCORE_BOSS);
            fx.cue(SoundCue::BossHit);
        }
        HitOutcome::Immune => {}
    }
}

fn player_vs_powerups(session: &mut StageSession, fx: &mut Effects) {
    let StageSession {
        player, powerups, ..
    } = session;
    if player.dead {
        return;
    }
    let pb = player.body.bounds();
    for pu in powerups.iter_mut().filter(|p| p.alive) {
        if !pb.overlaps(&pu.bounds()) {
            continue;
        }
        pu.alive = false;
        player.give(pu.kind);
        fx.award(SCORE_POWERUP);
        fx.cue(match pu.kind {
            PowerUpKind::Star => SoundCue::Star,
            _ => SoundCue::PowerUp,
        });
    }
}

fn fireballs_vs_enemies(session: &mut StageSession, fx: &mut Effects) {
    let StageSession {
        projectiles,
        enemies,
        particles,
        rng,
        ..
    } = session;
    for shot in projectiles.iter_mut().filter(|p| p.alive && !p.is_hostile()) {
        let sb = shot.bounds();
        let target = enemies
            .iter_mut()
            .find(|e| e.alive && e.takes_projectile_hits() && sb.overlaps(&e.bounds()));
        if let Some(enemy) = target {
            hit_enemy(enemy, false, particles, rng, fx);
            shot.alive = false;
        }
    }
}

fn shots_vs_player(session: &mut StageSession, fx: &mut Effects) {
    let StageSession {
        projectiles,
        player,
        flagpole,
        ..
    } = session;
    // The flagpole sequence is scripted; nothing can hurt the player during it
    if player.dead || flagpole.sliding {
        return;
    }
    for shot in projectiles.iter_mut().filter(|p| p.alive && p.is_hostile()) {
        if player.body.bounds().overlaps(&shot.bounds()) {
            shot.alive = false;
            player_damaged(player, fx);
        }
    }
}

/// Sliding shells flatten any walker in their path
fn shells_vs_enemies(session: &mut StageSession, fx: &mut Effects) {
    let StageSession {
        enemies,
        particles,
        rng,
        ..
    } = session;
    let shells: Vec<(usize, Aabb)> = enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.alive && e.is_moving_shell())
        .map(|(i, e)| (i, e.bounds()))
        .collect();
    for (shell, sb) in shells {
        for (i, enemy) in enemies.iter_mut().enumerate() {
            if i == shell || !enemy.alive || enemy.is_hazard() || !sb.overlaps(&enemy.bounds()) {
                continue;
            }
            enemy.kill();
            debris(particles, enemy, 4, rng);
            fx.award(SCORE_CONTACT_KILL);
            fx.cue(SoundCue::Stomp);
        }
    }
}

/// Exactly one rule per overlapping pair: stomp or side contact
fn player_vs_enemies(session: &mut StageSession, fx: &mut Effects) {
    let StageSession {
        player,
        enemies,
        particles,
        rng,
        flagpole,
        ..
    } = session;
    if player.dead || flagpole.sliding {
        return;
    }
    // Classify against the pre-rebound state so simultaneous stomps all count
    let pb = player.body.bounds();
    let vy = player.body.vel.y;
    let mut rebound = false;

    for enemy in enemies.iter_mut().filter(|e| e.alive) {
        if enemy.in_kick_grace() {
            continue;
        }
        match classify(&pb, vy, enemy) {
            Contact::None => {}
            Contact::Stomp => {
                let Some(outcome) = enemy.stomp(pb.center().x) else {
                    continue;
                };
                rebound = true;
                match outcome {
                    StompOutcome::Killed => {
                        let points = if matches!(enemy.kind, EnemyKind::HammerBro { .. }) {
                            SCORE_HAMMER_BRO_STOMP
                        } else {
                            SCORE_STOMP
                        };
                        fx.award(points);
                        debris(particles, enemy, 4, rng);
                        fx.cue(SoundCue::Stomp);
                    }
                    StompOutcome::Shelled => {
                        fx.award(SCORE_STOMP);
                        fx.cue(SoundCue::Stomp);
                    }
                    StompOutcome::Kicked => fx.cue(SoundCue::Kick),
                    StompOutcome::Stopped => fx.cue(SoundCue::Stomp),
                }
            }
            Contact::Side => {
                if player.is_starred() {
                    hit_enemy(enemy, true, particles, rng, fx);
                } else if player.is_vulnerable() {
                    player_damaged(player, fx);
                    if player.dead {
                        break;
                    }
                }
            }
        }
    }

    // A stomp earlier in the pass must not cancel the death impulse
    if rebound && !player.dead {
        player.body.vel.y = STOMP_REBOUND;
        player.body.on_ground = false;
    }
}

fn player_vs_flagpole(session: &mut StageSession, fx: &mut Effects) {
    let StageSession {
        player, flagpole, ..
    } = session;
    if let Some(bonus) = flagpole.try_grab(player) {
        fx.award(bonus);
        fx.cue(SoundCue::Flagpole);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::enemy::{ENEMY_SIZE, KoopaState};
    use crate::sim::items::ProjectileKind;
    use crate::sim::level::{LevelType, StageKey};
    use crate::sim::player::PowerTier;
    use crate::sim::tile::{TileGrid, TileKind};

    const FLOOR: f32 = (GRID_ROWS as f32 - 2.0) * TILE;

    fn session_with(enemies: Vec<Enemy>) -> StageSession {
        let mut grid = TileGrid::new(60, GRID_ROWS);
        for col in 0..60 {
            grid.set(col, GRID_ROWS as i32 - 1, TileKind::Ground);
            grid.set(col, GRID_ROWS as i32 - 2, TileKind::Ground);
        }
        let key = StageKey::new(1, 1).unwrap();
        StageSession::with_grid(key, LevelType::Overworld, grid, enemies, 400.0)
    }

    /// Put the player so its feet are `feet` px down and its left edge at `x`
    fn place_player(s: &mut StageSession, x: f32, feet: f32, vy: f32) {
        s.player.body.pos = Vec2::new(x, feet - s.player.body.size.y);
        s.player.body.vel = Vec2::new(0.0, vy);
    }

    fn walker_top() -> f32 {
        FLOOR - ENEMY_SIZE
    }

    #[test]
    fn test_scenario_stomp_koopa_into_shell() {
        let mut s = session_with(vec![Enemy::koopa(1, 400.0, walker_top())]);
        // Feet just into the koopa's top half
        place_player(&mut s, 401.0, walker_top() + 6.0, 3.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);

        let koopa = &s.enemies[0];
        assert!(koopa.alive);
        match &koopa.kind {
            EnemyKind::Koopa { walker, state } => {
                assert_eq!(*state, KoopaState::Shell { speed: 0.0, kick_grace: 0 });
                assert_eq!(walker.speed, 0.0);
                assert_eq!(walker.body.vel.x, 0.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fx.score, SCORE_STOMP);
        assert_eq!(s.player.body.vel.y, STOMP_REBOUND);
        assert!(!s.player.dead);
        assert_eq!(s.player.tier, PowerTier::Small);
    }

    #[test]
    fn test_side_contact_damages() {
        let mut s = session_with(vec![Enemy::goomba(1, 400.0, walker_top())]);
        s.player.tier = PowerTier::Super;
        place_player(&mut s, 380.0, FLOOR, 0.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert_eq!(s.player.tier, PowerTier::Small);
        assert!(s.player.is_invincible());
        assert!(s.enemies[0].alive);
        assert_eq!(fx.score, 0);

        // Grace window: the same overlap next tick is harmless
        resolve(&mut s, &mut fx);
        assert!(!s.player.dead);
    }

    #[test]
    fn test_hammer_bro_stomp_score() {
        let mut s = session_with(vec![Enemy::hammer_bro(1, 400.0, walker_top())]);
        place_player(&mut s, 401.0, walker_top() + 4.0, 2.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(!s.enemies[0].alive);
        assert_eq!(fx.score, SCORE_HAMMER_BRO_STOMP);
        assert!(fx.cues.contains(&SoundCue::Stomp));
    }

    #[test]
    fn test_double_stomp_single_rebound() {
        let mut s = session_with(vec![
            Enemy::goomba(1, 400.0, walker_top()),
            Enemy::goomba(2, 420.0, walker_top()),
        ]);
        place_player(&mut s, 405.0, walker_top() + 5.0, 4.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(s.enemies.iter().all(|e| !e.alive));
        assert_eq!(fx.score, 2 * SCORE_STOMP);
        assert!(!s.player.dead);
    }

    #[test]
    fn test_death_keeps_impulse_after_earlier_stomp() {
        let bar_y = walker_top() - 8.0;
        let mut s = session_with(vec![
            Enemy::goomba(1, 400.0, walker_top()),
            Enemy::firebar(2, Vec2::new(410.0, bar_y), 0.0, 0.0, 2.0),
        ]);
        place_player(&mut s, 401.0, walker_top() + 6.0, 3.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(!s.enemies[0].alive);
        assert!(s.player.dead);
        assert_eq!(s.player.body.vel.y, DEATH_IMPULSE);
        assert_eq!(fx.cues, vec![SoundCue::Stomp, SoundCue::Death]);
    }

    #[test]
    fn test_no_damage_during_flagpole_sequence() {
        let mut s = session_with(vec![Enemy::goomba(1, 400.0, walker_top())]);
        place_player(&mut s, 380.0, FLOOR, 0.0);
        s.projectiles.push(Projectile::hammer(385.0, FLOOR - 20.0, 1.0));
        s.flagpole.sliding = true;
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(!s.player.dead);
        assert!(s.projectiles[0].alive);
        assert!(fx.cues.is_empty());
    }

    #[test]
    fn test_kick_grace_then_shell_hurts() {
        let mut koopa = Enemy::koopa(1, 400.0, walker_top());
        koopa.stomp(0.0);
        let mut s = session_with(vec![koopa]);
        place_player(&mut s, 380.0, walker_top() + 4.0, 2.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(s.enemies[0].is_moving_shell());
        assert_eq!(fx.cues, vec![SoundCue::Kick]);

        // Still overlapping on the next tick: grace keeps the player safe
        s.player.body.vel.y = 0.0;
        resolve(&mut s, &mut fx);
        assert!(!s.player.dead);
    }

    #[test]
    fn test_scenario_starred_boss_contact() {
        let top = FLOOR - crate::sim::enemy::BOSS_SIZE;
        let mut s = session_with(vec![Enemy::boss(1, 400.0, top, (0.0, 2400.0))]);
        s.player.star_timer = STAR_TICKS;
        place_player(&mut s, 380.0, FLOOR, 0.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert_eq!(s.enemies[0].hp(), Some(BOSS_HP - 1));
        assert!(s.enemies[0].alive);
        assert!(!s.player.dead);
        assert_eq!(fx.cues, vec![SoundCue::BossHit]);

        // Overlap persists into the next tick: still exactly one hit point lost
        resolve(&mut s, &mut fx);
        assert_eq!(s.enemies[0].hp(), Some(BOSS_HP - 1));
    }

    #[test]
    fn test_boss_contact_damages_unstarred() {
        let top = FLOOR - crate::sim::enemy::BOSS_SIZE;
        let mut s = session_with(vec![Enemy::boss(1, 400.0, top, (0.0, 2400.0))]);
        // Falling onto the boss is still side contact
        place_player(&mut s, 420.0, top + 5.0, 5.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(s.player.dead);
        assert_eq!(s.enemies[0].hp(), Some(BOSS_HP));
        assert_eq!(fx.cues, vec![SoundCue::Death]);
    }

    #[test]
    fn test_starred_firebar_contact_is_harmless() {
        let bar = Enemy::firebar(1, Vec2::new(400.0, 400.0), 0.0, 0.0, 2.0);
        let mut s = session_with(vec![bar]);
        s.player.star_timer = STAR_TICKS;
        place_player(&mut s, 380.0, 420.0, 0.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(s.enemies[0].alive);
        assert!(!s.player.dead);
        assert_eq!(fx.score, 0);

        s.player.star_timer = 0;
        resolve(&mut s, &mut fx);
        assert!(s.player.dead);
    }

    #[test]
    fn test_fireball_kills_and_is_consumed() {
        let mut s = session_with(vec![
            Enemy::firebar(1, Vec2::new(410.0, 500.0), 0.0, 0.0, 2.0),
            Enemy::goomba(2, 400.0, walker_top()),
        ]);
        s.projectiles.push(Projectile::fireball(405.0, 495.0, 1.0));
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(s.enemies[0].alive, "firebar is immune");
        assert!(!s.enemies[1].alive);
        assert!(!s.projectiles[0].alive);
        assert_eq!(fx.score, SCORE_CONTACT_KILL);
    }

    #[test]
    fn test_fireball_hurts_boss() {
        let top = FLOOR - crate::sim::enemy::BOSS_SIZE;
        let mut s = session_with(vec![Enemy::boss(1, 400.0, top, (0.0, 2400.0))]);
        for _ in 0..BOSS_HP {
            s.projectiles.push(Projectile::fireball(420.0, top + 20.0, 1.0));
        }
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(!s.enemies[0].alive);
        assert_eq!(fx.score, SCORE_BOSS);
        assert!(s.projectiles.iter().all(|p| !p.alive));
    }

    #[test]
    fn test_hostile_shot_hits_player() {
        let mut s = session_with(Vec::new());
        place_player(&mut s, 100.0, FLOOR, 0.0);
        let mut hammer = Projectile::hammer(110.0, FLOOR - 20.0, 1.0);
        assert_eq!(hammer.kind, ProjectileKind::Hammer);
        hammer.body.vel = Vec2::ZERO;
        s.projectiles.push(hammer);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(s.player.dead);
        assert!(!s.projectiles[0].alive);
    }

    #[test]
    fn test_moving_shell_kills_walkers() {
        let mut shell = Enemy::koopa(1, 300.0, walker_top());
        shell.stomp(0.0);
        shell.stomp(0.0);
        let mut s = session_with(vec![shell, Enemy::goomba(2, 320.0, walker_top())]);
        place_player(&mut s, 40.0, FLOOR, 0.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert!(s.enemies[0].alive);
        assert!(!s.enemies[1].alive);
        assert_eq!(fx.score, SCORE_CONTACT_KILL);
    }

    #[test]
    fn test_pickup_applies_and_scores() {
        let mut s = session_with(Vec::new());
        place_player(&mut s, 200.0, FLOOR, 0.0);
        let mut pu = PowerUp::from_tile(PowerUpKind::Mushroom, TileCoord::new(5, 12));
        pu.emerging = false;
        s.powerups.push(pu);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert_eq!(s.player.tier, PowerTier::Super);
        assert!(!s.powerups[0].alive);
        assert_eq!(fx.score, SCORE_POWERUP);
        assert_eq!(fx.cues, vec![SoundCue::PowerUp]);
    }

    #[test]
    fn test_scenario_flagpole_bonus_extremes() {
        let mut s = session_with(Vec::new());
        let pole_x = s.flagpole.x;
        let top = s.flagpole.top;
        let h = s.player.body.size.y;
        place_player(&mut s, pole_x - 20.0, top + h, 0.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert_eq!(fx.score, FLAG_MAX_BONUS);
        assert!(s.flagpole.sliding);
        assert_eq!(fx.cues, vec![SoundCue::Flagpole]);

        let mut s = session_with(Vec::new());
        let bottom = s.flagpole.bottom;
        place_player(&mut s, pole_x - 20.0, bottom, 0.0);
        let mut fx = Effects::default();
        resolve(&mut s, &mut fx);
        assert_eq!(fx.score, FLAG_MIN_BONUS);

        // Already sliding: no second bonus
        resolve(&mut s, &mut fx);
        assert_eq!(fx.score, FLAG_MIN_BONUS);
    }

    #[test]
    fn test_bump_effects() {
        let mut s = session_with(Vec::new());
        let coin = TileCoord::new(5, 8);
        let question = TileCoord::new(6, 8);
        let brick = TileCoord::new(7, 8);
        s.grid.set(coin.col, coin.row, TileKind::CoinBlock);
        s.grid.set(question.col, question.row, TileKind::Question);
        s.grid.set(brick.col, brick.row, TileKind::Brick);

        let mut fx = Effects::default();
        apply_bump(&mut s, coin, &mut fx);
        assert_eq!((fx.score, fx.coins), (SCORE_COIN, 1));
        assert_eq!(s.coin_pops.len(), 1);

        s.player.tier = PowerTier::Super;
        apply_bump(&mut s, question, &mut fx);
        assert_eq!(s.powerups[0].kind, PowerUpKind::Flower);

        apply_bump(&mut s, brick, &mut fx);
        assert_eq!(s.grid.get(brick.col, brick.row), TileKind::Air);
        assert_eq!(s.particles.len(), 6);
        assert_eq!(fx.score, SCORE_COIN + SCORE_BRICK);
        assert_eq!(
            fx.cues,
            vec![SoundCue::Coin, SoundCue::Coin, SoundCue::BrickBreak]
        );

        let hidden = TileCoord::new(8, 8);
        s.grid.set(hidden.col, hidden.row, TileKind::HiddenOneUp);
        apply_bump(&mut s, hidden, &mut fx);
        assert_eq!(fx.lives, 1);
        assert_eq!(fx.cues.last(), Some(&SoundCue::OneUp));
        assert_eq!(s.grid.get(hidden.col, hidden.row), TileKind::Used);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn stomp_xor_side(dx in -40.0f32..40.0, feet in -20.0f32..60.0, vy in -8.0f32..8.0) {
                let mut s = session_with(vec![Enemy::goomba(1, 400.0, walker_top())]);
                place_player(&mut s, 400.0 + dx, walker_top() + feet, vy);
                let overlapping = s.player.body.bounds().overlaps(&s.enemies[0].bounds());
                let mut fx = Effects::default();
                resolve(&mut s, &mut fx);

                let stomped = !s.enemies[0].alive;
                let hurt = s.player.dead;
                prop_assert!(!(stomped && hurt), "both rules fired");
                prop_assert_eq!(overlapping, stomped || hurt);
            }
        }
    }
}
