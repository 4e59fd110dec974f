use super::*;
use crate::foundation::core::WorldPos;
use crate::timeline::record::{
    BombSnapshot, BombState, KillRecord, MatchRecording, PlayerId, PlayerSnapshot,
    ProjectileSnapshot, Team, TickRecord, UtilityDetonation, UtilityKind, WeaponId,
};

fn snap(player: u32, team: Team, x: f64, alive: bool) -> PlayerSnapshot {
    PlayerSnapshot {
        player: PlayerId(player),
        name: format!("p{player}"),
        team,
        position: WorldPos::new(x, 0.0, 0.0),
        yaw: 90.0,
        pitch: 0.0,
        alive,
        health: if alive { 100 } else { 0 },
        flash: 0.0,
        weapon: WeaponId(7),
    }
}

fn fixture() -> FrameResolver {
    let mut ticks: Vec<TickRecord> = (0..2000u64)
        .map(|i| TickRecord {
            tick: Tick(i),
            time: i as f64 / 64.0,
            players: Vec::new(),
            utility: Vec::new(),
            kills: Vec::new(),
            bomb: None,
            projectiles: Vec::new(),
        })
        .collect();
    ticks[0].players = vec![snap(2, Team::T, 0.0, true), snap(1, Team::Ct, 0.0, true)];
    ticks[400].players = vec![snap(2, Team::T, 5.0, true)];
    ticks[500].players = vec![snap(2, Team::T, 5.0, false)];
    ticks[100].utility = vec![UtilityDetonation {
        kind: UtilityKind::Smoke,
        origin: WorldPos::new(10.0, 20.0, 0.0),
        thrower: Some(PlayerId(1)),
    }];
    ticks[500].kills = vec![KillRecord {
        killer: Some(PlayerId(1)),
        victim: PlayerId(2),
        weapon: WeaponId(7),
        headshot: false,
    }];
    ticks[0].bomb = Some(BombSnapshot {
        state: BombState::Carried,
        position: WorldPos::new(0.0, 0.0, 0.0),
        carrier: Some(PlayerId(2)),
    });
    ticks[500].bomb = Some(BombSnapshot {
        state: BombState::Dropped,
        position: WorldPos::new(5.0, 0.0, 0.0),
        carrier: None,
    });
    // Entity 7 flies as a flash, then gets recycled for a smoke.
    for i in 200..210 {
        ticks[i].projectiles = vec![grenade(7, UtilityKind::Flash, i as f64)];
    }
    for i in 215..220 {
        ticks[i].projectiles = vec![grenade(7, UtilityKind::Smoke, -(i as f64))];
    }
    let rec = MatchRecording {
        map: "de_dust2".to_owned(),
        ticks,
        rounds: Vec::new(),
    };
    let index = TimelineIndex::from_recording(&rec).unwrap();
    FrameResolver::new(Arc::new(index), ResolverConfig::default())
}

fn grenade(id: u32, kind: UtilityKind, x: f64) -> ProjectileSnapshot {
    ProjectileSnapshot {
        id,
        kind,
        position: WorldPos::new(x, 0.0, 0.0),
        thrower: Some(PlayerId(1)),
    }
}

#[test]
fn resolving_twice_gives_equal_frames() {
    let r = fixture();
    for t in [0, 99, 100, 450, 500, 596, 1999] {
        assert_eq!(r.resolve(Tick(t)), r.resolve(Tick(t)), "tick {t}");
    }
}

#[test]
fn players_are_ordered_and_carry_staleness() {
    let r = fixture();
    let f = r.resolve(Tick(450));
    let ids: Vec<u32> = f.players().iter().map(|p| p.player.0).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(f.players()[0].staleness, 450);
    assert_eq!(f.players()[1].staleness, 50);
    assert_eq!(f.players()[1].position.x, 5.0);
    assert_eq!(f.alive_count(Team::T), 1);

    let after = r.resolve(Tick(501));
    assert_eq!(after.alive_count(Team::T), 0);
    assert_eq!(after.alive_count(Team::Ct), 1);
}

#[test]
fn utility_fades_over_its_lifetime() {
    let r = fixture();
    assert!(r.resolve(Tick(99)).utility().is_empty());

    let f = r.resolve(Tick(100));
    assert_eq!(f.utility().len(), 1);
    assert_eq!(f.utility()[0].age, 0);
    assert_eq!(f.utility()[0].remaining, 1.0);

    // Smoke lives 1152 ticks; halfway is 576 ticks in.
    let mid = r.resolve(Tick(676));
    assert!((mid.utility()[0].remaining - 0.5).abs() < 1e-9);
    assert!(r.resolve(Tick(1252)).utility().is_empty());
}

#[test]
fn kill_markers_fade_and_anchor_to_victim() {
    let r = fixture();
    assert_eq!(r.kill_window_ticks(), 192);
    assert!(r.resolve(Tick(499)).kills().is_empty());

    let f = r.resolve(Tick(500));
    assert_eq!(f.kills().len(), 1);
    assert_eq!(f.kills()[0].opacity, 1.0);
    assert_eq!(f.kills()[0].position.map(|p| p.x), Some(5.0));

    let half = r.resolve(Tick(596));
    assert!((half.kills()[0].opacity - 0.5).abs() < 1e-9);
    assert!(r.resolve(Tick(692)).kills().is_empty());
}

#[test]
fn out_of_range_ticks_are_clamped() {
    let r = fixture();
    assert_eq!(r.resolve(Tick(50_000)).tick(), Tick(1999));
    assert_eq!(r.resolve(Tick(50_000)), r.resolve(Tick(1999)));
}

#[test]
fn custom_kill_window() {
    let r = fixture();
    let short = FrameResolver::new(
        r.index_arc(),
        ResolverConfig {
            kill_marker_secs: 1.0,
            ..ResolverConfig::default()
        },
    );
    assert_eq!(short.kill_window_ticks(), 64);
    assert!(short.resolve(Tick(564)).kills().is_empty());
    assert_eq!(short.resolve(Tick(563)).kills().len(), 1);
}

#[test]
fn carried_bomb_follows_carrier_until_dropped() {
    let r = fixture();
    let carried = r.resolve(Tick(450));
    let bomb = carried.bomb().unwrap();
    assert_eq!(bomb.state, BombState::Carried);
    assert_eq!(bomb.carrier, Some(PlayerId(2)));
    assert_eq!(bomb.position.x, 5.0);
    assert_eq!(bomb.staleness, 450);

    let dropped = r.resolve(Tick(1999));
    let bomb = dropped.bomb().unwrap();
    assert_eq!(bomb.state, BombState::Dropped);
    assert_eq!(bomb.position.x, 5.0);
    assert_eq!(bomb.staleness, 1499);
}

#[test]
fn grenades_in_flight_carry_a_bounded_trail() {
    let r = fixture();
    assert!(r.resolve(Tick(199)).projectiles().is_empty());

    let launch = r.resolve(Tick(200));
    assert_eq!(launch.projectiles().len(), 1);
    assert_eq!(launch.projectiles()[0].trail.len(), 1);

    let late = r.resolve(Tick(209));
    let p = &late.projectiles()[0];
    assert_eq!(p.kind, UtilityKind::Flash);
    assert_eq!(p.position.x, 209.0);
    let xs: Vec<f64> = p.trail.iter().map(|w| w.x).collect();
    assert_eq!(xs, (202..210u32).map(f64::from).collect::<Vec<_>>());

    assert!(r.resolve(Tick(212)).projectiles().is_empty());
}

#[test]
fn recycled_projectile_id_starts_a_new_flight() {
    let r = fixture();
    assert_eq!(r.index().projectiles().len(), 2);
    let f = r.resolve(Tick(217));
    assert_eq!(f.projectiles().len(), 1);
    assert_eq!(f.projectiles()[0].kind, UtilityKind::Smoke);
    assert_eq!(f.projectiles()[0].trail.len(), 3);
}
