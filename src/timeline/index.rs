use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::foundation::core::{Tick, TickRange, WorldPos};
use crate::foundation::error::IndexError;
use crate::timeline::rate::{TickRate, detect_tick_rate};
use crate::timeline::record::{
    BombSnapshot, BombState, MatchRecording, PlayerId, PlayerSnapshot, Team, UtilityKind, WeaponId,
};

// Float slack when comparing seek times against tick timestamps.
const TIME_EPSILON: f64 = 1e-9;

/// A projectile id silent for longer than this starts a new flight when it reappears.
pub const PROJECTILE_GAP_SECS: f64 = 1.0;

/// Lifetime of each utility type, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct UtilityDurations {
    /// Smoke cloud lifetime.
    pub smoke_secs: f64,
    /// Flash burst visibility.
    pub flash_secs: f64,
    /// Fire lifetime.
    pub incendiary_secs: f64,
    /// Explosion visibility.
    pub explosive_secs: f64,
}

impl Default for UtilityDurations {
    fn default() -> Self {
        Self {
            smoke_secs: 18.0,
            flash_secs: 1.0,
            incendiary_secs: 7.0,
            explosive_secs: 1.0,
        }
    }
}

impl UtilityDurations {
    /// Lifetime of `kind` in seconds.
    pub fn secs(&self, kind: UtilityKind) -> f64 {
        match kind {
            UtilityKind::Smoke => self.smoke_secs,
            UtilityKind::Flash => self.flash_secs,
            UtilityKind::Incendiary => self.incendiary_secs,
            UtilityKind::Explosive => self.explosive_secs,
        }
    }
}

/// One round: `[start, end)` in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Round {
    /// Position of the round in the match (0-based).
    pub ordinal: usize,
    /// Round number as reported by the parser.
    pub number: u32,
    /// First tick of the round.
    pub start: Tick,
    /// First tick after the round.
    pub end: Tick,
}

impl Round {
    /// Tick range of the round.
    pub fn range(&self) -> TickRange {
        TickRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Return `true` when `tick` belongs to this round.
    pub fn contains(&self, tick: Tick) -> bool {
        self.range().contains(tick)
    }
}

/// Utility effect with its resolved activation window `[activation, expiry)`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct UtilityEvent {
    /// Utility category.
    pub kind: UtilityKind,
    /// Detonation position.
    pub origin: WorldPos,
    /// First tick the effect is visible.
    pub activation: Tick,
    /// First tick the effect is gone.
    pub expiry: Tick,
    /// Thrower, when known.
    pub thrower: Option<PlayerId>,
}

impl UtilityEvent {
    /// Return `true` when the effect is visible at `tick`.
    pub fn is_active(&self, tick: Tick) -> bool {
        self.activation <= tick && tick < self.expiry
    }
}

/// Kill at a given tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct KillEvent {
    /// Tick of the kill.
    pub tick: Tick,
    /// Killer, absent for world damage.
    pub killer: Option<PlayerId>,
    /// Victim.
    pub victim: PlayerId,
    /// Weapon used.
    pub weapon: WeaponId,
    /// Whether the kill was a headshot.
    pub headshot: bool,
}

/// All snapshots of one player, in tick order.
#[derive(Clone, Debug)]
pub struct PlayerTrack {
    /// Player identity.
    pub player: PlayerId,
    /// Last reported display name.
    pub name: String,
    /// Team at first appearance (seat assignment key).
    pub team: Team,
    /// 1-based seat within `team`, stable for the whole match.
    pub seat: u8,
    samples: Vec<(Tick, PlayerSnapshot)>,
}

impl PlayerTrack {
    /// Most recent snapshot at or before `tick`.
    pub fn latest_at(&self, tick: Tick) -> Option<&PlayerSnapshot> {
        self.latest_sample_at(tick).map(|(_, s)| s)
    }

    /// Most recent snapshot at or before `tick`, with the tick it was recorded at.
    pub fn latest_sample_at(&self, tick: Tick) -> Option<(Tick, &PlayerSnapshot)> {
        let n = self.samples.partition_point(|(t, _)| *t <= tick);
        n.checked_sub(1).map(|i| {
            let (at, snap) = &self.samples[i];
            (*at, snap)
        })
    }

    /// Number of recorded snapshots.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// One grenade flight: consecutive samples of one projectile id.
#[derive(Clone, Debug)]
pub struct ProjectileTrack {
    /// Parser entity id.
    pub id: u32,
    /// Grenade category.
    pub kind: UtilityKind,
    /// Thrower, when known.
    pub thrower: Option<PlayerId>,
    samples: Vec<(Tick, WorldPos)>,
}

impl ProjectileTrack {
    /// First sampled tick.
    pub fn first_tick(&self) -> Tick {
        self.samples[0].0
    }

    /// Last sampled tick.
    pub fn last_tick(&self) -> Tick {
        self.samples[self.samples.len() - 1].0
    }

    /// Return `true` while the grenade is airborne: `first_tick <= tick <= last_tick`.
    pub fn in_flight(&self, tick: Tick) -> bool {
        self.first_tick() <= tick && tick <= self.last_tick()
    }

    /// Up to `len` most recent samples at or before `tick`, oldest first.
    pub fn trail_at(&self, tick: Tick, len: usize) -> &[(Tick, WorldPos)] {
        let n = self.samples.partition_point(|(t, _)| *t <= tick);
        &self.samples[n.saturating_sub(len)..n]
    }

    /// Number of recorded samples.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Per-round digest for reporting collaborators.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RoundSummary {
    /// Round number.
    pub number: u32,
    /// First tick.
    pub start: Tick,
    /// First tick after the round.
    pub end: Tick,
    /// Round length in seconds.
    pub duration_secs: f64,
    /// Kills inside the round.
    pub kills: u32,
    /// Headshot kills inside the round.
    pub headshots: u32,
    /// Utility detonations by type name.
    pub utility: BTreeMap<String, u32>,
    /// First kill of the round.
    pub entry_kill: Option<KillEvent>,
    /// First tick the bomb was reported planted.
    pub plant: Option<Tick>,
    /// Last reported bomb state once planted (planted, defused or exploded).
    pub bomb_outcome: Option<BombState>,
}

/// Tick-ordered, random-access index over a recorded match.
///
/// Built once from a [`MatchRecording`]; immutable afterwards and safe to share across threads.
#[derive(Clone, Debug)]
pub struct TimelineIndex {
    map: String,
    first: Tick,
    // Seconds since the first tick, one entry per tick.
    times: Vec<f64>,
    rate: TickRate,
    rounds: Vec<Round>,
    tracks: Vec<PlayerTrack>,
    utility: Vec<UtilityEvent>,
    max_utility_ticks: u64,
    kills: Vec<KillEvent>,
    bomb: Vec<(Tick, BombSnapshot)>,
    projectiles: Vec<ProjectileTrack>,
    max_flight_ticks: u64,
}

impl TimelineIndex {
    /// Build an index using default utility lifetimes.
    pub fn from_recording(recording: &MatchRecording) -> Result<Self, IndexError> {
        Self::build(recording, &UtilityDurations::default())
    }

    /// Validate `recording` and build the index.
    #[tracing::instrument(skip(recording, durations), fields(map = %recording.map, ticks = recording.ticks.len()))]
    pub fn build(
        recording: &MatchRecording,
        durations: &UtilityDurations,
    ) -> Result<Self, IndexError> {
        let ticks = &recording.ticks;
        if ticks.len() < 2 {
            return Err(IndexError::Empty {
                min: 2,
                got: ticks.len(),
            });
        }

        let first = ticks[0].tick;
        let t0 = ticks[0].time;
        let mut times: Vec<f64> = Vec::with_capacity(ticks.len());
        for (i, rec) in ticks.iter().enumerate() {
            let expected = first.offset(i as u64);
            if rec.tick != expected {
                return Err(IndexError::NonContiguous {
                    position: i,
                    expected,
                    got: rec.tick,
                });
            }
            let t = rec.time - t0;
            if !t.is_finite() || times.last().is_some_and(|&prev| t <= prev) {
                return Err(IndexError::OutOfOrder(rec.tick));
            }
            times.push(t);
        }
        let rate = detect_tick_rate(&times)?;

        let end = first.offset(ticks.len() as u64);
        let rounds = validate_rounds(recording, first, end)?;

        let mut tracks = Vec::<PlayerTrack>::new();
        let mut track_by_player = HashMap::<PlayerId, usize>::new();
        let mut utility = Vec::new();
        let mut kills = Vec::new();
        let mut bomb = Vec::new();
        let mut projectiles = Vec::<ProjectileTrack>::new();
        let mut open_flights = HashMap::<u32, usize>::new();
        let flight_gap = rate.secs_to_ticks(PROJECTILE_GAP_SECS);
        for rec in ticks {
            for snap in &rec.players {
                let ti = *track_by_player.entry(snap.player).or_insert_with(|| {
                    tracks.push(PlayerTrack {
                        player: snap.player,
                        name: snap.name.clone(),
                        team: snap.team,
                        seat: 0,
                        samples: Vec::new(),
                    });
                    tracks.len() - 1
                });
                let track = &mut tracks[ti];
                if !snap.name.is_empty() {
                    track.name.clone_from(&snap.name);
                }
                track.samples.push((rec.tick, snap.clone()));
            }
            for det in &rec.utility {
                let life = rate.secs_to_ticks(durations.secs(det.kind)).max(1);
                utility.push(UtilityEvent {
                    kind: det.kind,
                    origin: det.origin,
                    activation: rec.tick,
                    expiry: rec.tick.offset(life),
                    thrower: det.thrower,
                });
            }
            for k in &rec.kills {
                kills.push(KillEvent {
                    tick: rec.tick,
                    killer: k.killer,
                    victim: k.victim,
                    weapon: k.weapon,
                    headshot: k.headshot,
                });
            }
            if let Some(b) = &rec.bomb {
                bomb.push((rec.tick, b.clone()));
            }
            for p in &rec.projectiles {
                // Ids are recycled; a kind change or a long silence starts a new flight.
                let open = open_flights.get(&p.id).copied().filter(|&i| {
                    let f = &projectiles[i];
                    f.kind == p.kind && rec.tick.since(f.last_tick()) <= flight_gap
                });
                match open {
                    Some(i) => projectiles[i].samples.push((rec.tick, p.position)),
                    None => {
                        open_flights.insert(p.id, projectiles.len());
                        projectiles.push(ProjectileTrack {
                            id: p.id,
                            kind: p.kind,
                            thrower: p.thrower,
                            samples: vec![(rec.tick, p.position)],
                        });
                    }
                }
            }
        }
        assign_seats(&mut tracks);
        tracks.sort_by_key(|t| (t.team, t.seat, t.player));

        let max_utility_ticks = utility
            .iter()
            .map(|u| u.expiry.since(u.activation))
            .max()
            .unwrap_or(0);
        let max_flight_ticks = projectiles
            .iter()
            .map(|p| p.last_tick().since(p.first_tick()))
            .max()
            .unwrap_or(0);

        tracing::debug!(
            rate = rate.0,
            rounds = rounds.len(),
            players = tracks.len(),
            utility = utility.len(),
            kills = kills.len(),
            bomb_reports = bomb.len(),
            flights = projectiles.len(),
            "timeline indexed"
        );

        Ok(Self {
            map: recording.map.clone(),
            first,
            times,
            rate,
            rounds,
            tracks,
            utility,
            max_utility_ticks,
            kills,
            bomb,
            projectiles,
            max_flight_ticks,
        })
    }

    /// Map identifier of the match.
    pub fn map_name(&self) -> &str {
        &self.map
    }

    /// Inferred sampling rate.
    pub fn tick_rate(&self) -> TickRate {
        self.rate
    }

    /// First tick of the timeline.
    pub fn first_tick(&self) -> Tick {
        self.first
    }

    /// Last tick of the timeline (inclusive).
    pub fn last_tick(&self) -> Tick {
        self.first.offset(self.times.len() as u64 - 1)
    }

    /// All ticks as a half-open range.
    pub fn range(&self) -> TickRange {
        TickRange {
            start: self.first,
            end: self.first.offset(self.times.len() as u64),
        }
    }

    /// Number of ticks.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always `false`; an index holds at least two ticks.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Clamp `tick` into the timeline.
    pub fn clamp(&self, tick: Tick) -> Tick {
        self.range().clamp(tick)
    }

    /// Seconds from the first tick to `tick` (clamped into the timeline).
    pub fn time_of(&self, tick: Tick) -> f64 {
        let t = self.clamp(tick);
        self.times[t.since(self.first) as usize]
    }

    /// Seconds spanned by the whole timeline.
    pub fn duration_secs(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Nearest tick at or before `t` (measured from the first tick).
    ///
    /// Times past the end clamp to the last tick; seeking never fails.
    pub fn tick_at_time(&self, t: Duration) -> Tick {
        self.tick_at_secs(t.as_secs_f64())
    }

    /// Same as [`TimelineIndex::tick_at_time`] for signed seconds; negative values clamp to the
    /// first tick.
    pub fn tick_at_secs(&self, secs: f64) -> Tick {
        if secs.is_nan() {
            return self.first;
        }
        let n = self.times.partition_point(|&x| x <= secs + TIME_EPSILON);
        self.first.offset(n.saturating_sub(1) as u64)
    }

    /// All rounds in match order.
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// The round that contains `tick`.
    pub fn round_containing(&self, tick: Tick) -> Result<Round, IndexError> {
        let n = self.rounds.partition_point(|r| r.start <= tick);
        n.checked_sub(1)
            .map(|i| self.rounds[i])
            .filter(|r| r.contains(tick))
            .ok_or(IndexError::NoRound(tick))
    }

    /// The round after `current`; the last round maps to itself.
    pub fn next_round(&self, current: Round) -> Round {
        self.rounds
            .get(current.ordinal + 1)
            .copied()
            .unwrap_or(current)
    }

    /// The round before `current`; the first round maps to itself.
    pub fn prev_round(&self, current: Round) -> Round {
        current
            .ordinal
            .checked_sub(1)
            .and_then(|i| self.rounds.get(i).copied())
            .unwrap_or(current)
    }

    /// Round with number `number`, if present.
    pub fn round_by_number(&self, number: u32) -> Option<Round> {
        self.rounds
            .binary_search_by_key(&number, |r| r.number)
            .ok()
            .map(|i| self.rounds[i])
    }

    /// Round numbered `number`, clamped to the first/last round; the nearest earlier round when
    /// numbering has gaps. `None` only when the match has no rounds.
    pub fn round_clamped(&self, number: u32) -> Option<Round> {
        let first = self.rounds.first()?;
        let n = self.rounds.partition_point(|r| r.number <= number);
        Some(n.checked_sub(1).map_or(*first, |i| self.rounds[i]))
    }

    /// First round starting after `tick`.
    pub fn first_round_after(&self, tick: Tick) -> Option<Round> {
        let n = self.rounds.partition_point(|r| r.start <= tick);
        self.rounds.get(n).copied()
    }

    /// Last round ending at or before `tick`.
    pub fn last_round_before(&self, tick: Tick) -> Option<Round> {
        let n = self.rounds.partition_point(|r| r.end <= tick);
        n.checked_sub(1).map(|i| self.rounds[i])
    }

    /// Player tracks ordered by team then seat.
    pub fn tracks(&self) -> &[PlayerTrack] {
        &self.tracks
    }

    /// Most recent snapshot per player at or before `tick`.
    pub fn snapshots_at(&self, tick: Tick) -> Vec<&PlayerSnapshot> {
        self.tracks
            .iter()
            .filter_map(|t| t.latest_at(tick))
            .collect()
    }

    /// Position of `player` at or before `tick`.
    pub fn position_of(&self, player: PlayerId, tick: Tick) -> Option<WorldPos> {
        self.tracks
            .iter()
            .find(|t| t.player == player)
            .and_then(|t| t.latest_at(tick))
            .map(|s| s.position)
    }

    /// Utility events active at `tick`, in activation order.
    pub fn utility_active_at(&self, tick: Tick) -> impl Iterator<Item = &UtilityEvent> + '_ {
        // Lifetimes are bounded, so only events activated within the last
        // `max_utility_ticks` can still be live.
        let lo = self
            .utility
            .partition_point(|u| u.activation.0.saturating_add(self.max_utility_ticks) <= tick.0);
        let hi = self.utility.partition_point(|u| u.activation <= tick);
        self.utility[lo..hi.max(lo)]
            .iter()
            .filter(move |u| u.is_active(tick))
    }

    /// Kills in `[tick - window + 1, tick]`, in tick order.
    pub fn kills_within(&self, tick: Tick, window_ticks: u64) -> &[KillEvent] {
        let lo = self
            .kills
            .partition_point(|k| k.tick.0.saturating_add(window_ticks) <= tick.0);
        let hi = self.kills.partition_point(|k| k.tick <= tick);
        &self.kills[lo..hi.max(lo)]
    }

    /// Kills whose tick falls inside `range`.
    pub fn kills_in(&self, range: TickRange) -> &[KillEvent] {
        let lo = self.kills.partition_point(|k| k.tick < range.start);
        let hi = self.kills.partition_point(|k| k.tick < range.end);
        &self.kills[lo..hi.max(lo)]
    }

    /// Utility events activating inside `range`.
    pub fn utility_in(&self, range: TickRange) -> &[UtilityEvent] {
        let lo = self.utility.partition_point(|u| u.activation < range.start);
        let hi = self.utility.partition_point(|u| u.activation < range.end);
        &self.utility[lo..hi.max(lo)]
    }

    /// Most recent bomb report at or before `tick`, with the tick it was reported at.
    ///
    /// Inside a round, reports from before the round start are ignored, so the bomb does not
    /// carry over from the previous round.
    pub fn bomb_at(&self, tick: Tick) -> Option<(Tick, &BombSnapshot)> {
        let n = self.bomb.partition_point(|(t, _)| *t <= tick);
        let (at, snap) = &self.bomb[n.checked_sub(1)?];
        if let Ok(round) = self.round_containing(tick)
            && *at < round.start
        {
            return None;
        }
        Some((*at, snap))
    }

    /// Bomb reports inside `range`.
    pub fn bomb_in(&self, range: TickRange) -> &[(Tick, BombSnapshot)] {
        let lo = self.bomb.partition_point(|(t, _)| *t < range.start);
        let hi = self.bomb.partition_point(|(t, _)| *t < range.end);
        &self.bomb[lo..hi.max(lo)]
    }

    /// Grenade flights in the order they were first seen.
    pub fn projectiles(&self) -> &[ProjectileTrack] {
        &self.projectiles
    }

    /// Grenades airborne at `tick`, in launch order.
    pub fn projectiles_in_flight(
        &self,
        tick: Tick,
    ) -> impl Iterator<Item = &ProjectileTrack> + '_ {
        let lo = self.projectiles.partition_point(|p| {
            p.first_tick().0.saturating_add(self.max_flight_ticks) < tick.0
        });
        let hi = self.projectiles.partition_point(|p| p.first_tick() <= tick);
        self.projectiles[lo..hi.max(lo)]
            .iter()
            .filter(move |p| p.in_flight(tick))
    }

    /// Per-round digest for every round.
    pub fn round_summaries(&self) -> Vec<RoundSummary> {
        self.rounds
            .iter()
            .map(|r| {
                let kills = self.kills_in(r.range());
                let bomb = self.bomb_in(r.range());
                let mut utility = BTreeMap::new();
                for u in self.utility_in(r.range()) {
                    *utility.entry(u.kind.as_str().to_owned()).or_insert(0u32) += 1;
                }
                RoundSummary {
                    number: r.number,
                    start: r.start,
                    end: r.end,
                    duration_secs: self.rate.ticks_to_secs(r.end.since(r.start)),
                    kills: kills.len() as u32,
                    headshots: kills.iter().filter(|k| k.headshot).count() as u32,
                    utility,
                    entry_kill: kills.first().cloned(),
                    plant: bomb
                        .iter()
                        .find(|(_, b)| b.state == BombState::Planted)
                        .map(|(t, _)| *t),
                    bomb_outcome: bomb
                        .iter()
                        .rev()
                        .map(|(_, b)| b.state)
                        .find(|s| s.is_planted_or_later()),
                }
            })
            .collect()
    }
}

fn validate_rounds(
    recording: &MatchRecording,
    first: Tick,
    end: Tick,
) -> Result<Vec<Round>, IndexError> {
    let mut rounds: Vec<Round> = Vec::with_capacity(recording.rounds.len());
    for (ordinal, m) in recording.rounds.iter().enumerate() {
        if m.start >= m.end {
            return Err(IndexError::InvalidRounds(format!(
                "round {} is empty ({}..{})",
                m.number, m.start.0, m.end.0
            )));
        }
        if m.start < first || m.end > end {
            return Err(IndexError::InvalidRounds(format!(
                "round {} ({}..{}) lies outside the timeline ({}..{})",
                m.number, m.start.0, m.end.0, first.0, end.0
            )));
        }
        if let Some(prev) = rounds.last() {
            if m.start < prev.end {
                return Err(IndexError::InvalidRounds(format!(
                    "round {} overlaps round {}",
                    m.number, prev.number
                )));
            }
            if m.number <= prev.number {
                return Err(IndexError::InvalidRounds(format!(
                    "round numbers must increase ({} after {})",
                    m.number, prev.number
                )));
            }
        }
        rounds.push(Round {
            ordinal,
            number: m.number,
            start: m.start,
            end: m.end,
        });
    }
    Ok(rounds)
}

fn assign_seats(tracks: &mut [PlayerTrack]) {
    // Tracks are in first-appearance order; seats count up per team in that order.
    let mut next = HashMap::<Team, u8>::new();
    for track in tracks.iter_mut() {
        let seat = next.entry(track.team).or_insert(0);
        *seat = seat.saturating_add(1);
        track.seat = *seat;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/index.rs"]
mod tests;
