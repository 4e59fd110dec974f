use super::*;

const TWO_TICKS: &str = r#"{
    "map": "de_nuke",
    "ticks": [
        { "tick": 7, "time": 1.0,
          "players": [{ "player": 3, "team": "CT", "position": { "x": 1, "y": 2, "z": 0 }, "alive": true }],
          "utility": [{ "kind": "molotov", "origin": { "x": 0, "y": 0, "z": 0 } }] },
        { "tick": 8, "time": 1.015625,
          "bomb": { "state": "carried", "position": { "x": 5, "y": 6, "z": 0 }, "carrier": 9 },
          "projectiles": [{ "id": 4, "kind": "he", "position": { "x": 9, "y": 9, "z": 0 } }] }
    ]
}"#;

#[test]
fn parser_output_with_optional_fields() {
    let rec = MatchRecording::from_reader(TWO_TICKS.as_bytes()).unwrap();
    assert_eq!(rec.map, "de_nuke");
    assert!(rec.rounds.is_empty());

    let first = &rec.ticks[0];
    assert_eq!(first.players[0].team, Team::Ct);
    assert_eq!(first.players[0].weapon, WeaponId::default());
    assert_eq!(first.utility[0].kind, UtilityKind::Incendiary);
    assert_eq!(first.bomb, None);
    assert!(first.projectiles.is_empty());

    let second = &rec.ticks[1];
    let bomb = second.bomb.as_ref().unwrap();
    assert_eq!(bomb.state, BombState::Carried);
    assert_eq!(bomb.carrier, Some(PlayerId(9)));
    assert_eq!(second.projectiles[0].kind, UtilityKind::Explosive);
    assert_eq!(second.projectiles[0].thrower, None);
}

#[test]
fn bomb_states_after_plant() {
    assert!(!BombState::Dropped.is_planted_or_later());
    assert!(BombState::Planted.is_planted_or_later());
    assert!(BombState::Defused.is_planted_or_later());
    assert_eq!(BombState::Exploded.as_str(), "exploded");
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = MatchRecording::from_reader(&b"{ \"map\": 3 }"[..]).unwrap_err();
    assert!(matches!(err, ReelError::Serde(_)));
}

#[test]
fn missing_file_keeps_path_and_io_source() {
    let path = std::env::temp_dir().join("tickreel_no_such_match.json");
    let err = MatchRecording::from_path(&path).unwrap_err();
    assert!(err.to_string().contains("tickreel_no_such_match.json"));
    let ReelError::Other(inner) = &err else {
        panic!("unexpected error: {err:?}");
    };
    let io = inner.downcast_ref::<std::io::Error>().unwrap();
    assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
}
