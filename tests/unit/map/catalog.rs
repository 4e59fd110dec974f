use super::*;

#[test]
fn normalizes_common_spellings() {
    assert_eq!(normalize_map_name("de_dust2"), "de_dust2");
    assert_eq!(normalize_map_name("Dust2"), "de_dust2");
    assert_eq!(normalize_map_name("maps/de_mirage.bsp"), "de_mirage");
    assert_eq!(normalize_map_name(" cs_office "), "cs_office");
}

#[test]
fn builtin_covers_active_pool() {
    let catalog = MapCatalog::builtin();
    let names: Vec<&str> = catalog.names().collect();
    assert_eq!(names.len(), 8);
    assert!(catalog.get("inferno").is_ok());
    assert_eq!(catalog.get("de_dust2").unwrap().scale, 4.4);
}

#[test]
fn unknown_map_fails_fast() {
    let catalog = MapCatalog::builtin();
    let err = catalog.get("de_cache").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownMap(ref m) if m == "de_cache"));
}

#[test]
fn loads_wrapped_and_list_json() {
    let list = r#"[{"name":"cache","origin_x":-2000,"origin_y":3250,"scale":5.5}]"#;
    let catalog = MapCatalog::from_reader(list.as_bytes()).unwrap();
    let p = catalog.get("de_cache").unwrap();
    assert_eq!(p.radar_size, DEFAULT_RADAR_SIZE);
    assert!(p.flip_y);

    let wrapped = r#"{"maps":[{"name":"de_train","origin_x":-2308,"origin_y":2078,"scale":4.082077,"flip_y":false}]}"#;
    let catalog = MapCatalog::from_reader(wrapped.as_bytes()).unwrap();
    assert!(!catalog.get("train").unwrap().flip_y);
}

#[test]
fn rejects_degenerate_scale() {
    let bad = r#"[{"name":"de_x","origin_x":0,"origin_y":0,"scale":0}]"#;
    assert!(matches!(
        MapCatalog::from_reader(bad.as_bytes()),
        Err(ConfigError::InvalidProfile { .. })
    ));
}

#[test]
fn merge_overrides_builtin() {
    let mut catalog = MapCatalog::builtin();
    let custom = r#"[{"name":"de_dust2","origin_x":0,"origin_y":0,"scale":2}]"#;
    catalog.merge(MapCatalog::from_reader(custom.as_bytes()).unwrap());
    assert_eq!(catalog.get("dust2").unwrap().scale, 2.0);
}
