use super::*;

#[test]
fn tick_range_clamp_and_contains() {
    let r = TickRange::new(Tick(10), Tick(20)).unwrap();
    assert_eq!(r.len_ticks(), 10);
    assert!(r.contains(Tick(10)));
    assert!(!r.contains(Tick(20)));
    assert_eq!(r.clamp(Tick(3)), Tick(10));
    assert_eq!(r.clamp(Tick(99)), Tick(19));

    let empty = TickRange::new(Tick(5), Tick(5)).unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.clamp(Tick(9)), Tick(5));
}

#[test]
fn tick_range_rejects_inverted_bounds() {
    assert!(TickRange::new(Tick(2), Tick(1)).is_err());
}

#[test]
fn sampled_ticks_step_by_interval() {
    let r = TickRange::new(Tick(0), Tick(10)).unwrap();
    let ticks: Vec<u64> = r.sampled(4).map(|t| t.0).collect();
    assert_eq!(ticks, vec![0, 4, 8]);
    assert_eq!(r.sample_count(4), 3);
    assert_eq!(r.sample_count(0), 10);
}

#[test]
fn intersect_handles_disjoint_ranges() {
    let a = TickRange::new(Tick(0), Tick(10)).unwrap();
    let b = TickRange::new(Tick(5), Tick(15)).unwrap();
    assert_eq!(a.intersect(b), TickRange::new(Tick(5), Tick(10)).unwrap());
    let c = TickRange::new(Tick(20), Tick(30)).unwrap();
    assert!(a.intersect(c).is_empty());
}

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(64, 0).is_err());
    assert_eq!(Fps::new(64, 8).unwrap().as_f64(), 8.0);
}

#[test]
fn color_opacity_and_premul() {
    let c = Rgba8::opaque(200, 100, 0).with_opacity(0.5);
    assert_eq!(c.a, 128);
    assert_eq!(c.to_premul_array(), [100, 50, 0, 128]);
}
