use super::*;
use crate::foundation::core::{Canvas, TickRange};
use crate::timeline::rate::TickRate;

fn cfg(width: u32, height: u32, interval: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        map: "de_train".to_owned(),
        ticks: TickRange::new(Tick(1000), Tick(2280)).unwrap(),
        tick_rate: TickRate(128),
        interval,
    }
}

fn args(sink: &FfmpegSink, cfg: &SinkConfig) -> Vec<String> {
    sink.args(cfg)
        .unwrap()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    let at = args.iter().position(|a| a == flag)?;
    args.get(at + 1).cloned()
}

fn tmp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("tickreel_ffmpeg_{}", std::process::id()))
        .join(name)
}

#[test]
fn input_rate_is_tick_rate_over_interval() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out/round.mp4"));
    let a = args(&sink, &cfg(64, 64, 4));
    assert_eq!(value_after(&a, "-framerate").as_deref(), Some("128/4"));
    assert_eq!(value_after(&a, "-pix_fmt").as_deref(), Some("rgb24"));
    assert_eq!(value_after(&a, "-s").as_deref(), Some("64x64"));
    assert_eq!(a.first().map(String::as_str), Some("-y"));
    assert_eq!(a.last().map(String::as_str), Some("out/round.mp4"));
    assert!(!a.iter().any(|x| x == "-vf"));
}

#[test]
fn odd_canvas_is_cropped_to_even() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out/round.mp4"));
    let a = args(&sink, &cfg(793, 788, 1));
    assert_eq!(
        value_after(&a, "-vf").as_deref(),
        Some("crop=trunc(iw/2)*2:trunc(ih/2)*2:0:0")
    );
}

#[test]
fn container_metadata_names_the_export() {
    let sink = FfmpegSink::new(FfmpegSinkOpts {
        overwrite: false,
        ..FfmpegSinkOpts::new("out/round.mp4")
    });
    let a = args(&sink, &cfg(64, 64, 2));
    let meta: Vec<&String> = a
        .iter()
        .zip(a.iter().skip(1))
        .filter(|(flag, _)| *flag == "-metadata")
        .map(|(_, v)| v)
        .collect();
    assert_eq!(meta.len(), 2);
    assert_eq!(meta[0], "title=de_train ticks 1000..2280");
    assert_eq!(meta[1], "comment=every 2 ticks at 128 ticks/s");
    assert_eq!(a.first().map(String::as_str), Some("-n"));
}

#[test]
fn zero_interval_has_no_output_rate() {
    let sink = FfmpegSink::new(FfmpegSinkOpts::new("out/round.mp4"));
    assert!(sink.args(&cfg(64, 64, 0)).is_err());
}

#[test]
fn degenerate_canvas_is_rejected_before_spawning() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(tmp_path("never.mp4")));
    let err = sink.begin(cfg(1, 100, 1)).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn push_before_begin_fails() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(tmp_path("never.mp4")));
    let frame = FrameRGBA::blank(Canvas::square(2), Rgba8::opaque(0, 0, 0));
    assert!(sink.push_frame(Tick(0), &frame).is_err());
    assert!(sink.end().is_err());
}

#[test]
fn dropping_an_unfinished_sink_reaps_ffmpeg() {
    if !is_ffmpeg_on_path() {
        eprintln!("ffmpeg not found; skipping");
        return;
    }
    let path = tmp_path("abandoned.mp4");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&path));
    sink.begin(cfg(16, 16, 1)).unwrap();
    let frame = FrameRGBA::blank(Canvas::square(16), Rgba8::opaque(40, 40, 40));
    sink.push_frame(Tick(1000), &frame).unwrap();
    drop(sink);

    // A second encoder on the same path starts cleanly once the first is gone.
    let mut again = FfmpegSink::new(FfmpegSinkOpts::new(&path));
    again.begin(cfg(16, 16, 1)).unwrap();
    again.push_frame(Tick(1000), &frame).unwrap();
    again.push_frame(Tick(1001), &frame).unwrap();
    again.end().unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn odd_canvas_encodes() {
    if !is_ffmpeg_on_path() {
        eprintln!("ffmpeg not found; skipping");
        return;
    }
    let path = tmp_path("odd.mp4");
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&path));
    sink.begin(cfg(33, 17, 8)).unwrap();
    let frame = FrameRGBA::blank(
        Canvas {
            width: 33,
            height: 17,
        },
        Rgba8::opaque(200, 10, 10),
    );
    for i in 0..4 {
        sink.push_frame(Tick(1000 + i * 8), &frame).unwrap();
    }
    sink.end().unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    let _ = std::fs::remove_file(&path);
}
