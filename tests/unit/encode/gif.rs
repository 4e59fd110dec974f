use std::io::BufReader;

use image::AnimationDecoder;
use image::codecs::gif::GifDecoder;

use super::*;
use crate::foundation::core::{Canvas, TickRange};
use crate::timeline::rate::TickRate;

fn tmp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("tickreel_gif_{}", std::process::id()))
        .join(name)
}

fn cfg(side: u32, interval: u32) -> SinkConfig {
    SinkConfig {
        width: side,
        height: side,
        map: "de_inferno".to_owned(),
        ticks: TickRange::new(Tick(0), Tick(64)).unwrap(),
        tick_rate: TickRate(64),
        interval,
    }
}

fn close(a: [u8; 4], b: [u8; 4]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 8)
}

#[test]
fn writes_one_gif_frame_per_tick_at_the_export_rate() {
    let path = tmp_path("round.gif");
    let mut sink = GifSink::new(GifSinkOpts::new(&path));
    sink.begin(cfg(8, 16)).unwrap();
    let colors = [
        Rgba8::opaque(200, 30, 30),
        Rgba8::opaque(30, 200, 30),
        Rgba8::opaque(30, 30, 200),
    ];
    for (i, c) in colors.iter().enumerate() {
        let frame = FrameRGBA::blank(Canvas::square(8), *c);
        sink.push_frame(Tick(i as u64 * 16), &frame).unwrap();
    }
    sink.end().unwrap();
    assert_eq!(sink.frames(), 3);

    let file = File::open(&path).unwrap();
    let frames = GifDecoder::new(BufReader::new(file))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(frames.len(), 3);
    for (frame, c) in frames.iter().zip(colors) {
        let (numer, denom) = frame.delay().numer_denom_ms();
        assert_eq!(f64::from(numer) / f64::from(denom), 250.0);
        assert_eq!(frame.buffer().dimensions(), (8, 8));
        let px = frame.buffer().get_pixel(4, 4).0;
        assert!(close(px, [c.r, c.g, c.b, 255]), "{px:?} vs {c:?}");
    }
    let _ = std::fs::remove_file(&path);
}

#[test]
fn translucent_frames_are_flattened_onto_the_background() {
    let path = tmp_path("flat.gif");
    let mut sink = GifSink::new(GifSinkOpts {
        background: Rgba8::opaque(0, 0, 255),
        ..GifSinkOpts::new(&path)
    });
    sink.begin(cfg(4, 64)).unwrap();
    let clear = FrameRGBA {
        width: 4,
        height: 4,
        data: vec![0; 64],
        premultiplied: true,
    };
    sink.push_frame(Tick(0), &clear).unwrap();
    sink.end().unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert!(close(img.get_pixel(1, 1).0, [0, 0, 255, 255]));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn out_of_order_and_unstarted_pushes_fail() {
    let frame = FrameRGBA::blank(Canvas::square(4), Rgba8::opaque(1, 2, 3));
    let path = tmp_path("order.gif");
    let mut sink = GifSink::new(GifSinkOpts::new(&path));
    assert!(sink.push_frame(Tick(0), &frame).is_err());

    sink.begin(cfg(4, 1)).unwrap();
    sink.push_frame(Tick(5), &frame).unwrap();
    assert!(sink.push_frame(Tick(5), &frame).is_err());
    let wrong = FrameRGBA::blank(Canvas::square(6), Rgba8::opaque(1, 2, 3));
    assert!(matches!(
        sink.push_frame(Tick(6), &wrong),
        Err(ReelError::Validation(_))
    ));
    sink.end().unwrap();
    assert!(sink.end().is_err());
    let _ = std::fs::remove_file(&path);
}
