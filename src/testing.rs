//! Shared test fixtures and a per-thread capture logger.

use std::cell::RefCell;
use std::io::Cursor;
use std::sync::Once;

use image::{ImageFormat, Rgba, RgbaImage};
use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()));
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Install the capture logger and clear this thread's records
pub fn capture_logs() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Number of captured records with the given level and message
pub fn log_count(level: Level, message: &str) -> usize {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(l, m)| *l == level && m == message)
            .count()
    })
}

/// Number of captured records at or above `Info`
pub fn logged() -> usize {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level <= Level::Info)
            .count()
    })
}

/// 64x32 sheet: "metro" 18x18 opaque green at (0,0), "park" 8x8 half-transparent
/// white at (18,0), "retina" 16x16 @2x SDF at (32,0)
pub fn sheet_png() -> Vec<u8> {
    let mut sheet = RgbaImage::new(64, 32);
    for (x, y, pixel) in sheet.enumerate_pixels_mut() {
        *pixel = if x < 18 && y < 18 {
            Rgba([0, 200, 0, 255])
        } else if (18..26).contains(&x) && y < 8 {
            Rgba([255, 255, 255, 128])
        } else if (32..48).contains(&x) && y < 16 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        };
    }

    let mut png = Cursor::new(Vec::new());
    sheet.write_to(&mut png, ImageFormat::Png).unwrap();
    png.into_inner()
}

pub fn sheet_json() -> String {
    r#"{
        "metro": { "x": 0, "y": 0, "width": 18, "height": 18, "pixelRatio": 1 },
        "park": { "x": 18, "y": 0, "width": 8, "height": 8 },
        "retina": { "x": 32, "y": 0, "width": 16, "height": 16, "pixelRatio": 2, "sdf": true }
    }"#
    .to_string()
}

/// A premultiplied image filled with one color
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}
