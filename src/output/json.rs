use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::atlas::{PackedEntry, SpriteVariant};
use crate::error::AtlasError;
use crate::packing;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput {
    meta: Meta,
    image: String,
    size: Size,
    pixel_ratio: f32,
    sprites: Vec<JsonSprite>,
}

#[derive(Serialize)]
struct Meta {
    app: &'static str,
    version: &'static str,
    format: &'static str,
}

#[derive(Serialize)]
struct Size {
    w: u32,
    h: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSprite {
    name: String,
    variant: SpriteVariant,
    frame: Frame,
    width: f32,
    height: f32,
    pixel_ratio: f32,
    tl: [f32; 2],
    br: [f32; 2],
    sdf: bool,
}

#[derive(Serialize)]
struct Frame {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Write JSON placement metadata next to `<name>.png`
pub fn write_json(
    entries: &[PackedEntry],
    size: packing::Size,
    pixel_ratio: f32,
    output_dir: &Path,
    base_name: &str,
) -> Result<()> {
    let output = JsonOutput {
        meta: Meta {
            app: "sprite-atlas",
            version: env!("CARGO_PKG_VERSION"),
            format: "rgba8888",
        },
        image: format!("{}.png", base_name),
        size: Size {
            w: size.width,
            h: size.height,
        },
        pixel_ratio,
        sprites: entries.iter().map(entry_to_json).collect(),
    };

    let json_path = output_dir.join(format!("{}.json", base_name));
    let content = serde_json::to_string_pretty(&output)?;

    fs::write(&json_path, content).map_err(|e| AtlasError::OutputWrite {
        path: json_path,
        source: e,
    })?;

    Ok(())
}

fn entry_to_json(entry: &PackedEntry) -> JsonSprite {
    let placement = &entry.placement;

    JsonSprite {
        name: entry.name.clone(),
        variant: entry.variant,
        frame: Frame {
            x: placement.pos.x,
            y: placement.pos.y,
            w: placement.pos.width,
            h: placement.pos.height,
        },
        width: placement.width,
        height: placement.height,
        pixel_ratio: placement.relative_pixel_ratio,
        tl: placement.tl,
        br: placement.br,
        sdf: placement.sdf,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::SpritePlacement;
    use crate::packing::Rect;

    #[test]
    fn test_write_json() {
        let dir = std::env::temp_dir().join(format!("sprite-atlas-json-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let entries = vec![PackedEntry {
            name: "metro".to_string(),
            variant: SpriteVariant::Pattern,
            placement: SpritePlacement {
                pos: Rect::new(20, 0, 20, 20),
                sdf: false,
                relative_pixel_ratio: 1.0,
                width: 18.0,
                height: 18.0,
                tl: [0.25, 0.5],
                br: [0.5, 0.75],
            },
        }];
        write_json(&entries, packing::Size::new(64, 32), 2.0, &dir, "streets").unwrap();

        let content = fs::read_to_string(dir.join("streets.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["image"], "streets.png");
        assert_eq!(value["size"]["w"], 64);
        assert_eq!(value["pixelRatio"], 2.0);
        let sprite = &value["sprites"][0];
        assert_eq!(sprite["name"], "metro");
        assert_eq!(sprite["variant"], "pattern");
        assert_eq!(sprite["frame"]["x"], 20);
        assert_eq!(sprite["tl"][1], 0.5);
        assert_eq!(sprite["sdf"], false);

        fs::remove_dir_all(&dir).unwrap();
    }
}
