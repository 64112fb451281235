//! Loads a map and renders the view from the player 1 start in to a PPM
//! image, without a window or game loop.

mod cli;
mod config;

use cli::*;
use log::{LevelFilter, info};
use mimalloc::MiMalloc;
use simplelog::TermLogger;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::config::UserConfig;
use level::{LoadOptions, MapData, PicData};
use math::{FRACBITS, Fixed};
use render_soft::SoftwareRenderer;
use render_trait::{Framebuffer, PlayViewRenderer, RenderConfig, ViewInput, ViewPos};
use wad::WadData;

const BASE_DIR: &str = "room4doom-view/";

/// Eye height above the floor
const VIEWHEIGHT: Fixed = 41 << FRACBITS;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), Box<dyn Error>> {
    let mut options: CLIOptions = argh::from_env();

    TermLogger::init(
        options.verbose.unwrap_or(LevelFilter::Info),
        simplelog::ConfigBuilder::default()
            .set_time_level(LevelFilter::Trace)
            .build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut user_config = UserConfig::load()?;
    user_config.sync_cli(&mut options);
    user_config.write()?;

    if options.iwad.is_empty() {
        return Err("No IWAD, pass --iwad once and it will be remembered".into());
    }
    let wad = WadData::new(Path::new(&options.iwad));
    let map_name = options.map.to_ascii_uppercase();
    if !wad.map_exists(&map_name) {
        return Err(format!("{map_name} is not in {}", options.iwad).into());
    }

    let mut pic_data = PicData::init(&wad);
    pic_data.set_sky_pic(sky_for_map(&map_name));
    let mut map = MapData::default();
    map.load(
        &map_name,
        &pic_data,
        &wad,
        LoadOptions {
            mirror: options.mirror,
            ..LoadOptions::default()
        },
    );

    let start = map
        .things()
        .iter()
        .find(|t| t.kind == 1)
        .copied()
        .ok_or_else(|| format!("{map_name} has no player 1 start"))?;
    let floor = map.sectors[map.point_in_sector(start.x, start.y)].floorheight;
    let mut input = ViewInput::at(ViewPos {
        x: start.x,
        y: start.y,
        z: floor + VIEWHEIGHT,
        angle: start.angle,
        lookdir: 0,
    });
    input.leveltime = options.tic;
    input.gametic = options.tic;

    let (width, height) = (options.width, options.height);
    let config = RenderConfig {
        screenblocks: options.screenblocks.unwrap_or(11),
        detailshift: options.detail.unwrap_or(0),
        hires: height > 200,
        fake_contrast: options.fake_contrast.unwrap_or(true),
        swirling_flats: options.swirl.unwrap_or(true),
        ..RenderConfig::default()
    };
    let mut renderer = SoftwareRenderer::new(width as i32, height as i32, config);
    let mut fb = Framebuffer::new(width as usize, height as usize);

    let timer = Instant::now();
    renderer.render_player_view(&input, &mut map, &pic_data, &mut fb);
    info!("Rendered {map_name} at {width}x{height} in {:?}", timer.elapsed());

    write_ppm(Path::new(&options.output), width, height, &fb.to_rgb(pic_data.palette()))?;
    info!("Wrote {}", options.output);

    #[cfg(feature = "hprof")]
    if options.profile {
        coarse_prof::write(&mut std::io::stdout())?;
    }
    Ok(())
}

/// The sky texture the game picks for a map
fn sky_for_map(map_name: &str) -> &'static str {
    if let Some(num) = map_name.strip_prefix("MAP").and_then(|n| n.parse::<u32>().ok()) {
        return match num {
            0..12 => "SKY1",
            12..21 => "SKY2",
            _ => "SKY3",
        };
    }
    match map_name.as_bytes().get(1) {
        Some(b'2') => "SKY2",
        Some(b'3') => "SKY3",
        Some(b'4') => "SKY4",
        _ => "SKY1",
    }
}

/// Binary PPM, three bytes per pixel
fn write_ppm(path: &Path, width: u32, height: u32, rgb: &[u8]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{width} {height}\n255\n")?;
    out.write_all(rgb)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_by_episode_and_map() {
        assert_eq!(sky_for_map("E1M1"), "SKY1");
        assert_eq!(sky_for_map("E3M4"), "SKY3");
        assert_eq!(sky_for_map("MAP11"), "SKY1");
        assert_eq!(sky_for_map("MAP12"), "SKY2");
        assert_eq!(sky_for_map("MAP30"), "SKY3");
    }
}
