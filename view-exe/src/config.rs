//! User configuration options.

use crate::{BASE_DIR, CLIOptions};
use dirs::config_dir;
use log::{info, warn};
use nanoserde::{DeRon, SerRon};
use std::{
    fs::{File, OpenOptions, create_dir_all},
    io::{self, Read, Write},
    path::PathBuf,
};

const LOG_TAG: &str = "UserConfig";

fn get_cfg_file() -> io::Result<PathBuf> {
    let mut dir = config_dir().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Couldn't find the user config dir")
    })?;
    dir.push(BASE_DIR);
    if !dir.exists() {
        create_dir_all(&dir)?;
    }
    dir.push("user.ron");
    Ok(dir)
}

#[derive(Debug, Clone, PartialEq, DeRon, SerRon)]
pub struct UserConfig {
    pub iwad: String,
    pub width: u32,
    pub height: u32,
    pub screenblocks: i32,
    pub detail: i32,
    pub fake_contrast: bool,
    pub swirl: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            iwad: String::new(),
            width: 320,
            height: 200,
            screenblocks: 11,
            detail: 0,
            fake_contrast: true,
            swirl: true,
        }
    }
}

impl UserConfig {
    /// Read the stored config, writing out the defaults if there is none or
    /// it can't be parsed
    pub fn load() -> io::Result<Self> {
        let path = get_cfg_file()?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let mut buf = String::new();
        if file.read_to_string(&mut buf)? > 0 {
            match UserConfig::deserialize_ron(&buf) {
                Ok(data) => {
                    info!(target: LOG_TAG, "Loaded user config file");
                    return Ok(data);
                }
                Err(e) => warn!(target: LOG_TAG, "Could not deserialise {path:?} ({e}), recreating config"),
            }
        }
        let config = UserConfig::default();
        config.write()?;
        info!(target: LOG_TAG, "Created default user config file");
        Ok(config)
    }

    pub fn write(&self) -> io::Result<()> {
        let path = get_cfg_file()?;
        let mut file = File::create(&path)?;
        file.write_all(self.serialize_ron().as_bytes())?;
        info!(target: LOG_TAG, "Saved user config to {path:?}");
        Ok(())
    }

    /// Sync the CLI options and UserOptions with each other. Anything given
    /// on the command line wins and is kept for next time.
    pub fn sync_cli(&mut self, cli: &mut CLIOptions) {
        info!(target: LOG_TAG, "Checking CLI options");

        if !cli.iwad.is_empty() && cli.iwad != self.iwad {
            cli.iwad.clone_into(&mut self.iwad);
            info!(target: LOG_TAG, "IWAD changed to: {}", &cli.iwad);
        } else {
            self.iwad.clone_into(&mut cli.iwad);
        }

        if cli.width != 0 {
            self.width = cli.width;
        } else {
            cli.width = self.width;
        }

        if cli.height != 0 {
            self.height = cli.height;
        } else {
            cli.height = self.height;
        }

        match cli.screenblocks {
            Some(blocks) => self.screenblocks = blocks,
            None => cli.screenblocks = Some(self.screenblocks),
        }

        match cli.detail {
            Some(detail) => self.detail = detail,
            None => cli.detail = Some(self.detail),
        }

        match cli.fake_contrast {
            Some(f) => self.fake_contrast = f,
            None => cli.fake_contrast = Some(self.fake_contrast),
        }

        match cli.swirl {
            Some(f) => self.swirl = f,
            None => cli.swirl = Some(self.swirl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> CLIOptions {
        CLIOptions {
            verbose: None,
            iwad: String::new(),
            map: "E1M1".to_string(),
            width: 0,
            height: 0,
            detail: None,
            screenblocks: None,
            mirror: false,
            fake_contrast: None,
            swirl: None,
            output: String::new(),
            tic: 0,
            profile: false,
        }
    }

    #[test]
    fn cli_values_win() {
        let mut config = UserConfig {
            iwad: "doom.wad".to_string(),
            ..UserConfig::default()
        };
        let mut options = cli();
        options.iwad = "doom2.wad".to_string();
        options.width = 640;
        options.swirl = Some(false);
        config.sync_cli(&mut options);

        assert_eq!(config.iwad, "doom2.wad");
        assert_eq!(config.width, 640);
        assert!(!config.swirl);
        // Unset options are filled from the config
        assert_eq!(options.height, 200);
        assert_eq!(options.screenblocks, Some(11));
        assert_eq!(options.fake_contrast, Some(true));
    }

    #[test]
    fn config_ron_round_trip() {
        let config = UserConfig {
            iwad: "/tmp/doom.wad".to_string(),
            detail: 1,
            ..UserConfig::default()
        };
        let ron = config.serialize_ron();
        assert_eq!(UserConfig::deserialize_ron(&ron).unwrap(), config);
    }
}
