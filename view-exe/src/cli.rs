use argh::FromArgs;

/// Render one frame of a map from the player 1 start to a PPM image
#[derive(Debug, Clone, FromArgs)]
pub struct CLIOptions {
    /// verbose level: off, error, warn, info, debug, trace
    #[argh(option)]
    pub verbose: Option<log::LevelFilter>,
    /// path to the IWAD
    #[argh(option, default = "Default::default()")]
    pub iwad: String,
    /// map to load, ExMy or MAPxx
    #[argh(option, default = "String::from(\"E1M1\")")]
    pub map: String,
    /// resolution width in pixels
    #[argh(option, default = "0")]
    pub width: u32,
    /// resolution height in pixels
    #[argh(option, default = "0")]
    pub height: u32,
    /// detail shift, 0 for high detail or 1 for low
    #[argh(option)]
    pub detail: Option<i32>,
    /// view size in blocks, 3 to 11
    #[argh(option)]
    pub screenblocks: Option<i32>,
    /// flip the level along the x axis
    #[argh(switch)]
    pub mirror: bool,
    /// light walls by their orientation
    #[argh(option)]
    pub fake_contrast: Option<bool>,
    /// animate liquid flats
    #[argh(option)]
    pub swirl: Option<bool>,
    /// where to write the frame
    #[argh(option, default = "String::from(\"room4doom-view.ppm\")")]
    pub output: String,
    /// game tic the frame is drawn at, drives flat swirl
    #[argh(option, default = "0")]
    pub tic: u32,
    /// print the render profile after the frame, needs the hprof feature
    #[argh(switch)]
    pub profile: bool,
}
