use crate::config::Settings;
use crate::video::Tools;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "kinoframes")]
pub enum Opts {
    #[structopt(
        name = "request",
        about = "Resolves a request comment into images and prints the outcome as JSON"
    )]
    Request(RequestArgs),

    #[structopt(
        name = "gif",
        about = "Resolves a request comment into an animated GIF, whatever its command"
    )]
    Gif(RequestArgs),

    #[structopt(name = "info", about = "Prints frame rate, size and aspect ratio of a video")]
    Info(InfoArgs),
}

#[derive(Debug, StructOpt)]
pub struct RequestArgs {
    #[structopt(
        long = "catalog",
        env = "KINOFRAMES_CATALOG",
        help = "JSON file listing the known movies and episodes"
    )]
    pub catalog: PathBuf,

    #[structopt(flatten)]
    pub common: Common,

    #[structopt(long = "user", default_value = "", help = "Name credited in the description")]
    pub user: String,

    #[structopt(long = "id", default_value = "request", help = "Request identifier")]
    pub id: String,

    #[structopt(
        long = "extra-info",
        help = "Append requester and execution time to the description"
    )]
    pub extra_info: bool,

    #[structopt(help = "Request comment, e.g. `!req Stalker (1979) [a quote] [1:05:00]`")]
    pub comment: String,
}

#[derive(Debug, StructOpt)]
pub struct Common {
    #[structopt(
        long = "frames-dir",
        env = "KINOFRAMES_FRAMES_DIR",
        default_value = "frames",
        help = "Directory output images and GIFs are written to"
    )]
    pub frames_dir: PathBuf,

    #[structopt(
        long = "font",
        env = "KINOFRAMES_FONT",
        help = "TrueType/OpenType font used for captions. Frames are left uncaptioned without one."
    )]
    pub font: Option<PathBuf>,

    #[structopt(
        long = "ffmpeg",
        env = "KINOFRAMES_FFMPEG",
        default_value = "ffmpeg",
        help = "ffmpeg binary"
    )]
    pub ffmpeg: String,

    #[structopt(
        long = "ffprobe",
        env = "KINOFRAMES_FFPROBE",
        default_value = "ffprobe",
        help = "ffprobe binary"
    )]
    pub ffprobe: String,
}

impl Common {
    pub fn tools(&self) -> Tools {
        Tools {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
        }
    }
}

impl RequestArgs {
    pub fn settings(&self) -> Settings {
        Settings {
            frames_dir: self.common.frames_dir.clone(),
            font: self.common.font.clone(),
            extra_info: self.extra_info,
            tools: self.common.tools(),
        }
    }
}

#[derive(Debug, StructOpt)]
pub struct InfoArgs {
    #[structopt(flatten)]
    pub common: Common,

    #[structopt(help = "Input video file")]
    pub video: PathBuf,
}
