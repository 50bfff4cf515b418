use crate::error::*;
use crate::overlay::{Captioner, FontCaptioner, Uncaptioned};
use crate::video::Tools;
use std::path::PathBuf;

/// Process-wide settings shared by every request.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where output directories and GIFs are written.
    pub frames_dir: PathBuf,
    /// Caption font. Without one, frames are delivered uncaptioned.
    pub font: Option<PathBuf>,
    /// Append requester and execution time to descriptions.
    pub extra_info: bool,
    pub tools: Tools,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            frames_dir: PathBuf::from("frames"),
            font: None,
            extra_info: false,
            tools: Tools::default(),
        }
    }
}

impl Settings {
    pub fn captioner(&self) -> Result<Box<dyn Captioner>> {
        match &self.font {
            Some(path) => Ok(Box::new(FontCaptioner::from_path(path)?)),
            None => Ok(Box::new(Uncaptioned)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_file_is_an_io_error() {
        let settings = Settings {
            font: Some(PathBuf::from("/nonexistent/font.ttf")),
            ..Settings::default()
        };

        let err = settings.captioner().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(Settings::default().captioner().is_ok());
    }
}
