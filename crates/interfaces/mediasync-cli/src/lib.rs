pub mod commands;
pub mod settings;

use clap::ValueEnum;
use mediasync_core::MediaType;
use mediasync_pipeline::AlbumMode;

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum CliMediaType {
    Video,
    Picture,
}

impl From<CliMediaType> for MediaType {
    fn from(t: CliMediaType) -> Self {
        match t {
            CliMediaType::Video => MediaType::Video,
            CliMediaType::Picture => MediaType::Picture,
        }
    }
}

#[derive(ValueEnum, Clone, Debug, Copy, Default, PartialEq, Eq)]
pub enum CliSourceKind {
    /// Plain folders and zip archives
    #[default]
    Folder,
    /// Google Photos Takeout export
    Takeout,
}

/// `--into-album` wins over `--create-albums`.
pub fn album_mode(into_album: Option<String>, create_albums: bool) -> AlbumMode {
    match into_album {
        Some(name) if !name.trim().is_empty() => AlbumMode::Into(name),
        _ if create_albums => AlbumMode::Mirror,
        _ => AlbumMode::Off,
    }
}
