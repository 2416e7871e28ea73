//! Show and audio file selection rules

use super::models::{AudioFileEntry, ShowMetadata};
use gdp_common::events::SongInfo;
use rand::seq::SliceRandom;
use rand::Rng;

/// Remove and return a uniformly random show from the candidates
pub fn take_random_show<R: Rng + ?Sized>(shows: &mut Vec<String>, rng: &mut R) -> Option<String> {
    if shows.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..shows.len());
    Some(shows.swap_remove(index))
}

/// Files of the given format whose name contains the song title (case-insensitive)
pub fn matching_audio_files<'a>(
    metadata: &'a ShowMetadata,
    song: &str,
    format: &str,
) -> Vec<&'a AudioFileEntry> {
    let needle = song.to_lowercase();
    metadata
        .files
        .iter()
        .filter(|f| f.format == format && f.name.to_lowercase().contains(&needle))
        .collect()
}

/// Random matching file, if the show has any
pub fn choose_audio_file<R: Rng + ?Sized>(
    metadata: &ShowMetadata,
    song: &str,
    format: &str,
    rng: &mut R,
) -> Option<AudioFileEntry> {
    matching_audio_files(metadata, song, format)
        .choose(rng)
        .map(|entry| (*entry).clone())
}

pub fn song_info(metadata: &ShowMetadata, entry: &AudioFileEntry) -> SongInfo {
    SongInfo {
        title: entry.name.clone(),
        artist: metadata
            .metadata
            .creator()
            .unwrap_or("Unknown Artist")
            .to_string(),
        album: metadata
            .metadata
            .title()
            .unwrap_or("Unknown Album")
            .to_string(),
    }
}

/// Status line for a show that has no matching audio file
pub fn not_played_message(song: &str, metadata: &ShowMetadata) -> String {
    format!(
        "'{}' not played on {} - {}",
        song,
        metadata.metadata.date().unwrap_or("Unknown Date"),
        metadata.metadata.title().unwrap_or("Unknown Show"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::models::ShowDetails;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(name: &str, format: &str) -> AudioFileEntry {
        AudioFileEntry {
            name: name.to_string(),
            format: format.to_string(),
        }
    }

    fn cornell() -> ShowMetadata {
        ShowMetadata {
            files: vec![
                entry("gd77-05-08d1t01.mp3", "VBR MP3"),
                entry("gd77-05-08d2t04 Scarlet Begonias.mp3", "VBR MP3"),
                entry("gd77-05-08d2t04 Scarlet Begonias.flac", "Flac"),
                entry("gd77-05-08d3t02 scarlet begonias (reprise).mp3", "VBR MP3"),
                entry("gd77-05-08d2t04 Scarlet Begonias.ogg", "Ogg Vorbis"),
            ],
            metadata: ShowDetails::new(
                Some("1977-05-08"),
                Some("Grateful Dead Live at Barton Hall"),
                Some("Grateful Dead"),
            ),
        }
    }

    #[test]
    fn test_matching_is_case_insensitive_and_format_exact() {
        let meta = cornell();
        let names: Vec<&str> = matching_audio_files(&meta, "SCARLET begonias", "VBR MP3")
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();

        assert_eq!(
            names,
            vec![
                "gd77-05-08d2t04 Scarlet Begonias.mp3",
                "gd77-05-08d3t02 scarlet begonias (reprise).mp3",
            ]
        );

        assert!(matching_audio_files(&meta, "Scarlet", "vbr mp3").is_empty());
    }

    #[test]
    fn test_choose_returns_a_match_or_none() {
        let meta = cornell();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let chosen = choose_audio_file(&meta, "scarlet", "VBR MP3", &mut rng).unwrap();
            assert_eq!(chosen.format, "VBR MP3");
            assert!(chosen.name.to_lowercase().contains("scarlet"));
        }

        assert!(choose_audio_file(&meta, "Dark Star", "VBR MP3", &mut rng).is_none());
    }

    #[test]
    fn test_take_random_show_drains_every_show_once() {
        let mut shows: Vec<String> = (0..10).map(|i| format!("show-{}", i)).collect();
        let mut rng = StdRng::seed_from_u64(42);

        let mut taken = Vec::new();
        while let Some(show) = take_random_show(&mut shows, &mut rng) {
            taken.push(show);
        }

        assert!(shows.is_empty());
        taken.sort();
        let mut expected: Vec<String> = (0..10).map(|i| format!("show-{}", i)).collect();
        expected.sort();
        assert_eq!(taken, expected);
    }

    #[test]
    fn test_song_info_uses_show_metadata() {
        let meta = cornell();
        let info = song_info(&meta, &meta.files[1]);
        assert_eq!(info.title, "gd77-05-08d2t04 Scarlet Begonias.mp3");
        assert_eq!(info.artist, "Grateful Dead");
        assert_eq!(info.album, "Grateful Dead Live at Barton Hall");
    }

    #[test]
    fn test_song_info_defaults() {
        let meta = ShowMetadata::default();
        let info = song_info(&meta, &entry("t.mp3", "VBR MP3"));
        assert_eq!(info.artist, "Unknown Artist");
        assert_eq!(info.album, "Unknown Album");
    }

    #[test]
    fn test_not_played_message() {
        assert_eq!(
            not_played_message("Dark Star", &cornell()),
            "'Dark Star' not played on 1977-05-08 - Grateful Dead Live at Barton Hall"
        );
        assert_eq!(
            not_played_message("Dark Star", &ShowMetadata::default()),
            "'Dark Star' not played on Unknown Date - Unknown Show"
        );
    }
}
