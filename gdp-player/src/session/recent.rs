//! Recently requested songs

use std::collections::VecDeque;

/// Distinct song titles in request order, bounded by `limit`
#[derive(Debug, Clone)]
pub struct RecentSongs {
    limit: usize,
    songs: VecDeque<String>,
}

impl RecentSongs {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            songs: VecDeque::with_capacity(limit + 1),
        }
    }

    /// Remember a requested song
    ///
    /// A title already in the list keeps its position. Returns whether the
    /// list changed.
    pub fn record(&mut self, song: &str) -> bool {
        if self.songs.iter().any(|s| s == song) {
            return false;
        }

        self.songs.push_back(song.to_string());
        while self.songs.len() > self.limit {
            self.songs.pop_front();
        }
        true
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.songs.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
