use std::path::{Path, PathBuf};

use crate::PlayerError;

/// Ordered playlist with a cursor that wraps in both directions.
#[derive(Clone, Debug, Default)]
pub struct TrackSequencer {
    tracks: Vec<PathBuf>,
    index: usize,
}

impl TrackSequencer {
    pub fn new(tracks: Vec<PathBuf>) -> Self {
        Self { tracks, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn tracks(&self) -> &[PathBuf] {
        &self.tracks
    }

    pub fn current(&self) -> Result<&Path, PlayerError> {
        self.tracks.get(self.index).map(PathBuf::as_path).ok_or(PlayerError::NoTracks)
    }

    pub fn advance(&mut self) -> Result<&Path, PlayerError> {
        if self.tracks.is_empty() {
            return Err(PlayerError::NoTracks);
        }

        self.index = (self.index + 1) % self.tracks.len();
        self.current()
    }

    pub fn rewind(&mut self) -> Result<&Path, PlayerError> {
        if self.tracks.is_empty() {
            return Err(PlayerError::NoTracks);
        }

        let len = self.tracks.len();
        self.index = (self.index + len - 1) % len;
        self.current()
    }

    /// Replaces the playlist, keeping the cursor on the same source when it
    /// survived the refresh.
    pub fn refresh(&mut self, tracks: Vec<PathBuf>) {
        let current = self.tracks.get(self.index).cloned();
        self.tracks = tracks;

        if self.tracks.is_empty() {
            self.index = 0;
            return;
        }

        self.index = current
            .and_then(|current| self.tracks.iter().position(|track| *track == current))
            .unwrap_or(self.index % self.tracks.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(names: &[&str]) -> TrackSequencer {
        TrackSequencer::new(names.iter().map(PathBuf::from).collect())
    }

    #[test]
    fn advance_wraps_to_start() {
        let mut sequencer = playlist(&["A", "B", "C"]);
        assert_eq!(sequencer.current().unwrap(), Path::new("A"));
        assert_eq!(sequencer.advance().unwrap(), Path::new("B"));
        assert_eq!(sequencer.index(), 1);
        assert_eq!(sequencer.advance().unwrap(), Path::new("C"));
        assert_eq!(sequencer.advance().unwrap(), Path::new("A"));
        assert_eq!(sequencer.index(), 0);
    }

    #[test]
    fn rewind_wraps_to_end() {
        let mut sequencer = playlist(&["A", "B", "C"]);
        assert_eq!(sequencer.rewind().unwrap(), Path::new("C"));
        assert_eq!(sequencer.advance().unwrap(), Path::new("A"));
    }

    #[test]
    fn full_cycle_returns_home() {
        for len in 1..6 {
            let names: Vec<String> = (0..len).map(|i| format!("t{i}")).collect();
            let mut sequencer = TrackSequencer::new(names.iter().map(PathBuf::from).collect());
            sequencer.advance().unwrap();
            let home = sequencer.index();
            for _ in 0..len {
                sequencer.advance().unwrap();
            }
            assert_eq!(sequencer.index(), home);
            sequencer.advance().unwrap();
            sequencer.rewind().unwrap();
            assert_eq!(sequencer.index(), home);
        }
    }

    #[test]
    fn empty_playlist_reports_no_tracks() {
        let mut sequencer = TrackSequencer::default();
        assert!(matches!(sequencer.current(), Err(PlayerError::NoTracks)));
        assert!(matches!(sequencer.advance(), Err(PlayerError::NoTracks)));
        assert!(matches!(sequencer.rewind(), Err(PlayerError::NoTracks)));
    }

    #[test]
    fn refresh_follows_current_source() {
        let mut sequencer = playlist(&["A", "B", "C"]);
        sequencer.advance().unwrap();
        sequencer.refresh(["0", "A", "B", "C"].iter().map(PathBuf::from).collect());
        assert_eq!(sequencer.current().unwrap(), Path::new("B"));
    }

    #[test]
    fn refresh_clamps_when_source_vanished() {
        let mut sequencer = playlist(&["A", "B", "C"]);
        sequencer.rewind().unwrap();
        sequencer.refresh(["A", "B"].iter().map(PathBuf::from).collect());
        assert_eq!(sequencer.index(), 0);

        sequencer.refresh(Vec::new());
        assert!(sequencer.is_empty());
        assert!(matches!(sequencer.current(), Err(PlayerError::NoTracks)));
    }
}
