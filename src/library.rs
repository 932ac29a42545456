use std::path::{Path, PathBuf};

use crate::utils::{find_file, remove_illegal_characters};

fn normalize(s: &str) -> String {
    remove_illegal_characters(&s.to_lowercase())
}

/// Searches an `artist/album/file` library tree.
///
/// Without `artist`, a file matches when `"<file> <album> <artist>"` contains
/// `term`. With `artist`, the artist folder must contain `artist` and the file
/// name must contain `term`. Comparisons are lower-cased and sanitized.
pub fn search_library(root: &Path, term: &str, artist: Option<&str>) -> Vec<PathBuf> {
    let term = normalize(term);
    let artist = artist.map(normalize);

    let mut matches: Vec<PathBuf> = find_file(root, "*/*/*.*")
        .into_iter()
        .filter(|path| {
            let part = |p: Option<&Path>| {
                p.and_then(Path::file_name)
                    .map(|n| normalize(&n.to_string_lossy()))
                    .unwrap_or_default()
            };
            let song = part(Some(path.as_path()));
            let album_dir = path.parent();
            let album = part(album_dir);
            let artist_dir = part(album_dir.and_then(Path::parent));

            match &artist {
                None => format!("{} {} {}", song, album, artist_dir).contains(&term),
                Some(artist) => artist_dir.contains(artist.as_str()) && song.contains(&term),
            }
        })
        .collect();

    matches.sort();
    log::debug!("📚 [LIBRARY] {} match(es) for '{}' in {:?}", matches.len(), term, root);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let tracks = [
            ("Dolly Parton", "Jolene", "01 Jolene.m4a"),
            ("Dolly Parton", "Jolene", "02 When Someone Wants to Leave.m4a"),
            ("The White Stripes", "Jolene - Single", "01 Jolene (Live).mp3"),
            ("Billy Joel", "Piano Man", "01 Piano Man.mp3"),
        ];
        for (artist, album, file) in tracks {
            let album_dir = dir.path().join(artist).join(album);
            fs::create_dir_all(&album_dir).unwrap();
            fs::write(album_dir.join(file), b"x").unwrap();
        }
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_term_matches_song_album_or_artist() {
        let lib = library();
        let found = search_library(lib.path(), "JOLENE", None);
        assert_eq!(found.len(), 3);

        let by_artist = search_library(lib.path(), "billy joel", None);
        assert_eq!(names(&by_artist), vec!["01 Piano Man.mp3"]);
    }

    #[test]
    fn test_artist_narrows_to_song_names() {
        let lib = library();
        let found = search_library(lib.path(), "jolene", Some("Dolly Parton"));
        assert_eq!(names(&found), vec!["01 Jolene.m4a"]);
    }

    #[test]
    fn test_illegal_characters_are_ignored_in_term() {
        let lib = library();
        let found = search_library(lib.path(), "piano: man?", None);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_files_at_wrong_depth_are_skipped() {
        let lib = library();
        fs::write(lib.path().join("Jolene.mp3"), b"x").unwrap();
        assert_eq!(search_library(lib.path(), "jolene", None).len(), 3);
    }
}
