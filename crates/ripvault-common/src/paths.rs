//! Archive naming helpers.

use std::path::PathBuf;

/// Directory under every destination root that holds movies.
pub const MOVIES_DIR: &str = "Movies";

/// Checksum manifest filename at every destination root.
pub const MANIFEST_FILE: &str = "Movies.sha256";

/// Staging directory under every destination root.
pub const STAGING_DIR: &str = ".input";

/// Label for a video height. 2160 lines is reported as `4k`.
pub fn resolution_label(height: u32) -> String {
    match height {
        0 => "unknown".to_string(),
        2160 => "4k".to_string(),
        h => format!("{}p", h),
    }
}

/// `"{name} ({year})"`
pub fn movie_dir_name(name: &str, year: &str) -> String {
    format!("{} ({})", name, year)
}

/// `"{name} ({year}) - {resolution}.mkv"`
pub fn movie_file_name(name: &str, year: &str, resolution: &str) -> String {
    format!("{} ({}) - {}.mkv", name, year, resolution)
}

/// Final path of an artifact relative to the `Movies` directory.
///
/// This is also the path recorded in the checksum manifest.
pub fn movie_relative_path(name: &str, year: &str, resolution: &str, use_movie_dir: bool) -> PathBuf {
    let file = movie_file_name(name, year, resolution);
    if use_movie_dir {
        PathBuf::from(movie_dir_name(name, year)).join(file)
    } else {
        PathBuf::from(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_label() {
        assert_eq!(resolution_label(2160), "4k");
        assert_eq!(resolution_label(1080), "1080p");
        assert_eq!(resolution_label(480), "480p");
        assert_eq!(resolution_label(0), "unknown");
    }

    #[test]
    fn test_movie_names() {
        assert_eq!(movie_dir_name("Foo", "1999"), "Foo (1999)");
        assert_eq!(
            movie_file_name("Foo", "1999", "1080p"),
            "Foo (1999) - 1080p.mkv"
        );
    }

    #[test]
    fn test_movie_relative_path() {
        assert_eq!(
            movie_relative_path("Foo", "1999", "1080p", true),
            PathBuf::from("Foo (1999)/Foo (1999) - 1080p.mkv")
        );
        assert_eq!(
            movie_relative_path("Foo", "1999", "4k", false),
            PathBuf::from("Foo (1999) - 4k.mkv")
        );
    }
}
