//! Writing generated games to disk so they can be opened in a browser.

use crate::session::GameVersion;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("USERPROFILE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn exports_dir() -> PathBuf {
    home_dir().join(".playforge").join("exports")
}

/// Write the version's HTML under `~/.playforge/exports/` and return the
/// final path.
pub fn export_version(version: &GameVersion) -> io::Result<PathBuf> {
    let file_name = format!("{}-v{}.html", slug(&version.title), version.id + 1);
    write_html(&exports_dir(), &file_name, &version.files.html)
}

/// Atomic write: the full document lands under a temp name first, then is
/// renamed into place, so a half-written game never carries the final name.
fn write_html(dir: &Path, file_name: &str, html: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let final_path = dir.join(file_name);
    let tmp_path = dir.join(format!("{file_name}.tmp"));

    fs::write(&tmp_path, html.as_bytes())?;
    match fs::rename(&tmp_path, &final_path) {
        Ok(()) => Ok(final_path),
        Err(rename_err) => {
            if final_path.exists() {
                fs::remove_file(&final_path)?;
                fs::rename(&tmp_path, &final_path)?;
                Ok(final_path)
            } else {
                Err(rename_err)
            }
        }
    }
}

fn slug(raw: &str) -> String {
    let mut out = String::new();
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if (ch == ' ' || ch == '-' || ch == '_') && !out.ends_with('-') {
            out.push('-');
        }
        if out.len() >= 48 {
            break;
        }
    }
    let out = out.trim_matches('-').to_string();
    if out.is_empty() {
        "game".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{slug, write_html};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "playforge_export_{prefix}_{}_{}",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn slug_flattens_titles_to_file_name_material() {
        assert_eq!(slug("Asteroid Dodge!"), "asteroid-dodge");
        assert_eq!(slug("  ~~~  "), "game");
        assert_eq!(slug("snake -- with_walls"), "snake-with-walls");
    }

    #[test]
    fn write_html_replaces_an_existing_export() {
        let dir = temp_dir("replace");
        let first = write_html(&dir, "pong-v1.html", "<html>1</html>").expect("first write");
        let second = write_html(&dir, "pong-v1.html", "<html>2</html>").expect("second write");
        assert_eq!(first, second);

        let contents = fs::read_to_string(&second).expect("export should read back");
        assert_eq!(contents, "<html>2</html>");
        assert!(!dir.join("pong-v1.html.tmp").exists());

        let _ = fs::remove_dir_all(dir);
    }
}
