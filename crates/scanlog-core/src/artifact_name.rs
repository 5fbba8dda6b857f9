use std::path::{Path, PathBuf};

const FALLBACK_NAME: &str = "image";

pub fn sanitize_name(name: &str) -> String {
    let t = name.trim();
    if t.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    t.chars()
        .map(|ch| match ch {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

// First `<dir>/<sanitized-name><index>.<ext>` that does not exist yet,
// starting at index 0. Does not create anything.
pub fn unique_path(dir: &Path, name: &str, ext: &str) -> PathBuf {
    let base = sanitize_name(name);
    let ext = ext.trim_start_matches('.');
    let mut index: u64 = 0;
    loop {
        let p = dir.join(format!("{base}{index}.{ext}"));
        if !p.exists() {
            return p;
        }
        index += 1;
    }
}

// Glob-like match on a single file name: `*` matches any run of characters,
// `?` matches exactly one.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_ni = 0usize;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            star_ni = ni;
            pi += 1;
        } else if let Some(s) = star {
            // Let the last star swallow one more character.
            pi = s + 1;
            star_ni += 1;
            ni = star_ni;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sanitize_replaces_separators_and_spaces() {
        assert_eq!(sanitize_name("slot icon"), "slot_icon");
        assert_eq!(sanitize_name("../x\\y"), ".._x_y");
        assert_eq!(sanitize_name("   "), "image");
    }

    #[test]
    fn unique_path_picks_smallest_free_index() {
        let td = tempfile::tempdir().expect("tempdir");
        let dir = td.path();
        assert_eq!(unique_path(dir, "mat", "png"), dir.join("mat0.png"));

        fs::write(dir.join("mat0.png"), b"x").expect("write 0");
        fs::write(dir.join("mat1.png"), b"x").expect("write 1");
        assert_eq!(unique_path(dir, "mat", ".png"), dir.join("mat2.png"));

        fs::remove_file(dir.join("mat0.png")).expect("remove 0");
        assert_eq!(unique_path(dir, "mat", "png"), dir.join("mat0.png"));
    }

    #[test]
    fn wildcard_matching() {
        assert!(wildcard_match("*.png", "mat0.png"));
        assert!(wildcard_match("*.png", ".png"));
        assert!(!wildcard_match("*.png", "mat0.png.bak"));
        assert!(wildcard_match("mat?.png", "mat7.png"));
        assert!(!wildcard_match("mat?.png", "mat17.png"));
        assert!(wildcard_match("m*t*.p?g", "marketplace_item3.png"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("a", ""));
    }
}
