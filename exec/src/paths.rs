//! Lexical path manipulation for laying out the input tree. All of these
//! operate on strings only; nothing here touches the filesystem.

/// How many directory levels above the working directory a relative path
/// reaches through `..` segments. `0` for paths that stay inside it.
pub fn parent_directory_levels(path: &str) -> usize {
    let mut current: i64 = 0;
    let mut lowest: i64 = 0;

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                current -= 1;
                lowest = lowest.min(current);
            }
            _ => current += 1,
        }
    }
    (-lowest) as usize
}

/// The last `n` segments of `path`, joined back with `/`. `None` if the
/// path has fewer segments than requested.
pub fn last_n_segments(path: &str, n: usize) -> Option<String> {
    if n == 0 {
        return Some(String::new());
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < n {
        return None;
    }
    Some(segments[segments.len() - n..].join("/"))
}

/// Lexically normalizes a path: collapses `.`, empty segments and
/// parent-directory segments where a parent is available. Leading `..`
/// segments (and an initial `/`) are preserved.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut result = if absolute {
        "/".to_string()
    } else {
        String::new()
    };
    result.push_str(&segments.join("/"));
    result
}
