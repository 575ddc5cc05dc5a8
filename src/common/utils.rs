// File-name helpers shared by client and server

/// Reduce a requested name to its last path component.
///
/// Both `/` and `\` count as separators regardless of platform. Returns `None`
/// when nothing usable is left (`""`, `"."`, `".."`, or a bare separator), so
/// the result can always be joined under a root directory without escaping it.
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    let base = name
        .trim()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or("");

    match base {
        "" | "." | ".." => None,
        b if b.contains('\0') => None,
        b => Some(b),
    }
}

/// Split a listing body into names, dropping blank and whitespace-only lines.
pub fn parse_names(body: &str) -> Vec<String> {
    body.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
