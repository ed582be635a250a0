/// One two-line element set as it appeared in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TleLines {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

/// Parse text that may hold several element sets, each in 2-line form
/// (no name) or 3-line form (name first). Unrecognised lines are skipped.
pub fn parse_multi_tle(content: &str) -> Vec<TleLines> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push(TleLines {
                name: None,
                line1: lines[i].to_string(),
                line2: lines[i + 1].to_string(),
            });
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            result.push(TleLines {
                name: Some(lines[i].to_string()),
                line1: lines[i + 1].to_string(),
                line2: lines[i + 2].to_string(),
            });
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}

/// The last complete element set in `content`, if any.
pub fn parse_last_tle(content: &str) -> Option<TleLines> {
    parse_multi_tle(content).pop()
}

/// Catalog number from columns 3-7 of line 1, without a full parse.
pub fn catalog_number(line1: &str) -> Option<u32> {
    line1.get(2..7)?.trim().parse().ok()
}
