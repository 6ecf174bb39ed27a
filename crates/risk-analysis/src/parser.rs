use analysis_core::RiskRecord;

/// Strips list numbering and bullet punctuation from both ends of a title.
fn strip_marker(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_ascii_digit() || c == '.' || c == '-' || c == ')' || c == ' '
    })
}

/// Best-effort structural parse of a generated risk list.
///
/// The input is expected to be a numbered or bulleted list but is never
/// validated: a line qualifies as a risk item when it opens with a digit or
/// a "-" bullet, and everything else is silently dropped. Within a
/// qualifying line the first ":" splits title from description; without one
/// the whole line becomes the title. Category and severity start unset.
pub fn parse_risk_items(text: &str) -> Vec<RiskRecord> {
    let mut risks = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let qualifies = line
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_digit())
            || line.starts_with('-');
        if !qualifies {
            continue;
        }

        let (title, description) = match line.split_once(':') {
            Some((head, tail)) => (strip_marker(head), tail.trim()),
            None => (strip_marker(line), ""),
        };
        risks.push(RiskRecord::new(title, description));
    }

    risks
}
