//! Text rendering helpers shared by both bots.

/// Placeholder for a value that was never configured.
pub const UNSET: &str = "*non impostato*";

/// Placeholder for a stored value outside its accepted range.
pub const INVALID: &str = "*valore non valido*";

/// Longest text accepted in one embed-style field.
pub const FIELD_LIMIT: usize = 1024;

/// Longest single chat message.
pub const MESSAGE_LIMIT: usize = 2000;

const ELLIPSIS: &str = "...";

/// `N%` for thresholds in `[0, 100]`.
pub fn percent(value: Option<i64>) -> String {
    match value {
        None => UNSET.to_string(),
        Some(v) if !(0..=100).contains(&v) => INVALID.to_string(),
        Some(v) => format!("{v}%"),
    }
}

/// Duration in seconds as days, hours, minutes and seconds.
pub fn duration(value: Option<i64>) -> String {
    match value {
        None => UNSET.to_string(),
        Some(v) if v < 0 => INVALID.to_string(),
        Some(v) => {
            let days = v / 86_400;
            let hours = (v % 86_400) / 3_600;
            let minutes = (v % 3_600) / 60;
            let seconds = v % 60;
            format!("{days} giorni, {hours} ore, {minutes} minuti, {seconds} secondi")
        }
    }
}

/// Cut `text` to at most `limit` characters, ending with `...` when cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Shortest cut of an item before the list starts dropping items instead.
const MIN_ITEM_CHARS: usize = 10;

/// Render `items` as a markdown bullet list that fits in `limit`.
///
/// When the full list is too long every item is cut to an equal share of
/// the limit. When that share gets too small, trailing items are dropped and
/// counted in a final `- ...e altri N` line.
pub fn bullet_list<S: AsRef<str>>(items: &[S], limit: usize) -> String {
    let full = items
        .iter()
        .map(|item| format!("- {}", item.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");
    if full.chars().count() <= limit || items.is_empty() {
        return full;
    }

    // "- " prefix, "..." suffix, newline separator.
    let per_item = (limit / items.len()).saturating_sub(6);
    if per_item >= MIN_ITEM_CHARS {
        return items
            .iter()
            .map(|item| {
                let cut: String = item.as_ref().chars().take(per_item).collect();
                format!("- {cut}{ELLIPSIS}")
            })
            .collect::<Vec<_>>()
            .join("\n");
    }

    let tail_room = format!("\n- {ELLIPSIS}e altri {}", items.len()).chars().count();
    let mut lines = Vec::new();
    let mut used = 0;
    for item in items {
        let line = format!("- {}", truncate(item.as_ref(), MIN_ITEM_CHARS * 10));
        let cost = line.chars().count() + usize::from(!lines.is_empty());
        if used + cost + tail_room > limit {
            break;
        }
        used += cost;
        lines.push(line);
    }
    lines.push(format!("- {ELLIPSIS}e altri {}", items.len() - lines.len()));
    lines.join("\n")
}

/// Join whole `items` with `separator` into chunks of at most `limit`
/// characters. An item longer than `limit` gets a chunk of its own.
pub fn join_within<S: AsRef<str>>(items: &[S], separator: &str, limit: usize) -> Vec<String> {
    let sep_len = separator.chars().count();
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for item in items {
        let item = item.as_ref();
        let item_len = item.chars().count();
        if !current.is_empty() && current_len + sep_len + item_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str(separator);
            current_len += sep_len;
        }
        current.push_str(item);
        current_len += item_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split a long message into chunks of at most `limit` characters,
/// preferring line boundaries.
pub fn split_message(content: &str, limit: usize) -> Vec<String> {
    if content.chars().count() <= limit {
        return vec![content.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in content.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            // Hard-split a line that alone exceeds the limit.
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == limit {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(None), UNSET);
        assert_eq!(percent(Some(50)), "50%");
        assert_eq!(percent(Some(0)), "0%");
        assert_eq!(percent(Some(101)), INVALID);
        assert_eq!(percent(Some(-1)), INVALID);
    }

    #[test]
    fn test_duration() {
        assert_eq!(duration(None), UNSET);
        assert_eq!(duration(Some(-5)), INVALID);
        assert_eq!(
            duration(Some(90_061)),
            "1 giorni, 1 ore, 1 minuti, 1 secondi"
        );
        assert_eq!(duration(Some(0)), "0 giorni, 0 ore, 0 minuti, 0 secondi");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a".repeat(1100);
        let cut = truncate(&long, FIELD_LIMIT);
        assert_eq!(cut.chars().count(), FIELD_LIMIT);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_bullet_list_cuts_each_item() {
        assert_eq!(bullet_list(&["a", "b"], FIELD_LIMIT), "- a\n- b");

        let items = vec!["x".repeat(600), "y".repeat(600)];
        let rendered = bullet_list(&items, FIELD_LIMIT);
        assert!(rendered.chars().count() <= FIELD_LIMIT);
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.lines().all(|line| line.ends_with("...")));
    }

    #[test]
    fn test_bullet_list_drops_items_past_the_limit() {
        let urls = (0..300)
            .map(|i| format!("https://site.example/articolo-{i}"))
            .collect::<Vec<_>>();
        let rendered = bullet_list(&urls, FIELD_LIMIT);
        assert!(rendered.chars().count() <= FIELD_LIMIT);

        let shown = rendered.lines().count() - 1;
        assert!(shown > 0);
        assert_eq!(
            rendered.lines().last().unwrap(),
            format!("- ...e altri {}", 300 - shown)
        );
        assert_eq!(rendered.lines().next().unwrap(), "- https://site.example/articolo-0");
    }

    #[test]
    fn test_join_within_keeps_items_whole() {
        assert!(join_within(&[] as &[&str], ", ", 10).is_empty());
        assert_eq!(join_within(&["ab", "cd", "ef"], ", ", 6), vec!["ab, cd", "ef"]);

        let mentions = (0..250u64)
            .map(|i| format!("<@{}>", 100_000_000_000_000_000 + i))
            .collect::<Vec<_>>();
        let chunks = join_within(&mentions, ", ", MESSAGE_LIMIT);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MESSAGE_LIMIT));
        let rejoined = chunks
            .iter()
            .flat_map(|c| c.split(", "))
            .collect::<Vec<_>>();
        assert_eq!(rejoined, mentions);
    }

    #[test]
    fn test_split_message() {
        assert_eq!(split_message("hello", 2000), vec!["hello"]);

        let content = format!("{}\n{}", "a".repeat(1500), "b".repeat(1500));
        let chunks = split_message(&content, 2000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 2000));

        let chunks = split_message(&"c".repeat(4500), 2000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].chars().count(), 500);
    }
}
