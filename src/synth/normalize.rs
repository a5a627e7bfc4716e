/// Clean up a raw model completion before it is treated as SQL.
///
/// Surrounding whitespace is always trimmed. With `strip_fences`, one
/// surrounding markdown code fence and a leading `sql` language tag are
/// removed as well, since the model does not always follow the instruction
/// to omit them.
pub fn normalize_completion(text: &str, strip_fences: bool) -> String {
    let text = text.trim();
    if !strip_fences {
        return text.to_string();
    }

    let text = strip_fence(text).trim();
    strip_language_tag(text).trim().to_string()
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // the rest of the opening line is the info string
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body)
}

fn strip_language_tag(text: &str) -> &str {
    match text.split_once(char::is_whitespace) {
        Some((tag, rest)) if tag.eq_ignore_ascii_case("sql") => rest,
        _ => text,
    }
}
