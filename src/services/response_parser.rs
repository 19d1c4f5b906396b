//! Tolerant parsing of model output into a validated [`GenerationResult`].

use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

use crate::models::domain::GenerationResult;

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("valid fence regex"));

/// Locates the first JSON object in model output, which may be wrapped in a
/// Markdown fence or surrounded by prose.
///
/// The fence match stops at the first closing backticks, so a summary that
/// itself contains a code block cuts the fenced body short. When that body
/// does not hold a complete object the whole output is scanned instead.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let fenced = FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| s.contains('{'));

    if let Some(object) = fenced.and_then(balanced_object).or_else(|| balanced_object(raw)) {
        return Some(object);
    }

    let body = fenced.unwrap_or(raw);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

// Scans from the first `{` to its matching `}`, ignoring braces inside strings.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Removes `//` and `/* */` comments and trailing commas before `}` or `]`,
/// leaving string contents alone.
pub fn repair_json(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            (',', _) => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Extracts, repairs if needed, deserializes and validates a result.
pub fn parse_generation_result(raw: &str) -> Result<GenerationResult, String> {
    let json = extract_json_object(raw).ok_or_else(|| "no JSON object in response".to_string())?;

    let result: GenerationResult = match serde_json::from_str(json) {
        Ok(result) => result,
        Err(first) => {
            log::debug!("Strict JSON parse failed ({}), attempting repair", first);
            serde_json::from_str(&repair_json(json)).map_err(|e| format!("invalid JSON: {}", e))?
        }
    };

    result
        .validate()
        .map_err(|e| format!("result failed validation: {}", e))?;

    Ok(result)
}
