// ✂️ Text Normalizer - Free text → symptom labels
// "fever, headache & dizziness" → ["Fever", "Headache", "Dizziness"]

// ============================================================================
// SEPARATORS
// ============================================================================

/// Separators recognised between symptoms, applied in this order
pub const SEPARATORS: [&str; 3] = [",", "&", " and "];

/// Uniform delimiter every separator is rewritten to before splitting
const DELIMITER: char = ',';

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Split free-form input into trimmed, title-cased symptom labels.
///
/// Never fails: empty input (or input made only of separators) yields an
/// empty vector, input with no separator yields a single label.
pub fn normalize(text: &str) -> Vec<String> {
    let mut unified = text.to_string();
    for separator in SEPARATORS {
        unified = unified.replace(separator, &DELIMITER.to_string());
    }

    unified
        .split(DELIMITER)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(title_case)
        .collect()
}

/// Title-case a single label: "CHEST pain" → "Chest Pain"
///
/// Runs of whitespace collapse to a single space.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            let mut titled = String::with_capacity(word.len());
            if let Some(first) = chars.next() {
                push_titlecase(first, &mut titled);
            }
            titled.extend(chars.flat_map(char::to_lowercase));
            titled
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Titlecase one leading character. Only the head of a multi-char
/// uppercase expansion stays upper ("ß" → "Ss"); Latin digraphs map to
/// their titlecase form ("ǆ" → "ǅ").
fn push_titlecase(c: char, out: &mut String) {
    match c {
        '\u{01C4}'..='\u{01C6}' => out.push('\u{01C5}'),
        '\u{01C7}'..='\u{01C9}' => out.push('\u{01C8}'),
        '\u{01CA}'..='\u{01CC}' => out.push('\u{01CB}'),
        '\u{01F1}'..='\u{01F3}' => out.push('\u{01F2}'),
        _ => {
            let mut upper = c.to_uppercase();
            if let Some(head) = upper.next() {
                out.push(head);
            }
            out.extend(upper.flat_map(char::to_lowercase));
        }
    }
}

/// Normalize a single label that is already known to be one symptom
/// (checklist selections, API payloads). Returns None for blank input.
pub fn normalize_label(label: &str) -> Option<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(title_case(trimmed))
    }
}

// ============================================================================
// TESTS
// ============================================================================
