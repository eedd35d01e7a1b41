// SPDX-FileCopyrightText: 2026 Hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query-driven excerpt extraction.

use hindsight_core::types::truncate_chars;

/// Separator placed between non-adjacent excerpts.
pub const CHUNK_SEPARATOR: &str = "\n---\n";

/// Lowercased query terms of two or more characters, deduplicated in order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query
        .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-')
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= 2)
    {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Collect every line mentioning a query term together with
/// `context_lines` lines on either side.
///
/// Overlapping or touching windows are merged so no line appears twice.
/// The result is capped at `max_chars` characters and is empty when nothing
/// matches.
pub fn extract_relevant(
    content: &str,
    query: &str,
    context_lines: usize,
    max_chars: usize,
) -> String {
    let terms = query_terms(query);
    if terms.is_empty() || max_chars == 0 {
        return String::new();
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut windows: Vec<(usize, usize)> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if !terms.iter().any(|t| lower.contains(t.as_str())) {
            continue;
        }
        let start = i.saturating_sub(context_lines);
        let end = (i + context_lines).min(lines.len() - 1);
        match windows.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => windows.push((start, end)),
        }
    }

    let joined = windows
        .iter()
        .map(|&(start, end)| lines[start..=end].join("\n"))
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR);
    truncate_chars(&joined, max_chars).0.to_string()
}
