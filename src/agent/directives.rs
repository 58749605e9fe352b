//! Memory directives embedded in model output.
//!
//! The system prompt invites the model to persist facts by wrapping
//! them in `<ferrobot_memory>...</ferrobot_memory>` tags. The block is
//! extracted for the memory store and stripped from the reply before
//! the user sees it. Models mangle tags often enough that stripping
//! tolerates attributes, mixed case, and orphaned halves.

const START_TAG: &str = "<ferrobot_memory>";
const END_TAG: &str = "</ferrobot_memory>";
const OPEN_PREFIX: &str = "<ferrobot_memory";
const CLOSE_PREFIX: &str = "</ferrobot_memory";

/// Byte offset of `needle` in `haystack`, ignoring ASCII case. The
/// needles here are all ASCII, so byte offsets stay valid for slicing.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

/// Extract the first complete memory block, trimmed.
///
/// Returns an empty string when no complete `<ferrobot_memory>` block
/// is present.
pub fn extract_memory_block(content: &str) -> String {
    let Some(start) = find_ci(content, START_TAG) else {
        return String::new();
    };
    let body_start = start + START_TAG.len();
    let Some(end) = find_ci(&content[body_start..], END_TAG) else {
        return String::new();
    };
    content[body_start..body_start + end].trim().to_string()
}

/// Remove every memory tag and tagged block from the content.
///
/// Complete blocks are removed wholesale. An opening tag without a
/// matching close loses the tag itself but keeps the text after it;
/// stray closing tags are removed likewise. The result is trimmed.
pub fn strip_memory_block(content: &str) -> String {
    let mut stripped = content.to_string();

    // Opening tags, with their block when a close tag follows.
    loop {
        let Some(start) = find_ci(&stripped, OPEN_PREFIX) else {
            break;
        };
        let Some(tag_end) = stripped[start + OPEN_PREFIX.len()..].find('>') else {
            stripped.replace_range(start..start + OPEN_PREFIX.len(), "");
            continue;
        };
        let tag_end = start + OPEN_PREFIX.len() + tag_end;
        match find_ci(&stripped[tag_end + 1..], END_TAG) {
            Some(end) => {
                let end = tag_end + 1 + end + END_TAG.len();
                stripped.replace_range(start..end, "");
            }
            None => {
                stripped.replace_range(start..tag_end + 1, "");
            }
        }
    }

    // Orphaned closing tags.
    loop {
        let Some(pos) = find_ci(&stripped, CLOSE_PREFIX) else {
            break;
        };
        match stripped[pos + CLOSE_PREFIX.len()..].find('>') {
            Some(tag_end) => {
                let tag_end = pos + CLOSE_PREFIX.len() + tag_end;
                stripped.replace_range(pos..tag_end + 1, "");
            }
            None => {
                stripped.replace_range(pos..pos + CLOSE_PREFIX.len(), "");
            }
        }
    }

    stripped.trim().to_string()
}

/// Normalize a memory block into individual fact lines.
///
/// Trims each line, drops empties, and strips a leading `- ` bullet so
/// the store can apply its own formatting.
pub fn normalize_memory_lines(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| {
            let mut line = line.trim();
            if let Some(rest) = line.strip_prefix("- ") {
                line = rest.trim();
            }
            if line.is_empty() {
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect()
}
