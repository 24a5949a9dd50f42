//! Text rendering for diagnostics.
//!
//! Helpers that turn type names and dependency chains into the strings
//! shown in error messages and in `Container::describe` output.

/// Joins a dependency chain with arrows.
///
/// # Examples
/// ```
/// use rabt_support::rendering::render_chain;
///
/// let chain = vec!["Service", "Repository", "Service"];
/// assert_eq!(render_chain(&chain), "Service → Repository → Service");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut out = String::new();
    for (i, link) in chain.iter().enumerate() {
        if i > 0 {
            out.push_str(" → ");
        }
        out.push_str(link.as_ref());
    }
    out
}

/// One line of a rendered dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Nesting level, the root is 0.
    pub depth: usize,
    /// Display name of the type.
    pub type_name: String,
    /// Lifetime label, e.g. "Singleton". `None` for unregistered types.
    pub lifetime: Option<String>,
}

/// Renders a depth-first dependency walk as an indented tree.
///
/// ```text
/// [Transient] Service
///   [Singleton] Config
///   [Transient] Repository
///     [Singleton] Config
/// ```
///
/// Unregistered entries are marked `[missing]`.
pub fn render_tree(entries: &[TreeEntry]) -> String {
    let label_width = entries
        .iter()
        .map(|e| e.lifetime.as_deref().map_or("missing".len(), str::len))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for entry in entries {
        let label = entry.lifetime.as_deref().unwrap_or("missing");
        out.push_str(&"  ".repeat(entry.depth));
        out.push_str(&format!(
            "[{label:<width$}] {}\n",
            entry.type_name,
            width = label_width
        ));
    }
    out
}

/// Strips module paths from a fully qualified type name.
///
/// ```
/// use rabt_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::db::Pool"), "Pool");
/// assert_eq!(
///     shorten_type_name("rabt_container::handle::Handle<app::db::Pool>"),
///     "Handle<Pool>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut out = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                out.push_str(&segment);
                out.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    out.push_str(&segment);
    out
}

/// Picks registered type names that look like `requested`.
///
/// Scores substring hits on the full name highest, then hits on the
/// shortened name, then a shared prefix of at least three characters.
/// Returns at most `limit` names, best first.
pub fn suggest_similar(requested: &str, available: &[&str], limit: usize) -> Vec<String> {
    let wanted_full = requested.to_lowercase();
    let wanted_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(usize, &str)> = available
        .iter()
        .filter_map(|&candidate| {
            let full = candidate.to_lowercase();
            if full == wanted_full {
                return None;
            }
            if full.contains(&wanted_full) || wanted_full.contains(&full) {
                return Some((100, candidate));
            }

            let short = shorten_type_name(candidate).to_lowercase();
            if short.contains(&wanted_short) || wanted_short.contains(&short) {
                return Some((80, candidate));
            }

            let shared = short
                .chars()
                .zip(wanted_short.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (shared >= 3).then_some((shared * 10, candidate))
        })
        .collect();

    // stable sort keeps registration order among equal scores
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}
