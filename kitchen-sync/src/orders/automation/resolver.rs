//! Free-text menu item resolution
//!
//! An ordered chain of matchers; the first one that finds a candidate wins.
//!
//! | # | Matcher | Example |
//! |---|---------|---------|
//! | 1 | exact (case-insensitive) | "garlic naan" -> "Garlic Naan" |
//! | 2 | singular/plural | "garlic naans" -> "Garlic Naan" |
//! | 3 | token subset | "naan" -> "Garlic Naan" |
//! | 4 | alias table | "coke" -> "Coca Cola" |

use crate::orders::error::{OrderError, OrderResult};
use enum_dispatch::enum_dispatch;
use shared::models::MenuItem;

/// Maximum suggestions returned with a miss
pub const MAX_SUGGESTIONS: usize = 3;

#[enum_dispatch]
pub trait ItemMatcher {
    /// Index into `candidates` of the match, if any
    fn find(&self, query: &str, candidates: &[&MenuItem]) -> Option<usize>;
}

pub struct ExactMatcher;

impl ItemMatcher for ExactMatcher {
    fn find(&self, query: &str, candidates: &[&MenuItem]) -> Option<usize> {
        let query = normalize(query);
        candidates.iter().position(|c| normalize(&c.name) == query)
    }
}

pub struct PluralMatcher;

impl ItemMatcher for PluralMatcher {
    fn find(&self, query: &str, candidates: &[&MenuItem]) -> Option<usize> {
        let query = singular_tokens(query);
        if query.is_empty() {
            return None;
        }
        candidates
            .iter()
            .position(|c| singular_tokens(&c.name) == query)
    }
}

/// Every query token appears in the candidate name; fewest extra tokens wins
pub struct TokenSubsetMatcher;

impl ItemMatcher for TokenSubsetMatcher {
    fn find(&self, query: &str, candidates: &[&MenuItem]) -> Option<usize> {
        let query = singular_tokens(query);
        if query.is_empty() {
            return None;
        }
        candidates
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| {
                let name = singular_tokens(&c.name);
                query
                    .iter()
                    .all(|t| name.contains(t))
                    .then(|| (idx, name.len() - query.len().min(name.len())))
            })
            .min_by_key(|(_, extra)| *extra)
            .map(|(idx, _)| idx)
    }
}

/// Fixed spoken-alias table; the canonical name is matched exactly or by plural form
pub struct AliasMatcher {
    aliases: Vec<(String, String)>,
}

impl AliasMatcher {
    pub fn new(aliases: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(alias, canonical)| (normalize(&alias), canonical))
                .collect(),
        }
    }
}

impl Default for AliasMatcher {
    fn default() -> Self {
        Self::new(
            DEFAULT_ALIASES
                .iter()
                .map(|(a, c)| (a.to_string(), c.to_string())),
        )
    }
}

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("wings", "chicken wings"),
    ("wing", "chicken wings"),
    ("fries", "french fries"),
    ("chips", "french fries"),
    ("coke", "coca cola"),
    ("soda", "soft drink"),
    ("pop", "soft drink"),
    ("water", "mineral water"),
];

impl ItemMatcher for AliasMatcher {
    fn find(&self, query: &str, candidates: &[&MenuItem]) -> Option<usize> {
        let query = normalize(query);
        let singular = singular_tokens(&query);
        let (_, canonical) = self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == query || singular_tokens(alias) == singular)?;
        ExactMatcher
            .find(canonical, candidates)
            .or_else(|| PluralMatcher.find(canonical, candidates))
    }
}

#[enum_dispatch(ItemMatcher)]
pub enum Matcher {
    Exact(ExactMatcher),
    Plural(PluralMatcher),
    TokenSubset(TokenSubsetMatcher),
    Alias(AliasMatcher),
}

/// Matcher chain over a tenant's menu
pub struct ItemResolver {
    chain: Vec<Matcher>,
}

impl Default for ItemResolver {
    fn default() -> Self {
        Self::new(vec![
            ExactMatcher.into(),
            PluralMatcher.into(),
            TokenSubsetMatcher.into(),
            AliasMatcher::default().into(),
        ])
    }
}

impl ItemResolver {
    pub fn new(chain: Vec<Matcher>) -> Self {
        Self { chain }
    }

    /// Resolve `query` against available items
    pub fn resolve<'a>(&self, query: &str, menu: &'a [MenuItem]) -> OrderResult<&'a MenuItem> {
        let available: Vec<&MenuItem> = menu.iter().filter(|m| m.is_available).collect();

        for matcher in &self.chain {
            if let Some(idx) = matcher.find(query, &available) {
                return Ok(available[idx]);
            }
        }

        Err(OrderError::NotFound {
            query: query.to_string(),
            suggestions: suggestions(query, &available, MAX_SUGGESTIONS),
        })
    }
}

/// Closest names by bigram similarity, best first
pub fn suggestions(query: &str, candidates: &[&MenuItem], limit: usize) -> Vec<String> {
    let query = normalize(query);
    let mut scored: Vec<(f64, &str)> = candidates
        .iter()
        .map(|c| (similarity(&query, &normalize(&c.name)), c.name.as_str()))
        .filter(|(score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Lowercase, punctuation stripped, whitespace collapsed
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn singular_tokens(text: &str) -> Vec<String> {
    normalize(text).split(' ').filter(|t| !t.is_empty()).map(singularize).collect()
}

fn singularize(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// Dice coefficient over character bigrams
fn similarity(a: &str, b: &str) -> f64 {
    let bigrams = |s: &str| -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let a = bigrams(a);
    let mut b = bigrams(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let total = a.len() + b.len();
    let mut shared = 0;
    for pair in &a {
        if let Some(pos) = b.iter().position(|p| p == pair) {
            b.swap_remove(pos);
            shared += 1;
        }
    }
    (2 * shared) as f64 / total as f64
}

/// Split a leading or trailing quantity off a query: "2 wings", "two naan", "naan x3"
pub fn parse_quantity(text: &str) -> (Option<i32>, String) {
    let normalized = normalize(text);
    let mut tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();

    if let Some(first) = tokens.first()
        && let Some(qty) = number_word(first)
        && tokens.len() > 1
    {
        tokens.remove(0);
        return (Some(qty), tokens.join(" "));
    }

    if let Some(last) = tokens.last()
        && tokens.len() > 1
        && let Some(qty) = last
            .strip_prefix('x')
            .and_then(|n| n.parse::<i32>().ok())
    {
        tokens.pop();
        return (Some(qty), tokens.join(" "));
    }

    (None, tokens.join(" "))
}

fn number_word(token: &str) -> Option<i32> {
    if let Ok(n) = token.parse::<i32>() {
        return Some(n);
    }
    let n = match token {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        _ => return None,
    };
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Vec<MenuItem> {
        vec![
            MenuItem::new("m1", "Garlic Naan", 80.0),
            MenuItem::new("m2", "Chicken Wings", 250.0),
            MenuItem::new("m3", "Butter Chicken", 320.0),
            MenuItem::new("m4", "Coca Cola", 60.0),
            MenuItem::new("m5", "Paneer Tikka", 280.0),
        ]
    }

    fn resolve(query: &str) -> OrderResult<String> {
        let menu = menu();
        ItemResolver::default()
            .resolve(query, &menu)
            .map(|m| m.id.clone())
    }

    #[test]
    fn test_exact_case_insensitive() {
        assert_eq!(resolve("GARLIC naan").unwrap(), "m1");
    }

    #[test]
    fn test_plural() {
        assert_eq!(resolve("garlic naans").unwrap(), "m1");
        assert_eq!(resolve("chicken wing").unwrap(), "m2");
    }

    #[test]
    fn test_token_subset_prefers_tighter_name() {
        // both chicken dishes contain "chicken"; equal extra tokens -> first listed
        assert_eq!(resolve("chicken").unwrap(), "m2");
        assert_eq!(resolve("tikka").unwrap(), "m5");
    }

    #[test]
    fn test_alias() {
        assert_eq!(resolve("coke").unwrap(), "m4");
        let matcher = AliasMatcher::default();
        let menu = menu();
        let refs: Vec<&MenuItem> = menu.iter().collect();
        assert_eq!(matcher.find("wings", &refs), Some(1));
    }

    #[test]
    fn test_unavailable_items_skipped() {
        let mut menu = menu();
        menu[0].is_available = false;
        assert!(ItemResolver::default().resolve("garlic naan", &menu).is_err());
    }

    #[test]
    fn test_miss_carries_suggestions() {
        match resolve("garlik nan") {
            Err(OrderError::NotFound { query, suggestions }) => {
                assert_eq!(query, "garlik nan");
                assert!(!suggestions.is_empty());
                assert!(suggestions.len() <= MAX_SUGGESTIONS);
                assert_eq!(suggestions[0], "Garlic Naan");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("2 wings"), (Some(2), "wings".to_string()));
        assert_eq!(parse_quantity("Two garlic naan"), (Some(2), "garlic naan".to_string()));
        assert_eq!(parse_quantity("naan x3"), (Some(3), "naan".to_string()));
        assert_eq!(parse_quantity("wings"), (None, "wings".to_string()));
        assert_eq!(parse_quantity("7"), (None, "7".to_string()));
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("wings"), "wing");
        assert_eq!(singularize("curries"), "curry");
        assert_eq!(singularize("dishes"), "dish");
        assert_eq!(singularize("glass"), "glass");
        assert_eq!(singularize("naan"), "naan");
    }
}
