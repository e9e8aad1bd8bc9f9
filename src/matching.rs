//! Heuristic identity matching engine.
//!
//! Scores whether a discovered external identifier (an Instagram handle, a
//! LinkedIn slug) plausibly belongs to a named person or company. The
//! contract is best-effort ranking, not certainty: false positives and
//! negatives are expected, the weights just keep them from dominating.

/// Minimum score for a candidate to be accepted as a person match.
pub const PERSON_MATCH_THRESHOLD: i32 = 6;

/// Minimum score for a candidate to be accepted as a company match.
pub const COMPANY_MATCH_THRESHOLD: i32 = 5;

/// Reserved words that suggest the handle is not a personal account.
const GENERIC_WORDS: &[&str] = &["admin", "user", "test", "oficial", "official", "company", "brand"];

/// Words that suggest a non-company account. "oficial"/"official" is
/// deliberately absent: companies legitimately use it.
const PERSONAL_INDICATORS: &[&str] = &["personal", "admin", "user"];

/// Legal-entity suffixes stripped from company names before tokenizing.
const LEGAL_SUFFIXES: &[&str] = &[
    "ltda", "ltd", "llc", "inc", "sa", "s.a", "me", "mei", "eireli", "corp", "co", "company",
    "group", "grupo", "empresa", "holdings",
];

/// A discovered external identifier plus the query context used to score it.
#[derive(Debug, Clone)]
pub struct MatchCandidate<'a> {
    pub candidate: &'a str,
    pub target_name: &'a str,
    pub company: Option<&'a str>,
}

impl MatchCandidate<'_> {
    pub fn is_person_match(&self) -> bool {
        is_person_match(self.candidate, self.target_name)
    }
}

/// Strips separators (`.`, `_`, `-`, `@`) and lower-cases a raw handle.
pub fn normalize_candidate(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '.' | '_' | '-' | '@'))
        .collect::<String>()
        .to_lowercase()
}

fn name_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split_whitespace()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn first_char(s: &str) -> String {
    s.chars().take(1).collect()
}

/// Weighted substring score of `candidate` against a person's name.
///
/// Tokenizes the name into first/middle/last (first and last token when the
/// name has two or more tokens, else the single token doubles as both) and
/// awards points for containment of name parts, initials and common
/// handle-construction patterns. Generic reserved words subtract points.
pub fn person_match_score(candidate: &str, target_name: &str) -> i32 {
    let tokens = name_tokens(target_name);
    if tokens.is_empty() {
        return 0;
    }

    let clean = normalize_candidate(candidate);
    if clean.is_empty() {
        return 0;
    }

    let first = tokens[0].clone();
    let last = if tokens.len() > 1 {
        tokens[tokens.len() - 1].clone()
    } else {
        first.clone()
    };
    let middle = if tokens.len() > 2 {
        tokens[1].clone()
    } else {
        String::new()
    };

    let mut score = 0;

    // Name parts; the surname carries more weight than the given name.
    if clean.contains(&first) {
        score += 3;
    }
    if clean.contains(&last) {
        score += 4;
    }
    if !middle.is_empty() && clean.contains(&middle) {
        score += 2;
    }

    // Initials and first-initial + surname patterns ("pbrito", "plbrito")
    let initials: String = tokens.iter().map(|t| first_char(t)).collect();
    if initials.len() > 1 && clean.contains(&initials) {
        score += 3;
    }
    if clean.contains(&format!("{}{}", first_char(&first), last)) {
        score += 4;
    }

    // Surname or given name anchoring the handle ("brito123", "pedro_rx")
    if clean.starts_with(&last) || clean.ends_with(&last) {
        score += 5;
    }
    if clean.starts_with(&first) || clean.ends_with(&first) {
        score += 3;
    }

    // Common handle constructions, counted once
    let patterns = [
        format!("{}{}", first, last),
        format!("{}{}", last, first),
        format!("{}{}", first, first_char(&last)),
        format!("{}{}", last, first_char(&first)),
    ];
    if patterns.iter().any(|p| p.len() > 2 && clean.contains(p)) {
        score += 4;
    }

    if GENERIC_WORDS.iter().any(|w| clean.contains(w)) {
        score -= 5;
    }

    score
}

/// A candidate is accepted iff its score crosses [`PERSON_MATCH_THRESHOLD`].
pub fn is_person_match(candidate: &str, target_name: &str) -> bool {
    let score = person_match_score(candidate, target_name);
    let accepted = score >= PERSON_MATCH_THRESHOLD;
    if accepted {
        tracing::debug!(
            "candidate '{}' matched '{}' (score: {})",
            candidate,
            target_name,
            score
        );
    }
    accepted
}

/// Removes legal-entity suffixes and punctuation from a company name,
/// returning a lowercased space-separated token string.
pub fn strip_legal_suffixes(company_name: &str) -> String {
    company_name
        .to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty() && !LEGAL_SUFFIXES.contains(t))
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Weighted substring score of `candidate` against a company name.
///
/// Same scheme as person scoring, applied to the company-name tokens after
/// legal-entity suffixes are stripped. The first token (the brand word)
/// carries the most weight.
pub fn company_match_score(candidate: &str, company_name: &str) -> i32 {
    let cleaned = strip_legal_suffixes(company_name);
    let words: Vec<&str> = cleaned.split_whitespace().filter(|w| w.len() > 2).collect();
    let clean = normalize_candidate(candidate);
    if clean.is_empty() {
        return 0;
    }

    let mut score = 0;

    if let Some(main) = words.first() {
        if clean.contains(main) {
            score += 5;
        }
    }
    for word in words.iter().skip(1) {
        if clean.contains(word) {
            score += 3;
        }
    }

    let full: String = words.concat();
    if !full.is_empty() && clean.contains(&full) {
        score += 7;
    }

    if words.len() > 1 {
        let initials: String = words.iter().map(|w| first_char(w)).collect();
        if clean.contains(&initials) {
            score += 4;
        }
    }

    if PERSONAL_INDICATORS.iter().any(|w| clean.contains(w)) {
        score -= 2;
    }

    score
}

/// A candidate is accepted iff its score crosses [`COMPANY_MATCH_THRESHOLD`].
pub fn is_company_match(candidate: &str, company_name: &str) -> bool {
    let score = company_match_score(candidate, company_name);
    let accepted = score >= COMPANY_MATCH_THRESHOLD;
    if accepted {
        tracing::debug!(
            "candidate '{}' matched company '{}' (score: {})",
            candidate,
            company_name,
            score
        );
    }
    accepted
}
