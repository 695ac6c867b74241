//! Local text metrics: keyword density, SEO score and suggestions,
//! Flesch reading ease, and short summaries of what a rewrite changed.
//! Nothing here calls a provider.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::{dto::KeywordDensity, repo_types::ContentType};

pub const DENSITY_MIN: f64 = 0.5;
pub const DENSITY_MAX: f64 = 2.5;
const TITLE_CHARS: (usize, usize) = (30, 60);
const META_CHARS: (usize, usize) = (120, 160);
const BODY_WORDS: (usize, usize) = (300, 2000);
/// Returned when a text has no words to score.
pub const DEFAULT_READABILITY: f64 = 60.0;

lazy_static! {
    static ref H1_HTML: Regex = Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap();
    static ref H1_MD: Regex = Regex::new(r"(?m)^#\s+(.+)$").unwrap();
    static ref H2: Regex = Regex::new(r"(?im)<h2[^>]*>|^##\s+").unwrap();
    static ref H3: Regex = Regex::new(r"(?im)<h3[^>]*>|^###\s+").unwrap();
    static ref META: Regex = Regex::new(
        r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']*)["']"#
    )
    .unwrap();
    static ref LINK: Regex =
        Regex::new(r#"(?i)<a[^>]*href=["'][^"']*["'][^>]*>|\[[^\]]+\]\([^)\s]+\)"#).unwrap();
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Occurrences of each keyword (or phrase) in the text, case-insensitive,
/// as a share of the text's word count.
pub fn keyword_density(text: &str, keywords: &[String]) -> BTreeMap<String, KeywordDensity> {
    let haystack = text.to_lowercase();
    let total = text.split_whitespace().count();
    keywords
        .iter()
        .map(|kw| {
            let needle = kw.trim().to_lowercase();
            let count = if needle.is_empty() {
                0
            } else {
                haystack.matches(needle.as_str()).count()
            };
            let density = if total == 0 {
                0.0
            } else {
                round2(count as f64 / total as f64 * 100.0)
            };
            (
                kw.clone(),
                KeywordDensity {
                    count,
                    density,
                    optimal: (DENSITY_MIN..=DENSITY_MAX).contains(&density),
                },
            )
        })
        .collect()
}

fn title(text: &str) -> Option<&str> {
    H1_HTML
        .captures(text)
        .or_else(|| H1_MD.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn title_points(text: &str, keywords: &[String]) -> f64 {
    let Some(title) = title(text) else {
        return 0.0;
    };
    let len = title.chars().count();
    let mut points = if (TITLE_CHARS.0..=TITLE_CHARS.1).contains(&len) {
        0.5
    } else {
        0.2
    };
    let lower = title.to_lowercase();
    if keywords.iter().any(|k| lower.contains(&k.to_lowercase())) {
        points += 0.5;
    }
    points
}

fn density_points(text: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let optimal = keyword_density(text, keywords)
        .values()
        .filter(|d| d.optimal)
        .count();
    optimal as f64 / keywords.len() as f64
}

fn structure_points(text: &str) -> f64 {
    let mut points: f64 = 0.0;
    if title(text).is_some() {
        points += 0.3;
    }
    if H2.is_match(text) {
        points += 0.4;
    }
    if H3.is_match(text) {
        points += 0.3;
    }
    points.min(1.0)
}

fn length_points(text: &str) -> f64 {
    let words = text.split_whitespace().count();
    if words < BODY_WORDS.0 {
        0.3
    } else if words <= BODY_WORDS.1 {
        1.0
    } else {
        0.7
    }
}

fn meta_points(text: &str) -> f64 {
    match META.captures(text).and_then(|c| c.get(1)) {
        Some(m) if (META_CHARS.0..=META_CHARS.1).contains(&m.as_str().chars().count()) => 1.0,
        Some(_) => 0.5,
        None => 0.0,
    }
}

fn link_points(text: &str) -> f64 {
    match LINK.find_iter(text).count() {
        0 => 0.0,
        1 => 0.5,
        _ => 1.0,
    }
}

/// Weighted 0-100 score: title 20, keyword density 25, headings 20,
/// length 15, meta description 10, links 10.
pub fn seo_score(text: &str, keywords: &[String]) -> f64 {
    let score = title_points(text, keywords) * 20.0
        + density_points(text, keywords) * 25.0
        + structure_points(text) * 20.0
        + length_points(text) * 15.0
        + meta_points(text) * 10.0
        + link_points(text) * 10.0;
    round2(score.min(100.0))
}

pub fn seo_suggestions(text: &str, keywords: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for (kw, d) in keyword_density(text, keywords) {
        if d.density < DENSITY_MIN {
            out.push(format!(
                "Low keyword density for '{kw}' - consider adding more naturally"
            ));
        } else if d.density > DENSITY_MAX {
            out.push(format!(
                "High keyword density for '{kw}' - reduce keyword stuffing"
            ));
        }
    }
    if title(text).is_none() {
        out.push("Missing H1 title - add a compelling title with target keywords".into());
    }
    if !H2.is_match(text) {
        out.push("Missing H2 headings - add subheadings to improve structure".into());
    }
    if text.split_whitespace().count() < BODY_WORDS.0 {
        out.push("Content is too short - expand to provide more value".into());
    }
    if META.captures(text).is_none() {
        out.push("Missing meta description - add for better search results".into());
    }
    if LINK.find_iter(text).count() < 2 {
        out.push("Add more internal links to improve site structure".into());
    }
    out
}

fn syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 1;
    }
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut prev_vowel = false;
    for &c in &letters {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }
    // Silent trailing "e", except "-le" ("table").
    let n = letters.len();
    if count > 1 && letters[n - 1] == 'e' && !(n >= 2 && letters[n - 2] == 'l') {
        count -= 1;
    }
    count.max(1)
}

fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count()
        .max(1)
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect()
}

/// Flesch reading ease. Higher is easier; 60-70 is plain English.
pub fn readability_score(text: &str) -> f64 {
    let words = words(text);
    if words.is_empty() {
        return DEFAULT_READABILITY;
    }
    let n = words.len() as f64;
    let syllables: usize = words.iter().map(|w| syllables(w)).sum();
    let per_sentence = n / sentence_count(text) as f64;
    let score = 206.835 - 1.015 * per_sentence - 84.6 * (syllables as f64 / n);
    round2(score)
}

fn avg_sentence_len(text: &str) -> f64 {
    words(text).len() as f64 / sentence_count(text) as f64
}

/// What a rewrite changed, measured on the two texts.
pub fn refinement_changes(
    original: &str,
    refined: &str,
    style: &str,
    audience: &str,
) -> Vec<String> {
    if original.trim() == refined.trim() {
        return vec!["Text already matched the requested style".into()];
    }
    let mut out = vec![format!("Rewrote in a {style} style for a {audience} audience")];

    let (before, after) = (words(original).len(), words(refined).len());
    if before != after {
        out.push(format!("Length changed from {before} to {after} words"));
    }

    let (s_before, s_after) = (avg_sentence_len(original), avg_sentence_len(refined));
    if (s_before - s_after).abs() >= 1.0 {
        let verb = if s_after < s_before { "Shortened" } else { "Lengthened" };
        out.push(format!(
            "{verb} sentences from {s_before:.1} to {s_after:.1} words on average"
        ));
    }

    let (r_before, r_after) = (readability_score(original), readability_score(refined));
    if (r_before - r_after).abs() >= 1.0 {
        let verb = if r_after > r_before { "improved" } else { "dropped" };
        out.push(format!(
            "Readability {verb} from {r_before:.1} to {r_after:.1}"
        ));
    }
    out
}

/// Follow-up advice on a freshly generated body.
pub fn generation_suggestions(
    body: &str,
    content_type: ContentType,
    requested_words: u32,
    keywords: &[String],
) -> Vec<String> {
    let mut out = Vec::new();
    let actual = body.split_whitespace().count() as f64;
    let requested = f64::from(requested_words);
    if actual < requested * 0.8 {
        out.push(format!(
            "Text is shorter than the requested {requested_words} words - consider expanding it"
        ));
    } else if actual > requested * 1.2 {
        out.push(format!(
            "Text is longer than the requested {requested_words} words - consider trimming it"
        ));
    }

    let lower = body.to_lowercase();
    for kw in keywords {
        if !lower.contains(&kw.to_lowercase()) {
            out.push(format!("Keyword '{kw}' does not appear in the text"));
        }
    }

    let long_form = matches!(content_type, ContentType::BlogPost | ContentType::Article);
    if long_form && !H2.is_match(body) {
        out.push("Add subheadings to break up the text".into());
    }

    if out.is_empty() {
        out.push("Consider adding more specific examples".into());
    }
    out
}
