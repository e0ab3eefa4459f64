//! Query intent classification.
//!
//! A keyword heuristic over the user prompt decides which enrichment to run
//! before generation. Advisory only: a missed match costs an augmentation
//! opportunity, a spurious match costs one extra provider call.

/// What enrichment, if any, a prompt calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    Weather,
    Search,
    NoAugmentation,
}

/// Whether search augmentation runs only on classified prompts or on every
/// prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AugmentationPolicy {
    #[default]
    Classified,
    Always,
}

const WEATHER_KEYWORDS: &[&str] = &[
    "hava",
    "hava durumu",
    "sicaklik",
    "derece",
    "yagmur",
    "kar",
    "gunes",
    "bulut",
    "ruzgar",
    "weather",
    "temperature",
    "rain",
    "snow",
    "sunny",
    "cloudy",
    "wind",
];

const INTERROGATIVES: &[&str] = &[
    "kim", "kimdir", "ne", "nedir", "nerede", "ne zaman", "nasil", "hangi", "kac", "who", "what",
    "when", "where", "how", "which",
];

const RESEARCH_VERBS: &[&str] = &[
    "arastir",
    "bilgi ver",
    "anlat",
    "acikla",
    "tell me about",
    "explain",
    "research",
];

const RECENCY_MARKERS: &[&str] = &[
    "bugun",
    "dun",
    "guncel",
    "yeni",
    "son durum",
    "haberler",
    "today",
    "yesterday",
    "current",
    "latest",
];

/// Lowercase and strip Turkish diacritics so keyword matching is insensitive
/// to both case and spelling variants (`rüzgar`/`ruzgar`, `İstanbul`/`istanbul`).
pub(crate) fn fold(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'İ' | 'ı' | 'I' => 'i',
            'Ş' | 'ş' => 's',
            'Ç' | 'ç' => 'c',
            'Ğ' | 'ğ' => 'g',
            'Ö' | 'ö' => 'o',
            'Ü' | 'ü' => 'u',
            _ => c,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

fn words(folded: &str) -> Vec<&str> {
    folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect()
}

/// Whole-word match for single keywords, substring match for phrases.
fn matches_any(folded: &str, keywords: &[&str]) -> bool {
    let words = words(folded);
    keywords.iter().any(|keyword| {
        if keyword.contains(' ') {
            folded.contains(keyword)
        } else {
            words.iter().any(|word| word == keyword)
        }
    })
}

fn contains_year_literal(folded: &str) -> bool {
    words(folded).iter().any(|word| {
        word.len() == 4
            && word
                .parse::<u32>()
                .is_ok_and(|year| (2020..=2100).contains(&year))
    })
}

/// A capitalized multi-letter token anywhere past the first word suggests a
/// proper noun or brand worth looking up.
fn contains_capitalized_token(prompt: &str) -> bool {
    prompt
        .split_whitespace()
        .skip(1)
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|word| {
            word.chars().count() > 1
                && word.chars().next().is_some_and(char::is_uppercase)
        })
}

/// Classify a prompt into the enrichment it calls for.
#[must_use]
pub fn classify(prompt: &str) -> QueryIntent {
    let folded = fold(prompt);

    if matches_any(&folded, WEATHER_KEYWORDS) {
        return QueryIntent::Weather;
    }

    if matches_any(&folded, INTERROGATIVES)
        || matches_any(&folded, RESEARCH_VERBS)
        || matches_any(&folded, RECENCY_MARKERS)
        || contains_year_literal(&folded)
        || contains_capitalized_token(prompt)
    {
        return QueryIntent::Search;
    }

    QueryIntent::NoAugmentation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_keywords_win_with_diacritics() {
        assert_eq!(classify("İstanbul'da hava durumu nasıl?"), QueryIntent::Weather);
        assert_eq!(classify("yarın yağmur yağacak mı"), QueryIntent::Weather);
        assert_eq!(classify("RÜZGAR kaç km?"), QueryIntent::Weather);
        assert_eq!(classify("what is the temperature outside"), QueryIntent::Weather);
    }

    #[test]
    fn weather_takes_precedence_over_interrogatives() {
        assert_eq!(classify("bugün hava nasıl olacak?"), QueryIntent::Weather);
    }

    #[test]
    fn interrogatives_trigger_search() {
        assert_eq!(classify("kimdir bu yazar?"), QueryIntent::Search);
        assert_eq!(classify("bu şirket nerede kuruldu"), QueryIntent::Search);
    }

    #[test]
    fn research_verbs_trigger_search() {
        assert_eq!(classify("bana kuantum bilgisayarları anlat"), QueryIntent::Search);
        assert_eq!(classify("tell me about the new release"), QueryIntent::Search);
    }

    #[test]
    fn recency_markers_trigger_search() {
        assert_eq!(classify("bugün piyasalarda son durum"), QueryIntent::Search);
        assert_eq!(classify("döviz kuru 2024"), QueryIntent::Search);
    }

    #[test]
    fn capitalized_token_past_first_word_triggers_search() {
        assert_eq!(classify("bana Löwentech firmasını özetle"), QueryIntent::Search);
    }

    #[test]
    fn whole_word_matching_avoids_substring_hits() {
        // "karar" contains "kar" but is not a weather word.
        assert_eq!(classify("bir karar verdim"), QueryIntent::NoAugmentation);
    }

    #[test]
    fn plain_prompts_need_no_augmentation() {
        assert_eq!(classify("merhaba"), QueryIntent::NoAugmentation);
        assert_eq!(classify("bana bir fıkra yazar mısın"), QueryIntent::NoAugmentation);
    }
}
