//! Links a listing from the primary aggregator to a GMP detail URL scraped
//! from the secondary source. The matching is deliberately heuristic:
//! corporate-suffix words are stripped, then the first candidate with
//! substring containment in either direction wins: first match, not best
//! match. The strategy sits behind a trait so a stricter matcher can be
//! swapped in without touching callers.

use regex::Regex;

use crate::models::UpcomingIpo;

/// The secondary source publishes review pages in its calendar; the GMP
/// history lives at a sibling URL with this segment swapped.
const REVIEW_SEGMENT: &str = "ipo-date-review-price-allotment-details";
const GMP_SEGMENT: &str = "ipo-gmp-grey-market-premium";

pub trait MatchStrategy: Send + Sync {
    /// Best-matching candidate URL for a company name, or None when the
    /// candidates hold nothing plausible ("GMP unavailable", not an error).
    fn find_url(&self, name: &str, candidates: &[UpcomingIpo]) -> Option<String>;
}

pub struct SubstringMatcher {
    name_stoplist: Regex,
    url_stoplist: Regex,
}

impl SubstringMatcher {
    pub fn new() -> Self {
        Self {
            name_stoplist: Regex::new(
                r"(?i)\b(ltd|pvt|industries|solutions|international|technologies)\b",
            )
            .expect("static regex"),
            url_stoplist: Regex::new(
                r"(?i)\b(-ltd|-pvt|-industries|-solutions|-international|-technologies|-india)\b",
            )
            .expect("static regex"),
        }
    }
}

impl Default for SubstringMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchStrategy for SubstringMatcher {
    fn find_url(&self, name: &str, candidates: &[UpcomingIpo]) -> Option<String> {
        let cleaned = self
            .name_stoplist
            .replace_all(name, "")
            .trim()
            .to_lowercase();

        for candidate in candidates {
            let candidate_name = candidate.name.to_lowercase();
            if candidate_name.contains(&cleaned) || cleaned.contains(&candidate_name) {
                let url = self
                    .url_stoplist
                    .replace_all(&candidate.url, "")
                    .trim()
                    .to_lowercase();
                return Some(url.replace(REVIEW_SEGMENT, GMP_SEGMENT));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, url: &str) -> UpcomingIpo {
        UpcomingIpo { name: name.into(), url: url.into() }
    }

    #[test]
    fn strips_suffix_words_before_matching() {
        let matcher = SubstringMatcher::new();
        let candidates = vec![
            candidate("other-ipo", "https://g.example.com/other-ipo"),
            candidate("acme-ipo", "https://g.example.com/acme-ipo-gmp"),
        ];

        let url = matcher.find_url("Acme Industries Ltd", &candidates);
        assert_eq!(url.as_deref(), Some("https://g.example.com/acme-ipo-gmp"));
    }

    #[test]
    fn first_match_wins_in_candidate_order() {
        let matcher = SubstringMatcher::new();
        let candidates = vec![
            candidate("acme power", "https://g.example.com/acme-power"),
            candidate("acme power and steel", "https://g.example.com/acme-power-and-steel"),
        ];

        // Both candidates are contained in (or contain) the input;
        // list order decides.
        let url = matcher.find_url("Acme Power and Steel", &candidates);
        assert_eq!(url.as_deref(), Some("https://g.example.com/acme-power"));
    }

    #[test]
    fn rewrites_review_urls_to_gmp_variant() {
        let matcher = SubstringMatcher::new();
        let candidates = vec![candidate(
            "zeta ipo",
            "https://g.example.com/zeta-india-ipo-date-review-price-allotment-details",
        )];

        let url = matcher.find_url("Zeta International", &candidates);
        assert_eq!(
            url.as_deref(),
            Some("https://g.example.com/zeta-ipo-gmp-grey-market-premium")
        );
    }

    #[test]
    fn no_overlap_yields_none() {
        let matcher = SubstringMatcher::new();
        let candidates = vec![candidate("wholly unrelated", "https://g.example.com/x")];
        assert_eq!(matcher.find_url("Acme Industries", &candidates), None);
    }
}
