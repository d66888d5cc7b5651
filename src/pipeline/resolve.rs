use anyhow::Result;

use crate::services::tmdb::TmdbClient;

/// The franchise keyword a search candidate must carry to be considered.
const FRANCHISE_KEYWORD: &str = "star trek";

/// Televised series the catalog tracks, in discovery order.
pub const SERIES_TARGETS: &[&str] = &[
    "Star Trek: Enterprise",
    "Star Trek: Discovery",
    "Star Trek: Strange New Worlds",
    "Star Trek: The Original Series",
    "Star Trek: The Animated Series",
    "Star Trek: The Next Generation",
    "Star Trek: Deep Space Nine",
    "Star Trek: Voyager",
    "Star Trek: Lower Decks",
    "Star Trek: Prodigy",
    "Star Trek: Picard",
];

/// Feature films the catalog tracks.
pub const MOVIE_TARGETS: &[&str] = &[
    "Star Trek: The Motion Picture",
    "Star Trek II: The Wrath of Khan",
    "Star Trek III: The Search for Spock",
    "Star Trek IV: The Voyage Home",
    "Star Trek V: The Final Frontier",
    "Star Trek VI: The Undiscovered Country",
    "Star Trek Generations",
    "Star Trek: First Contact",
    "Star Trek: Insurrection",
    "Star Trek: Nemesis",
    "Star Trek",
    "Star Trek Into Darkness",
    "Star Trek Beyond",
];

/// Curated short codes; always take precedence over the fallback.
const SERIES_CODE_MAP: &[(&str, &str)] = &[
    ("the original series", "tos"),
    ("the animated series", "tas"),
    ("the next generation", "tng"),
    ("deep space nine", "ds9"),
    ("voyager", "voy"),
    ("enterprise", "ent"),
    ("discovery", "dsc"),
    ("picard", "pic"),
    ("lower decks", "low"),
    ("prodigy", "pro"),
    ("strange new worlds", "snw"),
];

/// Curated movie ids, keyed by the prefix-stripped lower-case title.
/// The bare franchise title (the 2009 reboot) is keyed in full.
const MOVIE_ID_MAP: &[(&str, &str)] = &[
    ("the motion picture", "tmp"),
    ("ii: the wrath of khan", "twok"),
    ("iii: the search for spock", "tsfs"),
    ("iv: the voyage home", "tvh"),
    ("v: the final frontier", "tff"),
    ("vi: the undiscovered country", "tuc"),
    ("generations", "gen"),
    ("first contact", "fc"),
    ("insurrection", "ins"),
    ("nemesis", "nem"),
    ("star trek", "st09"),
    ("into darkness", "stid"),
    ("beyond", "stb"),
];

#[derive(Debug, Clone)]
pub struct ResolvedSeries {
    pub provider_id: i64,
    pub title: String,
    pub series_code: String,
    pub season_count: u32,
}

#[derive(Debug, Clone)]
pub struct ResolvedMovie {
    pub provider_id: i64,
    pub title: String,
    pub movie_id: String,
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Strip a leading franchise prefix (plus trailing separators) from an
/// already-normalized title. `"star trek: voyager"` -> `"voyager"`.
fn strip_franchise_prefix(normalized: &str) -> &str {
    normalized
        .strip_prefix(FRANCHISE_KEYWORD)
        .map(|rest| rest.trim_start_matches([':', '-', ' ']))
        .unwrap_or(normalized)
}

/// Symmetric containment heuristic: a candidate matches if it carries
/// the franchise keyword AND either it contains the prefix-stripped
/// target name, or the target contains the candidate's full name.
pub fn candidate_matches(candidate: &str, target: &str) -> bool {
    let candidate = normalize_title(candidate);
    if !candidate.contains(FRANCHISE_KEYWORD) {
        return false;
    }
    let target = normalize_title(target);
    let target_stripped = strip_franchise_prefix(&target);
    candidate.contains(target_stripped) || target.contains(&candidate)
}

fn lookup(map: &[(&str, &str)], key: &str) -> Option<String> {
    map.iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| (*v).to_string())
}

/// First 3-6 alphanumeric characters of the name, lower-case.
fn fallback_code(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

/// Derive the canonical series short-code for a title. The curated map
/// always wins over the fallback.
pub fn series_code_for_title(title: &str) -> String {
    let normalized = normalize_title(title);
    let stripped = strip_franchise_prefix(&normalized);
    lookup(SERIES_CODE_MAP, stripped).unwrap_or_else(|| fallback_code(stripped))
}

/// Derive the canonical movie id for a title. Falls back to the full
/// normalized title when stripping leaves nothing (the bare franchise
/// title), then to the generated code.
pub fn movie_id_for_title(title: &str) -> String {
    let normalized = normalize_title(title);
    let stripped = strip_franchise_prefix(&normalized);
    let key = if stripped.is_empty() {
        normalized.as_str()
    } else {
        stripped
    };
    lookup(MOVIE_ID_MAP, key).unwrap_or_else(|| fallback_code(key))
}

/// Resolve a series title to a provider id. First provider-order match
/// wins; no match is a non-fatal skip reported as `Ok(None)`.
pub async fn resolve_series(client: &TmdbClient, target: &str) -> Result<Option<ResolvedSeries>> {
    let candidates = client.search_tv(target).await?;
    let Some(hit) = candidates.iter().find(|c| candidate_matches(&c.name, target)) else {
        tracing::warn!("no provider match for series '{}', skipping", target);
        return Ok(None);
    };

    let details = client.get_tv_details(hit.id).await?;
    let season_count = details.number_of_seasons.unwrap_or(1);
    tracing::debug!(
        "resolved series '{}' -> provider id {} ({} seasons)",
        target,
        hit.id,
        season_count
    );

    Ok(Some(ResolvedSeries {
        provider_id: hit.id,
        title: details.name,
        series_code: series_code_for_title(target),
        season_count,
    }))
}

/// Resolve a movie title to a provider id; same heuristic and skip
/// semantics as series resolution.
pub async fn resolve_movie(client: &TmdbClient, target: &str) -> Result<Option<ResolvedMovie>> {
    let candidates = client.search_movie(target).await?;
    let Some(hit) = candidates.iter().find(|c| candidate_matches(&c.title, target)) else {
        tracing::warn!("no provider match for movie '{}', skipping", target);
        return Ok(None);
    };

    tracing::debug!("resolved movie '{}' -> provider id {}", target, hit.id);
    Ok(Some(ResolvedMovie {
        provider_id: hit.id,
        title: hit.title.clone(),
        movie_id: movie_id_for_title(target),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_must_carry_franchise_keyword() {
        assert!(!candidate_matches(
            "The Next Generation",
            "Star Trek: The Next Generation"
        ));
        assert!(candidate_matches(
            "Star Trek: The Next Generation",
            "Star Trek: The Next Generation"
        ));
    }

    #[test]
    fn test_candidate_containment_is_symmetric() {
        // Candidate contains the stripped target name.
        assert!(candidate_matches(
            "Star Trek: Deep Space Nine",
            "Star Trek: Deep Space Nine"
        ));
        // Target contains the candidate's shorter name.
        assert!(candidate_matches("Star Trek", "Star Trek Into Darkness"));
        // Unrelated franchise entries do not cross-match.
        assert!(!candidate_matches(
            "Star Trek: Picard",
            "Star Trek: Voyager"
        ));
    }

    #[test]
    fn test_curated_code_takes_precedence() {
        assert_eq!(series_code_for_title("Star Trek: Discovery"), "dsc");
        assert_eq!(series_code_for_title("Star Trek: Deep Space Nine"), "ds9");
        assert_eq!(series_code_for_title("Star Trek: Enterprise"), "ent");
    }

    #[test]
    fn test_fallback_code_for_uncurated_title() {
        // Not in the curated map: first 6 alphanumeric characters win.
        assert_eq!(series_code_for_title("Star Trek: Academy"), "academ");
        assert_eq!(series_code_for_title("Star Trek: Q"), "q");
    }

    #[test]
    fn test_movie_id_generation() {
        assert_eq!(movie_id_for_title("Star Trek II: The Wrath of Khan"), "twok");
        assert_eq!(movie_id_for_title("Star Trek Generations"), "gen");
        // Bare franchise title resolves via the full-title key.
        assert_eq!(movie_id_for_title("Star Trek"), "st09");
        assert_eq!(movie_id_for_title("Star Trek Beyond"), "stb");
    }

    #[test]
    fn test_every_target_has_a_distinct_code() {
        let mut codes: Vec<String> = SERIES_TARGETS
            .iter()
            .map(|t| series_code_for_title(t))
            .chain(MOVIE_TARGETS.iter().map(|t| movie_id_for_title(t)))
            .collect();
        let before = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), before);
    }
}
