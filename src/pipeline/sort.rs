use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

use crate::models::{parse_air_date, CanonicalEpisode, CatalogItem, Era};

static RE_LEADING_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})").unwrap());

// The three stardate shapes that appear in catalog data, tried in order:
// a season range marker, a labelled stardate, and the start of a plain
// range.
static RE_STARDATE_TILDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~(\d+)\.(\d+)").unwrap());
static RE_STARDATE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Ss]tardate\s+(\d+)\.(\d+)").unwrap());
static RE_STARDATE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)-").unwrap());

/// Primary item sort key: the leading 4-digit year. Placeholders and
/// unparseable values sort last.
pub fn year_sort_key(year: &str) -> f64 {
    RE_LEADING_YEAR
        .captures(year.trim())
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or(f64::INFINITY)
}

/// Secondary item sort key: a stardate number extracted by trying the
/// three shapes in order, combining whole and fractional parts as
/// `whole + fractional / 100`. Unparseable stardates sort last.
pub fn stardate_sort_key(stardate: &str) -> f64 {
    for re in [&*RE_STARDATE_TILDE, &*RE_STARDATE_LABEL, &*RE_STARDATE_RANGE] {
        if let Some(caps) = re.captures(stardate) {
            let whole: f64 = match caps[1].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            let fractional: f64 = match caps[2].parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            return whole + fractional / 100.0;
        }
    }
    f64::INFINITY
}

fn compare_items(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    year_sort_key(a.year())
        .total_cmp(&year_sort_key(b.year()))
        .then_with(|| stardate_sort_key(a.stardate()).total_cmp(&stardate_sort_key(b.stardate())))
}

/// Episodes order by air date; when either date fails to parse, the
/// episode number breaks the tie. No synthetic dates.
fn compare_episodes(a: &CanonicalEpisode, b: &CanonicalEpisode) -> Ordering {
    match (parse_air_date(&a.air_date), parse_air_date(&b.air_date)) {
        (Some(da), Some(db)) => da.cmp(&db).then(a.episode.cmp(&b.episode)),
        _ => a.episode.cmp(&b.episode),
    }
}

/// Order items within each era, and episodes within each season item.
/// Works on a copy; the input era set is never mutated.
pub fn chronological_sort(eras: &[Era]) -> Vec<Era> {
    let mut sorted = eras.to_vec();
    for era in &mut sorted {
        era.items.sort_by(compare_items);
        for item in &mut era.items {
            if let CatalogItem::Season(season) = item {
                season.episodes.sort_by(compare_episodes);
            }
        }
    }
    sorted
}
