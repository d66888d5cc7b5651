use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel for an unknown in-universe year.
pub const YEAR_TBD: &str = "TBD";
/// Sentinel for an unknown stardate.
pub const STARDATE_TBD: &str = "Stardate TBD";
/// Sentinel for unknown free text (synopsis, notes).
pub const TEXT_NONE: &str = "None";

/// True for the defined sentinel strings (and the empty string).
/// Placeholders are first-class values, but they never count as
/// informative during merge or sort.
pub fn is_placeholder(value: &str) -> bool {
    matches!(value.trim(), "" | "None" | "TBD" | "Stardate TBD")
}

/// Parse a provider air date (`YYYY-MM-DD`).
pub fn parse_air_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Derive the canonical episode id: `<series_code>_s<season>_e<episode>`.
/// Must be unique catalog-wide; collisions are fatal at scoring time.
pub fn episode_id(series_code: &str, season: u32, episode: u32) -> String {
    format!("{}_s{}_e{}", series_code, season, episode)
}

/// Derive the canonical season item id: `<series_code>_s<season>`.
pub fn season_id(series_code: &str, season: u32) -> String {
    format!("{}_s{}", series_code, season)
}

/// A single episode in canonical form.
///
/// Array fields are `Option<Vec<..>>`: `None` means "no data yet" and is
/// omitted from the persisted JSON, while `Some(vec![])` means a curator
/// explicitly emptied the field. The incremental merge relies on the
/// distinction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalEpisode {
    pub id: String,
    pub title: String,
    pub season: u32,
    pub episode: u32,
    pub air_date: String,
    pub stardate: String,
    pub synopsis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_stars: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<String>>,
    /// Unknown fields from hand-edited catalogs, passed through verbatim.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// One season of a series, owning its episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSeasonItem {
    pub id: String,
    pub title: String,
    pub series_code: String,
    pub season: u32,
    pub year: String,
    /// Derived range string, e.g. `~3.1-3.26`.
    pub stardate: String,
    pub episode_count: usize,
    pub episodes: Vec<CanonicalEpisode>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// A feature film; flat, no nested episodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMovieItem {
    pub id: String,
    pub title: String,
    pub year: String,
    pub stardate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub director: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Vec<String>>,
    pub notes: String,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// An entry in an era's item list. Persisted with a `type` tag
/// (`"season"` / `"movie"`). The tag is handled by hand: a derived
/// internally-tagged enum would leak the tag into the flattened `extra`
/// map and duplicate it on the way back out.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogItem {
    Season(CanonicalSeasonItem),
    Movie(CanonicalMovieItem),
}

impl Serialize for CatalogItem {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;
        let (tag, value) = match self {
            CatalogItem::Season(s) => ("season", serde_json::to_value(s)),
            CatalogItem::Movie(m) => ("movie", serde_json::to_value(m)),
        };
        let mut value = value.map_err(S::Error::custom)?;
        if let Value::Object(map) = &mut value {
            map.insert("type".to_string(), Value::String(tag.to_string()));
        }
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CatalogItem {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let mut value = Value::deserialize(deserializer)?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| D::Error::missing_field("type"))?;
        if let Value::Object(map) = &mut value {
            map.remove("type");
        }
        match tag.as_str() {
            "season" => serde_json::from_value(value)
                .map(CatalogItem::Season)
                .map_err(D::Error::custom),
            "movie" => serde_json::from_value(value)
                .map(CatalogItem::Movie)
                .map_err(D::Error::custom),
            other => Err(D::Error::unknown_variant(other, &["season", "movie"])),
        }
    }
}

impl CatalogItem {
    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Season(s) => &s.id,
            CatalogItem::Movie(m) => &m.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CatalogItem::Season(s) => &s.title,
            CatalogItem::Movie(m) => &m.title,
        }
    }

    pub fn year(&self) -> &str {
        match self {
            CatalogItem::Season(s) => &s.year,
            CatalogItem::Movie(m) => &m.year,
        }
    }

    pub fn stardate(&self) -> &str {
        match self {
            CatalogItem::Season(s) => &s.stardate,
            CatalogItem::Movie(m) => &m.stardate,
        }
    }
}

/// The fixed chronological era taxonomy. Closed set: unknown ids only
/// appear when reading a persisted catalog written by a newer version,
/// and they sort after every known era.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EraId {
    Enterprise,
    DiscoveryTos,
    Tng,
    Picard,
    FarFuture,
    Kelvin,
    Unknown(String),
}

impl EraId {
    pub fn as_str(&self) -> &str {
        match self {
            EraId::Enterprise => "enterprise-era",
            EraId::DiscoveryTos => "discovery-tos-era",
            EraId::Tng => "tng-era",
            EraId::Picard => "picard-era",
            EraId::FarFuture => "far-future-era",
            EraId::Kelvin => "kelvin-era",
            EraId::Unknown(s) => s,
        }
    }

    pub fn parse(value: &str) -> EraId {
        match value {
            "enterprise-era" => EraId::Enterprise,
            "discovery-tos-era" => EraId::DiscoveryTos,
            "tng-era" => EraId::Tng,
            "picard-era" => EraId::Picard,
            "far-future-era" => EraId::FarFuture,
            "kelvin-era" => EraId::Kelvin,
            other => EraId::Unknown(other.to_string()),
        }
    }

    /// Canonical ordering rank; unknown ids sort last.
    pub fn sort_rank(&self) -> usize {
        match self {
            EraId::Enterprise => 0,
            EraId::DiscoveryTos => 1,
            EraId::Kelvin => 2,
            EraId::Tng => 3,
            EraId::Picard => 4,
            EraId::FarFuture => 5,
            EraId::Unknown(_) => usize::MAX,
        }
    }
}

impl std::fmt::Display for EraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EraId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EraId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EraId::parse(&s))
    }
}

/// A chronological bucket in the curated taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Era {
    pub id: EraId,
    pub title: String,
    pub years: String,
    pub stardates: String,
    pub description: String,
    #[serde(default)]
    pub items: Vec<CatalogItem>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("TBD"));
        assert!(is_placeholder("Stardate TBD"));
        assert!(is_placeholder("None"));
        assert!(is_placeholder(""));
        assert!(is_placeholder("  "));
        assert!(!is_placeholder("1312.4"));
        assert!(!is_placeholder("2151"));
    }

    #[test]
    fn test_id_derivation() {
        assert_eq!(episode_id("tng", 3, 15), "tng_s3_e15");
        assert_eq!(season_id("ds9", 1), "ds9_s1");
    }

    #[test]
    fn test_air_date_parsing() {
        assert!(parse_air_date("1987-09-28").is_some());
        assert!(parse_air_date("1987-09-28 ").is_some());
        assert!(parse_air_date("TBD").is_none());
        assert!(parse_air_date("").is_none());
    }

    #[test]
    fn test_era_id_round_trip() {
        for id in [
            EraId::Enterprise,
            EraId::DiscoveryTos,
            EraId::Tng,
            EraId::Picard,
            EraId::FarFuture,
            EraId::Kelvin,
        ] {
            assert_eq!(EraId::parse(id.as_str()), id);
        }
        let unknown = EraId::parse("mirror-era");
        assert_eq!(unknown, EraId::Unknown("mirror-era".to_string()));
        assert_eq!(unknown.sort_rank(), usize::MAX);
    }

    #[test]
    fn test_episode_omits_absent_arrays() {
        let ep = CanonicalEpisode {
            id: episode_id("tos", 1, 1),
            title: "The Man Trap".to_string(),
            season: 1,
            episode: 1,
            air_date: "1966-09-08".to_string(),
            stardate: "1531.1".to_string(),
            synopsis: TEXT_NONE.to_string(),
            plot_points: None,
            guest_stars: Some(vec!["Jeanne Bal".to_string()]),
            connections: None,
            extra: Map::new(),
        };
        let json = serde_json::to_value(&ep).unwrap();
        assert!(json.get("plotPoints").is_none());
        assert!(json.get("connections").is_none());
        assert_eq!(json["guestStars"][0], "Jeanne Bal");
        assert_eq!(json["airDate"], "1966-09-08");
    }

    #[test]
    fn test_catalog_item_tag_round_trip() {
        let item = CatalogItem::Movie(CanonicalMovieItem {
            id: "tmp".to_string(),
            title: "Star Trek: The Motion Picture".to_string(),
            year: "2273".to_string(),
            stardate: "Stardate 7410.2".to_string(),
            director: Some(vec!["Robert Wise".to_string()]),
            writer: None,
            cast: None,
            notes: TEXT_NONE.to_string(),
            extra: Map::new(),
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "movie");

        let back: CatalogItem = serde_json::from_value(json).unwrap();
        // The tag must not leak into the flattened unknown-field map.
        let CatalogItem::Movie(m) = &back else {
            panic!("expected movie variant");
        };
        assert!(m.extra.is_empty());
        assert_eq!(back, item);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let json = serde_json::json!({
            "id": "tos_s1_e1",
            "title": "The Man Trap",
            "season": 1,
            "episode": 1,
            "airDate": "1966-09-08",
            "stardate": "1531.1",
            "synopsis": "None",
            "curatorRating": 4
        });
        let ep: CanonicalEpisode = serde_json::from_value(json).unwrap();
        assert_eq!(ep.extra.get("curatorRating").unwrap(), 4);
        let back = serde_json::to_value(&ep).unwrap();
        assert_eq!(back["curatorRating"], 4);
    }
}
