//! Seed data shapes: the content catalog documents and the CSV snapshot
//! rows the provisioner can load on first boot.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The content catalog file: `movies` and `series` arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentCatalog {
    #[serde(default)]
    pub movies: Vec<MovieDoc>,
    #[serde(default)]
    pub series: Vec<SeriesDoc>,
}

/// A movie document from the content catalog.
///
/// `genre` is a native array in the catalog; normalization flattens it into
/// one row per genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDoc {
    pub content_id: String,
    pub title: String,
    #[serde(default)]
    pub genre: Vec<String>,
    pub rating: Decimal,
    pub production_budget: Decimal,
    pub duration_minutes: i32,
    pub release_year: i32,
    pub views_count: i64,
}

/// A series document from the content catalog.
///
/// `episodes_per_season` is indexed by season, starting at season 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDoc {
    pub content_id: String,
    pub title: String,
    #[serde(default)]
    pub genre: Vec<String>,
    pub rating: Decimal,
    pub production_budget: Decimal,
    pub seasons: i32,
    pub avg_episode_duration: Decimal,
    pub total_views: i64,
    #[serde(default)]
    pub episodes_per_season: Vec<i32>,
}

/// One row of the users snapshot (`users.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: i64,
    pub age: i32,
    pub country: String,
    pub subscription_type: String,
    pub registration_date: NaiveDate,
    pub total_watch_time_hours: Decimal,
}

/// One row of the viewing sessions snapshot (`viewing_sessions.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: i64,
    pub content_id: String,
    pub watch_date: NaiveDate,
    pub watch_duration_minutes: i32,
    pub completion_percentage: Decimal,
    pub device_type: String,
    pub quality_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_deserializes_with_missing_sections() {
        let catalog: ContentCatalog = serde_json::from_str("{}").unwrap();
        assert!(catalog.movies.is_empty());
        assert!(catalog.series.is_empty());
    }

    #[test]
    fn test_movie_doc_from_json() {
        let json = r#"{
            "content_id": "m001",
            "title": "The Long Return",
            "genre": ["drama", "thriller"],
            "rating": 8.1,
            "production_budget": 42000000,
            "duration_minutes": 131,
            "release_year": 2019,
            "views_count": 5400211
        }"#;
        let movie: MovieDoc = serde_json::from_str(json).unwrap();
        assert_eq!(movie.content_id, "m001");
        assert_eq!(movie.genre, vec!["drama", "thriller"]);
        assert_eq!(movie.release_year, 2019);
    }

    #[test]
    fn test_user_record_from_csv() {
        let data = "user_id,age,country,subscription_type,registration_date,total_watch_time_hours\n\
                    1001,34,ES,premium,2023-05-14,120.5\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: UserRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record.user_id, 1001);
        assert_eq!(record.registration_date, NaiveDate::from_ymd_opt(2023, 5, 14).unwrap());
    }
}
