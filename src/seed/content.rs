//! Content catalog loading and normalization.
//!
//! The catalog file carries nested documents (genre arrays, per-season
//! episode counts); normalization flattens them into the relational rows of
//! the analytics schema: content, movie_details, series_details,
//! content_genres, series_episodes.

use super::{SeedBatch, SeedError};
use crate::domain::ContentCatalog;
use crate::store::SqlValue;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::warn;

pub const CONTENT_COLUMNS: &[&str] = &[
    "content_id",
    "title",
    "content_type",
    "rating",
    "production_budget",
];
pub const MOVIE_DETAIL_COLUMNS: &[&str] = &[
    "content_id",
    "duration_minutes",
    "release_year",
    "views_count",
];
pub const SERIES_DETAIL_COLUMNS: &[&str] = &[
    "content_id",
    "seasons",
    "avg_episode_duration",
    "total_views",
];
pub const GENRE_COLUMNS: &[&str] = &["content_id", "genre"];
pub const EPISODE_COLUMNS: &[&str] = &["content_id", "season", "episode_count"];

/// Read and parse a content catalog file.
pub fn load_catalog(path: &Path) -> Result<ContentCatalog, SeedError> {
    if !path.exists() {
        return Err(SeedError::Missing(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Flatten a catalog into per-relation row batches, parents first.
pub fn normalize_catalog(catalog: &ContentCatalog) -> Vec<SeedBatch> {
    let mut content_rows = Vec::new();
    let mut movie_detail_rows = Vec::new();
    let mut series_detail_rows = Vec::new();
    let mut genre_rows = Vec::new();
    let mut episode_rows = Vec::new();

    for movie in &catalog.movies {
        content_rows.push(content_row(
            &movie.content_id,
            &movie.title,
            "movie",
            movie.rating,
            movie.production_budget,
        ));
        movie_detail_rows.push(vec![
            SqlValue::Text(movie.content_id.clone()),
            SqlValue::Int(i64::from(movie.duration_minutes)),
            SqlValue::Int(i64::from(movie.release_year)),
            SqlValue::Int(movie.views_count),
        ]);
        for genre in &movie.genre {
            genre_rows.push(vec![
                SqlValue::Text(movie.content_id.clone()),
                SqlValue::Text(genre.clone()),
            ]);
        }
    }

    for series in &catalog.series {
        content_rows.push(content_row(
            &series.content_id,
            &series.title,
            "series",
            series.rating,
            series.production_budget,
        ));
        series_detail_rows.push(vec![
            SqlValue::Text(series.content_id.clone()),
            SqlValue::Int(i64::from(series.seasons)),
            SqlValue::Numeric(series.avg_episode_duration),
            SqlValue::Int(series.total_views),
        ]);
        for genre in &series.genre {
            genre_rows.push(vec![
                SqlValue::Text(series.content_id.clone()),
                SqlValue::Text(genre.clone()),
            ]);
        }
        if series.episodes_per_season.len() != series.seasons as usize {
            warn!(
                "seasons/episode list mismatch for {}: {} seasons, {} entries",
                series.content_id,
                series.seasons,
                series.episodes_per_season.len()
            );
        }
        for (season, episode_count) in series.episodes_per_season.iter().enumerate() {
            episode_rows.push(vec![
                SqlValue::Text(series.content_id.clone()),
                SqlValue::Int(season as i64 + 1),
                SqlValue::Int(i64::from(*episode_count)),
            ]);
        }
    }

    vec![
        SeedBatch {
            relation: "content",
            columns: CONTENT_COLUMNS,
            rows: content_rows,
        },
        SeedBatch {
            relation: "movie_details",
            columns: MOVIE_DETAIL_COLUMNS,
            rows: movie_detail_rows,
        },
        SeedBatch {
            relation: "series_details",
            columns: SERIES_DETAIL_COLUMNS,
            rows: series_detail_rows,
        },
        SeedBatch {
            relation: "content_genres",
            columns: GENRE_COLUMNS,
            rows: genre_rows,
        },
        SeedBatch {
            relation: "series_episodes",
            columns: EPISODE_COLUMNS,
            rows: episode_rows,
        },
    ]
}

fn content_row(
    content_id: &str,
    title: &str,
    content_type: &str,
    rating: Decimal,
    production_budget: Decimal,
) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(content_id.to_string()),
        SqlValue::Text(title.to_string()),
        SqlValue::Text(content_type.to_string()),
        SqlValue::Numeric(rating),
        SqlValue::Numeric(production_budget),
    ]
}
