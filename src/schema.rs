//! The analytics schema as data.
//!
//! Both store backends consume these specs: the PostgreSQL backend renders
//! them to DDL, the in-memory backend records them directly, so tests
//! observe the same schema the real store receives.

/// Column type vocabulary. Each variant maps to one SQL type per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    BigInt,
    Numeric,
    Date,
}

/// A column within a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    /// Referenced relation, pointing at its primary key column.
    pub references: Option<&'static str>,
}

impl ColumnSpec {
    const fn new(name: &'static str, ty: ColumnType) -> Self {
        ColumnSpec {
            name,
            ty,
            primary_key: false,
            references: None,
        }
    }

    const fn primary(name: &'static str, ty: ColumnType) -> Self {
        ColumnSpec {
            name,
            ty,
            primary_key: true,
            references: None,
        }
    }

    const fn with_reference(mut self, relation: &'static str) -> Self {
        self.references = Some(relation);
        self
    }
}

/// A relation (table) to ensure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
}

impl RelationSpec {
    pub fn primary_key(&self) -> Option<&'static str> {
        self.columns.iter().find(|c| c.primary_key).map(|c| c.name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}

/// An index to ensure on a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub relation: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

/// The relations of the video-streaming analytics schema, in creation
/// order (parents before children).
pub fn analytics_relations() -> Vec<RelationSpec> {
    vec![
        RelationSpec {
            name: "content",
            columns: vec![
                ColumnSpec::primary("content_id", ColumnType::Text),
                ColumnSpec::new("title", ColumnType::Text),
                ColumnSpec::new("content_type", ColumnType::Text),
                ColumnSpec::new("rating", ColumnType::Numeric),
                ColumnSpec::new("production_budget", ColumnType::Numeric),
            ],
        },
        RelationSpec {
            name: "movie_details",
            columns: vec![
                ColumnSpec::primary("content_id", ColumnType::Text).with_reference("content"),
                ColumnSpec::new("duration_minutes", ColumnType::Integer),
                ColumnSpec::new("release_year", ColumnType::Integer),
                ColumnSpec::new("views_count", ColumnType::BigInt),
            ],
        },
        RelationSpec {
            name: "series_details",
            columns: vec![
                ColumnSpec::primary("content_id", ColumnType::Text).with_reference("content"),
                ColumnSpec::new("seasons", ColumnType::Integer),
                ColumnSpec::new("avg_episode_duration", ColumnType::Numeric),
                ColumnSpec::new("total_views", ColumnType::BigInt),
            ],
        },
        RelationSpec {
            name: "content_genres",
            columns: vec![
                ColumnSpec::new("content_id", ColumnType::Text).with_reference("content"),
                ColumnSpec::new("genre", ColumnType::Text),
            ],
        },
        RelationSpec {
            name: "series_episodes",
            columns: vec![
                ColumnSpec::new("content_id", ColumnType::Text).with_reference("content"),
                ColumnSpec::new("season", ColumnType::Integer),
                ColumnSpec::new("episode_count", ColumnType::Integer),
            ],
        },
        RelationSpec {
            name: "users",
            columns: vec![
                ColumnSpec::primary("user_id", ColumnType::BigInt),
                ColumnSpec::new("age", ColumnType::Integer),
                ColumnSpec::new("country", ColumnType::Text),
                ColumnSpec::new("subscription_type", ColumnType::Text),
                ColumnSpec::new("registration_date", ColumnType::Date),
                ColumnSpec::new("total_watch_time_hours", ColumnType::Numeric),
            ],
        },
        RelationSpec {
            name: "viewing_sessions",
            columns: vec![
                ColumnSpec::primary("session_id", ColumnType::Text),
                ColumnSpec::new("user_id", ColumnType::BigInt),
                ColumnSpec::new("content_id", ColumnType::Text),
                ColumnSpec::new("watch_date", ColumnType::Date),
                ColumnSpec::new("watch_duration_minutes", ColumnType::Integer),
                ColumnSpec::new("completion_percentage", ColumnType::Numeric),
                ColumnSpec::new("device_type", ColumnType::Text),
                ColumnSpec::new("quality_level", ColumnType::Text),
            ],
        },
    ]
}

/// The indexes of the analytics schema: the rating and genre lookup
/// indexes, plus uniqueness over the child relations' natural keys.
pub fn analytics_indexes() -> Vec<IndexSpec> {
    vec![
        IndexSpec {
            name: "idx_content_rating",
            relation: "content",
            columns: &["rating"],
            unique: false,
        },
        IndexSpec {
            name: "idx_content_genres_genre",
            relation: "content_genres",
            columns: &["genre"],
            unique: false,
        },
        IndexSpec {
            name: "uq_content_genres",
            relation: "content_genres",
            columns: &["content_id", "genre"],
            unique: true,
        },
        IndexSpec {
            name: "uq_series_episodes",
            relation: "series_episodes",
            columns: &["content_id", "season"],
            unique: true,
        },
        IndexSpec {
            name: "idx_sessions_user",
            relation: "viewing_sessions",
            columns: &["user_id"],
            unique: false,
        },
        IndexSpec {
            name: "idx_sessions_content",
            relation: "viewing_sessions",
            columns: &["content_id"],
            unique: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_relation_names_are_unique() {
        let relations = analytics_relations();
        let names: HashSet<_> = relations.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), relations.len());
    }

    #[test]
    fn test_expected_relations_present() {
        let names: Vec<_> = analytics_relations().iter().map(|r| r.name).collect();
        for expected in [
            "content",
            "movie_details",
            "series_details",
            "content_genres",
            "series_episodes",
            "users",
            "viewing_sessions",
        ] {
            assert!(names.contains(&expected), "missing relation {expected}");
        }
    }

    #[test]
    fn test_references_point_at_earlier_relations() {
        let relations = analytics_relations();
        let mut seen = HashSet::new();
        for relation in &relations {
            for column in &relation.columns {
                if let Some(target) = column.references {
                    assert!(
                        seen.contains(target),
                        "{} references {} before it is created",
                        relation.name,
                        target
                    );
                }
            }
            seen.insert(relation.name);
        }
    }

    #[test]
    fn test_indexes_reference_known_relations_and_columns() {
        let relations = analytics_relations();
        for index in analytics_indexes() {
            let relation = relations
                .iter()
                .find(|r| r.name == index.relation)
                .unwrap_or_else(|| panic!("index {} on unknown relation", index.name));
            for column in index.columns {
                assert!(
                    relation.column_names().contains(column),
                    "index {} uses unknown column {}",
                    index.name,
                    column
                );
            }
        }
    }

    #[test]
    fn test_content_has_unique_primary_key() {
        let relations = analytics_relations();
        let content = relations.iter().find(|r| r.name == "content").unwrap();
        assert_eq!(content.primary_key(), Some("content_id"));
    }
}
