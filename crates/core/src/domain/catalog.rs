//! Fixed schema of the video catalog table.
//!
//! Query synthesis describes exactly these columns to the model, and the demo
//! fixtures create tables with the same layout.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub description: &'static str,
}

pub const CATALOG_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { name: "ID", sql_type: "TEXT", description: "unique video id" },
    ColumnSpec { name: "TITLE", sql_type: "TEXT", description: "video title, lower-case" },
    ColumnSpec {
        name: "DESCRIPTION",
        sql_type: "TEXT",
        description: "video description, lower-case",
    },
    ColumnSpec { name: "THUMBNAIL_URL", sql_type: "TEXT", description: "thumbnail image url" },
    ColumnSpec { name: "VIDEO_URL", sql_type: "TEXT", description: "watch url" },
    ColumnSpec {
        name: "CATEGORY",
        sql_type: "TEXT",
        description: "one of the fixed categories, lower-case",
    },
    ColumnSpec { name: "GUEST", sql_type: "TEXT", description: "featured guest name, lower-case" },
    ColumnSpec { name: "PUBLISHED_DATE", sql_type: "DATE", description: "publish date" },
    ColumnSpec { name: "DURATION", sql_type: "TEXT", description: "duration as HH:MM:SS" },
    ColumnSpec { name: "VIEW_COUNT", sql_type: "INTEGER", description: "number of views" },
    ColumnSpec { name: "LIKE_COUNT", sql_type: "INTEGER", description: "number of likes" },
    ColumnSpec { name: "COMMENT_COUNT", sql_type: "INTEGER", description: "number of comments" },
    ColumnSpec {
        name: "POSITIVE_SENTIMENT_PCT",
        sql_type: "REAL",
        description: "share of positive comments, 0-100",
    },
    ColumnSpec {
        name: "NEGATIVE_SENTIMENT_PCT",
        sql_type: "REAL",
        description: "share of negative comments, 0-100",
    },
    ColumnSpec {
        name: "NEUTRAL_SENTIMENT_PCT",
        sql_type: "REAL",
        description: "share of neutral comments, 0-100",
    },
    ColumnSpec { name: "TOPIC", sql_type: "TEXT", description: "main topic, lower-case" },
];

/// Text columns searched with OR-combined `LIKE` predicates.
pub const SEARCHABLE_COLUMNS: &[&str] = &["TITLE", "DESCRIPTION", "TOPIC", "CATEGORY", "GUEST"];

pub const CATEGORIES: &[&str] = &["podcast", "interview", "tutorial", "short", "livestream"];
