use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use tracing::info;

use vidsage_core::config::is_table_identifier;
use vidsage_core::CATALOG_COLUMNS;

use crate::warehouse::WarehouseError;

#[derive(Clone, Copy, Debug)]
pub struct DemoVideo {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub guest: Option<&'static str>,
    pub published_date: &'static str,
    pub duration: &'static str,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub sentiment: (f64, f64, f64),
    pub topic: &'static str,
}

impl DemoVideo {
    pub fn thumbnail_url(&self) -> String {
        format!("https://i.ytimg.com/vi/{}/maxresdefault.jpg", self.id)
    }

    pub fn video_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// Catalog rows. Text columns are stored lower-case, which is what query
/// synthesis assumes when it lower-cases search terms.
pub const CATALOG_VIDEOS: &[DemoVideo] = &[
    DemoVideo {
        id: "q7Yd1sLp0aE",
        title: "the science of deep sleep",
        description: "why deep sleep matters for memory and how to get more of it",
        category: "podcast",
        guest: Some("dr. maya lindqvist"),
        published_date: "2024-03-11",
        duration: "01:12:40",
        view_count: 184_220,
        like_count: 9_310,
        comment_count: 612,
        sentiment: (81.0, 6.5, 12.5),
        topic: "sleep",
    },
    DemoVideo {
        id: "Zr4kP9vBq2M",
        title: "fix your sleep schedule in 7 days",
        description: "a practical routine for resetting your circadian rhythm",
        category: "tutorial",
        guest: None,
        published_date: "2024-06-02",
        duration: "00:18:05",
        view_count: 402_118,
        like_count: 21_004,
        comment_count: 1_877,
        sentiment: (74.2, 9.1, 16.7),
        topic: "sleep",
    },
    DemoVideo {
        id: "Lm2nC8xTt5Q",
        title: "strength training after forty",
        description: "building muscle safely as you age, with a sports physician",
        category: "interview",
        guest: Some("dr. sam okafor"),
        published_date: "2023-11-20",
        duration: "00:54:12",
        view_count: 96_540,
        like_count: 4_820,
        comment_count: 301,
        sentiment: (85.3, 3.2, 11.5),
        topic: "fitness",
    },
    DemoVideo {
        id: "Hp0sW3eRj7K",
        title: "cold exposure myths and facts",
        description: "what the research says about ice baths and cold showers",
        category: "podcast",
        guest: Some("prof. elena varga"),
        published_date: "2024-01-08",
        duration: "01:31:02",
        view_count: 251_903,
        like_count: 11_642,
        comment_count: 1_090,
        sentiment: (68.0, 14.4, 17.6),
        topic: "recovery",
    },
    DemoVideo {
        id: "Bn6tY1uIo4P",
        title: "five minute morning mobility",
        description: "a short daily mobility flow for stiff backs and hips",
        category: "short",
        guest: None,
        published_date: "2024-08-19",
        duration: "00:05:11",
        view_count: 1_205_770,
        like_count: 88_012,
        comment_count: 2_940,
        sentiment: (90.1, 2.0, 7.9),
        topic: "mobility",
    },
    DemoVideo {
        id: "Cv9gH2jKl8R",
        title: "nutrition q&a live",
        description: "answering viewer questions on protein, fasting and supplements",
        category: "livestream",
        guest: Some("jordan reyes"),
        published_date: "2024-05-14",
        duration: "02:03:44",
        view_count: 58_331,
        like_count: 2_104,
        comment_count: 3_412,
        sentiment: (62.7, 11.8, 25.5),
        topic: "nutrition",
    },
    DemoVideo {
        id: "Ds3fG7hJk1L",
        title: "managing stress with breathwork",
        description: "guided breathing techniques to calm the nervous system before sleep",
        category: "tutorial",
        guest: None,
        published_date: "2023-09-30",
        duration: "00:22:47",
        view_count: 310_466,
        like_count: 17_930,
        comment_count: 845,
        sentiment: (87.6, 3.9, 8.5),
        topic: "stress",
    },
];

/// Rows served when a generated statement matches nothing.
pub const FEATURED_VIDEOS: &[DemoVideo] = &[
    DemoVideo {
        id: "BwyZIWeBpRw",
        title: "start here: a tour of the channel",
        description: "what this channel covers and where to begin",
        category: "short",
        guest: None,
        published_date: "2023-06-01",
        duration: "00:03:30",
        view_count: 512_004,
        like_count: 30_110,
        comment_count: 980,
        sentiment: (88.0, 2.5, 9.5),
        topic: "channel",
    },
    DemoVideo {
        id: "lsODSDmY4CY",
        title: "the most requested episode",
        description: "our most watched long-form conversation on health and longevity",
        category: "podcast",
        guest: Some("dr. maya lindqvist"),
        published_date: "2023-10-17",
        duration: "01:45:09",
        view_count: 2_301_558,
        like_count: 120_441,
        comment_count: 8_730,
        sentiment: (83.4, 5.1, 11.5),
        topic: "longevity",
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedReport {
    pub catalog_table: String,
    pub catalog_rows: usize,
    pub fallback_table: String,
    pub fallback_rows: usize,
}

/// Creates and fills the catalog and fallback tables in a SQLite warehouse.
pub struct DemoCatalog;

impl DemoCatalog {
    pub async fn seed(
        url: &str,
        catalog_table: &str,
        fallback_table: &str,
    ) -> Result<SeedReport, WarehouseError> {
        for table in [catalog_table, fallback_table] {
            if !is_table_identifier(table) || table.contains('.') {
                return Err(WarehouseError::Configuration(format!(
                    "`{table}` is not a plain table name"
                )));
            }
        }

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut connection = SqliteConnection::connect_with(&options).await?;
        let mut tx = connection.begin().await?;

        for (table, videos) in [(catalog_table, CATALOG_VIDEOS), (fallback_table, FEATURED_VIDEOS)]
        {
            let drop_sql = format!("DROP TABLE IF EXISTS {table}");
            sqlx::query(&drop_sql).execute(&mut *tx).await?;
            let create_sql = create_table_sql(table);
            sqlx::query(&create_sql).execute(&mut *tx).await?;

            let insert_sql = insert_sql(table);
            for video in videos {
                let (positive, negative, neutral) = video.sentiment;
                sqlx::query(&insert_sql)
                    .bind(video.id)
                    .bind(video.title)
                    .bind(video.description)
                    .bind(video.thumbnail_url())
                    .bind(video.video_url())
                    .bind(video.category)
                    .bind(video.guest)
                    .bind(video.published_date)
                    .bind(video.duration)
                    .bind(video.view_count)
                    .bind(video.like_count)
                    .bind(video.comment_count)
                    .bind(positive)
                    .bind(negative)
                    .bind(neutral)
                    .bind(video.topic)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        connection.close().await?;

        info!(
            event_name = "warehouse.fixtures.seeded",
            catalog_table,
            fallback_table,
            catalog_rows = CATALOG_VIDEOS.len(),
            fallback_rows = FEATURED_VIDEOS.len(),
            "demo catalog seeded"
        );

        Ok(SeedReport {
            catalog_table: catalog_table.to_string(),
            catalog_rows: CATALOG_VIDEOS.len(),
            fallback_table: fallback_table.to_string(),
            fallback_rows: FEATURED_VIDEOS.len(),
        })
    }
}

fn create_table_sql(table: &str) -> String {
    let columns = CATALOG_COLUMNS
        .iter()
        .map(|column| format!("{} {}", column.name, column.sql_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {table} ({columns})")
}

fn insert_sql(table: &str) -> String {
    let names = CATALOG_COLUMNS.iter().map(|column| column.name).collect::<Vec<_>>();
    let placeholders = vec!["?"; names.len()].join(", ");
    format!("INSERT INTO {table} ({}) VALUES ({placeholders})", names.join(", "))
}
