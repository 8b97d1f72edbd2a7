use crate::models::ListingRow;
use crate::{Database, OptionalExt, Result};
use rusqlite::Connection;
use rusqlite::types::ToSql;

/// Query-string filters for listing search.
#[derive(Debug, Default)]
pub struct ListingFilter {
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub location: Option<String>,
    /// Case-insensitive substring match over name, description and location.
    pub search: Option<String>,
    /// One of `price_per_night`, `created_at`, `name`; a `-` prefix reverses.
    pub ordering: Option<String>,
}

const LISTING_COLS: &str =
    "id, host_id, name, description, location, price_per_night_cents, created_at, updated_at";

impl Database {
    pub fn create_listing(
        &self,
        id: &str,
        host_id: &str,
        name: &str,
        description: &str,
        location: &str,
        price_per_night_cents: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings (id, host_id, name, description, location, price_per_night_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, host_id, name, description, location, price_per_night_cents],
            )?;
            Ok(())
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| query_listing(conn, id))
    }

    pub fn update_listing(
        &self,
        id: &str,
        name: &str,
        description: &str,
        location: &str,
        price_per_night_cents: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE listings
                 SET name = ?2, description = ?3, location = ?4, price_per_night_cents = ?5,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                rusqlite::params![id, name, description, location, price_per_night_cents],
            )?;
            if changed == 0 {
                return Err(crate::StoreError::NotFound);
            }
            Ok(())
        })
    }

    pub fn delete_listing(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM listings WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(crate::StoreError::NotFound);
            }
            Ok(())
        })
    }

    pub fn listings_for_host(&self, host_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {LISTING_COLS} FROM listings WHERE host_id = ?1 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([host_id], map_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Filtered, searched and ordered listing query. The WHERE clause is built
    /// dynamically but every value is bound, and the ORDER BY column comes
    /// from a closed whitelist.
    pub fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut clauses: Vec<String> = Vec::new();
            let mut params: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(min) = filter.min_price_cents {
                params.push(Box::new(min));
                clauses.push(format!("price_per_night_cents >= ?{}", params.len()));
            }
            if let Some(max) = filter.max_price_cents {
                params.push(Box::new(max));
                clauses.push(format!("price_per_night_cents <= ?{}", params.len()));
            }
            if let Some(location) = &filter.location {
                params.push(Box::new(location.clone()));
                clauses.push(format!("location = ?{}", params.len()));
            }
            if let Some(search) = &filter.search {
                let pattern = format!("%{}%", search);
                params.push(Box::new(pattern));
                let n = params.len();
                clauses.push(format!(
                    "(name LIKE ?{n} OR description LIKE ?{n} OR location LIKE ?{n})"
                ));
            }

            let where_clause = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };

            let sql = format!(
                "SELECT {LISTING_COLS} FROM listings {where_clause} ORDER BY {}",
                order_by(filter.ordering.as_deref())
            );

            let mut stmt = conn.prepare(&sql)?;
            let bound: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let rows = stmt
                .query_map(bound.as_slice(), map_listing)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Average rating and review count for one listing.
    pub fn rating_for_listing(&self, listing_id: &str) -> Result<(f64, i64)> {
        self.with_conn(|conn| {
            let pair = conn.query_row(
                "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM reviews WHERE listing_id = ?1",
                [listing_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(pair)
        })
    }

    /// Batch-fetch rating aggregates for a set of listing IDs.
    pub fn rating_for_listings(&self, listing_ids: &[String]) -> Result<Vec<(String, f64, i64)>> {
        if listing_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=listing_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT listing_id, AVG(rating), COUNT(*) FROM reviews
                 WHERE listing_id IN ({})
                 GROUP BY listing_id",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn ToSql> = listing_ids
                .iter()
                .map(|id| id as &dyn ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn order_by(ordering: Option<&str>) -> &'static str {
    let (field, desc) = match ordering {
        Some(s) if s.starts_with('-') => (&s[1..], true),
        Some(s) => (s, false),
        None => ("created_at", true),
    };
    match (field, desc) {
        ("price_per_night", false) => "price_per_night_cents ASC",
        ("price_per_night", true) => "price_per_night_cents DESC",
        ("name", false) => "name ASC",
        ("name", true) => "name DESC",
        ("created_at", false) => "created_at ASC",
        _ => "created_at DESC",
    }
}

fn query_listing(conn: &Connection, id: &str) -> Result<Option<ListingRow>> {
    let sql = format!("SELECT {LISTING_COLS} FROM listings WHERE id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], map_listing).optional()?;
    Ok(row)
}

fn map_listing(row: &rusqlite::Row<'_>) -> std::result::Result<ListingRow, rusqlite::Error> {
    Ok(ListingRow {
        id: row.get(0)?,
        host_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        price_per_night_cents: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::ListingFilter;
    use crate::Database;

    fn seed(db: &Database) {
        db.create_user("host", "host@example.com", "hash", "Hana", "Girma", None)
            .unwrap();
        db.create_listing("l1", "host", "Lakeside Cabin", "Quiet cabin", "Awassa", 10_000)
            .unwrap();
        db.create_listing("l2", "host", "City Loft", "Downtown loft", "Addis Ababa", 25_000)
            .unwrap();
        db.create_listing("l3", "host", "Garden Villa", "Villa with garden", "Addis Ababa", 40_000)
            .unwrap();
    }

    #[test]
    fn price_range_filter() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let filter = ListingFilter {
            min_price_cents: Some(20_000),
            max_price_cents: Some(30_000),
            ..Default::default()
        };
        let rows = db.list_listings(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "l2");
    }

    #[test]
    fn location_and_search_filters() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let by_location = db
            .list_listings(&ListingFilter {
                location: Some("Addis Ababa".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_location.len(), 2);

        let by_search = db
            .list_listings(&ListingFilter {
                search: Some("garden".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].id, "l3");
    }

    #[test]
    fn ordering_by_price() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let rows = db
            .list_listings(&ListingFilter {
                ordering: Some("price_per_night".into()),
                ..Default::default()
            })
            .unwrap();
        let prices: Vec<i64> = rows.iter().map(|r| r.price_per_night_cents).collect();
        assert_eq!(prices, vec![10_000, 25_000, 40_000]);

        let rows = db
            .list_listings(&ListingFilter {
                ordering: Some("-price_per_night".into()),
                ..Default::default()
            })
            .unwrap();
        let prices: Vec<i64> = rows.iter().map(|r| r.price_per_night_cents).collect();
        assert_eq!(prices, vec![40_000, 25_000, 10_000]);
    }

    #[test]
    fn unknown_ordering_falls_back_to_newest_first() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);

        let rows = db
            .list_listings(&ListingFilter {
                ordering: Some("hackme; DROP TABLE listings".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn rating_aggregates() {
        let db = Database::open_in_memory().unwrap();
        seed(&db);
        db.create_user("g1", "g1@example.com", "hash", "Guest", "One", None)
            .unwrap();
        db.create_user("g2", "g2@example.com", "hash", "Guest", "Two", None)
            .unwrap();
        db.add_review("r1", "l1", "g1", 4, "Nice").unwrap();
        db.add_review("r2", "l1", "g2", 2, "Okay").unwrap();

        let (avg, count) = db.rating_for_listing("l1").unwrap();
        assert_eq!(count, 2);
        assert!((avg - 3.0).abs() < f64::EPSILON);

        let (avg, count) = db.rating_for_listing("l2").unwrap();
        assert_eq!(count, 0);
        assert_eq!(avg, 0.0);
    }
}
