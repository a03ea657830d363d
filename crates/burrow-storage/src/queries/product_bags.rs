// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use burrow_core::BurrowError;
use burrow_core::types::ProductBag;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductBag> {
    Ok(ProductBag {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        timestamp: row.get(2)?,
        products: row.get(3)?,
    })
}

/// Save a bag, replacing the contents of any bag with the same name.
pub async fn save_product_bag(db: &Database, bag: &ProductBag) -> Result<i64, BurrowError> {
    let bag = bag.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "INSERT INTO product_bags (name, timestamp, products) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET
                     timestamp = excluded.timestamp,
                     products = excluded.products
                 RETURNING id",
                params![bag.name, bag.timestamp, bag.products],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn fetch_product_bag(
    db: &Database,
    name: &str,
) -> Result<Option<ProductBag>, BurrowError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ProductBag>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, name, timestamp, products FROM product_bags WHERE name = ?1",
                params![name],
                read_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn fetch_product_bags(db: &Database) -> Result<Vec<ProductBag>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Vec<ProductBag>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, name, timestamp, products FROM product_bags ORDER BY name ASC",
            )?;
            let bags: Result<Vec<ProductBag>, _> = stmt.query_map([], read_row)?.collect();
            bags
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_product_bag(db: &Database, name: &str) -> Result<(), BurrowError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM product_bags WHERE name = ?1", params![name])
        })
        .await
        .map_err(map_tr_err)
        .map(|_| ())
}

pub async fn delete_all_product_bags(db: &Database) -> Result<usize, BurrowError> {
    db.connection()
        .call(|conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM product_bags", [])
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saving_same_name_replaces_contents() {
        let db = Database::open_in_memory().await.unwrap();
        let first = save_product_bag(&db, &ProductBag::new("cart", b"[1]".to_vec()))
            .await
            .unwrap();
        let second = save_product_bag(&db, &ProductBag::new("cart", b"[1,2]".to_vec()))
            .await
            .unwrap();
        assert_eq!(first, second);

        let bag = fetch_product_bag(&db, "cart").await.unwrap().unwrap();
        assert_eq!(bag.products, b"[1,2]".to_vec());
        assert!(fetch_product_bag(&db, "wishlist").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_name_and_clear() {
        let db = Database::open_in_memory().await.unwrap();
        for name in ["b", "a", "c"] {
            save_product_bag(&db, &ProductBag::new(name, Vec::new()))
                .await
                .unwrap();
        }
        let names: Vec<String> = fetch_product_bags(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);

        delete_product_bag(&db, "b").await.unwrap();
        delete_product_bag(&db, "b").await.unwrap();
        assert_eq!(delete_all_product_bags(&db).await.unwrap(), 2);
        assert!(fetch_product_bags(&db).await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
