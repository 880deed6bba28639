//! Beer catalogue queries. Beers are never deleted.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use super::db_sqlite::Database;
use crate::errors::{TapError, TapResult};
use crate::models::{Beer, BeerInput};

fn row_to_beer(row: &SqliteRow) -> Result<Beer, sqlx::Error> {
    Ok(Beer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        abv: row.try_get("abv")?,
        image_path: row.try_get("image_path")?,
    })
}

impl Database {
    /// All beers, ordered by name.
    pub async fn list_beers(&self) -> TapResult<Vec<Beer>> {
        let rows = sqlx::query("SELECT id, name, abv, image_path FROM beers ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_beer).collect::<Result<_, _>>()?)
    }

    /// One beer by id.
    pub async fn get_beer(&self, id: i64) -> TapResult<Beer> {
        let row = sqlx::query("SELECT id, name, abv, image_path FROM beers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(row_to_beer(&row)?),
            None => Err(TapError::beer_not_found()),
        }
    }

    /// Adds a beer and returns it with its new id.
    pub async fn add_beer(&self, input: BeerInput) -> TapResult<Beer> {
        let input = input.validated()?;
        let row = sqlx::query(
            "INSERT INTO beers (name, abv, image_path) VALUES (?1, ?2, ?3)
             RETURNING id, name, abv, image_path",
        )
        .bind(&input.name)
        .bind(input.abv)
        .bind(&input.image_path)
        .fetch_one(&self.pool)
        .await?;
        let beer = row_to_beer(&row)?;
        info!(beer_id = beer.id, name = %beer.name, "Beer added");
        Ok(beer)
    }

    /// Edits a beer. A missing `image_path` keeps the current image.
    pub async fn edit_beer(&self, id: i64, input: BeerInput) -> TapResult<Beer> {
        let input = input.validated()?;
        let row = sqlx::query(
            "UPDATE beers SET name = ?1, abv = ?2, image_path = COALESCE(?3, image_path)
             WHERE id = ?4
             RETURNING id, name, abv, image_path",
        )
        .bind(&input.name)
        .bind(input.abv)
        .bind(&input.image_path)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => {
                let beer = row_to_beer(&row)?;
                info!(beer_id = beer.id, name = %beer.name, "Beer updated");
                Ok(beer)
            }
            None => Err(TapError::beer_not_found()),
        }
    }
}
