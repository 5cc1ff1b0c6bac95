use crate::domain::{Book, BookId};
use crate::ports::catalog_store::{BookOrdering, BookQuery, CatalogStore, Page};
use crate::ports::error::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::error_mapping::map_sqlx_error;
use super::rows::{BOOK_COLUMNS, map_row_to_book};

/// Escape `%`, `_` and `\` so a search term matches literally inside ILIKE.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BookQuery) {
    builder.push(" WHERE TRUE");
    if let Some(author) = &query.author {
        builder.push(" AND author = ").push_bind(author.clone());
    }
    if let Some(isbn) = &query.isbn {
        builder.push(" AND isbn = ").push_bind(isbn.clone());
    }
    if let Some(available) = query.available {
        builder.push(" AND available = ").push_bind(available);
    }
    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR author ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn order_clause(ordering: BookOrdering) -> &'static str {
    match ordering {
        BookOrdering::CreatedAtDesc => " ORDER BY created_at DESC, id DESC",
        BookOrdering::CreatedAtAsc => " ORDER BY created_at ASC, id ASC",
        BookOrdering::TitleAsc => " ORDER BY title ASC, id ASC",
        BookOrdering::TitleDesc => " ORDER BY title DESC, id DESC",
    }
}

/// PostgreSQL implementation of [`CatalogStore`].
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn get_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list(&self, query: &BookQuery) -> Result<Page<Book>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM books");
        push_filters(&mut count, query);
        let total: i64 = count
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .try_get("total")
            .map_err(map_sqlx_error)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {BOOK_COLUMNS} FROM books"));
        push_filters(&mut select, query);
        select.push(order_clause(query.ordering));
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let items = rows.iter().map(map_row_to_book).collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn all_ids(&self) -> Result<Vec<BookId>> {
        let rows = sqlx::query("SELECT id FROM books ORDER BY created_at")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                row.try_get("id")
                    .map(BookId::from_uuid)
                    .map_err(map_sqlx_error)
            })
            .collect()
    }

    async fn insert(&self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, isbn, page_count, available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.isbn.as_str())
        .bind(book.page_count)
        .bind(book.available)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    /// `available` is deliberately absent from the SET list.
    async fn update_details(&self, book: &Book) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, page_count = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.isbn.as_str())
        .bind(book.page_count)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, book_id: BookId) -> Result<bool> {
        // The RESTRICT foreign key on loans.book_id refuses books with history.
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id.value())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_done\\"), "%100\\%\\_done\\\\%");
    }
}
