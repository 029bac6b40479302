use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    /// A stored row that no longer decodes into its model
    #[error("Corrupt row: {field} - {message}")]
    CorruptRow { field: String, message: String },

    #[error("Duplicate {field}")]
    Conflict { field: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LibraryError {
    /// Translate a unique-constraint violation on `table.column` into
    /// [`LibraryError::Conflict`]; other errors pass through.
    pub fn from_unique_violation(err: sqlx::Error, table: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = db_err.message();
                let prefix = format!("{}.", table);
                let field = message
                    .rsplit(' ')
                    .next()
                    .and_then(|col| col.strip_prefix(prefix.as_str()))
                    .unwrap_or("record")
                    .to_string();
                return LibraryError::Conflict { field };
            }
        }
        LibraryError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
