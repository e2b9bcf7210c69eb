//! Database connection descriptor

use crate::error::{LoaderError, Result};

/// Credentials and connect identifier of one target database.
///
/// Immutable once built. Neither `Display` nor `Debug` print the password;
/// only [`Database::connect_string`] does, for the loader command line.
#[derive(Clone, PartialEq, Eq)]
pub struct Database {
    name: String,
    user: String,
    password: String,
    connection_id: String,
}

impl Database {
    /// Build a descriptor; every field must be non-empty
    pub fn new(
        name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        connection_id: impl Into<String>,
    ) -> Result<Self> {
        let db = Self {
            name: name.into(),
            user: user.into(),
            password: password.into(),
            connection_id: connection_id.into(),
        };

        for (field, value) in [
            ("name", &db.name),
            ("user", &db.user),
            ("password", &db.password),
            ("connection id", &db.connection_id),
        ] {
            if value.trim().is_empty() {
                return Err(LoaderError::invalid_database(
                    db.name.clone(),
                    format!("{} cannot be empty", field),
                ));
            }
        }

        Ok(db)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<user>/<password>@<connection_id>`, as the loader binary expects it
    pub fn connect_string(&self) -> String {
        format!("{}/{}@{}", self.user, self.password, self.connection_id)
    }
}

impl std::fmt::Display for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/***@{}", self.user, self.connection_id)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"***")
            .field("connection_id", &self.connection_id)
            .finish()
    }
}
