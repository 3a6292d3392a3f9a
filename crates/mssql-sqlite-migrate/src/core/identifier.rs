//! Identifier validation and quoting for generated SQL.
//!
//! Identifiers (table names, column names, schema names) cannot be passed as
//! statement parameters, so every identifier that ends up in generated SQL goes
//! through this module:
//! 1. Validate for suspicious patterns (null bytes, empty, excessive length)
//! 2. Apply engine-specific quoting (brackets for SQL Server, double quotes for SQLite)
//! 3. Escape the closing quote character inside the name

use crate::error::{MigrateError, Result};

/// Maximum identifier length in SQL Server (sysname is nvarchar(128)).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Translated names join two SQL Server identifiers with an underscore.
const MAX_TRANSLATED_LENGTH: usize = MAX_IDENTIFIER_LENGTH * 2 + 1;

/// Validate a source identifier.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers longer than SQL Server allows.
///
/// # Errors
///
/// Returns `MigrateError::SchemaExtraction` with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    validate_with_limit(name, MAX_IDENTIFIER_LENGTH)
}

fn validate_with_limit(name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::SchemaExtraction(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::SchemaExtraction(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.chars().count() > max_len {
        return Err(MigrateError::SchemaExtraction(format!(
            "Identifier exceeds maximum length of {} characters: {:?}",
            max_len, name
        )));
    }

    Ok(())
}

/// Quote a SQLite identifier.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
///
/// ```ignore
/// assert_eq!(quote_sqlite("dbo_Orders")?, "\"dbo_Orders\"");
/// ```
pub fn quote_sqlite(name: &str) -> Result<String> {
    validate_with_limit(name, MAX_TRANSLATED_LENGTH)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a SQL Server identifier using brackets.
///
/// Escapes closing brackets by doubling them and wraps in brackets.
///
/// ```ignore
/// assert_eq!(quote_mssql("table]name")?, "[table]]name]");
/// ```
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Qualify a SQL Server table name with schema.
pub fn qualify_mssql(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_mssql(schema)?, quote_mssql(table)?))
}

/// Quote a list of SQLite column names and join them with `", "`.
pub fn quote_sqlite_list<S: AsRef<str>>(names: &[S]) -> Result<String> {
    let quoted = names
        .iter()
        .map(|n| quote_sqlite(n.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_length_limit() {
        let max_name = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(validate_identifier(&max_name).is_ok());
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(validate_identifier(&long_name)
            .unwrap_err()
            .to_string()
            .contains("maximum length"));
    }

    #[test]
    fn test_quote_sqlite_escapes_double_quote() {
        assert_eq!(quote_sqlite("dbo_Orders").unwrap(), "\"dbo_Orders\"");
        assert_eq!(quote_sqlite("a\"b").unwrap(), "\"a\"\"b\"");
    }

    #[test]
    fn test_quote_sqlite_accepts_translated_length() {
        let translated = format!(
            "{}_{}",
            "s".repeat(MAX_IDENTIFIER_LENGTH),
            "t".repeat(MAX_IDENTIFIER_LENGTH)
        );
        assert!(quote_sqlite(&translated).is_ok());
    }

    #[test]
    fn test_quote_sqlite_injection_safely_quoted() {
        assert_eq!(
            quote_sqlite("Robert\"); DROP TABLE Students;--").unwrap(),
            "\"Robert\"\"); DROP TABLE Students;--\""
        );
    }

    #[test]
    fn test_quote_mssql() {
        assert_eq!(quote_mssql("users").unwrap(), "[users]");
        assert_eq!(quote_mssql("table]name").unwrap(), "[table]]name]");
        assert_eq!(qualify_mssql("dbo", "Order Details").unwrap(), "[dbo].[Order Details]");
        assert!(quote_mssql("").is_err());
    }

    #[test]
    fn test_quote_sqlite_list() {
        assert_eq!(
            quote_sqlite_list(&["a", "b c"]).unwrap(),
            "\"a\", \"b c\""
        );
    }
}
