//! SQL Server source over tiberius.

use super::{RowReader, SchemaIntrospector, Source};
use crate::config::SourceConfig;
use crate::core::{Column, ForeignKey, QualifiedName, SqlValue};
use crate::error::{MigrateError, Result};
use crate::transfer::Projection;
use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tiberius::numeric::Numeric;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};
use uuid::Uuid;

const LIST_TABLES_QUERY: &str = r#"
    SELECT TABLE_SCHEMA, TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_SCHEMA, TABLE_NAME
"#;

const LIST_COLUMNS_QUERY: &str = r#"
    SELECT
        COLUMN_NAME,
        DATA_TYPE,
        IS_NULLABLE,
        COLUMN_DEFAULT,
        CHARACTER_MAXIMUM_LENGTH
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2
    ORDER BY ORDINAL_POSITION
"#;

const LIST_PRIMARY_KEY_QUERY: &str = r#"
    SELECT kcu.COLUMN_NAME
    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
        ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
        AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
    WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
        AND tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
    ORDER BY kcu.ORDINAL_POSITION
"#;

const LIST_UNIQUE_QUERY: &str = r#"
    SELECT kcu.CONSTRAINT_NAME, kcu.COLUMN_NAME
    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
        ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
        AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
    WHERE tc.CONSTRAINT_TYPE = 'UNIQUE'
        AND tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
    ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
"#;

const LIST_FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        fk.COLUMN_NAME,
        pk.TABLE_SCHEMA,
        pk.TABLE_NAME,
        pk.COLUMN_NAME
    FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE fk
        ON rc.CONSTRAINT_SCHEMA = fk.CONSTRAINT_SCHEMA
        AND rc.CONSTRAINT_NAME = fk.CONSTRAINT_NAME
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE pk
        ON rc.UNIQUE_CONSTRAINT_SCHEMA = pk.CONSTRAINT_SCHEMA
        AND rc.UNIQUE_CONSTRAINT_NAME = pk.CONSTRAINT_NAME
        AND fk.ORDINAL_POSITION = pk.ORDINAL_POSITION
    WHERE fk.TABLE_SCHEMA = @P1 AND fk.TABLE_NAME = @P2
    ORDER BY rc.CONSTRAINT_NAME, fk.ORDINAL_POSITION
"#;

/// Connection manager for bb8 pool with tiberius.
#[derive(Clone)]
struct TiberiusConnectionManager {
    config: SourceConfig,
}

impl TiberiusConnectionManager {
    fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        if self.config.encrypt {
            if self.config.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }

        config
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            })?;

        tcp.set_nodelay(true).ok();

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// SQL Server source holding a single pooled connection.
///
/// The run is strictly sequential, so the pool is capped at one connection;
/// bb8 still gives us validation and reconnect on checkout.
pub struct MssqlSource {
    pool: Pool<TiberiusConnectionManager>,
}

impl MssqlSource {
    /// Connect to SQL Server and verify the connection with `SELECT 1`.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let manager = TiberiusConnectionManager::new(config.clone());
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .await
            .map_err(|e| MigrateError::pool(e, "creating MSSQL source pool"))?;

        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| MigrateError::pool(e, "testing MSSQL source connection"))?;
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }

        info!(
            "Connected to MSSQL: {}/{}",
            config.address(),
            config.database
        );

        Ok(Self { pool })
    }

    async fn get_client(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting MSSQL source connection"))
    }

    /// Run a catalog query bound to `(schema, table)`.
    async fn catalog_rows(&self, sql: &str, table: &QualifiedName) -> Result<Vec<Row>> {
        let mut client = self.get_client().await?;

        let mut query = Query::new(sql);
        query.bind(table.schema.as_str());
        query.bind(table.name.as_str());

        let stream = query.query(&mut *client).await?;
        Ok(stream.into_first_result().await?)
    }
}

/// Read a catalog string column that must not be NULL.
fn required_str(row: &Row, idx: usize, what: &str) -> Result<String> {
    row.try_get::<&str, _>(idx)?
        .map(str::to_string)
        .ok_or_else(|| MigrateError::SchemaExtraction(format!("catalog returned NULL {}", what)))
}

#[async_trait]
impl SchemaIntrospector for MssqlSource {
    async fn list_tables(&self) -> Result<Vec<QualifiedName>> {
        let mut client = self.get_client().await?;
        let rows = client
            .simple_query(LIST_TABLES_QUERY)
            .await?
            .into_first_result()
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            tables.push(QualifiedName::new(
                required_str(&row, 0, "TABLE_SCHEMA")?,
                required_str(&row, 1, "TABLE_NAME")?,
            ));
        }

        debug!("Found {} base tables", tables.len());
        Ok(tables)
    }

    async fn list_columns(&self, table: &QualifiedName) -> Result<Vec<Column>> {
        let rows = self.catalog_rows(LIST_COLUMNS_QUERY, table).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let is_nullable = row
                .try_get::<&str, _>(2)?
                .map(|s| s.eq_ignore_ascii_case("YES"))
                .unwrap_or(true);
            columns.push(Column {
                name: required_str(&row, 0, "COLUMN_NAME")?,
                data_type: required_str(&row, 1, "DATA_TYPE")?,
                is_nullable,
                default: row.try_get::<&str, _>(3)?.map(str::to_string),
                max_length: row.try_get::<i32, _>(4)?,
            });
        }

        Ok(columns)
    }

    async fn list_primary_key_columns(&self, table: &QualifiedName) -> Result<Vec<String>> {
        let rows = self.catalog_rows(LIST_PRIMARY_KEY_QUERY, table).await?;
        rows.iter()
            .map(|row| required_str(row, 0, "primary key COLUMN_NAME"))
            .collect()
    }

    async fn list_unique_constraints(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let rows = self.catalog_rows(LIST_UNIQUE_QUERY, table).await?;

        let mut constraints: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in rows {
            let name = required_str(&row, 0, "CONSTRAINT_NAME")?;
            let column = required_str(&row, 1, "unique COLUMN_NAME")?;
            constraints.entry(name).or_default().push(column);
        }

        Ok(constraints)
    }

    async fn list_foreign_keys(&self, table: &QualifiedName) -> Result<Vec<ForeignKey>> {
        let rows = self.catalog_rows(LIST_FOREIGN_KEYS_QUERY, table).await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for row in rows {
            foreign_keys.push(ForeignKey {
                column: required_str(&row, 0, "foreign key COLUMN_NAME")?,
                ref_table: QualifiedName::new(
                    required_str(&row, 1, "referenced TABLE_SCHEMA")?,
                    required_str(&row, 2, "referenced TABLE_NAME")?,
                ),
                ref_column: required_str(&row, 3, "referenced COLUMN_NAME")?,
            });
        }

        Ok(foreign_keys)
    }
}

#[async_trait]
impl RowReader for MssqlSource {
    async fn read_rows(&self, projection: &Projection) -> Result<Vec<Vec<SqlValue>>> {
        let sql = projection.to_mssql_select()?;
        debug!("{}", sql);

        let mut client = self.get_client().await?;
        let rows = client.simple_query(sql).await?.into_first_result().await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(projection.columns.len());
            for (idx, col) in projection.columns.iter().enumerate() {
                values.push(convert_row_value(&row, idx, col.read_type())?);
            }
            out.push(values);
        }

        Ok(out)
    }
}

#[async_trait]
impl Source for MssqlSource {
    fn db_type(&self) -> &str {
        "mssql"
    }

    async fn close(&self) {
        // Dropping the pool closes its single connection.
        debug!("Closing MSSQL source");
    }
}

/// Convert a row value to SqlValue based on the column type.
fn convert_row_value(row: &Row, idx: usize, data_type: &str) -> Result<SqlValue> {
    let dt = data_type.to_lowercase();

    let value = match dt.as_str() {
        "bit" => SqlValue::from_option(row.try_get::<bool, _>(idx)?),
        "tinyint" => SqlValue::from_option(row.try_get::<u8, _>(idx)?.map(i16::from)),
        "smallint" => SqlValue::from_option(row.try_get::<i16, _>(idx)?),
        "int" => SqlValue::from_option(row.try_get::<i32, _>(idx)?),
        "bigint" => SqlValue::from_option(row.try_get::<i64, _>(idx)?),
        "real" => SqlValue::from_option(row.try_get::<f32, _>(idx)?),
        "float" => SqlValue::from_option(row.try_get::<f64, _>(idx)?),
        // money and smallmoney arrive as floating point on the wire
        "money" | "smallmoney" => SqlValue::from_option(row.try_get::<f64, _>(idx)?),
        "decimal" | "numeric" => match row.try_get::<Numeric, _>(idx)? {
            Some(num) => numeric_value(num),
            None => SqlValue::Null,
        },
        "uniqueidentifier" => SqlValue::from_option(row.try_get::<Uuid, _>(idx)?),
        "datetime" | "datetime2" | "smalldatetime" => {
            SqlValue::from_option(row.try_get::<NaiveDateTime, _>(idx)?)
        }
        "datetimeoffset" => {
            SqlValue::from_option(row.try_get::<DateTime<FixedOffset>, _>(idx)?)
        }
        "date" => SqlValue::from_option(row.try_get::<NaiveDate, _>(idx)?),
        "time" => SqlValue::from_option(row.try_get::<NaiveTime, _>(idx)?),
        "binary" | "varbinary" | "image" | "timestamp" | "rowversion" => {
            SqlValue::from_option(row.try_get::<&[u8], _>(idx)?.map(<[u8]>::to_vec))
        }
        // char, varchar, nchar, nvarchar, text, ntext and anything read as text
        _ => SqlValue::from_option(row.try_get::<&str, _>(idx)?),
    };

    Ok(value)
}

/// Convert a wire numeric without going through tiberius's `Decimal`
/// conversion, which panics above scale 28 or beyond 96 bits of mantissa.
/// Values rust_decimal cannot hold fall back to f64, since the target
/// column is REAL either way.
fn numeric_value(num: Numeric) -> SqlValue {
    match Decimal::try_from_i128_with_scale(num.value(), u32::from(num.scale())) {
        Ok(d) => SqlValue::Decimal(d),
        Err(_) => SqlValue::F64(num.value() as f64 / 10f64.powi(i32::from(num.scale()))),
    }
}
