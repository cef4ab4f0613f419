use sea_orm::sea_query::{
    Alias, ColumnDef, Index, IndexCreateStatement, Table, TableCreateStatement,
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend};
use tracing::info;

use crate::constants::{COIN_SCALE, ODDS_SCALE};
use crate::error::{Error, Result};

const COIN_PRECISION: u32 = 20;
const ODDS_PRECISION: u32 = 10;

pub struct Db {
    connection: DatabaseConnection,
}

impl Db {
    pub async fn new(database_url: &str) -> Result<Self> {
        let connection = Database::connect(database_url)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        info!("✅ Connected to database");
        Ok(Self { connection })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Creates the markets, accounts and wagers tables and their indexes if they do not
    /// exist yet.
    pub async fn create_tables(&self) -> Result<()> {
        let backend = self.connection.get_database_backend();

        for (name, mut table, mut indexes) in [
            ("markets", Self::markets_table(), Self::markets_indexes()),
            ("accounts", Self::accounts_table(), Vec::new()),
            ("wagers", Self::wagers_table(), Self::wagers_indexes()),
        ] {
            // MySQL has no CREATE INDEX IF NOT EXISTS, so its indexes go inline.
            if backend == DbBackend::MySql {
                for index in indexes.iter_mut() {
                    table.index(index);
                }
                indexes.clear();
            }

            self.connection
                .execute(backend.build(&table))
                .await
                .map_err(|e| Error::Database(format!("Failed to create {} table: {}", name, e)))?;

            for index in indexes.iter_mut() {
                let stmt = index.table(Alias::new(name)).if_not_exists().to_owned();
                self.connection
                    .execute(backend.build(&stmt))
                    .await
                    .map_err(|e| {
                        Error::Database(format!("Failed to index {} table: {}", name, e))
                    })?;
            }
            info!("✅ Ensured {} table", name);
        }
        Ok(())
    }

    fn markets_table() -> TableCreateStatement {
        Table::create()
            .table(Alias::new("markets"))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("external_id"))
                    .string_len(128)
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(Alias::new("name")).string_len(255).not_null())
            .col(ColumnDef::new(Alias::new("side_a")).string_len(120).not_null())
            .col(ColumnDef::new(Alias::new("side_b")).string_len(120).not_null())
            .col(odds_column("odds_a").not_null())
            .col(odds_column("odds_b").not_null())
            .col(&mut odds_column("odds_draw"))
            .col(ColumnDef::new(Alias::new("start_time")).date_time())
            .col(ColumnDef::new(Alias::new("updated_at")).date_time().not_null())
            .to_owned()
    }

    fn markets_indexes() -> Vec<IndexCreateStatement> {
        vec![Index::create()
            .name("idx_markets_start_time")
            .col(Alias::new("start_time"))
            .to_owned()]
    }

    fn accounts_table() -> TableCreateStatement {
        Table::create()
            .table(Alias::new("accounts"))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("id"))
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(coin_column("coin_balance").not_null())
            .col(ColumnDef::new(Alias::new("created_at")).date_time().not_null())
            .to_owned()
    }

    fn wagers_table() -> TableCreateStatement {
        Table::create()
            .table(Alias::new("wagers"))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("id"))
                    .big_integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Alias::new("user_id")).big_integer().not_null())
            .col(ColumnDef::new(Alias::new("market_id")).string_len(128).not_null())
            .col(ColumnDef::new(Alias::new("market_name")).string_len(255).not_null())
            .col(coin_column("stake_amount").not_null())
            .col(odds_column("odds").not_null())
            .col(ColumnDef::new(Alias::new("selected_side")).string_len(120).not_null())
            .col(ColumnDef::new(Alias::new("status")).string_len(16).not_null())
            .col(ColumnDef::new(Alias::new("placed_at")).date_time().not_null())
            .col(ColumnDef::new(Alias::new("settled_at")).date_time())
            .to_owned()
    }

    fn wagers_indexes() -> Vec<IndexCreateStatement> {
        vec![
            Index::create()
                .name("idx_wagers_market_status")
                .col(Alias::new("market_id"))
                .col(Alias::new("status"))
                .to_owned(),
            Index::create()
                .name("idx_wagers_user")
                .col(Alias::new("user_id"))
                .to_owned(),
        ]
    }
}

fn coin_column(name: &str) -> ColumnDef {
    ColumnDef::new(Alias::new(name))
        .decimal_len(COIN_PRECISION, COIN_SCALE)
        .to_owned()
}

fn odds_column(name: &str) -> ColumnDef {
    ColumnDef::new(Alias::new(name))
        .decimal_len(ODDS_PRECISION, ODDS_SCALE)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{MysqlQueryBuilder, SqliteQueryBuilder};

    #[test]
    fn wagers_are_indexed_for_the_settlement_lookup() {
        let mut table = Db::wagers_table();
        for index in Db::wagers_indexes().iter_mut() {
            table.index(index);
        }
        let sql = table.to_string(MysqlQueryBuilder);

        assert!(sql.contains("CREATE TABLE IF NOT EXISTS `wagers`"));
        assert!(sql.contains("idx_wagers_market_status"));
        assert!(sql.contains("`stake_amount` decimal(20, 8)"));
    }

    #[test]
    fn markets_table_keys_on_external_id() {
        let sql = Db::markets_table().to_string(MysqlQueryBuilder);

        assert!(sql.contains("`external_id` varchar(128)"));
        assert!(sql.contains("PRIMARY KEY"));
        assert!(sql.contains("`odds_draw` decimal(10, 4)"));
    }

    #[test]
    fn standalone_indexes_are_idempotent() {
        let sql = Db::markets_indexes()[0]
            .table(Alias::new("markets"))
            .if_not_exists()
            .to_string(SqliteQueryBuilder);

        assert!(sql.starts_with("CREATE INDEX IF NOT EXISTS"));
        assert!(sql.contains("\"markets\""));
    }
}
