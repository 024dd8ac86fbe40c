//! Create `sequence_counter` table.
//!
//! One row per sequence key (club, deal, news, entity, role, permission);
//! `value` holds the last integer issued for that key. Rows are upserted on
//! first allocation, never deleted.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SequenceCounter::Table)
                    .if_not_exists()
                    .col(string_len(SequenceCounter::Key, 64).primary_key())
                    .col(big_integer(SequenceCounter::Value).not_null().default(0))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(SequenceCounter::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum SequenceCounter { Table, Key, Value }
