use sea_orm_migration::prelude::*;

use crate::m20250901_000002_create_tasks_table::Tasks;

#[derive(DeriveMigrationName)]
pub struct Migration;

const IDX_TASKS_USER_ID_CREATED_AT: &str = "idx-tasks-user_id-created_at";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(IDX_TASKS_USER_ID_CREATED_AT)
                    .table(Tasks::Table)
                    .col(Tasks::UserId)
                    .col(Tasks::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_TASKS_USER_ID_CREATED_AT)
                    .table(Tasks::Table)
                    .to_owned(),
            )
            .await
    }
}
