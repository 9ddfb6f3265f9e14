//! Create `follow_request` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FollowRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FollowRequest::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FollowRequest::FromUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FollowRequest::ToUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FollowRequest::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(FollowRequest::OpenPairKey).string_len(65))
                    .col(
                        ColumnDef::new(FollowRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(FollowRequest::RespondedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follow_request_from_user")
                            .from(FollowRequest::Table, FollowRequest::FromUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follow_request_to_user")
                            .from(FollowRequest::Table, FollowRequest::ToUserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(
                        Expr::col(FollowRequest::FromUserId)
                            .ne(Expr::col(FollowRequest::ToUserId)),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: open_pair_key - one pending request per unordered pair.
        // Resolved requests carry NULL here and never collide.
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_request_open_pair_key")
                    .table(FollowRequest::Table)
                    .col(FollowRequest::OpenPairKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (to_user_id, status) - incoming pending requests
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_request_to_user_status")
                    .table(FollowRequest::Table)
                    .col(FollowRequest::ToUserId)
                    .col(FollowRequest::Status)
                    .to_owned(),
            )
            .await?;

        // Index: (from_user_id, status) - sent pending requests
        manager
            .create_index(
                Index::create()
                    .name("idx_follow_request_from_user_status")
                    .table(FollowRequest::Table)
                    .col(FollowRequest::FromUserId)
                    .col(FollowRequest::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FollowRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FollowRequest {
    Table,
    Id,
    FromUserId,
    ToUserId,
    Status,
    OpenPairKey,
    CreatedAt,
    RespondedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
