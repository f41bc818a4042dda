use crate::entities::feature_permissions;
use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(FeaturePermissions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Starter catalog entries matching the permission keys shipped to
        // early clients.
        let now = chrono::Utc::now();
        let seed: [(&str, &str, &str, i32); 2] = [
            ("wechat", "WeChat capture", "data-capture", 0),
            ("ximalaya", "Ximalaya playback", "media-playback", 1),
        ];

        for (key, name, category, sort_order) in seed {
            let insert = sea_orm_migration::sea_query::Query::insert()
                .into_table(FeaturePermissions)
                .columns([
                    feature_permissions::Column::PermissionKey,
                    feature_permissions::Column::PermissionName,
                    feature_permissions::Column::Category,
                    feature_permissions::Column::SortOrder,
                    feature_permissions::Column::Status,
                    feature_permissions::Column::CreatedAt,
                    feature_permissions::Column::UpdatedAt,
                ])
                .values_panic([
                    key.into(),
                    name.into(),
                    category.into(),
                    sort_order.into(),
                    "normal".into(),
                    now.into(),
                    now.into(),
                ])
                .to_owned();

            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FeaturePermissions).to_owned())
            .await?;

        Ok(())
    }
}
