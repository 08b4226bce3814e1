use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_products_table::Migration),
            Box::new(m20240101_000002_create_cart_tables::Migration),
            Box::new(m20240101_000003_create_checkout_tables::Migration),
            Box::new(m20240101_000004_create_order_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Images).json().not_null())
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Price,
        Images,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_cart_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_cart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Carts::UserId).uuid().null())
                        .col(ColumnDef::new(Carts::GuestId).string().null())
                        .col(
                            ColumnDef::new(Carts::TotalPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Carts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Carts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One cart per owner
            manager
                .create_index(
                    Index::create()
                        .name("idx_carts_user_id")
                        .table(Carts::Table)
                        .col(Carts::UserId)
                        .unique()
                        .to_owned(),
                )
                .await?;
            manager
                .create_index(
                    Index::create()
                        .name("idx_carts_guest_id")
                        .table(Carts::Table)
                        .col(Carts::GuestId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Name).string().not_null())
                        .col(ColumnDef::new(CartItems::Image).string().not_null())
                        .col(
                            ColumnDef::new(CartItems::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartItems::Size).string().null())
                        .col(ColumnDef::new(CartItems::Color).string().null())
                        .col(
                            ColumnDef::new(CartItems::LineTotal)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart_id")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_cart_id")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        UserId,
        GuestId,
        TotalPrice,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        ProductId,
        Name,
        Image,
        UnitPrice,
        Quantity,
        Size,
        Color,
        LineTotal,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_checkout_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_checkout_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Checkouts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Checkouts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Checkouts::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(Checkouts::ShippingAddress)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::PaymentMethod)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::TotalPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::IsPaid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Checkouts::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::PaymentStatus)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Checkouts::PaymentDetails).json().null())
                        .col(
                            ColumnDef::new(Checkouts::IsFinalized)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Checkouts::FinalizedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Checkouts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_checkouts_user_id")
                        .table(Checkouts::Table)
                        .col(Checkouts::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CheckoutItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CheckoutItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CheckoutItems::CheckoutId).uuid().not_null())
                        .col(ColumnDef::new(CheckoutItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CheckoutItems::Name).string().not_null())
                        .col(ColumnDef::new(CheckoutItems::Image).string().null())
                        .col(
                            ColumnDef::new(CheckoutItems::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CheckoutItems::Size).string().null())
                        .col(ColumnDef::new(CheckoutItems::Color).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_checkout_items_checkout_id")
                                .from(CheckoutItems::Table, CheckoutItems::CheckoutId)
                                .to(Checkouts::Table, Checkouts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_checkout_items_checkout_id")
                        .table(CheckoutItems::Table)
                        .col(CheckoutItems::CheckoutId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CheckoutItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Checkouts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Checkouts {
        Table,
        Id,
        UserId,
        ShippingAddress,
        PaymentMethod,
        TotalPrice,
        IsPaid,
        PaidAt,
        PaymentStatus,
        PaymentDetails,
        IsFinalized,
        FinalizedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CheckoutItems {
        Table,
        Id,
        CheckoutId,
        ProductId,
        Name,
        Image,
        UnitPrice,
        Quantity,
        Size,
        Color,
    }
}

mod m20240101_000004_create_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).json().not_null())
                        .col(
                            ColumnDef::new(Orders::PaymentMethod)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::PaymentDetails).json().null())
                        .col(
                            ColumnDef::new(Orders::TotalPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::IsPaid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::PaidAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::IsDelivered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::PaymentStatus)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(20)
                                .not_null()
                                .default("Processing"),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Image).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::Size).string().null())
                        .col(ColumnDef::new(OrderItems::Color).string().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        ShippingAddress,
        PaymentMethod,
        PaymentDetails,
        TotalPrice,
        IsPaid,
        PaidAt,
        IsDelivered,
        DeliveredAt,
        PaymentStatus,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Name,
        Image,
        UnitPrice,
        Quantity,
        Size,
        Color,
    }
}
