use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stocked item held by exactly one warehouse.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub buy_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub sell_price: Decimal,
    #[sea_orm(nullable)]
    pub category: Option<String>,
    pub min_stock_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id",
        on_delete = "Cascade"
    )]
    Warehouse,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Stock is low once it sits at or below the configured minimum.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock_level
    }

    /// Value of the stock on hand at purchase cost, `None` past the range
    /// `Decimal` can hold.
    pub fn total_value(&self) -> Option<Decimal> {
        self.buy_price.checked_mul(Decimal::from(self.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn item(quantity: i32, min_stock_level: i32, buy_price: Decimal) -> Model {
        Model {
            id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            name: "Widget".into(),
            sku: "WID-1".into(),
            description: None,
            quantity,
            buy_price,
            sell_price: buy_price + dec!(1),
            category: None,
            min_stock_level,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[rstest]
    #[case(0, 0, true)]
    #[case(4, 5, true)]
    #[case(5, 5, true)]
    #[case(6, 5, false)]
    fn low_stock_is_at_or_below_minimum(
        #[case] quantity: i32,
        #[case] min_stock_level: i32,
        #[case] expected: bool,
    ) {
        assert_eq!(item(quantity, min_stock_level, dec!(1)).is_low_stock(), expected);
    }

    #[test]
    fn total_value_uses_buy_price() {
        assert_eq!(item(3, 0, dec!(2.50)).total_value(), Some(dec!(7.50)));
        assert_eq!(item(0, 0, dec!(99.99)).total_value(), Some(Decimal::ZERO));
    }

    #[test]
    fn total_value_reports_overflow_instead_of_panicking() {
        let huge = Decimal::from_scientific("1e20").unwrap();
        assert_eq!(item(i32::MAX, 0, huge).total_value(), None);
    }
}
