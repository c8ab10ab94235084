//! Fixtures shared by the resolution unit tests.

use crate::{
    mapping::schema::SchemaMappingResolver,
    sql_expr::{EntityId, SqlColumnExpr, SqlEntityExpr, SqlExpr, SqlType},
    sql_statement::{SqlStatement, SqlStatementBuilder, StreamedDataInfo},
    sql_table::{JoinSemantics, SqlAppendedTable, SqlTable, SqlTableId, TableInfo},
};

use super::context::MappingResolutionContext;

pub const SHOP_MAPPING: &str = r#"
entities:
  - type_name: Customer
    table: Customers
    primary_key: [ID]
    columns:
      - { member: ID, column: CustomerID, type: Int32 }
      - { member: Name, column: Name, type: String }
      - { member: IsActive, column: IsActive, type: Boolean }
      - { member: IsVip, column: IsVip, type: "Boolean?" }
    navigations:
      - { member: Orders, target: Order, cardinality: many, foreign_key: CustomerID }
  - type_name: Order
    table: Orders
    primary_key: [ID]
    columns:
      - { member: ID, column: OrderID, type: Int32 }
      - { member: CustomerID, column: CustomerID, type: "Int32?" }
      - { member: Total, column: Total, type: Decimal }
    navigations:
      - { member: Customer, target: Customer, cardinality: one, local_key: CustomerID }
  - type_name: Product
    table: Products
    primary_key: [ID]
    columns:
      - { member: ID, column: ProductID, type: Int32 }
      - { member: CategoryID, column: CategoryID, type: Int32 }
      - { member: Price, column: Price, type: Decimal }
"#;

pub fn shop_resolver() -> SchemaMappingResolver {
    SchemaMappingResolver::from_yaml_str(SHOP_MAPPING).expect("shop mapping is valid")
}

pub fn column(ty: SqlType, alias: &str, name: &str) -> SqlExpr {
    SqlExpr::Column(SqlColumnExpr::new(ty, alias, name, false))
}

/// Entity with an `ID` key column and a `Name` column.
pub fn entity(type_name: &str, alias: &str) -> SqlEntityExpr {
    let id = SqlColumnExpr::new(SqlType::Int32, alias, "ID", true);
    let name = SqlColumnExpr::new(SqlType::String, alias, "Name", false);
    SqlEntityExpr {
        id: EntityId(100),
        ty: SqlType::object(type_name),
        table_alias: alias.to_string(),
        name: None,
        identity: Box::new(SqlExpr::Column(id.clone())),
        columns: vec![id, name],
    }
}

pub fn unresolved_table(ctx: &mut MappingResolutionContext, type_name: &str) -> SqlTableId {
    ctx.add_table(SqlTable::new(TableInfo::unresolved(SqlType::object(type_name))))
}

/// `SELECT <projection> FROM <table>` yielding a sequence.
pub fn select_from(table: SqlTableId, projection: SqlExpr) -> SqlStatement {
    SqlStatementBuilder::new(
        StreamedDataInfo::Sequence {
            item_type: projection.ty(),
        },
        projection,
    )
    .sql_table(SqlAppendedTable::new(table, JoinSemantics::Inner))
    .build()
}
