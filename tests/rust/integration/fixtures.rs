//! Shared helpers for building unresolved statements over the shop mapping.

use sqlresolve::{
    mapping::schema::SchemaMappingResolver,
    mapping_resolution::MappingResolutionContext,
    sql_expr::{MemberRef, SqlExpr, SqlType},
    sql_statement::{SqlStatement, SqlStatementBuilder, StreamedDataInfo},
    sql_table::{JoinSemantics, SqlAppendedTable, SqlTable, SqlTableId, TableInfo},
};

pub const SHOP_MAPPING: &str = include_str!("../fixtures/shop.yaml");

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn shop_resolver() -> SchemaMappingResolver {
    init_logging();
    SchemaMappingResolver::from_yaml_str(SHOP_MAPPING).expect("shop mapping should load")
}

pub fn unresolved_table(ctx: &mut MappingResolutionContext, type_name: &str) -> SqlTableId {
    ctx.add_table(SqlTable::new(TableInfo::unresolved(SqlType::object(type_name))))
}

pub fn reference(table: SqlTableId, type_name: &str) -> SqlExpr {
    SqlExpr::table_reference(table, SqlType::object(type_name))
}

/// `source.member` where `member` is declared on `type_name`.
pub fn member(source: SqlExpr, type_name: &str, name: &str, ty: SqlType) -> SqlExpr {
    SqlExpr::member(source, MemberRef::property(type_name, name, ty))
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
