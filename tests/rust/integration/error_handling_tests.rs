//! Integration tests for resolution failures
//!
//! Failures caused by the query or the mapping must be user-facing; limits
//! from `ResolutionConfig` must stop runaway nesting.

#[cfg(test)]
mod error_handling_tests {
    use sqlresolve::{
        config::ResolutionConfig,
        mapping::MappingError,
        mapping_resolution::{Component, MappingResolutionContext, MappingResolutionStage, ResolutionError},
        sql_expr::{SqlExpr, SqlType},
        sql_statement::{Ordering, OrderingDirection},
        sql_table::{SqlTable, TableInfo},
    };

    use crate::fixtures::{member, reference, select_from, shop_resolver, unresolved_table};

    #[test]
    fn test_unmapped_member_is_reported_by_mapping() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");

        let statement = select_from(
            customers,
            member(reference(customers, "Customer"), "Customer", "Missing", SqlType::String),
        );
        let err = stage.resolve_query(statement, ctx).unwrap_err();

        assert!(matches!(err, ResolutionError::Unmapped(MappingError::UnmappedMember { .. })));
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_unmapped_type_is_reported_by_mapping() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let suppliers = unresolved_table(&mut ctx, "Supplier");

        let statement = select_from(suppliers, SqlExpr::int_literal(1, false));
        let err = stage.resolve_query(statement, ctx).unwrap_err();

        assert!(matches!(err, ResolutionError::Unmapped(MappingError::UnmappedType { .. })));
    }

    #[test]
    fn test_entity_in_single_value_position_is_rejected() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let customers = unresolved_table(&mut ctx, "Customer");

        let mut statement = select_from(
            customers,
            member(reference(customers, "Customer"), "Customer", "Name", SqlType::String),
        );
        statement.orderings = vec![Ordering::new(reference(customers, "Customer"), OrderingDirection::Asc)];
        let err = stage.resolve_query(statement, ctx).unwrap_err();

        match err {
            ResolutionError::Unsupported { component, message } => {
                assert_eq!(component, Component::ContextEnforcer);
                assert!(message.contains("where SQL requires a single value"));
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_nesting_beyond_limit_is_rejected() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let config = ResolutionConfig {
            max_nesting_depth: 3,
            ..Default::default()
        };
        let mut ctx = MappingResolutionContext::with_config(&config);

        let mut statement = {
            let table = unresolved_table(&mut ctx, "Customer");
            select_from(
                table,
                member(reference(table, "Customer"), "Customer", "Name", SqlType::String),
            )
        };
        for _ in 0..4 {
            let table = unresolved_table(&mut ctx, "Customer");
            statement = select_from(table, SqlExpr::sub_statement(statement));
        }

        let err = stage.resolve_query(statement, ctx).unwrap_err();
        assert_eq!(err, ResolutionError::NestingTooDeep { limit: 3 });
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_reference_to_unresolved_table_is_internal_error() {
        let resolver = shop_resolver();
        let stage = MappingResolutionStage::new(&resolver);
        let mut ctx = MappingResolutionContext::new();
        let orphan = ctx.add_table(SqlTable::new(TableInfo::unresolved(SqlType::object("Customer"))));

        // The orphan table is referenced but never appended to the statement.
        let customers = unresolved_table(&mut ctx, "Customer");
        let statement = select_from(
            customers,
            member(reference(orphan, "Customer"), "Customer", "Name", SqlType::String),
        );
        let err = stage.resolve_query(statement, ctx).unwrap_err();

        assert!(!err.is_user_facing());
    }
}
