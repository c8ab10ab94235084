//! Unit tests for loading and validating YAML mappings

#[cfg(test)]
mod mapping_schema_tests {
    use std::io::Write;

    use sqlresolve::mapping::{
        schema::{MappingSchema, NavigationCardinality, SchemaMappingResolver},
        MappingError,
    };

    const SHOP_MAPPING_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/rust/fixtures/shop.yaml");

    #[test]
    fn test_shop_mapping_loads_from_file() {
        let resolver = SchemaMappingResolver::from_yaml_file(SHOP_MAPPING_PATH).unwrap();
        let schema = resolver.schema();

        assert_eq!(schema.entities.len(), 3);
        let customer = schema.entity("Customer").unwrap();
        assert_eq!(customer.table, "Customers");
        assert_eq!(customer.primary_key, vec!["ID".to_string()]);
        assert_eq!(customer.column_for("IsVip").map(|c| c.type_name.as_str()), Some("Boolean?"));

        let orders = customer.navigation_for("Orders").unwrap();
        assert_eq!(orders.cardinality, NavigationCardinality::Many);
        assert_eq!(orders.foreign_key.as_deref(), Some("CustomerID"));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaMappingResolver::from_yaml_file(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, MappingError::SchemaReadError { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = MappingSchema::from_yaml_str("entities: [ {").unwrap_err();
        assert!(matches!(err, MappingError::SchemaParseError { .. }));
    }

    #[test]
    fn test_empty_mapping_is_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "entities: []").unwrap();

        let err = SchemaMappingResolver::from_yaml_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("at least one entity"));
    }

    #[test]
    fn test_duplicate_types_are_invalid() {
        let yaml = r#"
entities:
  - type_name: Customer
    table: Customers
    primary_key: [ID]
    columns:
      - { member: ID, column: CustomerID, type: Int32 }
  - type_name: Customer
    table: Clients
    primary_key: [ID]
    columns:
      - { member: ID, column: ClientID, type: Int32 }
"#;
        let err = SchemaMappingResolver::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate entity type: Customer"));
    }

    #[test]
    fn test_key_must_be_mapped_column() {
        let yaml = r#"
entities:
  - type_name: Customer
    table: Customers
    primary_key: [Code]
    columns:
      - { member: ID, column: CustomerID, type: Int32 }
"#;
        let err = SchemaMappingResolver::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, MappingError::InvalidSchema { .. }));
    }

    #[test]
    fn test_collection_navigation_needs_foreign_key() {
        let yaml = r#"
entities:
  - type_name: Customer
    table: Customers
    primary_key: [ID]
    columns:
      - { member: ID, column: CustomerID, type: Int32 }
    navigations:
      - { member: Orders, target: Order, cardinality: many, local_key: CustomerID }
  - type_name: Order
    table: Orders
    primary_key: [ID]
    columns:
      - { member: ID, column: OrderID, type: Int32 }
"#;
        let err = SchemaMappingResolver::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("must use a foreign_key"));
    }

    #[test]
    fn test_bad_column_type_is_invalid() {
        let yaml = r#"
entities:
  - type_name: Customer
    table: Customers
    primary_key: [ID]
    columns:
      - { member: ID, column: CustomerID, type: "not a type" }
"#;
        let err = SchemaMappingResolver::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("Column 'Customer.ID'"));
    }
}
