//! YAML-configured mapping of entity types to tables.
//!
//! ```yaml
//! entities:
//!   - type_name: Order
//!     table: Orders
//!     primary_key: [ID]
//!     columns:
//!       - { member: ID, column: OrderID, type: Int32 }
//!       - { member: CustomerID, column: CustomerID, type: "Int32?" }
//!     navigations:
//!       - { member: Customer, target: Customer, cardinality: one, local_key: CustomerID }
//! ```
//!
//! `local_key` names a column of the declaring table holding the target's
//! primary key; `foreign_key` names a column of the target table holding the
//! declaring entity's primary key.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    sql_expr::{
        Cardinality, CompoundExpr, CtorRef, MemberRef, SqlColumnExpr, SqlConstantExpr,
        SqlEntityConstantExpr, SqlEntityExpr, SqlEntityRefMemberExpr, SqlExpr, SqlType, Value,
    },
    sql_table::{ResolvedSimpleTableInfo, TableInfo, UnresolvedJoinInfo, UnresolvedTableInfo},
    utils::unique_identifier::UniqueIdentifierGenerator,
};

use super::{errors::MappingError, MappingResolver, MappingResult};

const TABLE_ALIAS_PREFIX: &str = "t";
const LENGTH_MEMBER: &str = "Length";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSchema {
    pub entities: Vec<EntityMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub type_name: String,
    pub table: String,
    /// Members forming the primary key, in key order.
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub discriminator: Option<DiscriminatorMapping>,
    pub columns: Vec<ColumnMapping>,
    #[serde(default)]
    pub navigations: Vec<NavigationMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub member: String,
    pub column: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Column and value identifying rows of one type inside a shared table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscriminatorMapping {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationCardinality {
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationMapping {
    pub member: String,
    pub target: String,
    pub cardinality: NavigationCardinality,
    #[serde(default)]
    pub local_key: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<String>,
}

impl MappingSchema {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let contents = fs::read_to_string(path).map_err(|e| MappingError::SchemaReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        serde_yaml::from_str(yaml).map_err(|e| MappingError::SchemaParseError {
            error: e.to_string(),
        })
    }

    /// Structural validation: unique types, declared keys, known navigation targets.
    pub fn validate(&self) -> Result<(), MappingError> {
        if self.entities.is_empty() {
            return Err(invalid("Mapping must contain at least one entity".to_string()));
        }

        let mut seen_types = std::collections::HashSet::new();
        for entity in &self.entities {
            if !seen_types.insert(entity.type_name.as_str()) {
                return Err(invalid(format!("Duplicate entity type: {}", entity.type_name)));
            }
        }

        for entity in &self.entities {
            if entity.primary_key.is_empty() {
                return Err(invalid(format!(
                    "Entity '{}' must declare a primary key",
                    entity.type_name
                )));
            }
            for key in &entity.primary_key {
                if entity.column_for(key).is_none() {
                    return Err(invalid(format!(
                        "Primary key member '{}' of '{}' is not a mapped column",
                        key, entity.type_name
                    )));
                }
            }
            for column in &entity.columns {
                column.type_name.parse::<SqlType>().map_err(|e| {
                    invalid(format!(
                        "Column '{}.{}': {}",
                        entity.type_name, column.member, e
                    ))
                })?;
            }
            for navigation in &entity.navigations {
                self.validate_navigation(entity, navigation)?;
            }
        }

        Ok(())
    }

    fn validate_navigation(
        &self,
        entity: &EntityMapping,
        navigation: &NavigationMapping,
    ) -> Result<(), MappingError> {
        let target = self.entity(&navigation.target).ok_or_else(|| {
            invalid(format!(
                "Navigation '{}.{}' targets unknown type '{}'",
                entity.type_name, navigation.member, navigation.target
            ))
        })?;

        match (&navigation.local_key, &navigation.foreign_key) {
            (Some(local_key), None) => {
                if navigation.cardinality == NavigationCardinality::Many {
                    return Err(invalid(format!(
                        "Collection navigation '{}.{}' must use a foreign_key",
                        entity.type_name, navigation.member
                    )));
                }
                if !entity.columns.iter().any(|c| &c.column == local_key) {
                    return Err(invalid(format!(
                        "Local key '{}' of '{}.{}' is not a column of '{}'",
                        local_key, entity.type_name, navigation.member, entity.table
                    )));
                }
                if target.primary_key.len() != 1 {
                    return Err(invalid(format!(
                        "Navigation '{}.{}' needs a single-column key on '{}'",
                        entity.type_name, navigation.member, target.type_name
                    )));
                }
            }
            (None, Some(foreign_key)) => {
                if !target.columns.iter().any(|c| &c.column == foreign_key) {
                    return Err(invalid(format!(
                        "Foreign key '{}' of '{}.{}' is not a column of '{}'",
                        foreign_key, entity.type_name, navigation.member, target.table
                    )));
                }
                if entity.primary_key.len() != 1 {
                    return Err(invalid(format!(
                        "Navigation '{}.{}' needs a single-column key on '{}'",
                        entity.type_name, navigation.member, entity.type_name
                    )));
                }
            }
            _ => {
                return Err(invalid(format!(
                    "Navigation '{}.{}' must declare exactly one of local_key or foreign_key",
                    entity.type_name, navigation.member
                )));
            }
        }
        Ok(())
    }

    pub fn entity(&self, type_name: &str) -> Option<&EntityMapping> {
        self.entities.iter().find(|e| e.type_name == type_name)
    }
}

impl EntityMapping {
    pub fn column_for(&self, member: &str) -> Option<&ColumnMapping> {
        self.columns.iter().find(|c| c.member == member)
    }

    pub fn navigation_for(&self, member: &str) -> Option<&NavigationMapping> {
        self.navigations.iter().find(|n| n.member == member)
    }

    fn is_key_member(&self, member: &str) -> bool {
        self.primary_key.iter().any(|k| k == member)
    }
}

fn invalid(message: String) -> MappingError {
    MappingError::InvalidSchema { message }
}

/// Reference [`MappingResolver`] backed by a validated [`MappingSchema`].
#[derive(Debug, Clone)]
pub struct SchemaMappingResolver {
    schema: MappingSchema,
    column_types: HashMap<(String, String), SqlType>,
}

impl SchemaMappingResolver {
    pub fn new(schema: MappingSchema) -> Result<Self, MappingError> {
        schema.validate()?;

        let mut column_types = HashMap::new();
        for entity in &schema.entities {
            for column in &entity.columns {
                let ty = column
                    .type_name
                    .parse::<SqlType>()
                    .map_err(|e| invalid(e.to_string()))?;
                column_types.insert((entity.type_name.clone(), column.member.clone()), ty);
            }
        }

        log::debug!(
            "SchemaMappingResolver: loaded {} entity mappings",
            schema.entities.len()
        );
        Ok(SchemaMappingResolver {
            schema,
            column_types,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        Self::new(MappingSchema::from_yaml_str(yaml)?)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        Self::new(MappingSchema::from_yaml_file(path)?)
    }

    pub fn schema(&self) -> &MappingSchema {
        &self.schema
    }

    fn entity_mapping(&self, ty: &SqlType) -> MappingResult<&EntityMapping> {
        ty.type_name()
            .and_then(|name| self.schema.entity(name))
            .ok_or_else(|| MappingError::UnmappedType {
                type_name: ty.to_string(),
            })
    }

    fn column_type(&self, entity: &EntityMapping, member: &str) -> SqlType {
        self.column_types
            .get(&(entity.type_name.clone(), member.to_string()))
            .cloned()
            .unwrap_or(SqlType::Int32)
    }

    fn navigation(
        &self,
        type_name: &str,
        member: &MemberRef,
    ) -> MappingResult<(&EntityMapping, &NavigationMapping)> {
        let entity = self
            .schema
            .entity(type_name)
            .ok_or_else(|| MappingError::UnmappedType {
                type_name: type_name.to_string(),
            })?;
        let navigation = entity
            .navigation_for(member.logical_name())
            .ok_or_else(|| MappingError::unmapped_navigation(type_name, member.logical_name()))?;
        Ok((entity, navigation))
    }

    fn simple_table_info(&self, entity: &EntityMapping, generator: &mut UniqueIdentifierGenerator) -> TableInfo {
        TableInfo::ResolvedSimple(ResolvedSimpleTableInfo {
            item_type: SqlType::object(entity.type_name.clone()),
            table_name: entity.table.clone(),
            table_alias: generator.get_unique_identifier(TABLE_ALIAS_PREFIX),
        })
    }

    fn entity_column(&self, entity: &SqlEntityExpr, column_name: &str) -> MappingResult<SqlExpr> {
        entity
            .column(column_name)
            .cloned()
            .map(SqlExpr::Column)
            .ok_or_else(|| MappingError::unmapped_member(entity.type_name(), column_name))
    }

    fn key_column_of_joined(&self, target: &EntityMapping, alias: &str, column: &str) -> SqlExpr {
        let member = target
            .columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| c.member.as_str())
            .unwrap_or(column);
        SqlExpr::Column(SqlColumnExpr::new(
            self.column_type(target, member),
            alias,
            column,
            target.is_key_member(member),
        ))
    }

    /// Local key column of a one-navigation, when the key lives on the originating row.
    fn local_key_column(&self, entity_ref: &SqlEntityRefMemberExpr) -> Option<SqlExpr> {
        let (_, navigation) = self
            .navigation(entity_ref.originating_entity.type_name(), &entity_ref.member)
            .ok()?;
        let local_key = navigation.local_key.as_ref()?;
        entity_ref
            .originating_entity
            .column(local_key)
            .cloned()
            .map(SqlExpr::Column)
    }
}

impl MappingResolver for SchemaMappingResolver {
    fn resolve_table_info(
        &self,
        table_info: &UnresolvedTableInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> MappingResult<TableInfo> {
        let entity = self.entity_mapping(&table_info.item_type)?;
        Ok(self.simple_table_info(entity, generator))
    }

    fn resolve_join_table_info(
        &self,
        join_info: &UnresolvedJoinInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> MappingResult<TableInfo> {
        let (_, navigation) = self.navigation(
            join_info.originating_entity.type_name(),
            &join_info.member,
        )?;
        let target = self
            .schema
            .entity(&navigation.target)
            .ok_or_else(|| MappingError::UnmappedType {
                type_name: navigation.target.clone(),
            })?;
        Ok(self.simple_table_info(target, generator))
    }

    fn resolve_join_condition(
        &self,
        originating_entity: &SqlEntityExpr,
        member: &MemberRef,
        joined_table_info: &TableInfo,
    ) -> MappingResult<SqlExpr> {
        let (origin, navigation) = self.navigation(originating_entity.type_name(), member)?;
        let target = self.entity_mapping(&joined_table_info.item_type())?;
        let joined_alias = joined_table_info
            .table_alias()
            .ok_or_else(|| MappingError::unmapped_navigation(&origin.type_name, member.logical_name()))?;

        match (&navigation.local_key, &navigation.foreign_key) {
            (Some(local_key), _) => {
                let target_key = target
                    .column_for(&target.primary_key[0])
                    .map(|c| c.column.as_str())
                    .unwrap_or(target.primary_key[0].as_str());
                Ok(SqlExpr::equal(
                    self.entity_column(originating_entity, local_key)?,
                    self.key_column_of_joined(target, joined_alias, target_key),
                ))
            }
            (None, Some(foreign_key)) => {
                let origin_key = origin
                    .column_for(&origin.primary_key[0])
                    .map(|c| c.column.as_str())
                    .unwrap_or(origin.primary_key[0].as_str());
                Ok(SqlExpr::equal(
                    self.entity_column(originating_entity, origin_key)?,
                    self.key_column_of_joined(target, joined_alias, foreign_key),
                ))
            }
            (None, None) => Err(MappingError::unmapped_navigation(
                &origin.type_name,
                member.logical_name(),
            )),
        }
    }

    fn resolve_simple_table_info(
        &self,
        table_info: &ResolvedSimpleTableInfo,
        generator: &mut UniqueIdentifierGenerator,
    ) -> MappingResult<SqlEntityExpr> {
        let entity = self.entity_mapping(&table_info.item_type)?;
        let alias = &table_info.table_alias;

        let columns: Vec<SqlColumnExpr> = entity
            .columns
            .iter()
            .map(|c| {
                SqlColumnExpr::new(
                    self.column_type(entity, &c.member),
                    alias,
                    &c.column,
                    entity.is_key_member(&c.member),
                )
            })
            .collect();

        let mut key_columns: Vec<(&str, SqlExpr)> = entity
            .primary_key
            .iter()
            .filter_map(|key| {
                let mapping = entity.column_for(key)?;
                let column = columns.iter().find(|c| c.column_name == mapping.column)?;
                Some((key.as_str(), SqlExpr::Column(column.clone())))
            })
            .collect();

        let identity = match key_columns.len() {
            0 => {
                return Err(invalid(format!(
                    "Entity '{}' has no key columns",
                    entity.type_name
                )))
            }
            1 => key_columns.remove(0).1,
            _ => SqlExpr::New(CompoundExpr::with_members(
                &format!("{}Key", entity.type_name),
                key_columns,
            )),
        };

        Ok(SqlEntityExpr {
            id: generator.next_entity_id(),
            ty: table_info.item_type.clone(),
            table_alias: alias.clone(),
            name: None,
            identity: Box::new(identity),
            columns,
        })
    }

    fn resolve_member_expression(
        &self,
        entity: &SqlEntityExpr,
        member: &MemberRef,
    ) -> MappingResult<SqlExpr> {
        let mapping = self.entity_mapping(&entity.ty)?;
        let name = member.logical_name();

        if let Some(column) = mapping.column_for(name) {
            return self.entity_column(entity, &column.column);
        }

        match mapping.navigation_for(name) {
            Some(navigation) if navigation.cardinality == NavigationCardinality::One => {
                Ok(SqlExpr::EntityRefMember(SqlEntityRefMemberExpr {
                    originating_entity: entity.clone(),
                    member: member.clone(),
                    cardinality: Cardinality::One,
                }))
            }
            _ => Err(MappingError::unmapped_member(&mapping.type_name, name)),
        }
    }

    fn resolve_column_member_expression(
        &self,
        column: &SqlColumnExpr,
        member: &MemberRef,
    ) -> MappingResult<SqlExpr> {
        if member.logical_name() == LENGTH_MEMBER && *column.ty.underlying() == SqlType::String {
            return Ok(SqlExpr::Length(Box::new(SqlExpr::Column(column.clone()))));
        }
        Err(MappingError::unmapped_member(
            &column.ty.to_string(),
            member.logical_name(),
        ))
    }

    fn resolve_constant_expression(&self, constant: &SqlConstantExpr) -> MappingResult<SqlExpr> {
        let object = match &constant.value {
            Value::Object(object) => object,
            _ => return Ok(SqlExpr::Constant(constant.clone())),
        };
        let Some(entity) = self.schema.entity(&object.type_name) else {
            return Ok(SqlExpr::Constant(constant.clone()));
        };

        let unmapped = || MappingError::UnmappedConstant {
            constant: constant.value.to_string(),
            type_name: object.type_name.clone(),
        };
        let mut key_values = entity
            .primary_key
            .iter()
            .map(|key| {
                let value = object.field(key).cloned().ok_or_else(unmapped)?;
                Ok((key.as_str(), SqlExpr::constant(value, self.column_type(entity, key))))
            })
            .collect::<MappingResult<Vec<_>>>()?;

        let identity = if key_values.len() == 1 {
            key_values.remove(0).1
        } else {
            SqlExpr::New(CompoundExpr::with_members(
                &format!("{}Key", entity.type_name),
                key_values,
            ))
        };

        Ok(SqlExpr::EntityConstant(SqlEntityConstantExpr {
            ty: constant.ty.clone(),
            value: constant.value.clone(),
            identity: Box::new(identity),
        }))
    }

    fn resolve_type_check(&self, expression: &SqlExpr, type_name: &str) -> MappingResult<SqlExpr> {
        let unmapped = || MappingError::UnmappedTypeCheck {
            type_name: type_name.to_string(),
            expression: expression.to_string(),
        };
        let entity = expression.as_entity().ok_or_else(unmapped)?;
        if entity.type_name() == type_name {
            return Ok(SqlExpr::bool_constant(true));
        }

        let checked = self.schema.entity(type_name).ok_or_else(unmapped)?;
        let discriminator = checked.discriminator.as_ref().ok_or_else(unmapped)?;
        let column = entity
            .column(&discriminator.column)
            .cloned()
            .ok_or_else(unmapped)?;

        Ok(SqlExpr::equal(
            SqlExpr::Column(column),
            SqlExpr::constant(Value::String(discriminator.value.clone()), SqlType::String),
        ))
    }

    fn try_resolve_optimized_identity(&self, entity_ref: &SqlEntityRefMemberExpr) -> Option<SqlExpr> {
        self.local_key_column(entity_ref)
    }

    fn try_resolve_optimized_member_expression(
        &self,
        entity_ref: &SqlEntityRefMemberExpr,
        member: &MemberRef,
    ) -> Option<SqlExpr> {
        let (_, navigation) = self
            .navigation(entity_ref.originating_entity.type_name(), &entity_ref.member)
            .ok()?;
        let target = self.schema.entity(&navigation.target)?;
        if target.primary_key.len() == 1 && target.primary_key[0] == member.logical_name() {
            self.local_key_column(entity_ref)
        } else {
            None
        }
    }
}
