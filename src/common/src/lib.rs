#[macro_use]
extern crate serde;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use sqlparser::ast;
use sqlparser::parser::ParserError;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
pub mod catalog;
pub mod database;
pub mod query_tree;
pub use query_tree::{AggOp, Comparator};
pub mod statement;
pub mod table;
pub mod testutil;

/// Default byte width of a NUMBER column when the DDL gives none.
pub const DEFAULT_NUMBER_SIZE: usize = 8;
/// Default width of a CHAR column, as in `CHAR` meaning `CHAR(1)`.
pub const DEFAULT_CHAR_SIZE: usize = 1;
/// Width of a VARCHAR/TEXT column declared without a length.
pub const DEFAULT_VARCHAR_SIZE: usize = 255;
/// Width of a DATE column (`YYYY-MM-DD`).
pub const DATE_SIZE: usize = 10;

/// Custom error type.
#[derive(Debug, Clone, PartialEq)]
pub enum DbError {
    /// IO Errors.
    IOError(String),
    /// The SQL text could not be parsed.
    ParseError(String),
    /// Validation errors.
    ValidationError(String),
    /// A traversal path or final move does not reach an existing node.
    LocationNotFound(String),
    /// A move or edit does not fit the arity of the node it is applied to.
    ArityViolation(String),
    /// No unique relation with the given table name.
    RelationNotFound(String),
    /// A column could not be attributed to any table in scope.
    ColumnNotFound(String),
    /// Custom errors.
    DbError(String),
}

impl DbError {
    /// Path/arity faults raised by query tree edits. Always a defect in the calling pass.
    pub fn is_structural_fault(&self) -> bool {
        matches!(
            self,
            DbError::LocationNotFound(_) | DbError::ArityViolation(_)
        )
    }

    /// Lookups that an upstream verifier should have caught.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            DbError::RelationNotFound(_) | DbError::ColumnNotFound(_)
        )
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DbError::ValidationError(s) => format!("Validation Error: {}", s),
                DbError::ParseError(s) => format!("SQL Error: {}", s),
                DbError::LocationNotFound(s) => format!("Location Not Found: {}", s),
                DbError::ArityViolation(s) => format!("Arity Violation: {}", s),
                DbError::RelationNotFound(s) => format!("Relation Not Found: {}", s),
                DbError::ColumnNotFound(s) => format!("Column Not Found: {}", s),
                DbError::DbError(s) => format!("Db Error: {}", s),
                DbError::IOError(s) => s.to_string(),
            }
        )
    }
}

// Implement std::convert::From for DbError; from io::Error
impl From<io::Error> for DbError {
    fn from(error: io::Error) -> Self {
        DbError::IOError(error.to_string())
    }
}

impl From<ParserError> for DbError {
    fn from(error: ParserError) -> Self {
        DbError::ParseError(error.to_string())
    }
}

impl Error for DbError {}

/// Handle schemas.
#[derive(PartialEq, Clone, Debug)]
pub struct TableSchema {
    /// Attributes of the schema.
    attributes: Vec<Attribute>,
    /// Mapping from lower-cased attribute name to order in the schema.
    name_map: HashMap<String, usize>,
}

impl Serialize for TableSchema {
    /// Custom serialize to avoid serializing name_map.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.attributes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TableSchema {
    /// Custom deserialize to avoid serializing name_map.
    fn deserialize<D>(deserializer: D) -> Result<TableSchema, D::Error>
    where
        D: Deserializer<'de>,
    {
        let attrs = Vec::deserialize(deserializer)?;
        Ok(TableSchema::new(attrs))
    }
}

impl TableSchema {
    /// Create a new schema.
    ///
    /// # Arguments
    ///
    /// * `attributes` - Attributes of the schema in the order that they are in the schema.
    pub fn new(attributes: Vec<Attribute>) -> Self {
        let mut name_map = HashMap::new();
        for (i, attr) in attributes.iter().enumerate() {
            name_map.insert(attr.name().to_lowercase(), i);
        }
        Self {
            attributes,
            name_map,
        }
    }

    /// Create a new schema with the given names and dtypes, using the default size of each dtype.
    ///
    /// # Arguments
    ///
    /// * `names` - Names of the new schema.
    /// * `dtypes` - Dypes of the new schema.
    pub fn from_vecs(names: Vec<&str>, dtypes: Vec<DataType>) -> Self {
        let mut attrs = Vec::new();
        for (name, dtype) in names.iter().zip(dtypes.iter()) {
            attrs.push(Attribute::new(
                name.to_string(),
                dtype.clone(),
                dtype.default_size(),
            ));
        }
        TableSchema::new(attrs)
    }

    /// Get the attribute from the given index.
    ///
    /// # Arguments
    ///
    /// * `i` - Index of the attribute to look for.
    pub fn get_attribute(&self, i: usize) -> Option<&Attribute> {
        self.attributes.get(i)
    }

    /// Get the index of the attribute. Column names are matched case-insensitively.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute to get the index for.
    pub fn get_field_index(&self, name: &str) -> Option<&usize> {
        self.name_map.get(&name.to_lowercase())
    }

    /// Get the attribute with the given name.
    pub fn get_attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.get_field_index(name)
            .and_then(|i| self.attributes.get(*i))
    }

    /// Check if the attribute name is in the schema.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute to look for.
    pub fn contains(&self, name: &str) -> bool {
        self.name_map.contains_key(&name.to_lowercase())
    }

    /// Get an iterator of the attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Returns the length of the schema.
    pub fn size(&self) -> usize {
        self.attributes.len()
    }

    /// Returns the declared size of a row in bytes.
    pub fn byte_size(&self) -> usize {
        self.attributes.iter().map(|a| a.size).sum()
    }
}

/// Handle attributes. Pairs the name with the dtype and its declared size.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,
    /// Attribute dtype.
    pub dtype: DataType,
    /// Declared size, e.g. the `20` of `CHAR(20)`.
    pub size: usize,
}

impl Attribute {
    /// Create a new attribute with the given name, dtype and size.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the attribute.
    /// * `dtype` - Dtype of the attribute.
    /// * `size` - Declared size of the attribute.
    pub fn new(name: String, dtype: DataType, size: usize) -> Self {
        Self { name, dtype, size }
    }

    /// Returns the name of the attribute.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dtype of the attribute.
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    /// Returns true for NUMBER attributes.
    pub fn is_numeric(&self) -> bool {
        self.dtype == DataType::Number
    }
}

/// Enumerate the supported dtypes.
#[derive(PartialEq, Serialize, Deserialize, Clone, Copy, Debug)]
pub enum DataType {
    Number,
    Char,
    Date,
}

impl DataType {
    /// Size used when the declaration does not carry one.
    pub fn default_size(&self) -> usize {
        match self {
            DataType::Number => DEFAULT_NUMBER_SIZE,
            DataType::Char => DEFAULT_CHAR_SIZE,
            DataType::Date => DATE_SIZE,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Number => "NUMBER",
            DataType::Char => "CHAR",
            DataType::Date => "DATE",
        };
        write!(f, "{}", name)
    }
}

/// Retrieve the name from the command parser object.
///
/// # Argument
///
/// * `name` - Name object from the command parser.
pub fn get_name(name: &ast::ObjectName) -> Result<String, DbError> {
    if name.0.len() != 1 {
        Err(DbError::ValidationError(format!(
            "Error no . names supported in {}",
            name
        )))
    } else {
        Ok(name.0[0].value.clone())
    }
}

/// Retrieve the dtype and declared size from the command parser object.
///
/// # Argument
///
/// * `dtype` - Data type object from the command parser.
pub fn get_attr(dtype: &ast::DataType) -> Result<(DataType, usize), DbError> {
    let char_len = |len: &Option<ast::CharacterLength>, default: usize| {
        len.as_ref().map(|l| l.length as usize).unwrap_or(default)
    };
    match dtype {
        ast::DataType::Int(size)
        | ast::DataType::Integer(size)
        | ast::DataType::SmallInt(size)
        | ast::DataType::BigInt(size)
        | ast::DataType::Float(size) => Ok((
            DataType::Number,
            size.map(|s| s as usize).unwrap_or(DEFAULT_NUMBER_SIZE),
        )),
        ast::DataType::Numeric(info) | ast::DataType::Decimal(info) => {
            let size = match info {
                ast::ExactNumberInfo::None => DEFAULT_NUMBER_SIZE,
                ast::ExactNumberInfo::Precision(p) => *p as usize,
                ast::ExactNumberInfo::PrecisionAndScale(p, _) => *p as usize,
            };
            Ok((DataType::Number, size))
        }
        ast::DataType::Real | ast::DataType::Double | ast::DataType::DoublePrecision => {
            Ok((DataType::Number, DEFAULT_NUMBER_SIZE))
        }
        ast::DataType::Char(len) | ast::DataType::Character(len) => {
            Ok((DataType::Char, char_len(len, DEFAULT_CHAR_SIZE)))
        }
        ast::DataType::Varchar(len)
        | ast::DataType::CharVarying(len)
        | ast::DataType::CharacterVarying(len) => {
            Ok((DataType::Char, char_len(len, DEFAULT_VARCHAR_SIZE)))
        }
        ast::DataType::Text | ast::DataType::String => {
            Ok((DataType::Char, DEFAULT_VARCHAR_SIZE))
        }
        ast::DataType::Date | ast::DataType::Datetime(_) | ast::DataType::Timestamp(_, _) => {
            Ok((DataType::Date, DATE_SIZE))
        }
        _ => Err(DbError::ValidationError(format!(
            "Unsupported data type {}",
            dtype
        ))),
    }
}

#[cfg(test)]
mod libtests {
    use super::*;

    #[test]
    fn test_schema_lookup_ignores_case() {
        let schema = TableSchema::from_vecs(
            vec!["CustomerID", "FirstName"],
            vec![DataType::Number, DataType::Char],
        );
        assert!(schema.contains("customerid"));
        assert_eq!(Some(&1), schema.get_field_index("FIRSTNAME"));
        assert_eq!(None, schema.get_field_index("LastName"));
        assert_eq!(DEFAULT_NUMBER_SIZE + DEFAULT_CHAR_SIZE, schema.byte_size());
    }

    #[test]
    fn test_get_attr() {
        let varchar = ast::DataType::Varchar(Some(ast::CharacterLength {
            length: 20,
            unit: None,
        }));
        assert_eq!((DataType::Char, 20), get_attr(&varchar).unwrap());
        assert_eq!(
            (DataType::Number, DEFAULT_NUMBER_SIZE),
            get_attr(&ast::DataType::Int(None)).unwrap()
        );
        assert_eq!((DataType::Date, DATE_SIZE), get_attr(&ast::DataType::Date).unwrap());
        assert!(get_attr(&ast::DataType::Boolean).is_err());
    }

    #[test]
    fn test_error_taxonomy() {
        assert!(DbError::ArityViolation(String::new()).is_structural_fault());
        assert!(DbError::LocationNotFound(String::new()).is_structural_fault());
        assert!(DbError::RelationNotFound(String::new()).is_lookup_miss());
        assert!(!DbError::ValidationError(String::new()).is_structural_fault());
    }
}
