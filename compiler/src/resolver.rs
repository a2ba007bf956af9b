use pbgen_schema::{BaseType, Cardinality, DataDefRef, FieldType, Message, MessageField, SchemaGraph};

use crate::error::ResolveError;

/// A rendered field type and the literal it is initialised with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub ty:      String,
    pub default: String,
}

impl Resolved {
    pub fn new(ty: impl Into<String>, default: impl Into<String>) -> Self {
        Resolved {
            ty:      ty.into(),
            default: default.into(),
        }
    }
}

/// Maps schema field types onto one target language.
///
/// Implementors describe the language's vocabulary (primitive table, boxing,
/// container and reference syntax); the provided methods fix how those pieces
/// combine, so every backend agrees on the shape:
///
/// - enum references read as plain `int32` fields,
/// - repeated fields and maps are boxed containers defaulting to [`TypeResolver::null`],
/// - maps never nest.
pub trait TypeResolver {
    /// Type and zero value of a primitive. Must cover all of [`BaseType::ALL`].
    fn base(&self, base: BaseType) -> Resolved;

    /// The absent-value literal.
    fn null(&self) -> &'static str;

    /// Fully qualified name of a message type.
    fn message_type(&self, graph: &SchemaGraph, message: &Message) -> String;

    fn list_type(&self, item: &str) -> String;

    fn map_type(&self, key: &str, value: &str) -> String;

    /// Form of `ty` usable as a generic type parameter.
    fn boxed(&self, ty: &str) -> String {
        ty.to_string()
    }

    /// Form of a qualified message name used directly as a field type.
    fn reference(&self, ty: &str) -> String {
        ty.to_string()
    }

    fn resolve_field(&self, graph: &SchemaGraph, field: &MessageField) -> Result<Resolved, ResolveError> {
        match field.cardinality {
            Cardinality::Singular => self.resolve_type(graph, &field.ty, &field.name),
            Cardinality::Repeated => {
                let item = self.element_type(graph, &field.ty, &field.name)?;
                Ok(Resolved::new(self.list_type(&item), self.null()))
            }
        }
    }

    fn resolve_type(&self, graph: &SchemaGraph, ty: &FieldType, field: &str) -> Result<Resolved, ResolveError> {
        match ty {
            FieldType::Base(base) => Ok(self.base(*base)),
            FieldType::Ref { target, .. } => match graph.data_def(*target) {
                DataDefRef::Enum(_) => Ok(self.base(BaseType::Int32)),
                DataDefRef::Message(message) => {
                    let name = self.message_type(graph, message);
                    Ok(Resolved::new(self.reference(&name), self.null()))
                }
            },
            FieldType::Map { key, value } => {
                let key = self.element_type(graph, key, field)?;
                let value = self.element_type(graph, value, field)?;
                Ok(Resolved::new(self.map_type(&key, &value), self.null()))
            }
        }
    }

    /// Boxed type of a container element.
    fn element_type(&self, graph: &SchemaGraph, ty: &FieldType, field: &str) -> Result<String, ResolveError> {
        let bare = match ty {
            FieldType::Base(base) => self.base(*base).ty,
            FieldType::Ref { target, .. } => match graph.data_def(*target) {
                DataDefRef::Enum(_) => self.base(BaseType::Int32).ty,
                DataDefRef::Message(message) => self.message_type(graph, message),
            },
            FieldType::Map { .. } => {
                return Err(ResolveError::NestedMap {
                    field: field.to_string(),
                })
            }
        };
        Ok(self.boxed(&bare))
    }
}
