use std::ops::{Deref, DerefMut};

use serde::Serialize;

use crate::DEPRECATED_MARKER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    Syntax,
    Package,
    Import,
    Option,
}

impl HeaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderKind::Syntax  => "syntax",
            HeaderKind::Package => "package",
            HeaderKind::Import  => "import",
            HeaderKind::Option  => "option",
        }
    }
}

/// A file-level statement: `syntax`, `package`, `import` or `option`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub kind:  HeaderKind,
    pub name:  String,
    pub value: String,
}

impl Header {
    pub fn new(kind: HeaderKind, name: impl Into<String>, value: impl Into<String>) -> Self {
        Header {
            kind,
            name:  name.into(),
            value: value.into(),
        }
    }
}

/// Index of a [`crate::Protobuf`] inside its [`crate::SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProtoId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefKind {
    Message,
    Enum,
}

/// Address of a message or enum: owning file, kind, and position in that
/// file's message or enum list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DefId {
    pub proto: ProtoId,
    pub kind:  DefKind,
    pub index: usize,
}

/// The seven primitive types a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Int64,
    Int32,
    String,
    Bool,
    Float,
    Double,
    Bytes,
}

impl BaseType {
    pub const ALL: [BaseType; 7] = [
        BaseType::Int64,
        BaseType::Int32,
        BaseType::String,
        BaseType::Bool,
        BaseType::Float,
        BaseType::Double,
        BaseType::Bytes,
    ];

    pub fn from_name(name: &str) -> Option<BaseType> {
        BaseType::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BaseType::Int64  => "int64",
            BaseType::Int32  => "int32",
            BaseType::String => "string",
            BaseType::Bool   => "bool",
            BaseType::Float  => "float",
            BaseType::Double => "double",
            BaseType::Bytes  => "bytes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Base(BaseType),
    Ref {
        package: Option<String>,
        name:    String,
        target:  DefId,
    },
    Map {
        key:   Box<FieldType>,
        value: Box<FieldType>,
    },
}

impl FieldType {
    pub fn reference(package: Option<String>, name: impl Into<String>, target: DefId) -> Self {
        FieldType::Ref {
            package,
            name: name.into(),
            target,
        }
    }

    pub fn map(key: FieldType, value: FieldType) -> Self {
        FieldType::Map {
            key:   Box::new(key),
            value: Box::new(value),
        }
    }

    /// Sets `package` on every reference that did not name one explicitly.
    pub(crate) fn stamp_package(&mut self, package: &str) {
        match self {
            FieldType::Base(_) => {}
            FieldType::Ref { package: pkg, .. } => {
                if pkg.is_none() {
                    *pkg = Some(package.to_string());
                }
            }
            FieldType::Map { key, value } => {
                key.stamp_package(package);
                value.stamp_package(package);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Singular,
    Repeated,
}

/// State shared by message fields and enum constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:    String,
    pub number:  i32,
    /// Declaration order inside the owning definition, set on registration.
    pub index:   usize,
    pub comment: Option<String>,
    pub ignored: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Field {
            name: name.into(),
            number,
            index: 0,
            comment: None,
            ignored: false,
        }
    }

    pub fn is_deprecated(&self) -> bool {
        is_deprecated(self.comment.as_deref())
    }

    /// True when the field must not appear in generated output.
    pub fn is_skipped(&self) -> bool {
        self.ignored || self.is_deprecated()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageField {
    #[serde(flatten)]
    pub field:       Field,
    #[serde(rename = "type")]
    pub ty:          FieldType,
    pub cardinality: Cardinality,
}

impl MessageField {
    pub fn new(name: impl Into<String>, number: i32, ty: FieldType) -> Self {
        MessageField {
            field: Field::new(name, number),
            ty,
            cardinality: Cardinality::Singular,
        }
    }

    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumField {
    #[serde(flatten)]
    pub field: Field,
}

impl EnumField {
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        EnumField {
            field: Field::new(name, number),
        }
    }
}

macro_rules! field_deref {
    ($($ty:ty),*) => {$(
        impl Deref for $ty {
            type Target = Field;

            fn deref(&self) -> &Field {
                &self.field
            }
        }

        impl DerefMut for $ty {
            fn deref_mut(&mut self) -> &mut Field {
                &mut self.field
            }
        }

        impl AsRef<Field> for $ty {
            fn as_ref(&self) -> &Field {
                &self.field
            }
        }

        impl AsMut<Field> for $ty {
            fn as_mut(&mut self) -> &mut Field {
                &mut self.field
            }
        }
    )*};
}

field_deref!(MessageField, EnumField);

/// A named definition: either a [`Message`] or an [`Enum`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataDef<F> {
    pub name:    String,
    /// Owning file, used for package lookups only.
    #[serde(skip)]
    pub proto:   ProtoId,
    pub fields:  Vec<F>,
    pub comment: Option<String>,
    pub ignored: bool,
}

pub type Message = DataDef<MessageField>;
pub type Enum = DataDef<EnumField>;

impl<F: AsMut<Field>> DataDef<F> {
    pub fn new(name: impl Into<String>, proto: ProtoId) -> Self {
        DataDef {
            name: name.into(),
            proto,
            fields: Vec::new(),
            comment: None,
            ignored: false,
        }
    }

    pub fn add_field(&mut self, mut field: F) {
        field.as_mut().index = self.fields.len();
        self.fields.push(field);
    }
}

impl<F> DataDef<F> {
    pub fn is_deprecated(&self) -> bool {
        is_deprecated(self.comment.as_deref())
    }

    pub fn is_skipped(&self) -> bool {
        self.ignored || self.is_deprecated()
    }
}

/// Borrowed view over either kind of definition.
#[derive(Debug, Clone, Copy)]
pub enum DataDefRef<'a> {
    Message(&'a Message),
    Enum(&'a Enum),
}

impl<'a> DataDefRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            DataDefRef::Message(m) => &m.name,
            DataDefRef::Enum(e)    => &e.name,
        }
    }

    pub fn proto(&self) -> ProtoId {
        match self {
            DataDefRef::Message(m) => m.proto,
            DataDefRef::Enum(e)    => e.proto,
        }
    }

    pub fn comment(&self) -> Option<&'a str> {
        match self {
            DataDefRef::Message(m) => m.comment.as_deref(),
            DataDefRef::Enum(e)    => e.comment.as_deref(),
        }
    }

    pub fn kind(&self) -> DefKind {
        match self {
            DataDefRef::Message(_) => DefKind::Message,
            DataDefRef::Enum(_)    => DefKind::Enum,
        }
    }
}

fn is_deprecated(comment: Option<&str>) -> bool {
    comment.is_some_and(|c| c.contains(DEPRECATED_MARKER))
}
