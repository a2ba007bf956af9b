//! Java backend: one source file per message or enum, placed under the Java
//! package (`option java_package`, falling back to the schema package).

use pbgen_schema::{
    BaseType, DataDefRef, Enum, EnumField, Message, MessageField, Protobuf, SchemaGraph,
};

use crate::{
    backend::Backend,
    error::GenError,
    resolver::{Resolved, TypeResolver},
    writer::{Output, Writer},
};

pub const FILE_EXT: &str = ".java";

pub fn java_package(proto: &Protobuf) -> &str {
    proto
        .option("java_package")
        .or_else(|| proto.package())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaResolver;

impl TypeResolver for JavaResolver {
    fn base(&self, base: BaseType) -> Resolved {
        let (ty, default) = match base {
            BaseType::Int64  => ("long", "0L"),
            BaseType::Int32  => ("int", "0"),
            BaseType::String => ("String", "\"\""),
            BaseType::Bool   => ("boolean", "false"),
            BaseType::Float  => ("float", "0F"),
            BaseType::Double => ("double", "0"),
            BaseType::Bytes  => ("String", "\"\""),
        };
        Resolved::new(ty, default)
    }

    fn null(&self) -> &'static str {
        "null"
    }

    fn message_type(&self, graph: &SchemaGraph, message: &Message) -> String {
        format!("{}.{}", java_package(graph.proto(message.proto)), message.name)
    }

    fn list_type(&self, item: &str) -> String {
        format!("java.util.List<{}>", item)
    }

    fn map_type(&self, key: &str, value: &str) -> String {
        format!("java.util.Map<{}, {}>", key, value)
    }

    fn boxed(&self, ty: &str) -> String {
        match ty {
            "long"    => "Long",
            "int"     => "Integer",
            "boolean" => "Boolean",
            "float"   => "Float",
            "double"  => "Double",
            other     => other,
        }
        .to_string()
    }
}

/// One file per definition, laid out by Java package.
pub struct JavaWriter {
    output: Output,
}

impl JavaWriter {
    pub fn new(output: Output) -> Self {
        JavaWriter { output }
    }
}

impl Writer for JavaWriter {
    fn output(&mut self) -> &mut Output {
        &mut self.output
    }

    fn before_data_def(&mut self, graph: &SchemaGraph, def: DataDefRef<'_>) -> Result<(), GenError> {
        let proto = graph.proto(def.proto());
        let path = self.output.data_def_path(java_package(proto), def.name());
        self.output.prepare(&path, Some(proto))
    }
}

pub struct JavaBackend {
    writer:   JavaWriter,
    resolver: JavaResolver,
}

impl JavaBackend {
    pub fn new(output: Output) -> Self {
        JavaBackend {
            writer:   JavaWriter::new(output),
            resolver: JavaResolver,
        }
    }

    pub fn output(&self) -> &Output {
        &self.writer.output
    }

    fn doc(&mut self, indent: &str, comment: Option<&str>) -> Result<(), GenError> {
        if let Some(comment) = comment {
            self.writer.write_line(&format!("{}/**", indent))?;
            self.writer.write_line(&format!("{} * {}", indent, comment))?;
            self.writer.write_line(&format!("{} */", indent))?;
        }
        Ok(())
    }

    fn open_type(&mut self, graph: &SchemaGraph, def: DataDefRef<'_>, keyword: &str) -> Result<(), GenError> {
        let package = java_package(graph.proto(def.proto()));
        if !package.is_empty() {
            self.writer.write_line(&format!("package {};", package))?;
            self.writer.write_line("")?;
        }
        self.doc("", def.comment())?;
        self.writer
            .write_line(&format!("public {} {} {{", keyword, def.name()))
    }
}

impl Backend for JavaBackend {
    fn writer(&mut self) -> &mut dyn Writer {
        &mut self.writer
    }

    fn before_message(&mut self, graph: &SchemaGraph, message: &Message) -> Result<(), GenError> {
        self.open_type(graph, DataDefRef::Message(message), "class")
    }

    fn emit_message_field(&mut self, graph: &SchemaGraph, field: &MessageField) -> Result<(), GenError> {
        self.doc("  ", field.comment.as_deref())?;
        let resolved = self.resolver.resolve_field(graph, field)?;
        self.writer.write_line(&format!(
            "  public {} {} = {};",
            resolved.ty, field.name, resolved.default
        ))
    }

    fn after_message(&mut self, _graph: &SchemaGraph, _message: &Message) -> Result<(), GenError> {
        self.writer.write_line("}")?;
        self.writer.write_line("")
    }

    fn before_enum(&mut self, graph: &SchemaGraph, en: &Enum) -> Result<(), GenError> {
        self.open_type(graph, DataDefRef::Enum(en), "enum")
    }

    fn emit_enum_field(&mut self, _graph: &SchemaGraph, field: &EnumField, is_last: bool) -> Result<(), GenError> {
        self.doc("  ", field.comment.as_deref())?;
        let end = if is_last { ';' } else { ',' };
        self.writer
            .write_line(&format!("  {}({}){}", field.name, field.number, end))
    }

    fn after_enum(&mut self, _graph: &SchemaGraph, en: &Enum, fields: &[&EnumField]) -> Result<(), GenError> {
        let w = &mut self.writer;
        if fields.is_empty() {
            w.write_line("  ;")?;
        }
        w.write_line("")?;
        w.write_line(&format!("  public static final {} valueOf(int value) {{", en.name))?;
        w.write_line("    switch (value) {")?;
        for field in fields {
            w.write_line(&format!("      case {}: return {};", field.number, field.name))?;
        }
        w.write_line("      default: return null;")?;
        w.write_line("    }")?;
        w.write_line("  }")?;
        w.write_line("")?;
        w.write_line("  private final int value;")?;
        w.write_line("")?;
        w.write_line("  public int getValue() { return this.value; }")?;
        w.write_line("")?;
        w.write_line(&format!("  private {}(int value) {{ this.value = value; }}", en.name))?;
        w.write_line("")?;
        w.write_line("}")?;
        w.write_line("")
    }
}
