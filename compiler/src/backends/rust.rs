//! Rust backend: one module per schema file at
//! `<out>/<package modules>/<file module>.rs`, plus a `mod.rs` in every
//! output directory declaring its children. The output root is meant to be
//! mounted as the crate root, so references render as `crate::...` paths.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use pbgen_schema::{BaseType, DataDefRef, Enum, EnumField, Message, MessageField, Protobuf, SchemaGraph};
use tracing::debug;

use crate::{
    backend::Backend,
    error::GenError,
    resolver::{Resolved, TypeResolver},
    utils::{escape_rust_keyword, to_pascal_case, to_snake_case},
    writer::{Output, Writer},
};

pub const FILE_EXT: &str = ".rs";

const DERIVE_STRUCT: &str = "#[derive(Debug, Clone, PartialEq)]";
const DERIVE_ENUM: &str = "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]";

pub fn type_name(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

pub fn field_name(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

/// Snake-case module identifier; a leading digit gets a `_` prefix.
pub fn module_ident(name: &str) -> String {
    let ident = field_name(&name.replace(['-', '.'], "_"));
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", ident)
    } else {
        ident
    }
}

fn module_name(proto: &Protobuf) -> String {
    let stem = proto
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    module_ident(&stem)
}

/// Package segments as module identifiers; also the output directories.
fn package_modules(proto: &Protobuf) -> Vec<String> {
    proto
        .package()
        .unwrap_or_default()
        .split('.')
        .filter(|s| !s.is_empty())
        .map(module_ident)
        .collect()
}

/// `crate::<package modules>::<file module>`.
pub fn module_path(proto: &Protobuf) -> String {
    let mut segments = vec!["crate".to_string()];
    segments.extend(package_modules(proto));
    segments.push(module_name(proto));
    segments.join("::")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RustResolver;

impl TypeResolver for RustResolver {
    fn base(&self, base: BaseType) -> Resolved {
        let (ty, default) = match base {
            BaseType::Int64  => ("i64", "0"),
            BaseType::Int32  => ("i32", "0"),
            BaseType::String => ("String", "String::new()"),
            BaseType::Bool   => ("bool", "false"),
            BaseType::Float  => ("f32", "0.0"),
            BaseType::Double => ("f64", "0.0"),
            BaseType::Bytes  => ("Vec<u8>", "Vec::new()"),
        };
        Resolved::new(ty, default)
    }

    fn null(&self) -> &'static str {
        "None"
    }

    fn message_type(&self, graph: &SchemaGraph, message: &Message) -> String {
        format!("{}::{}", module_path(graph.proto(message.proto)), type_name(&message.name))
    }

    fn list_type(&self, item: &str) -> String {
        format!("Option<Vec<{}>>", item)
    }

    fn map_type(&self, key: &str, value: &str) -> String {
        format!("Option<std::collections::HashMap<{}, {}>>", key, value)
    }

    fn reference(&self, ty: &str) -> String {
        format!("Option<Box<{}>>", ty)
    }
}

/// One file per schema file; definitions share it.
pub struct RustWriter {
    output:  Output,
    /// Child modules of every output directory seen so far.
    modules: BTreeMap<PathBuf, BTreeSet<String>>,
}

impl RustWriter {
    pub fn new(output: Output) -> Self {
        RustWriter {
            output,
            modules: BTreeMap::new(),
        }
    }

    pub fn proto_path(&self, proto: &Protobuf) -> PathBuf {
        let mut path = self.output.out_dir().to_path_buf();
        path.extend(package_modules(proto));
        path.join(format!("{}{}", module_name(proto), self.output.file_ext()))
    }

    fn register(&mut self, proto: &Protobuf) {
        let mut dir = self.output.out_dir().to_path_buf();
        for segment in package_modules(proto) {
            self.modules.entry(dir.clone()).or_default().insert(segment.clone());
            dir.push(segment);
        }
        self.modules.entry(dir).or_default().insert(module_name(proto));
    }

    fn write_mod_files(&mut self) -> Result<(), GenError> {
        let marker = format!("// generated by {}, NEVER CHANGE!!", self.output.tool());
        for (dir, children) in std::mem::take(&mut self.modules) {
            let path = dir.join(format!("mod{}", self.output.file_ext()));
            debug!(path = %path.display(), "module index");
            self.output.prepare(&path, None)?;
            self.output.write_line(&marker)?;
            self.output.write_line("")?;
            for child in &children {
                self.output.write_line(&format!("pub mod {};", child))?;
            }
            self.output.close()?;
        }
        Ok(())
    }
}

impl Writer for RustWriter {
    fn output(&mut self) -> &mut Output {
        &mut self.output
    }

    fn before_proto(&mut self, _graph: &SchemaGraph, proto: &Protobuf) -> Result<(), GenError> {
        let path = self.proto_path(proto);
        self.register(proto);
        self.output.prepare(&path, Some(proto))
    }

    fn after_proto(&mut self, _graph: &SchemaGraph, _proto: &Protobuf) -> Result<(), GenError> {
        self.output.close()
    }

    fn before_data_def(&mut self, _graph: &SchemaGraph, _def: DataDefRef<'_>) -> Result<(), GenError> {
        Ok(())
    }

    fn after_data_def(&mut self, _graph: &SchemaGraph, _def: DataDefRef<'_>) -> Result<(), GenError> {
        Ok(())
    }

    /// Closes the last module and writes the `mod.rs` indexes.
    fn done(&mut self) -> Result<(), GenError> {
        self.output.close()?;
        self.write_mod_files()
    }
}

pub struct RustBackend {
    writer:   RustWriter,
    resolver: RustResolver,
    /// `(field, default)` pairs of the message being emitted.
    defaults: Vec<(String, String)>,
}

impl RustBackend {
    pub fn new(output: Output) -> Self {
        RustBackend {
            writer:   RustWriter::new(output),
            resolver: RustResolver,
            defaults: Vec::new(),
        }
    }

    pub fn output(&self) -> &Output {
        &self.writer.output
    }

    fn doc(&mut self, indent: &str, comment: Option<&str>) -> Result<(), GenError> {
        match comment {
            Some(comment) => self.writer.write_line(&format!("{}/// {}", indent, comment)),
            None => Ok(()),
        }
    }
}

impl Backend for RustBackend {
    fn writer(&mut self) -> &mut dyn Writer {
        &mut self.writer
    }

    fn before_message(&mut self, _graph: &SchemaGraph, message: &Message) -> Result<(), GenError> {
        self.defaults.clear();
        self.doc("", message.comment.as_deref())?;
        self.writer.write_line(DERIVE_STRUCT)?;
        self.writer
            .write_line(&format!("pub struct {} {{", type_name(&message.name)))
    }

    fn emit_message_field(&mut self, graph: &SchemaGraph, field: &MessageField) -> Result<(), GenError> {
        let resolved = self.resolver.resolve_field(graph, field)?;
        let name = field_name(&field.name);
        self.doc("    ", field.comment.as_deref())?;
        self.writer
            .write_line(&format!("    pub {}: {},", name, resolved.ty))?;
        self.defaults.push((name, resolved.default));
        Ok(())
    }

    fn after_message(&mut self, _graph: &SchemaGraph, message: &Message) -> Result<(), GenError> {
        let defaults = std::mem::take(&mut self.defaults);
        let w = &mut self.writer;
        w.write_line("}")?;
        w.write_line("")?;
        w.write_line(&format!("impl Default for {} {{", type_name(&message.name)))?;
        w.write_line("    fn default() -> Self {")?;
        w.write_line("        Self {")?;
        for (name, default) in &defaults {
            w.write_line(&format!("            {}: {},", name, default))?;
        }
        w.write_line("        }")?;
        w.write_line("    }")?;
        w.write_line("}")?;
        w.write_line("")
    }

    fn before_enum(&mut self, _graph: &SchemaGraph, en: &Enum) -> Result<(), GenError> {
        self.doc("", en.comment.as_deref())?;
        self.writer.write_line(DERIVE_ENUM)?;
        // Zero-variant enums cannot carry a repr.
        if en.fields.iter().any(|f| !f.is_skipped()) {
            self.writer.write_line("#[repr(i32)]")?;
        }
        self.writer
            .write_line(&format!("pub enum {} {{", type_name(&en.name)))
    }

    fn emit_enum_field(&mut self, _graph: &SchemaGraph, field: &EnumField, _is_last: bool) -> Result<(), GenError> {
        self.doc("    ", field.comment.as_deref())?;
        self.writer
            .write_line(&format!("    {} = {},", type_name(&field.name), field.number))
    }

    fn after_enum(&mut self, _graph: &SchemaGraph, en: &Enum, fields: &[&EnumField]) -> Result<(), GenError> {
        let w = &mut self.writer;
        w.write_line("}")?;
        w.write_line("")?;
        w.write_line(&format!("impl {} {{", type_name(&en.name)))?;
        w.write_line("    pub fn from_i32(value: i32) -> Option<Self> {")?;
        w.write_line("        match value {")?;
        for field in fields {
            w.write_line(&format!(
                "            {} => Some(Self::{}),",
                field.number,
                type_name(&field.name)
            ))?;
        }
        w.write_line("            _ => None,")?;
        w.write_line("        }")?;
        w.write_line("    }")?;
        w.write_line("}")?;
        w.write_line("")
    }
}
