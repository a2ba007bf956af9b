use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use pbgen_schema::{
    BaseType, DefId, DefKind, Enum, EnumField, FieldType, Message, MessageField, ProtoId,
    Protobuf, SchemaGraph,
};
use tracing::debug;

use crate::{
    error::LoadError,
    parser::{parse_schema, DefinitionAst, FieldAst, FileAst, TypeExpr},
    tokenizer::{tokenize_schema, SyntaxError},
    utils::slash_path,
};

/// Source of schema graphs for the compiler.
///
/// A loaded file's [`Protobuf::import_protos`] already holds its whole import
/// closure, dependencies first.
pub trait Loader {
    /// Root that skip patterns and generated markers are relative to.
    fn proto_dir(&self) -> &Path;

    /// Loads `path` and everything it imports. Loading a file twice returns
    /// the same id.
    fn load_abspath(&mut self, path: &Path) -> Result<ProtoId, LoadError>;

    fn graph(&self) -> &SchemaGraph;
}

/// Loads `.proto`-style text files from a schema root.
#[derive(Debug)]
pub struct TextLoader {
    proto_dir: PathBuf,
    graph:     SchemaGraph,
    loaded:    HashMap<PathBuf, ProtoId>,
    loading:   Vec<PathBuf>,
}

impl TextLoader {
    pub fn new(proto_dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let proto_dir = proto_dir.as_ref();
        let proto_dir = fs::canonicalize(proto_dir).map_err(|source| LoadError::Unreadable {
            path: proto_dir.to_path_buf(),
            source,
        })?;
        Ok(TextLoader {
            proto_dir,
            graph: SchemaGraph::new(),
            loaded: HashMap::new(),
            loading: Vec::new(),
        })
    }

    pub fn into_graph(self) -> SchemaGraph {
        self.graph
    }

    fn relative(&self, abs: &Path) -> PathBuf {
        abs.strip_prefix(&self.proto_dir).unwrap_or(abs).to_path_buf()
    }

    fn load(&mut self, abs: PathBuf) -> Result<ProtoId, LoadError> {
        if let Some(&id) = self.loaded.get(&abs) {
            return Ok(id);
        }

        let bytes = fs::read(&abs).map_err(|source| LoadError::Unreadable {
            path: abs.clone(),
            source,
        })?;
        let file = self.relative(&abs);
        let file_name = slash_path(&file);
        let text = decode_utf8(&file_name, bytes)?;
        let ast = tokenize_schema(&text)
            .and_then(|tokens| parse_schema(&tokens))
            .map_err(|e| parse_error(&file_name, e))?;

        self.loading.push(abs.clone());
        let imports = self.load_imports(&file_name, &ast);
        self.loading.pop();
        let closure = self.import_closure(&imports?);

        let mut proto = Protobuf::new(self.graph.next_id(), &self.proto_dir, file, &abs);
        proto.import_protos = closure;
        build_proto(&self.graph, &mut proto, &file_name, ast)?;
        let id = self.graph.insert(proto);

        debug!(file = %file_name, "loaded");
        self.loaded.insert(abs, id);
        Ok(id)
    }

    fn load_imports(&mut self, file_name: &str, ast: &FileAst) -> Result<Vec<ProtoId>, LoadError> {
        let mut ids = Vec::new();
        for import in ast.imports() {
            let unresolved = || LoadError::UnresolvedImport {
                file:   file_name.to_string(),
                import: import.to_string(),
            };
            let abs = fs::canonicalize(self.proto_dir.join(import)).map_err(|_| unresolved())?;
            if self.loading.contains(&abs) {
                return Err(LoadError::ImportCycle {
                    file:   file_name.to_string(),
                    import: import.to_string(),
                });
            }
            match self.load(abs) {
                Ok(id) => ids.push(id),
                Err(LoadError::Unreadable { .. }) => return Err(unresolved()),
                Err(e) => return Err(e),
            }
        }
        Ok(ids)
    }

    /// Transitive closure of `direct`, each dependency before its dependents.
    fn import_closure(&self, direct: &[ProtoId]) -> Vec<ProtoId> {
        let mut closure: Vec<ProtoId> = Vec::new();
        for &id in direct {
            let nested = &self.graph.proto(id).import_protos;
            for &dep in nested.iter().chain(std::iter::once(&id)) {
                if !closure.contains(&dep) {
                    closure.push(dep);
                }
            }
        }
        closure
    }
}

impl Loader for TextLoader {
    fn proto_dir(&self) -> &Path {
        &self.proto_dir
    }

    fn load_abspath(&mut self, path: &Path) -> Result<ProtoId, LoadError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.proto_dir.join(path)
        };
        let abs = fs::canonicalize(&path).map_err(|source| LoadError::Unreadable { path, source })?;
        self.load(abs)
    }

    fn graph(&self) -> &SchemaGraph {
        &self.graph
    }
}

/// Invalid UTF-8 is a parse error at the first offending byte.
fn decode_utf8(file: &str, bytes: Vec<u8>) -> Result<String, LoadError> {
    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = 1 + valid.iter().filter(|&&b| b == b'\n').count();
        let line_start = valid.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        let column = 1 + String::from_utf8_lossy(&valid[line_start..]).chars().count();
        LoadError::Parse {
            file: file.to_string(),
            msg: "invalid UTF-8".to_string(),
            line,
            column,
        }
    })
}

fn parse_error(file: &str, e: SyntaxError) -> LoadError {
    LoadError::Parse {
        file:   file.to_string(),
        msg:    e.msg,
        line:   e.line,
        column: e.column,
    }
}

/// Name lookup for one file: its own definitions, then its import closure.
struct Scope<'g> {
    graph:   &'g SchemaGraph,
    package: Option<&'g str>,
    local:   HashMap<String, DefId>,
    imports: &'g [ProtoId],
}

impl Scope<'_> {
    /// Returns the explicit package (if the name carried one) and the target.
    fn lookup(&self, name: &str) -> Option<(Option<String>, DefId)> {
        let name = name.trim_start_matches('.');
        match name.rsplit_once('.') {
            Some((package, short)) => {
                if self.package == Some(package) {
                    if let Some(&id) = self.local.get(short) {
                        return Some((Some(package.to_string()), id));
                    }
                }
                self.imports
                    .iter()
                    .map(|&id| self.graph.proto(id))
                    .filter(|p| p.package() == Some(package))
                    .find_map(|p| p.def_id(short))
                    .map(|id| (Some(package.to_string()), id))
            }
            None => self
                .local
                .get(name)
                .copied()
                .or_else(|| {
                    let in_imports = |same_package: bool| {
                        self.imports
                            .iter()
                            .map(|&id| self.graph.proto(id))
                            .filter(|p| !same_package || p.package() == self.package)
                            .find_map(|p| p.def_id(name))
                    };
                    in_imports(true).or_else(|| in_imports(false))
                })
                .map(|id| (None, id)),
        }
    }

    fn field_type(&self, file: &str, field: &FieldAst, name: &str) -> Result<FieldType, LoadError> {
        if let Some(base) = BaseType::from_name(name) {
            return Ok(FieldType::Base(base));
        }
        let (package, target) = self.lookup(name).ok_or_else(|| LoadError::UnknownType {
            file:  file.to_string(),
            name:  name.to_string(),
            field: field.name.clone(),
        })?;
        let short = name.rsplit('.').next().unwrap_or(name);
        Ok(FieldType::reference(package, short, target))
    }
}

fn build_proto(
    graph: &SchemaGraph,
    proto: &mut Protobuf,
    file: &str,
    ast: FileAst,
) -> Result<(), LoadError> {
    let FileAst { headers, messages, enums } = ast;
    for header in headers {
        proto.add_header(header);
    }

    let mut local = HashMap::new();
    for (index, def) in messages.iter().enumerate() {
        local.insert(def.name.clone(), DefId { proto: proto.id, kind: DefKind::Message, index });
    }
    for (index, def) in enums.iter().enumerate() {
        local.insert(def.name.clone(), DefId { proto: proto.id, kind: DefKind::Enum, index });
    }

    let package = proto.package().map(str::to_string);
    let import_protos = proto.import_protos.clone();
    let scope = Scope {
        graph,
        package: package.as_deref(),
        local,
        imports: &import_protos,
    };

    for def in messages {
        let message = build_message(&scope, proto.id, file, def)?;
        proto.add_message(message)?;
    }
    for def in enums {
        proto.add_enum(build_enum(proto.id, def))?;
    }
    Ok(())
}

fn build_message(
    scope: &Scope<'_>,
    proto: ProtoId,
    file: &str,
    def: DefinitionAst,
) -> Result<Message, LoadError> {
    let mut message = Message::new(def.name, proto);
    message.comment = def.comment;
    message.ignored = def.ignored;
    for field in &def.fields {
        let ty = match &field.ty {
            Some(TypeExpr::Map(key, value)) => FieldType::map(
                scope.field_type(file, field, key)?,
                scope.field_type(file, field, value)?,
            ),
            Some(TypeExpr::Named(name)) => scope.field_type(file, field, name)?,
            None => unreachable!("message fields always carry a type"),
        };
        let mut built = MessageField::new(field.name.clone(), field.number, ty);
        built.cardinality = field.cardinality;
        built.comment = field.comment.clone();
        built.ignored = field.ignored;
        message.add_field(built);
    }
    Ok(message)
}

fn build_enum(proto: ProtoId, def: DefinitionAst) -> Enum {
    let mut en = Enum::new(def.name, proto);
    en.comment = def.comment;
    en.ignored = def.ignored;
    for field in def.fields {
        let mut built = EnumField::new(field.name, field.number);
        built.comment = field.comment;
        built.ignored = field.ignored;
        en.add_field(built);
    }
    en
}
