use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pbgen_schema::{DataDefRef, Enum, Field, Message, ProtoId, SchemaGraph};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{
    backend::Backend,
    config::{CompilerConfig, SkipList, DEFAULT_SCHEMA_EXT},
    error::GenError,
    loader::Loader,
    utils::slash_path,
};

/// Counters for one [`Compiler::compile`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub files:         usize,
    pub messages:      usize,
    pub enums:         usize,
    pub skipped_files: usize,
}

/// Walks schema files and drives a [`Backend`] over every kept definition.
pub struct Compiler<L, B> {
    loader:     L,
    backend:    B,
    skip:       SkipList,
    schema_ext: String,
    session:    Session,
}

/// State threaded through one run.
#[derive(Default)]
struct Session {
    compiled: HashSet<PathBuf>,
    stats:    CompileStats,
}

impl<L: Loader, B: Backend> Compiler<L, B> {
    pub fn new(loader: L, backend: B) -> Self {
        Compiler {
            loader,
            backend,
            skip: SkipList::default(),
            schema_ext: DEFAULT_SCHEMA_EXT.to_string(),
            session: Session::default(),
        }
    }

    /// Applies the skip list and schema extension from `config`.
    pub fn with_config(loader: L, backend: B, config: &CompilerConfig) -> Result<Self, GenError> {
        let mut compiler = Compiler::new(loader, backend);
        compiler.skip = config.skip_list()?;
        compiler.schema_ext = config.schema_ext.clone();
        Ok(compiler)
    }

    pub fn with_skip(mut self, skip: SkipList) -> Self {
        self.skip = skip;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Compiles every root in order. Directories are expanded recursively,
    /// entries sorted by name.
    ///
    /// The backend's output is closed before returning, whether the run
    /// succeeded or not.
    pub fn compile<P: AsRef<Path>>(&mut self, roots: &[P]) -> Result<CompileStats, GenError> {
        let result = roots
            .iter()
            .try_for_each(|root| self.compile_path(root.as_ref()));
        let closed = self.backend.writer().done();
        result?;
        closed?;
        Ok(self.session.stats.clone())
    }

    fn compile_path(&mut self, path: &Path) -> Result<(), GenError> {
        if path.is_dir() {
            self.compile_dir(path)
        } else {
            self.compile_file(path)
        }
    }

    fn compile_dir(&mut self, dir: &Path) -> Result<(), GenError> {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "cannot list entry");
                    continue;
                }
            };
            let path = entry.path();
            let wanted = path
                .extension()
                .is_some_and(|ext| ext == self.schema_ext.as_str());
            if entry.file_type().is_file() && wanted {
                self.compile_file(path)?;
            }
        }
        Ok(())
    }

    fn compile_file(&mut self, path: &Path) -> Result<(), GenError> {
        let relpath = self.relative(path);
        if self.skip.matches(&relpath) {
            info!(file = %relpath, "skip");
            self.session.stats.skipped_files += 1;
            return Ok(());
        }

        let id = match self.loader.load_abspath(path) {
            Ok(id) => id,
            Err(e) if e.is_advisory() => {
                warn!(file = %relpath, error = %e, "unreadable, skipped");
                self.session.stats.skipped_files += 1;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let graph = self.loader.graph();
        for &import in &graph.proto(id).import_protos {
            self.session.compile_proto(graph, &mut self.backend, import)?;
        }
        self.session.compile_proto(graph, &mut self.backend, id)
    }

    fn relative(&self, path: &Path) -> String {
        let root = self.loader.proto_dir();
        let rel = match path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => path
                .canonicalize()
                .ok()
                .and_then(|abs| abs.strip_prefix(root).ok().map(Path::to_path_buf))
                .unwrap_or_else(|| path.to_path_buf()),
        };
        slash_path(&rel)
    }
}

impl Session {
    fn compile_proto<B: Backend>(
        &mut self,
        graph: &SchemaGraph,
        backend: &mut B,
        id: ProtoId,
    ) -> Result<(), GenError> {
        let proto = graph.proto(id);
        if self.compiled.contains(&proto.path) {
            return Ok(());
        }

        if backend.skip_proto(graph, proto) {
            info!(file = %slash_path(&proto.file), "skip");
            self.compiled.insert(proto.path.clone());
            self.stats.skipped_files += 1;
            return Ok(());
        }

        backend.before_proto(graph, proto)?;
        backend.before_messages(graph, &proto.messages)?;
        for message in proto.messages.iter().filter(|m| !m.is_skipped()) {
            compile_message(graph, backend, message)?;
            self.stats.messages += 1;
        }
        backend.after_messages(graph, &proto.messages)?;
        backend.before_enums(graph, &proto.enums)?;
        for en in proto.enums.iter().filter(|e| !e.is_skipped()) {
            compile_enum(graph, backend, en)?;
            self.stats.enums += 1;
        }
        backend.after_enums(graph, &proto.enums)?;
        backend.after_proto(graph, proto)?;

        self.compiled.insert(proto.path.clone());
        self.stats.files += 1;
        info!(file = %slash_path(&proto.file), "compile");
        Ok(())
    }
}

fn compile_message<B: Backend>(graph: &SchemaGraph, backend: &mut B, message: &Message) -> Result<(), GenError> {
    let def = DataDefRef::Message(message);
    backend.writer().before_data_def(graph, def)?;
    backend.before_message(graph, message)?;
    for field in kept(&message.fields) {
        backend.emit_message_field(graph, field)?;
    }
    backend.after_message(graph, message)?;
    backend.writer().after_data_def(graph, def)
}

fn compile_enum<B: Backend>(graph: &SchemaGraph, backend: &mut B, en: &Enum) -> Result<(), GenError> {
    let def = DataDefRef::Enum(en);
    let fields = kept(&en.fields);
    backend.writer().before_data_def(graph, def)?;
    backend.before_enum(graph, en)?;
    for (i, field) in fields.iter().enumerate() {
        backend.emit_enum_field(graph, field, i + 1 == fields.len())?;
    }
    backend.after_enum(graph, en, &fields)?;
    backend.writer().after_data_def(graph, def)
}

/// Fields that are neither deprecated nor ignored, in declaration order.
pub fn kept<F: AsRef<Field>>(fields: &[F]) -> Vec<&F> {
    fields.iter().filter(|f| !f.as_ref().is_skipped()).collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    let hidden = entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.');
    if hidden {
        debug!(path = %entry.path().display(), "skip dotfile");
    }
    hidden
}
