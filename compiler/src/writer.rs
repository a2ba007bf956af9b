use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pbgen_schema::{DataDefRef, Protobuf, SchemaGraph};
use tracing::debug;

use crate::{
    error::GenError,
    utils::{package_path, slash_path},
};

struct OpenFile {
    path: PathBuf,
    out:  BufWriter<File>,
}

/// The single output handle of a run.
///
/// At most one file is open at a time: [`Output::prepare`] closes the current
/// file before opening the next, and dropping the handle closes it too.
pub struct Output {
    out_dir:  PathBuf,
    file_ext: String,
    tool:     String,
    current:  Option<OpenFile>,
    written:  Vec<PathBuf>,
}

impl Output {
    pub fn new(out_dir: impl Into<PathBuf>, file_ext: impl Into<String>, tool: impl Into<String>) -> Self {
        Output {
            out_dir:  out_dir.into(),
            file_ext: file_ext.into(),
            tool:     tool.into(),
            current:  None,
            written:  Vec::new(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn file_ext(&self) -> &str {
        &self.file_ext
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    /// Every file opened so far, in opening order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// `<out_dir>/<package-as-path>/<name><ext>`.
    pub fn data_def_path(&self, package: &str, name: &str) -> PathBuf {
        self.out_dir
            .join(package_path(package))
            .join(format!("{}{}", name, self.file_ext))
    }

    /// Closes the open file, creates `path` (and its parents) and writes the
    /// generated-file marker for `proto`.
    pub fn prepare(&mut self, path: &Path, proto: Option<&Protobuf>) -> Result<(), GenError> {
        self.close()?;
        let io = |source| GenError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io)?;
        }
        let file = File::create(path).map_err(io)?;
        debug!(path = %path.display(), "open");
        self.current = Some(OpenFile {
            path: path.to_path_buf(),
            out:  BufWriter::new(file),
        });
        self.written.push(path.to_path_buf());
        if let Some(proto) = proto {
            let marker = format!(
                "// generated from {} by {}, NEVER CHANGE!!",
                slash_path(&proto.file),
                self.tool
            );
            self.write_line(&marker)?;
            self.write_line("")?;
        }
        Ok(())
    }

    /// Writes `line` followed by a newline; an empty line writes just the newline.
    pub fn write_line(&mut self, line: &str) -> Result<(), GenError> {
        let file = self.current.as_mut().ok_or(GenError::NoOutput)?;
        writeln!(file.out, "{}", line).map_err(|source| GenError::Io {
            path: file.path.clone(),
            source,
        })
    }

    /// Flushes and releases the open file. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<(), GenError> {
        match self.current.take() {
            Some(mut file) => file.out.flush().map_err(|source| GenError::Io {
                path: file.path,
                source,
            }),
            None => Ok(()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Output-file lifecycle hooks around each schema file and definition.
///
/// The default layout writes one file per definition under the schema
/// package. Per-file backends override the proto hooks instead and leave
/// the definition hooks empty.
pub trait Writer {
    fn output(&mut self) -> &mut Output;

    fn before_proto(&mut self, _graph: &SchemaGraph, _proto: &Protobuf) -> Result<(), GenError> {
        Ok(())
    }

    fn after_proto(&mut self, _graph: &SchemaGraph, _proto: &Protobuf) -> Result<(), GenError> {
        Ok(())
    }

    fn before_data_def(&mut self, graph: &SchemaGraph, def: DataDefRef<'_>) -> Result<(), GenError> {
        let proto = graph.proto(def.proto());
        let output = self.output();
        let path = output.data_def_path(proto.package().unwrap_or_default(), def.name());
        output.prepare(&path, Some(proto))
    }

    fn after_data_def(&mut self, _graph: &SchemaGraph, _def: DataDefRef<'_>) -> Result<(), GenError> {
        self.output().close()
    }

    fn write_line(&mut self, line: &str) -> Result<(), GenError> {
        self.output().write_line(line)
    }

    /// Called once when the run ends, on success or failure.
    fn done(&mut self) -> Result<(), GenError> {
        self.output().close()
    }
}
