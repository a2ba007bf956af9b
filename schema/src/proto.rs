use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    error::ModelError,
    types::{DataDefRef, DefId, DefKind, Enum, Header, HeaderKind, Message, ProtoId},
};

/// One parsed schema file.
///
/// Identity is the absolute [`Protobuf::path`]; two instances with the same
/// path describe the same file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Protobuf {
    #[serde(skip)]
    pub id:            ProtoId,
    /// Schema root the file was loaded from.
    pub root_dir:      PathBuf,
    /// Path relative to `root_dir`.
    pub file:          PathBuf,
    /// Absolute path.
    pub path:          PathBuf,
    headers:           Vec<Header>,
    imports:           Vec<Header>,
    options:           Vec<Header>,
    pub messages:      Vec<Message>,
    pub enums:         Vec<Enum>,
    definitions:       BTreeMap<String, DefId>,
    /// Transitive import closure, dependencies first.
    #[serde(skip)]
    pub import_protos: Vec<ProtoId>,
}

impl Protobuf {
    pub fn new(
        id: ProtoId,
        root_dir: impl Into<PathBuf>,
        file: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Protobuf {
            id,
            root_dir:      root_dir.into(),
            file:          file.into(),
            path:          path.into(),
            headers:       Vec::new(),
            imports:       Vec::new(),
            options:       Vec::new(),
            messages:      Vec::new(),
            enums:         Vec::new(),
            definitions:   BTreeMap::new(),
            import_protos: Vec::new(),
        }
    }

    /// Imports and options are keyed by name and may repeat; every other kind
    /// replaces an earlier header with the same name.
    pub fn add_header(&mut self, header: Header) {
        let list = match header.kind {
            HeaderKind::Import => &mut self.imports,
            HeaderKind::Option => &mut self.options,
            _                  => &mut self.headers,
        };
        match list.iter_mut().find(|h| h.name == header.name) {
            Some(existing) => *existing = header,
            None => list.push(header),
        }
    }

    pub fn header(&self, name: &str) -> Option<&Header> {
        self.headers.iter().find(|h| h.name == name)
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn imports(&self) -> &[Header] {
        &self.imports
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    pub fn options(&self) -> &[Header] {
        &self.options
    }

    pub fn syntax(&self) -> Option<&str> {
        self.header(HeaderKind::Syntax.as_str()).map(|h| h.value.as_str())
    }

    pub fn package(&self) -> Option<&str> {
        self.header(HeaderKind::Package.as_str()).map(|h| h.value.as_str())
    }

    pub fn add_message(&mut self, mut message: Message) -> Result<DefId, ModelError> {
        let package = self.registration_package(&message.name)?;
        for field in &mut message.fields {
            field.ty.stamp_package(&package);
        }
        let id = DefId {
            proto: self.id,
            kind:  DefKind::Message,
            index: self.messages.len(),
        };
        message.proto = self.id;
        self.definitions.insert(message.name.clone(), id);
        self.messages.push(message);
        Ok(id)
    }

    pub fn add_enum(&mut self, mut en: Enum) -> Result<DefId, ModelError> {
        self.registration_package(&en.name)?;
        let id = DefId {
            proto: self.id,
            kind:  DefKind::Enum,
            index: self.enums.len(),
        };
        en.proto = self.id;
        self.definitions.insert(en.name.clone(), id);
        self.enums.push(en);
        Ok(id)
    }

    pub fn def_id(&self, name: &str) -> Option<DefId> {
        self.definitions.get(name).copied()
    }

    pub fn data_def(&self, name: &str) -> Option<DataDefRef<'_>> {
        self.def_id(name).and_then(|id| self.get(id))
    }

    /// Looks up a definition owned by this file.
    pub fn get(&self, id: DefId) -> Option<DataDefRef<'_>> {
        if id.proto != self.id {
            return None;
        }
        match id.kind {
            DefKind::Message => self.messages.get(id.index).map(DataDefRef::Message),
            DefKind::Enum    => self.enums.get(id.index).map(DataDefRef::Enum),
        }
    }

    pub fn is_file(&self, path: &Path) -> bool {
        self.path == path
    }

    fn registration_package(&self, name: &str) -> Result<String, ModelError> {
        if self.definitions.contains_key(name) {
            return Err(ModelError::DuplicateDefinition {
                file: self.file.display().to_string(),
                name: name.to_string(),
            });
        }
        self.package()
            .map(str::to_string)
            .ok_or_else(|| ModelError::MissingPackage {
                file: self.file.display().to_string(),
                name: name.to_string(),
            })
    }
}
