use std::path::Path;

use crate::{
    proto::Protobuf,
    types::{DataDefRef, DefId, DefKind, Enum, Message, ProtoId},
};

/// Arena of every loaded schema file.
///
/// Ids handed out by the graph stay valid for its whole lifetime; files are
/// never removed.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    protos: Vec<Protobuf>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        SchemaGraph::default()
    }

    /// Id the next inserted file will receive.
    pub fn next_id(&self) -> ProtoId {
        ProtoId(self.protos.len())
    }

    /// Stores a file built with [`SchemaGraph::next_id`].
    pub fn insert(&mut self, mut proto: Protobuf) -> ProtoId {
        let id = self.next_id();
        debug_assert_eq!(proto.id, id, "file built for a different slot");
        proto.id = id;
        self.protos.push(proto);
        id
    }

    pub fn proto(&self, id: ProtoId) -> &Protobuf {
        &self.protos[id.0]
    }

    pub fn protos(&self) -> impl Iterator<Item = &Protobuf> {
        self.protos.iter()
    }

    pub fn len(&self) -> usize {
        self.protos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<ProtoId> {
        self.protos.iter().find(|p| p.is_file(path)).map(|p| p.id)
    }

    pub fn data_def(&self, id: DefId) -> DataDefRef<'_> {
        match id.kind {
            DefKind::Message => DataDefRef::Message(self.message(id)),
            DefKind::Enum    => DataDefRef::Enum(self.enum_(id)),
        }
    }

    pub fn message(&self, id: DefId) -> &Message {
        &self.proto(id.proto).messages[id.index]
    }

    pub fn enum_(&self, id: DefId) -> &Enum {
        &self.proto(id.proto).enums[id.index]
    }

    /// Package of the file that owns `def`.
    pub fn package_of(&self, def: DataDefRef<'_>) -> Option<&str> {
        self.proto(def.proto()).package()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Header, HeaderKind};

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut graph = SchemaGraph::new();
        let a = graph.insert(Protobuf::new(graph.next_id(), "/s", "a.proto", "/s/a.proto"));

        let id = graph.next_id();
        let mut p = Protobuf::new(id, "/s", "b.proto", "/s/b.proto");
        p.add_header(Header::new(HeaderKind::Package, "package", "b"));
        p.add_message(Message::new("Thing", id)).unwrap();
        let b = graph.insert(p);

        assert_eq!(a, ProtoId(0));
        assert_eq!(b, ProtoId(1));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.find_by_path(Path::new("/s/b.proto")), Some(b));

        let thing = graph.proto(b).def_id("Thing").unwrap();
        let def = graph.data_def(thing);
        assert_eq!(def.name(), "Thing");
        assert_eq!(graph.package_of(def), Some("b"));
        assert_eq!(graph.message(thing).proto, b);
    }
}
