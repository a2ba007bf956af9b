//! Object model for parsed pbgen schema files.
//!
//! A [`SchemaGraph`] owns every loaded [`Protobuf`]. Definitions refer to each
//! other through [`DefId`] values and to their owning file through [`ProtoId`],
//! so the graph stays a plain tree of owned data.
//!
//! ```
//! use pbgen_schema::*;
//!
//! let mut graph = SchemaGraph::new();
//! let id = graph.next_id();
//! let mut proto = Protobuf::new(id, "/schemas", "demo/color.proto", "/schemas/demo/color.proto");
//! proto.add_header(Header::new(HeaderKind::Package, "package", "demo"));
//!
//! let mut color = Enum::new("Color", id);
//! color.add_field(EnumField::new("RED", 1));
//! color.add_field(EnumField::new("GREEN", 2));
//! proto.add_enum(color).unwrap();
//! graph.insert(proto);
//!
//! let proto = graph.proto(id);
//! assert_eq!(proto.package(), Some("demo"));
//! assert_eq!(proto.enums[0].fields[1].index, 1);
//! ```

pub mod error;
pub mod graph;
pub mod proto;
pub mod types;

pub use error::*;
pub use graph::*;
pub use proto::*;
pub use types::*;

/// Comment substring that marks a definition or field as deprecated.
pub const DEPRECATED_MARKER: &str = "@deprecated";
