use pbgen_schema::{Enum, EnumField, Message, MessageField, Protobuf, SchemaGraph};

use crate::{error::GenError, writer::Writer};

/// Target-language code generation driven by [`crate::Compiler`].
///
/// The compiler calls the hooks in this order for every kept definition:
///
/// ```text
/// skip_proto?
/// before_proto
///   before_messages
///     writer.before_data_def, before_message, emit_message_field*, after_message, writer.after_data_def
///   after_messages
///   before_enums
///     writer.before_data_def, before_enum, emit_enum_field*, after_enum, writer.after_data_def
///   after_enums
/// after_proto
/// ```
///
/// Deprecated and ignored definitions and fields never reach the per-definition
/// hooks. The list hooks see every definition of the file.
pub trait Backend {
    fn writer(&mut self) -> &mut dyn Writer;

    /// Files for which this returns `true` produce no output at all.
    fn skip_proto(&self, _graph: &SchemaGraph, _proto: &Protobuf) -> bool {
        false
    }

    fn before_proto(&mut self, graph: &SchemaGraph, proto: &Protobuf) -> Result<(), GenError> {
        self.writer().before_proto(graph, proto)
    }

    fn after_proto(&mut self, graph: &SchemaGraph, proto: &Protobuf) -> Result<(), GenError> {
        self.writer().after_proto(graph, proto)
    }

    fn before_messages(&mut self, _graph: &SchemaGraph, _messages: &[Message]) -> Result<(), GenError> {
        Ok(())
    }

    fn after_messages(&mut self, _graph: &SchemaGraph, _messages: &[Message]) -> Result<(), GenError> {
        Ok(())
    }

    fn before_enums(&mut self, _graph: &SchemaGraph, _enums: &[Enum]) -> Result<(), GenError> {
        Ok(())
    }

    fn after_enums(&mut self, _graph: &SchemaGraph, _enums: &[Enum]) -> Result<(), GenError> {
        Ok(())
    }

    fn before_message(&mut self, graph: &SchemaGraph, message: &Message) -> Result<(), GenError>;

    /// Called once per kept field, in declaration order.
    fn emit_message_field(&mut self, graph: &SchemaGraph, field: &MessageField) -> Result<(), GenError>;

    fn after_message(&mut self, graph: &SchemaGraph, message: &Message) -> Result<(), GenError>;

    fn before_enum(&mut self, graph: &SchemaGraph, en: &Enum) -> Result<(), GenError>;

    fn emit_enum_field(&mut self, graph: &SchemaGraph, field: &EnumField, is_last: bool) -> Result<(), GenError>;

    /// `fields` are the kept constants; backends emit the number-to-constant
    /// lookup from them.
    fn after_enum(&mut self, graph: &SchemaGraph, en: &Enum, fields: &[&EnumField]) -> Result<(), GenError>;
}
