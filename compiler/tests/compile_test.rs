use std::fs;
use std::path::{Path, PathBuf};

use pbgen_compiler::{
    backends::{JavaBackend, RustBackend},
    Backend, CompileStats, Compiler, GenError, LoadError, Output, SkipList, TextLoader, Writer,
};
use pbgen_schema::{DataDefRef, Enum, EnumField, Message, MessageField, Protobuf, SchemaGraph};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const PIXEL: &str = r#"
syntax = "proto3";
package demo;

enum Color {
  RED = 1;
  GREEN = 2;
}

message Pixel {
  Color color = 1;
  int32 id = 2;
  repeated string tags = 3;
}
"#;

fn write(root: &Path, rel: &str, text: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, text).unwrap();
    path
}

fn java(proto_dir: &Path, out: &Path, roots: &[PathBuf]) -> Result<CompileStats, GenError> {
    let loader = TextLoader::new(proto_dir).unwrap();
    let backend = JavaBackend::new(Output::new(out, ".java", "pbgen"));
    Compiler::new(loader, backend).compile(roots)
}

/// Records the hook sequence instead of writing code.
struct Recorder {
    output: Output,
    events: Vec<String>,
    /// Schema files (relative, slash separated) the backend refuses.
    refuse: Vec<&'static str>,
}

impl Recorder {
    fn new(dir: &Path) -> Self {
        Recorder {
            output: Output::new(dir, ".txt", "pbgen"),
            events: Vec::new(),
            refuse: Vec::new(),
        }
    }
}

impl Writer for Recorder {
    fn output(&mut self) -> &mut Output {
        &mut self.output
    }

    fn before_data_def(&mut self, _graph: &SchemaGraph, _def: DataDefRef<'_>) -> Result<(), GenError> {
        Ok(())
    }
}

impl Backend for Recorder {
    fn writer(&mut self) -> &mut dyn Writer {
        self
    }

    fn skip_proto(&self, _graph: &SchemaGraph, proto: &Protobuf) -> bool {
        self.refuse.iter().any(|f| proto.file == Path::new(f))
    }

    fn before_messages(&mut self, _graph: &SchemaGraph, messages: &[Message]) -> Result<(), GenError> {
        self.events.push(format!("messages {}", messages.len()));
        Ok(())
    }

    fn after_messages(&mut self, _graph: &SchemaGraph, _messages: &[Message]) -> Result<(), GenError> {
        self.events.push("end messages".to_string());
        Ok(())
    }

    fn before_enums(&mut self, _graph: &SchemaGraph, enums: &[Enum]) -> Result<(), GenError> {
        self.events.push(format!("enums {}", enums.len()));
        Ok(())
    }

    fn after_enums(&mut self, _graph: &SchemaGraph, _enums: &[Enum]) -> Result<(), GenError> {
        self.events.push("end enums".to_string());
        Ok(())
    }

    fn before_proto(&mut self, _graph: &SchemaGraph, proto: &Protobuf) -> Result<(), GenError> {
        self.events.push(format!("proto {}", proto.file.display()));
        Ok(())
    }

    fn before_message(&mut self, _graph: &SchemaGraph, message: &Message) -> Result<(), GenError> {
        self.events.push(format!("message {}", message.name));
        Ok(())
    }

    fn emit_message_field(&mut self, _graph: &SchemaGraph, field: &MessageField) -> Result<(), GenError> {
        self.events.push(format!("  field {}", field.name));
        Ok(())
    }

    fn after_message(&mut self, _graph: &SchemaGraph, _message: &Message) -> Result<(), GenError> {
        Ok(())
    }

    fn before_enum(&mut self, _graph: &SchemaGraph, en: &Enum) -> Result<(), GenError> {
        self.events.push(format!("enum {}", en.name));
        Ok(())
    }

    fn emit_enum_field(&mut self, _graph: &SchemaGraph, field: &EnumField, is_last: bool) -> Result<(), GenError> {
        let last = if is_last { " (last)" } else { "" };
        self.events.push(format!("  constant {}{}", field.name, last));
        Ok(())
    }

    fn after_enum(&mut self, _graph: &SchemaGraph, _en: &Enum, _fields: &[&EnumField]) -> Result<(), GenError> {
        Ok(())
    }
}

fn record(proto_dir: &Path, roots: &[PathBuf], skip: &[&str]) -> (Vec<String>, CompileStats) {
    record_refusing(proto_dir, roots, skip, &[])
}

fn record_refusing(
    proto_dir: &Path,
    roots: &[PathBuf],
    skip: &[&str],
    refuse: &[&'static str],
) -> (Vec<String>, CompileStats) {
    let out = TempDir::new().unwrap();
    let loader = TextLoader::new(proto_dir).unwrap();
    let mut recorder = Recorder::new(out.path());
    recorder.refuse = refuse.to_vec();
    let mut compiler = Compiler::new(loader, recorder).with_skip(SkipList::new(skip).unwrap());
    let stats = compiler.compile(roots).unwrap();
    (compiler.into_backend().events, stats)
}

fn protos(events: &[String]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| e.strip_prefix("proto "))
        .collect()
}

#[test]
fn test_java_end_to_end() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = write(src.path(), "pixel.proto", PIXEL);

    let stats = java(src.path(), out.path(), &[file]).unwrap();
    assert_eq!(
        stats,
        CompileStats { files: 1, messages: 1, enums: 1, skipped_files: 0 }
    );

    let pixel = fs::read_to_string(out.path().join("demo/Pixel.java")).unwrap();
    assert_eq!(
        pixel,
        "// generated from pixel.proto by pbgen, NEVER CHANGE!!

package demo;

public class Pixel {
  public int color = 0;
  public int id = 0;
  public java.util.List<String> tags = null;
}

"
    );

    let color = fs::read_to_string(out.path().join("demo/Color.java")).unwrap();
    assert_eq!(
        color,
        "// generated from pixel.proto by pbgen, NEVER CHANGE!!

package demo;

public enum Color {
  RED(1),
  GREEN(2);

  public static final Color valueOf(int value) {
    switch (value) {
      case 1: return RED;
      case 2: return GREEN;
      default: return null;
    }
  }

  private final int value;

  public int getValue() { return this.value; }

  private Color(int value) { this.value = value; }

}

"
    );
}

#[test]
fn test_rust_end_to_end() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = write(src.path(), "pixel.proto", PIXEL);

    let loader = TextLoader::new(src.path()).unwrap();
    let backend = RustBackend::new(Output::new(out.path(), ".rs", "pbgen"));
    Compiler::new(loader, backend).compile(&[file]).unwrap();

    let text = fs::read_to_string(out.path().join("demo/pixel.rs")).unwrap();
    assert_eq!(
        text,
        "// generated from pixel.proto by pbgen, NEVER CHANGE!!

#[derive(Debug, Clone, PartialEq)]
pub struct Pixel {
    pub color: i32,
    pub id: i32,
    pub tags: Option<Vec<String>>,
}

impl Default for Pixel {
    fn default() -> Self {
        Self {
            color: 0,
            id: 0,
            tags: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Color {
    Red = 1,
    Green = 2,
}

impl Color {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Red),
            2 => Some(Self::Green),
            _ => None,
        }
    }
}

"
    );
}

#[test]
fn test_deprecated_and_ignored_definitions_are_not_emitted() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = write(
        src.path(),
        "holder.proto",
        r#"
package demo;

// @deprecated
message Old {
  int32 x = 1;
}

message Hidden {
  option ignore = true;
  int32 y = 1;
}

message Holder {
  Old old = 1;
  int32 keep = 2;
  int32 gone = 3 [ignore = true];
}

enum Level {
  LOW = 1;
  // @deprecated
  MID = 2;
  HIGH = 3;
}
"#,
    );

    let stats = java(src.path(), out.path(), &[file]).unwrap();
    assert_eq!(stats.messages, 1);
    assert!(!out.path().join("demo/Old.java").exists());
    assert!(!out.path().join("demo/Hidden.java").exists());

    let holder = fs::read_to_string(out.path().join("demo/Holder.java")).unwrap();
    assert!(holder.contains("  public demo.Old old = null;\n"));
    assert!(holder.contains("  public int keep = 0;\n"));
    assert!(!holder.contains("gone"));

    let level = fs::read_to_string(out.path().join("demo/Level.java")).unwrap();
    assert!(level.contains("  LOW(1),\n  HIGH(3);\n"));
    assert!(level.contains("      case 3: return HIGH;\n"));
    assert!(!level.contains("MID"));
}

#[test]
fn test_imports_compile_first_and_once() {
    let src = TempDir::new().unwrap();
    write(src.path(), "c.proto", "package p;\nenum C { ONE = 1; }\n");
    let b = write(
        src.path(),
        "b.proto",
        "package p;\nimport \"c.proto\";\nmessage B { C c = 1; }\n",
    );
    let a = write(
        src.path(),
        "a.proto",
        "package p;\nimport \"b.proto\";\nimport \"c.proto\";\nmessage A { B b = 1; }\n",
    );

    let (events, stats) = record(src.path(), &[a, b], &[]);
    assert_eq!(protos(&events), vec!["c.proto", "b.proto", "a.proto"]);
    assert_eq!(stats.files, 3);
    assert_eq!(
        events,
        vec![
            "proto c.proto",
            "messages 0",
            "end messages",
            "enums 1",
            "enum C",
            "  constant ONE (last)",
            "end enums",
            "proto b.proto",
            "messages 1",
            "message B",
            "  field c",
            "end messages",
            "enums 0",
            "end enums",
            "proto a.proto",
            "messages 1",
            "message A",
            "  field b",
            "end messages",
            "enums 0",
            "end enums",
        ]
    );
}

#[test]
fn test_directory_root_dedups_imported_files() {
    let src = TempDir::new().unwrap();
    write(src.path(), "x/leaf.proto", "package x;\nmessage Leaf { int32 v = 1; }\n");
    write(
        src.path(),
        "a/top.proto",
        "package a;\nimport \"x/leaf.proto\";\nmessage Top { x.Leaf leaf = 1; }\n",
    );

    let (events, stats) = record(src.path(), &[src.path().to_path_buf()], &[]);
    let files = protos(&events);
    assert_eq!(files, vec!["x/leaf.proto", "a/top.proto"]);
    assert_eq!(stats.files, 2);
}

#[test]
fn test_skip_list_and_dotfiles() {
    let src = TempDir::new().unwrap();
    write(src.path(), "keep.proto", "package k;\nmessage Keep { int32 v = 1; }\n");
    write(src.path(), "vendor/third.proto", "package v;\nmessage Third { int32 v = 1; }\n");
    write(src.path(), ".cache/stale.proto", "package s;\nmessage Stale { int32 v = 1; }\n");
    write(src.path(), "notes.txt", "not a schema");

    let (events, stats) = record(src.path(), &[src.path().to_path_buf()], &["vendor/"]);
    assert_eq!(protos(&events), vec!["keep.proto"]);
    assert_eq!(stats.files, 1);
    assert_eq!(stats.skipped_files, 1);
}

#[test]
fn test_missing_root_is_skipped_with_a_warning() {
    let src = TempDir::new().unwrap();
    let keep = write(src.path(), "keep.proto", "package k;\nmessage Keep { int32 v = 1; }\n");

    let (events, stats) = record(src.path(), &[src.path().join("absent.proto"), keep], &[]);
    assert_eq!(protos(&events), vec!["keep.proto"]);
    assert_eq!(stats.skipped_files, 1);
}

#[test]
fn test_output_is_deterministic() {
    let src = TempDir::new().unwrap();
    let file = write(src.path(), "pixel.proto", PIXEL);
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    java(src.path(), first.path(), &[file.clone()]).unwrap();
    java(src.path(), second.path(), &[file]).unwrap();

    for name in ["demo/Pixel.java", "demo/Color.java"] {
        let a = fs::read(first.path().join(name)).unwrap();
        let b = fs::read(second.path().join(name)).unwrap();
        assert_eq!(a, b, "{}", name);
    }
}

#[test]
fn test_parse_error_aborts_after_closing_output() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let good = write(src.path(), "good.proto", PIXEL);
    let bad = write(src.path(), "bad.proto", "package demo;\nmessage Broken {\n  int32 x = ;\n}\n");
    let later = write(src.path(), "later.proto", "package demo;\nmessage Later { int32 v = 1; }\n");

    let loader = TextLoader::new(src.path()).unwrap();
    let backend = JavaBackend::new(Output::new(out.path(), ".java", "pbgen"));
    let mut compiler = Compiler::new(loader, backend);

    let err = compiler.compile(&[good, bad, later]).unwrap_err();
    match err {
        GenError::Load(LoadError::Parse { file, line, .. }) => {
            assert_eq!(file, "bad.proto");
            assert_eq!(line, 3);
        }
        other => panic!("unexpected error: {}", other),
    }

    assert!(!compiler.backend().output().is_open());
    assert!(!out.path().join("demo/Later.java").exists());
    let pixel = fs::read_to_string(out.path().join("demo/Pixel.java")).unwrap();
    assert!(pixel.ends_with("}\n\n"));
}

#[test]
fn test_list_hooks_see_every_definition() {
    let src = TempDir::new().unwrap();
    let file = write(
        src.path(),
        "mixed.proto",
        "package m;\n// @deprecated\nmessage Old { int32 v = 1; }\nmessage New { int32 v = 1; }\n",
    );

    let (events, stats) = record(src.path(), &[file], &[]);
    assert_eq!(stats.messages, 1);
    assert_eq!(
        events,
        vec![
            "proto mixed.proto",
            "messages 2",
            "message New",
            "  field v",
            "end messages",
            "enums 0",
            "end enums",
        ]
    );
}

#[test]
fn test_backend_can_refuse_a_file() {
    let src = TempDir::new().unwrap();
    write(src.path(), "dep.proto", "package p;\nenum Dep { ONE = 1; }\n");
    let top = write(
        src.path(),
        "top.proto",
        "package p;\nimport \"dep.proto\";\nmessage Top { Dep d = 1; }\n",
    );

    let (events, stats) = record_refusing(src.path(), &[top], &[], &["dep.proto"]);
    assert_eq!(protos(&events), vec!["top.proto"]);
    assert!(!events.iter().any(|e| e == "enum Dep"));
    assert_eq!(stats.files, 1);
    assert_eq!(stats.skipped_files, 1);
}

#[test]
fn test_explicit_root_inside_directory_root_is_emitted_once() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let b = write(src.path(), "b.proto", "package d;\nmessage B { int32 v = 1; }\n");
    write(
        src.path(),
        "a.proto",
        "package d;\nimport \"b.proto\";\nmessage A { B b = 1; }\n",
    );

    let (events, stats) = record(src.path(), &[src.path().to_path_buf(), b.clone()], &[]);
    assert_eq!(protos(&events), vec!["b.proto", "a.proto"]);
    assert_eq!(events.iter().filter(|e| *e == "message B").count(), 1);
    assert_eq!(stats.files, 2);

    let stats = java(src.path(), out.path(), &[src.path().to_path_buf(), b]).unwrap();
    assert_eq!(stats.messages, 2);
    let emitted: Vec<_> = fs::read_dir(out.path().join("d"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(emitted.iter().filter(|n| *n == "B.java").count(), 1);
    assert_eq!(emitted.len(), 2);
}

#[test]
fn test_skipped_enum_still_resolves_as_int32() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let file = write(
        src.path(),
        "status.proto",
        r#"
package demo;

// @deprecated
enum Legacy {
  A = 1;
}

enum Hidden {
  option ignore = true;
  B = 1;
}

message Status {
  Legacy legacy = 1;
  Hidden hidden = 2;
}
"#,
    );

    let stats = java(src.path(), out.path(), &[file]).unwrap();
    assert_eq!(stats.enums, 0);
    assert!(!out.path().join("demo/Legacy.java").exists());
    assert!(!out.path().join("demo/Hidden.java").exists());

    let status = fs::read_to_string(out.path().join("demo/Status.java")).unwrap();
    assert!(status.contains("  public int legacy = 0;\n"));
    assert!(status.contains("  public int hidden = 0;\n"));
}

#[test]
fn test_rust_module_indexes() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write(src.path(), "base/2d.proto", "package geo.base;\nmessage Point { int32 x = 1; }\n");
    let shape = write(
        src.path(),
        "shape.proto",
        "package geo;\nimport \"base/2d.proto\";\nmessage Shape { geo.base.Point origin = 1; }\n",
    );

    let loader = TextLoader::new(src.path()).unwrap();
    let backend = RustBackend::new(Output::new(out.path(), ".rs", "pbgen"));
    Compiler::new(loader, backend).compile(&[shape]).unwrap();

    let read = |rel: &str| fs::read_to_string(out.path().join(rel)).unwrap();
    assert_eq!(read("mod.rs"), "// generated by pbgen, NEVER CHANGE!!\n\npub mod geo;\n");
    assert_eq!(
        read("geo/mod.rs"),
        "// generated by pbgen, NEVER CHANGE!!\n\npub mod base;\npub mod shape;\n"
    );
    assert_eq!(read("geo/base/mod.rs"), "// generated by pbgen, NEVER CHANGE!!\n\npub mod _2d;\n");
    assert!(read("geo/base/_2d.rs").contains("pub struct Point {"));
    assert!(read("geo/shape.rs").contains("    pub origin: Option<Box<crate::geo::base::_2d::Point>>,\n"));
}

#[test]
fn test_invalid_utf8_fails_the_run() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let path = src.path().join("bad.proto");
    let mut bytes = b"package demo;\nmessage Fine { int32 v = 1; }\n// ".to_vec();
    bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
    fs::write(&path, bytes).unwrap();

    let err = java(src.path(), out.path(), &[path]).unwrap_err();
    assert!(matches!(err, GenError::Load(LoadError::Parse { line: 3, .. })), "{}", err);
    assert!(!out.path().join("demo/Fine.java").exists());
}
