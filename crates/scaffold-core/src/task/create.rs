//! Create task: copy rendered files from the generator into the destination

use super::{parse_enum, Common, Scalar};
use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::fs::{Conflict, ContentType, Destination, Source};
use crate::logger::FileAction;
use crate::template;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeta {
    #[serde(flatten)]
    pub common: Common,
    /// Source path under `SrcPath`; a directory is copied recursively
    #[serde(default)]
    pub src: Option<String>,
    /// Inline template used instead of a source file
    #[serde(default)]
    pub content: Option<String>,
    pub dst: String,
    #[serde(default)]
    pub src_type: Option<String>,
    #[serde(default)]
    pub dst_type: Option<String>,
    #[serde(default)]
    pub mode: Option<Scalar>,
    #[serde(default)]
    pub conflict: Option<String>,
    /// Copy contents without rendering them
    #[serde(default)]
    pub raw: bool,
    /// Entry names to skip when copying a directory, e.g. `*.bak` or `target`
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub(crate) common: Common,
    src: Option<Source>,
    content: Option<String>,
    dst: Destination,
    raw: bool,
    exclude: Vec<String>,
}

/// What ends up in a destination file
enum Payload {
    Bytes(Vec<u8>),
    Document(Value),
}

impl CreateTask {
    pub fn new(meta: CreateMeta) -> Result<Self> {
        let src = meta
            .src
            .filter(|s| !s.trim().is_empty())
            .map(|path| Source::new(path).with_content_type(meta.src_type));
        if src.is_none() && meta.content.is_none() {
            return Err(Error::construction("src", "either `src` or `content` is required"));
        }
        if meta.dst.trim().is_empty() {
            return Err(Error::construction("dst", "destination path is empty"));
        }
        let conflict: Conflict = parse_enum(meta.conflict.as_deref(), "conflict")?;

        Ok(Self {
            common: meta.common,
            src,
            content: meta.content,
            dst: Destination::new(meta.dst)
                .with_content_type(meta.dst_type)
                .with_mode(meta.mode.map(Scalar::into_string))
                .with_conflict(conflict),
            raw: meta.raw,
            exclude: meta.exclude,
        })
    }

    pub fn execute(&self, ctx: &RunContext<'_>, values: &mut Map<String, Value>) -> Result<()> {
        let mut dst = self.dst.clone();
        dst.set_values(values)?;

        let Some(source) = &self.src else {
            let content = self.content.as_deref().unwrap_or_default();
            let payload = if self.raw {
                Payload::Bytes(content.as_bytes().to_vec())
            } else {
                Payload::Bytes(template::render(content, values)?.into_bytes())
            };
            return create_file(ctx, dst, payload);
        };

        let mut src = source.clone();
        src.set_values(values)?;
        if !src.exists() {
            return Err(Error::PathNotFound(src.path().to_path_buf()));
        }

        if src.is_dir() {
            return self.create_tree(ctx, &src, dst, values);
        }

        // A file copied onto an existing directory lands inside it
        if dst.is_dir() {
            if let Some(file_name) = src.path().file_name() {
                dst = dst.child(&file_name.to_string_lossy())?;
            }
        }
        let payload = self.payload(&src, &dst, values)?;
        create_file(ctx, dst, payload)
    }

    /// Copy a directory source: directories first, then files
    fn create_tree(
        &self,
        ctx: &RunContext<'_>,
        src: &Source,
        root: Destination,
        values: &Map<String, Value>,
    ) -> Result<()> {
        let mut root = root;
        if !root.exists() {
            ctx.logger.action(FileAction::Mkdir, root.path());
            if !ctx.dry_run {
                root.create_dir()?;
            }
        }

        let mut files = Vec::new();
        for entry in src.entries()? {
            if self.is_excluded(&entry.relative) {
                continue;
            }
            // Entry names are templates; an empty segment drops the entry
            let rendered = template::render(&entry.relative, values)?;
            if rendered.split('/').any(|segment| segment.trim().is_empty()) {
                tracing::debug!(entry = %entry.relative, "entry name rendered empty, skipping");
                continue;
            }

            if entry.is_dir {
                let mut dir = root.child(&rendered)?;
                if !dir.exists() {
                    ctx.logger.action(FileAction::Mkdir, dir.path());
                    if !ctx.dry_run {
                        dir.create_dir()?;
                    }
                }
            } else {
                files.push((entry.relative, rendered));
            }
        }

        for (relative, rendered) in files {
            let file = src.child(&relative)?;
            let dst = root.child(&rendered)?;
            let payload = self.payload(&file, &dst, values)?;
            create_file(ctx, dst, payload)?;
        }
        Ok(())
    }

    /// Rendered contents of `src` in the form `dst` should store them
    ///
    /// Non-UTF-8 files and `raw` tasks are copied byte for byte. Between json
    /// and yaml the document is converted.
    fn payload(&self, src: &Source, dst: &Destination, values: &Map<String, Value>) -> Result<Payload> {
        let bytes = src.bytes().unwrap_or_default();
        if self.raw {
            return Ok(Payload::Bytes(bytes.to_vec()));
        }
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Ok(Payload::Bytes(bytes.to_vec()));
        };

        let rendered = template::render(text, values)?;
        let structured = |t: ContentType| matches!(t, ContentType::Json | ContentType::Yaml);
        if src.content_type() != dst.content_type()
            && structured(src.content_type())
            && structured(dst.content_type())
        {
            let document = src
                .content_type()
                .decode(rendered.as_bytes())
                .map_err(|message| Error::Content {
                    content_type: src.content_type().as_str(),
                    path: src.path().to_path_buf(),
                    message,
                })?;
            return Ok(Payload::Document(document));
        }
        Ok(Payload::Bytes(rendered.into_bytes()))
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.exclude.iter().any(|p| p == relative)
            || relative
                .split('/')
                .any(|segment| matches_any(segment, &self.exclude))
    }
}

/// Check if a name matches any pattern: `*suffix`, `prefix*` or an exact name
fn matches_any(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        if let Some(suffix) = pattern.strip_prefix('*') {
            name.ends_with(suffix)
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            name.starts_with(prefix)
        } else {
            name == pattern
        }
    })
}

/// Write one file, applying the destination's conflict policy
fn create_file(ctx: &RunContext<'_>, mut dst: Destination, payload: Payload) -> Result<()> {
    if !dst.exists() {
        ctx.logger.action(FileAction::Create, dst.path());
        if !ctx.dry_run {
            write(&mut dst, &payload)?;
        }
        return Ok(());
    }

    let replace = match dst.conflict() {
        Conflict::Keep => false,
        Conflict::Replace => true,
        Conflict::Prompt => {
            let question = format!("Overwrite {}?", dst.path().display());
            ctx.prompter.confirm(&question, false, "")?
        }
    };

    if !replace {
        ctx.logger.action(FileAction::Keep, dst.path());
        return Ok(());
    }

    // Only files are replaced; a directory is never removed to make room
    if dst.is_dir() {
        return Err(Error::Io {
            op: "replace",
            path: dst.path().to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "destination is a directory",
            ),
        });
    }

    ctx.logger.action(FileAction::Replace, dst.path());
    if !ctx.dry_run {
        dst.delete()?;
        write(&mut dst, &payload)?;
    }
    Ok(())
}

fn write(dst: &mut Destination, payload: &Payload) -> Result<()> {
    match payload {
        Payload::Bytes(bytes) => dst.write_bytes(bytes),
        Payload::Document(document) => dst.write(document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::FileAction;
    use crate::testing::{roots, Harness};
    use serde_json::json;
    use std::fs;

    fn task(meta: Value) -> CreateTask {
        CreateTask::new(serde_json::from_value(meta).unwrap()).unwrap()
    }

    #[test]
    fn test_creates_rendered_file() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/hello.txt"), "Hello {{Name}}!\n").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "hello.txt", "dst": "out/{{Name}}.txt" }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        let written = tmp.path().join("dst/out/demo.txt");
        assert_eq!(fs::read_to_string(&written).unwrap(), "Hello demo!\n");
        assert_eq!(harness.logger.actions(), vec![(FileAction::Create, written)]);
    }

    #[test]
    fn test_replace_overwrites_without_prompting() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/file.txt"), "new").unwrap();
        fs::write(tmp.path().join("dst/file.txt"), "old").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "file.txt", "dst": "file.txt", "conflict": "replace" }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        let written = tmp.path().join("dst/file.txt");
        assert_eq!(fs::read_to_string(&written).unwrap(), "new");
        assert_eq!(harness.logger.actions(), vec![(FileAction::Replace, written)]);
        assert!(harness.prompter.asked().is_empty());
    }

    #[test]
    fn test_keep_leaves_existing_file() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/file.txt"), "new").unwrap();
        fs::write(tmp.path().join("dst/file.txt"), "old").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "file.txt", "dst": "file.txt", "conflict": "keep" }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("dst/file.txt")).unwrap(), "old");
        assert_eq!(harness.logger.actions()[0].0, FileAction::Keep);
    }

    #[test]
    fn test_prompt_policy_asks_and_respects_answer() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/file.txt"), "new").unwrap();
        fs::write(tmp.path().join("dst/file.txt"), "old").unwrap();
        let create = task(json!({ "src": "file.txt", "dst": "file.txt" }));

        let declined = Harness::new().with_answers(vec![json!(false)]);
        create.execute(&declined.context(), &mut values).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("dst/file.txt")).unwrap(), "old");
        assert_eq!(declined.prompter.asked().len(), 1);
        assert!(declined.prompter.asked()[0].starts_with("confirm:Overwrite "));

        let accepted = Harness::new().with_answers(vec![json!(true)]);
        create.execute(&accepted.context(), &mut values).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("dst/file.txt")).unwrap(), "new");
    }

    #[test]
    fn test_prompt_errors_propagate() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/file.txt"), "new").unwrap();
        fs::write(tmp.path().join("dst/file.txt"), "old").unwrap();

        let harness = Harness::new();
        let err = task(json!({ "src": "file.txt", "dst": "file.txt" }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();
        assert!(matches!(err, Error::Prompt(_)));
    }

    #[test]
    fn test_directory_tree_with_rendered_names() {
        let (tmp, mut values) = roots();
        let src = tmp.path().join("src/tree");
        fs::create_dir_all(src.join("{{Name}}/nested")).unwrap();
        fs::write(src.join("{{Name}}/nested/{{snake Name}}.rs"), "// {{Name}}\n").unwrap();
        fs::write(src.join("README.md"), "# {{Name}}\n").unwrap();
        fs::write(src.join("notes.bak"), "skip me").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "tree", "dst": "app", "exclude": ["*.bak"] }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        let app = tmp.path().join("dst/app");
        assert_eq!(fs::read_to_string(app.join("demo/nested/demo.rs")).unwrap(), "// demo\n");
        assert_eq!(fs::read_to_string(app.join("README.md")).unwrap(), "# demo\n");
        assert!(!app.join("notes.bak").exists());

        let actions: Vec<_> = harness.logger.actions().into_iter().map(|(a, _)| a).collect();
        assert_eq!(
            actions,
            vec![
                FileAction::Mkdir,
                FileAction::Mkdir,
                FileAction::Mkdir,
                FileAction::Create,
                FileAction::Create
            ]
        );
    }

    #[test]
    fn test_entries_rendering_empty_are_skipped() {
        let (tmp, mut values) = roots();
        let src = tmp.path().join("src/tree");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("{{DockerFile}}"), "FROM scratch\n").unwrap();
        fs::write(src.join("main.txt"), "main\n").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "tree", "dst": "." }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        assert!(tmp.path().join("dst/main.txt").exists());
        let created: Vec<_> = harness.logger.actions().into_iter().map(|(_, p)| p).collect();
        assert_eq!(created, vec![tmp.path().join("dst/main.txt")]);
    }

    #[test]
    fn test_dry_run_logs_without_writing() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/file.txt"), "new").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "file.txt", "dst": "file.txt" }))
            .execute(&harness.context().with_dry_run(true), &mut values)
            .unwrap();

        assert!(!tmp.path().join("dst/file.txt").exists());
        assert_eq!(harness.logger.actions()[0].0, FileAction::Create);
    }

    #[test]
    fn test_binary_and_raw_sources_are_copied_verbatim() {
        let (tmp, mut values) = roots();
        let binary = vec![0xff, 0xfe, b'{', b'{', 0x00];
        fs::write(tmp.path().join("src/logo.bin"), &binary).unwrap();
        fs::write(tmp.path().join("src/tmpl.txt"), "{{Name}}").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "logo.bin", "dst": "logo.bin" }))
            .execute(&harness.context(), &mut values)
            .unwrap();
        task(json!({ "src": "tmpl.txt", "dst": "tmpl.txt", "raw": true }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        assert_eq!(fs::read(tmp.path().join("dst/logo.bin")).unwrap(), binary);
        assert_eq!(fs::read_to_string(tmp.path().join("dst/tmpl.txt")).unwrap(), "{{Name}}");
    }

    #[test]
    fn test_file_into_existing_directory() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/file.txt"), "x").unwrap();
        fs::create_dir_all(tmp.path().join("dst/docs")).unwrap();

        let harness = Harness::new();
        task(json!({ "src": "file.txt", "dst": "docs" }))
            .execute(&harness.context(), &mut values)
            .unwrap();
        assert!(tmp.path().join("dst/docs/file.txt").is_file());
    }

    #[test]
    fn test_inline_content_never_replaces_a_directory() {
        let (tmp, mut values) = roots();
        let guide = tmp.path().join("dst/docs/guide");
        fs::create_dir_all(&guide).unwrap();
        fs::write(guide.join("intro.md"), "intro").unwrap();

        let harness = Harness::new();
        let err = task(json!({ "content": "x", "dst": "docs", "conflict": "replace" }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();

        assert!(matches!(err, Error::Io { op: "replace", .. }));
        assert!(tmp.path().join("dst/docs").is_dir());
        assert_eq!(fs::read_to_string(guide.join("intro.md")).unwrap(), "intro");
        assert!(harness.logger.actions().is_empty());
    }

    #[test]
    fn test_yaml_source_converted_to_json() {
        let (tmp, mut values) = roots();
        fs::write(tmp.path().join("src/config.yaml"), "name: {{Name}}\nport: 8080\n").unwrap();

        let harness = Harness::new();
        task(json!({ "src": "config.yaml", "dst": "config.json" }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        let written: Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join("dst/config.json")).unwrap())
                .unwrap();
        assert_eq!(written, json!({ "name": "demo", "port": 8080 }));
    }

    #[test]
    fn test_inline_content_and_mode() {
        let (tmp, mut values) = roots();
        let harness = Harness::new();
        task(json!({ "content": "#!/bin/sh\necho {{Name}}\n", "dst": "run.sh", "mode": 755 }))
            .execute(&harness.context(), &mut values)
            .unwrap();

        let script = tmp.path().join("dst/run.sh");
        assert_eq!(fs::read_to_string(&script).unwrap(), "#!/bin/sh\necho demo\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            assert_eq!(fs::metadata(&script).unwrap().permissions().mode() & 0o777, 0o755);
        }
    }

    #[test]
    fn test_missing_source_and_traversal() {
        let (_tmp, mut values) = roots();
        let harness = Harness::new();

        let err = task(json!({ "src": "absent.txt", "dst": "x" }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));

        let err = task(json!({ "content": "x", "dst": "../../escape.txt" }))
            .execute(&harness.context(), &mut values)
            .unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));
    }

    #[test]
    fn test_source_or_content_is_required() {
        let meta: CreateMeta = serde_json::from_value(json!({ "dst": "x" })).unwrap();
        assert!(CreateTask::new(meta).is_err());
    }
}
