//! Inline `@import` expansion through an [`Importer`].
//!
//! Copyright (c) 2025 Posit, PBC

use tracing::trace;

use crate::error::ImportError;
use crate::imports::{ImportArg, scan_imports, scan_module_rules};
use crate::importer::Importer;
use crate::path::{CSS_EXTENSION, ROOT_MARKER};

/// Maximum import nesting before expansion gives up.
pub const IMPORT_DEPTH_LIMIT: usize = 64;

/// Replace every stylesheet `@import` in `source` with the imported contents.
///
/// Plain CSS imports (`url(...)`, remote URLs, compiled `.css` files) are kept
/// as `@import` rules for the engine to pass through. Each imported file is
/// expanded relative to its own logical path.
///
/// `@use` and `@forward` rules of imported files are moved to the top of the
/// result, since module rules must precede everything else in a stylesheet.
/// A rule identical to one already present is dropped.
pub fn expand_imports(source: &str, importer: &dyn Importer) -> Result<String, ImportError> {
    let mut modules = ModuleRules {
        existing: scan_module_rules(source)
            .into_iter()
            .map(|range| source[range].to_string())
            .collect(),
        hoisted: Vec::new(),
    };
    let body = expand(source, ROOT_MARKER, importer, 0, &mut modules)?;
    if modules.hoisted.is_empty() {
        return Ok(body);
    }

    let mut out = modules.hoisted.join("\n");
    out.push('\n');
    out.push_str(&body);
    Ok(out)
}

struct ModuleRules {
    existing: Vec<String>,
    hoisted: Vec<String>,
}

impl ModuleRules {
    /// Remove the module rules of an imported file, keeping the first copy
    /// of each for the top of the output.
    fn hoist(&mut self, source: &str) -> String {
        let ranges = scan_module_rules(source);
        if ranges.is_empty() {
            return source.to_string();
        }

        let mut rest = String::with_capacity(source.len());
        let mut cursor = 0;
        for range in ranges {
            rest.push_str(&source[cursor..range.start]);
            cursor = range.end;

            let rule = &source[range];
            if !self.existing.iter().chain(&self.hoisted).any(|seen| seen == rule) {
                self.hoisted.push(rule.to_string());
            }
        }
        rest.push_str(&source[cursor..]);
        rest
    }
}

fn expand(
    source: &str,
    importing_path: &str,
    importer: &dyn Importer,
    depth: usize,
    modules: &mut ModuleRules,
) -> Result<String, ImportError> {
    let statements = scan_imports(source);
    if statements.is_empty() {
        return Ok(source.to_string());
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    for statement in &statements {
        out.push_str(&source[cursor..statement.range.start]);
        cursor = statement.range.end;

        let mut passthrough: Vec<&str> = Vec::new();
        for arg in &statement.args {
            let Some(specifier) = arg.specifier.as_deref() else {
                passthrough.push(&arg.raw);
                continue;
            };
            match importer.resolve_import(specifier, importing_path) {
                Ok(resolved) => {
                    if depth + 1 >= IMPORT_DEPTH_LIMIT {
                        return Err(ImportError::TooDeep {
                            path: resolved.path,
                            limit: IMPORT_DEPTH_LIMIT,
                        });
                    }
                    trace!(specifier, importing_path, path = %resolved.path, "Expanding import");
                    let contents = modules.hoist(&resolved.contents);
                    out.push_str(&expand(&contents, &resolved.path, importer, depth + 1, modules)?);
                    out.push('\n');
                }
                Err(ImportError::Excluded { .. }) => passthrough.push(&arg.raw),
                Err(ImportError::NotFound { .. }) if is_css_import(arg) => {
                    passthrough.push(&arg.raw)
                }
                Err(err) => return Err(err),
            }
        }

        if !passthrough.is_empty() {
            out.push_str("@import ");
            out.push_str(&passthrough.join(", "));
            out.push(';');
        }
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

/// A `.css` import with no source sibling is plain CSS, not a missing partial.
fn is_css_import(arg: &ImportArg) -> bool {
    arg.specifier
        .as_deref()
        .is_some_and(|s| s.ends_with(CSS_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::VirtualImporter;
    use crate::types::{AliasCache, FileSet};

    fn expand_with(files: &[(&str, &str)], source: &str) -> Result<String, ImportError> {
        let files: FileSet = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);
        expand_imports(source, &importer)
    }

    #[test]
    fn test_nested_imports_expand_in_place() {
        let out = expand_with(
            &[
                ("theme.scss", "@import \"tools/tools\";\nh1 {}"),
                ("tools/tools.scss", "@import \"onemore\";\n.tools {}"),
                ("tools/onemore.scss", ".underscore {}"),
            ],
            "@import \"theme\";",
        )
        .unwrap();

        assert_eq!(out, ".underscore {}\n\n.tools {}\n\nh1 {}\n");
    }

    #[test]
    fn test_plain_css_imports_pass_through() {
        let out = expand_with(
            &[("a.scss", ".a {}")],
            "@import url(\"https://fonts.example/css\");\n@import \"a\", \"print.css\";",
        )
        .unwrap();

        assert!(out.starts_with("@import url(\"https://fonts.example/css\");"));
        assert!(out.contains(".a {}\n@import \"print.css\";"));
    }

    #[test]
    fn test_commented_import_untouched() {
        let out = expand_with(&[], "// @import \"missing\";\n.a {}").unwrap();
        assert_eq!(out, "// @import \"missing\";\n.a {}");
    }

    #[test]
    fn test_import_cycle_is_too_deep() {
        let err = expand_with(
            &[("a.scss", "@import \"b\";"), ("b.scss", "@import \"a\";")],
            "@import \"a\";",
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::TooDeep { limit: IMPORT_DEPTH_LIMIT, .. }));
    }

    #[test]
    fn test_missing_import_propagates() {
        let err = expand_with(&[], "@import \"nope\";").unwrap_err();
        assert_eq!(
            err,
            ImportError::NotFound {
                path: "nope.scss".to_string()
            }
        );
    }

    #[test]
    fn test_module_rules_of_imported_files_move_to_top() {
        let out = expand_with(
            &[
                ("a.scss", "@use \"sass:math\";\n.a { width: math.div(10px, 2); }"),
                ("b.scss", "@use \"sass:math\";\n@use \"sass:color\";\n.b {}"),
            ],
            "@use \"sass:color\";\n.top { x: y; }\n@import \"a\";\n@import \"b\";",
        )
        .unwrap();

        assert!(out.starts_with("@use \"sass:math\";\n@use \"sass:color\";\n.top"));
        assert_eq!(out.matches("@use \"sass:math\";").count(), 1);
        assert_eq!(out.matches("@use \"sass:color\";").count(), 1);
        assert!(out.contains(".a { width: math.div(10px, 2); }"));
    }
}
