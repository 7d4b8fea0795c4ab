//! Fallback backend using the rsass crate.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! rsass loads module files through a [`Loader`], here one answering from the
//! request's [`Importer`]. Theme functions are defined as builtins in the
//! global scope of each render.

use std::fmt;
use std::io;
use std::sync::Arc;

use rsass::css::{self, CssString};
use rsass::input::{Context, LoadError, Loader, SourceFile, SourceName};
use rsass::output::{Format, Style};
use rsass::sass::{self, CallError, FormalArgs, Function, Name, ResolvedArgs};
use rsass::value::Quotes;
use rsass::{ScopeRef, parse_value_data};
use tracing::debug;

use super::{OutputStyle, RenderRequest, SassBackend, prepare_source};
use crate::error::BackendError;
use crate::functions::{FunctionRegistry, SassValue, ThemeFunction, quoted_contents};
use crate::importer::Importer;
use crate::path;

type BuiltinBody = Arc<dyn Fn(&ResolvedArgs) -> Result<css::Value, CallError> + Send + Sync>;

/// Compiler backend backed by [`rsass`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RsassBackend;

impl RsassBackend {
    pub const NAME: &'static str = "rsass";

    pub fn new() -> Self {
        Self
    }
}

impl SassBackend for RsassBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<String, BackendError> {
        let source = prepare_source(request, Self::NAME)?;
        if request.source_map {
            debug!(backend = Self::NAME, output = ?request.output, "Source maps are not supported; ignoring");
        }

        let format = Format {
            style: match request.style {
                OutputStyle::Expanded => Style::Expanded,
                OutputStyle::Compressed => Style::Compressed,
            },
            ..Default::default()
        };
        let mut context = Context::for_loader(ImporterLoader {
            importer: request.importer,
        })
        .with_format(format);
        define_functions(&context.get_scope(), request.functions);

        let file = SourceFile::scss_bytes(source, SourceName::root("-"));
        let css = context.transform(file).map_err(|e| BackendError::Compile {
            backend: Self::NAME,
            message: e.to_string(),
        })?;
        String::from_utf8(css).map_err(|_| BackendError::InvalidOutput {
            backend: Self::NAME,
        })
    }
}

fn define_functions(scope: &ScopeRef, functions: &FunctionRegistry) {
    for function in functions.iter() {
        let name = Name::from(function.name());
        let args = FormalArgs::new(
            function
                .params()
                .iter()
                .map(|param| {
                    let default = param.default.map(|_| sass::Value::Null);
                    (Name::from(param.name), default)
                })
                .collect(),
        );
        scope.define_function(
            name.clone(),
            Function::builtin("", &name, args, builtin_body(function.clone())),
        );
    }
}

fn builtin_body(function: ThemeFunction) -> BuiltinBody {
    Arc::new(move |args: &ResolvedArgs| {
        let mut values = Vec::with_capacity(function.arity());
        for param in function.params() {
            let value: css::Value = args.get(Name::from(param.name))?;
            values.push(argument_text(value));
        }
        let bound = function.complete_args(values).map_err(CallError::msg)?;
        to_css_value(function.invoke(&bound))
    })
}

fn argument_text(value: css::Value) -> Option<String> {
    match value {
        css::Value::Null => None,
        css::Value::Literal(text) => Some(text.take_value()),
        other => Some(other.format(Format::default()).to_string()),
    }
}

fn to_css_value(value: SassValue) -> Result<css::Value, CallError> {
    match value {
        SassValue::Null => Ok(css::Value::Null),
        SassValue::String(text) => Ok(css::Value::Literal(match quoted_contents(&text) {
            Some(inner) => CssString::new(inner.to_string(), Quotes::Double),
            None => CssString::new(text, Quotes::None),
        })),
        number_or_color => {
            let literal = number_or_color.to_literal();
            let parsed = parse_value_data(literal.as_bytes())?;
            Ok(parsed.evaluate(ScopeRef::new_global(Format::default()))?)
        }
    }
}

/// [`Loader`] answering rsass file lookups from an [`Importer`].
#[derive(Clone, Copy)]
struct ImporterLoader<'a> {
    importer: &'a dyn Importer,
}

impl fmt::Debug for ImporterLoader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImporterLoader").finish_non_exhaustive()
    }
}

impl Loader for ImporterLoader<'_> {
    type File = io::Cursor<Vec<u8>>;

    fn find_file(&self, url: &str) -> Result<Option<Self::File>, LoadError> {
        Ok(self
            .importer
            .load(&path::normalize(url))
            .map(|contents| io::Cursor::new(contents.into_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::theme_functions;
    use crate::importer::VirtualImporter;
    use crate::settings::ThemeSettings;
    use crate::types::{AliasCache, FileSet};
    use serde_json::json;
    use std::sync::Arc;

    fn render(files: &[(&str, &str)], source: &str) -> Result<String, BackendError> {
        let files: FileSet = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut aliases = AliasCache::new();
        let importer = VirtualImporter::new(&files, &mut aliases);
        let functions = theme_functions(Arc::new(ThemeSettings::new(json!({
            "color-primary": "#0000AA",
            "font-size": "14"
        }))));
        RsassBackend::new().render(&RenderRequest {
            source,
            functions: &functions,
            importer: &importer,
            output: None,
            source_map: true,
            style: OutputStyle::Expanded,
        })
    }

    #[test]
    fn test_compiles_with_virtual_imports() {
        let css = render(
            &[("tools/_tools.scss", ".tools { font-size: stencilNumber(\"font-size\"); }")],
            "@import \"tools/_tools\";\nh1 { color: red; }",
        )
        .unwrap();
        assert!(css.contains("font-size: 14px;"));
        assert!(css.contains("color: red;"));
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let err = render(&[], "h1 { color: red; ").unwrap_err();
        assert_eq!(err.backend(), "rsass");
        assert_eq!(err.kind(), "compile");
    }

    #[test]
    fn test_theme_functions_take_evaluated_arguments() {
        let css = render(
            &[],
            "@mixin c($n) { color: stencilColor($n); }\na { @include c(\"color-primary\"); }\n$k: \"color-primary\";\nb { width: stencilNumber($k, $unit: em); }",
        )
        .unwrap();

        assert!(css.to_lowercase().contains("color: #0000aa;"));
        assert!(css.contains("width: 0em;"));
        assert!(!css.contains("stencilColor"));
    }

    #[test]
    fn test_use_is_served_from_file_set() {
        let css = render(
            &[("_vars.scss", "$size: stencilNumber(\"font-size\");")],
            "@use \"vars\";\np { font-size: vars.$size; }",
        )
        .unwrap();
        assert!(css.contains("font-size: 14px;"));
    }

    #[test]
    fn test_missing_argument_is_compile_error() {
        let err = render(&[], "a { color: stencilColor(); }").unwrap_err();
        assert_eq!(err.backend(), "rsass");
        assert_eq!(err.kind(), "compile");
    }
}
