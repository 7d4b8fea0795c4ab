//! Primary backend using the grass crate.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! grass is a pure Rust implementation that targets dart-sass 1.54.3.
//! `@import` rules are expanded before grass sees the source. Module rules
//! (`@use`, `@forward`) are resolved by grass itself, through [`ImporterFs`],
//! which serves the session's file set and never touches the disk.
//!
//! grass only accepts plain `fn` pointers as custom functions. Each theme
//! function is bound to one of a fixed set of slot functions, which look up
//! the function to run in a thread-local table installed for the duration of
//! the render.

use std::cell::RefCell;
use std::fmt::Debug;
use std::io;
use std::path::Path;
use std::sync::Arc;

use grass::Options;
use grass_compiler::sass_value::{
    ArgumentResult, Color, Number, QuoteKind, SassNumber, Unit, Value,
};
use grass_compiler::{Builtin, Visitor};
use tracing::{debug, warn};

use super::{OutputStyle, RenderRequest, SassBackend, prepare_source};
use crate::error::BackendError;
use crate::functions::{FunctionRegistry, SassValue, ThemeFunction, is_css_unit, quoted_contents};
use crate::importer::Importer;
use crate::path;

type SlotFn = fn(ArgumentResult, &mut Visitor<'_>) -> grass::Result<Value>;

/// Upper bound on theme functions registered with one render.
const FUNCTION_SLOT_COUNT: usize = 16;

const FUNCTION_SLOTS: [SlotFn; FUNCTION_SLOT_COUNT] = [
    call_slot::<0>,
    call_slot::<1>,
    call_slot::<2>,
    call_slot::<3>,
    call_slot::<4>,
    call_slot::<5>,
    call_slot::<6>,
    call_slot::<7>,
    call_slot::<8>,
    call_slot::<9>,
    call_slot::<10>,
    call_slot::<11>,
    call_slot::<12>,
    call_slot::<13>,
    call_slot::<14>,
    call_slot::<15>,
];

thread_local! {
    static ACTIVE_FUNCTIONS: RefCell<Vec<ThemeFunction>> = const { RefCell::new(Vec::new()) };
}

/// Compiler backend backed by [`grass`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GrassBackend;

impl GrassBackend {
    pub const NAME: &'static str = "grass";

    pub fn new() -> Self {
        Self
    }
}

impl SassBackend for GrassBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn render(&self, request: &RenderRequest<'_>) -> Result<String, BackendError> {
        let source = prepare_source(request, Self::NAME)?;
        if request.source_map {
            debug!(backend = Self::NAME, output = ?request.output, "Source maps are not supported; ignoring");
        }

        let fs = ImporterFs::new(request.importer);
        let style = match request.style {
            OutputStyle::Expanded => grass::OutputStyle::Expanded,
            OutputStyle::Compressed => grass::OutputStyle::Compressed,
        };
        let mut options = Options::default().fs(&fs).style(style).quiet(true);

        let _active = ActiveFunctions::install(request.functions);
        for (slot, function) in request.functions.iter().enumerate() {
            let Some(body) = FUNCTION_SLOTS.get(slot) else {
                warn!(
                    backend = Self::NAME,
                    function = function.name(),
                    limit = FUNCTION_SLOT_COUNT,
                    "Too many theme functions; function not registered"
                );
                continue;
            };
            options = options.add_custom_fn(function.name(), Builtin::new(*body));
        }

        grass::from_string(source, &options).map_err(|e| BackendError::Compile {
            backend: Self::NAME,
            message: e.to_string(),
        })
    }
}

/// Installs a registry into the slot table, restoring the previous table
/// when dropped.
struct ActiveFunctions {
    previous: Vec<ThemeFunction>,
}

impl ActiveFunctions {
    fn install(functions: &FunctionRegistry) -> Self {
        let table: Vec<ThemeFunction> = functions.iter().take(FUNCTION_SLOT_COUNT).cloned().collect();
        let previous = ACTIVE_FUNCTIONS.with(|active| active.replace(table));
        Self { previous }
    }
}

impl Drop for ActiveFunctions {
    fn drop(&mut self) {
        let previous = std::mem::take(&mut self.previous);
        ACTIVE_FUNCTIONS.with(|active| active.replace(previous));
    }
}

fn call_slot<const SLOT: usize>(mut args: ArgumentResult, _visitor: &mut Visitor<'_>) -> grass::Result<Value> {
    let Some(function) = ACTIVE_FUNCTIONS.with(|active| active.borrow().get(SLOT).cloned()) else {
        return Err(("Theme function called outside of a render.", args.span()).into());
    };

    let span = args.span();
    args.max_args(function.arity())?;
    let mut values = Vec::with_capacity(function.arity());
    for (index, param) in function.params().iter().enumerate() {
        let value = match args.get(index, param.name).map(|arg| arg.node) {
            None | Some(Value::Null) => None,
            Some(Value::String(text, _)) => Some(text),
            Some(other) => Some(other.to_css_string(span, false)?),
        };
        values.push(value);
    }

    let bound = function
        .complete_args(values)
        .map_err(|message| -> Box<grass::Error> { (message, span).into() })?;
    Ok(to_grass_value(function.invoke(&bound)))
}

fn to_grass_value(value: SassValue) -> Value {
    match value {
        SassValue::Null => Value::Null,
        SassValue::Number { value, unit } => Value::Dimension(SassNumber {
            num: Number(value),
            unit: if is_css_unit(&unit) {
                Unit::from(unit)
            } else {
                Unit::None
            },
            as_slash: None,
        }),
        SassValue::Color { r, g, b } => Value::Color(Arc::new(Color::new(
            r,
            g,
            b,
            1,
            format!("#{:02x}{:02x}{:02x}", r, g, b),
        ))),
        SassValue::String(text) => match quoted_contents(&text) {
            Some(inner) => Value::String(inner.to_string(), QuoteKind::Quoted),
            None => Value::String(text, QuoteKind::None),
        },
    }
}

/// Adapter that implements `grass::Fs` over an [`Importer`].
///
/// Paths are mapped to logical paths by normalizing separators.
pub struct ImporterFs<'a> {
    importer: &'a dyn Importer,
}

impl<'a> ImporterFs<'a> {
    pub fn new(importer: &'a dyn Importer) -> Self {
        Self { importer }
    }

    fn logical(path: &Path) -> String {
        path::normalize(&path.to_string_lossy())
    }
}

impl Debug for ImporterFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImporterFs")
            .field("importer", &"<Importer>")
            .finish()
    }
}

impl grass::Fs for ImporterFs<'_> {
    fn is_dir(&self, _path: &Path) -> bool {
        false
    }

    fn is_file(&self, path: &Path) -> bool {
        self.importer.exists(&Self::logical(path))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let logical = Self::logical(path);
        match self.importer.load(&logical) {
            Some(contents) => Ok(contents.into_bytes()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} doesn't exist!", logical),
            )),
        }
    }
}
