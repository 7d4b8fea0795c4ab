//! End-to-end compilation tests using the real backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use stencil_styles::{
    BackendError, CompilationSession, CompileOptions, EngineArbiter, FileSet, GrassBackend,
    OutputStyle, RenderRequest, RsassBackend, SassBackend, StylesConfig, StylesError,
    ThemeSettings, compile_css,
};

fn theme_settings() -> ThemeSettings {
    ThemeSettings::new(json!({
        "google-font-size": "14",
        "global": { "h1": { "font-size": { "value": 16 } } },
        "img-url": "stencil/{:size}/example.jpg",
        "img-size": "1000x400",
        "google-font": "Google_Open+Sans_700",
        "color-text": "#333333"
    }))
}

fn theme_files() -> FileSet {
    let mut files = FileSet::new();
    files.insert(
        "theme.scss".to_string(),
        "@import \"settings/global\";\n@import \"components/heading\";".to_string(),
    );
    files.insert(
        "settings/global.scss".to_string(),
        "$body-size: stencilNumber(\"google-font-size\");\n$h1-size: stencilNumber(\"global.h1.font-size.value\", rem);".to_string(),
    );
    files.insert(
        "components/heading.scss".to_string(),
        "h1 {\n  font-size: $h1-size;\n  font-family: stencilFontFamily(\"google-font\"), sans-serif;\n  font-weight: stencilFontWeight(\"google-font\");\n  color: stencilColor(\"color-text\");\n  background: url(stencilImage(\"img-url\", \"img-size\"));\n}\nbody { font-size: $body-size; }".to_string(),
    );
    files
}

fn options() -> CompileOptions {
    CompileOptions::new("@import \"theme\";")
        .with_files(theme_files())
        .with_theme_settings(theme_settings())
}

#[test]
fn test_compiles_theme_with_grass() {
    let mut session = CompilationSession::new(EngineArbiter::single(Box::new(GrassBackend::new())));
    let css = session.compile(options()).unwrap();

    assert!(css.contains("font-size: 16rem;"));
    assert!(css.contains("font-family: \"Open Sans\", sans-serif;"));
    assert!(css.contains("font-weight: 700;"));
    assert!(css.contains("color: #333333;"));
    assert!(css.contains("stencil/1000x400/example.jpg"));
    assert!(css.contains("body {\n  font-size: 14px;\n}"));
}

#[test]
fn test_compiles_theme_with_rsass() {
    let mut session = CompilationSession::new(EngineArbiter::single(Box::new(RsassBackend::new())))
        .with_style(OutputStyle::Compressed);
    let css = session.compile(options()).unwrap();

    assert!(css.contains("font-size:16rem"));
    assert!(css.contains("font-size:14px"));
}

#[test]
fn test_session_is_single_use() {
    let mut session = CompilationSession::with_default_backends();
    let first = session.compile(CompileOptions::new("a { b: c; }")).unwrap();

    let err = session.compile(CompileOptions::new("a { b: c; }")).unwrap_err();
    assert!(matches!(err, StylesError::SessionReused));
    assert!(err.to_string().contains("already used"));
    assert!(first.contains("b: c;"));
}

#[test]
fn test_invalid_source_reports_backend_error() {
    let mut session = CompilationSession::with_default_backends();
    let err = session.compile(CompileOptions::new("a { b: ")).unwrap_err();
    match err {
        StylesError::Backend(err) => assert_eq!(err.backend(), "rsass"),
        other => panic!("unexpected error: {other}"),
    }
}

/// Fails once and counts how often it was asked.
struct AlwaysFails(Arc<AtomicUsize>);

impl SassBackend for AlwaysFails {
    fn name(&self) -> &'static str {
        "always-fails"
    }

    fn render(&self, _request: &RenderRequest<'_>) -> Result<String, BackendError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Compile {
            backend: "always-fails",
            message: "unsupported feature".to_string(),
        })
    }
}

#[test]
fn test_fallback_backend_recovers() {
    let calls = Arc::new(AtomicUsize::new(0));
    let arbiter = EngineArbiter::new(
        Box::new(AlwaysFails(calls.clone())),
        Some(Box::new(GrassBackend::new())),
    );
    let mut session = CompilationSession::new(arbiter);

    let css = session.compile(options()).unwrap();
    assert!(css.contains("font-size: 14px;"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_compile_css_runs_prefixer() {
    let config = StylesConfig {
        browsers: vec!["safari 12".to_string()],
        ..Default::default()
    };
    let css = compile_css(CompileOptions::new(".a { user-select: none; }"), &config).unwrap();
    assert!(css.contains("-webkit-user-select: none"));
}
