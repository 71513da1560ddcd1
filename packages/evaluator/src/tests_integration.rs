//! End-to-end compiles: source text in, CSS text out.

use crate::{compile, compile_with_locator, CompileResult};
use cascata_common::MockLocator;
use cascata_parser::serializer::Format;

fn compile_normal(source: &str) -> CompileResult {
    compile(source, Format::Normal).unwrap()
}

#[test]
fn test_full_feature_mix() {
    let source = "\
        @define { base: 4px; }\n\
        @class btn(pad: 8px) {\n\
          padding: $pad;\n\
          &.primary { color: white; }\n\
        }\n\
        .toolbar {\n\
          extend: btn(calc($base * 3));\n\
          margin: 0;\n\
          > li { list-style: none; }\n\
        }\n";
    let result = compile_normal(source);
    assert!(result.diagnostics.is_clean(), "{:?}", result.diagnostics);
    assert_eq!(
        result.css,
        ".toolbar {\n  padding: 12px;\n  margin: 0;\n}\n\n\
         .toolbar.primary {\n  color: white;\n}\n\n\
         .toolbar > li {\n  list-style: none;\n}\n"
    );
}

#[test]
fn test_compact_output() {
    let result = compile(
        ".toolbar { margin: 0; > li { list-style: none; } }",
        Format::Compact,
    )
    .unwrap();
    assert_eq!(result.css, ".toolbar{margin:0}.toolbar>li{list-style:none}");
}

#[test]
fn test_round_trip_is_idempotent() {
    let source = "\
        @define { accent: rgb(255, 99, 71); }\n\
        @class card { border: 1px solid $accent; &:hover { color: $accent; } }\n\
        .panel, .dialog { extend: card; padding: 8px 16px; }\n\
        @media screen { .panel { width: 50%; } }\n";
    let normal = compile_normal(source).css;
    let compact = compile(source, Format::Compact).unwrap().css;
    // compiling the compact output again must reproduce the normal
    // output exactly
    let reparsed = compile_normal(&compact);
    assert!(reparsed.diagnostics.is_clean());
    assert_eq!(reparsed.css, normal);
}

#[test]
fn test_selector_text_reference_between_siblings() {
    let source = "\
        nav {\n\
          .item { color: gray; }\n\
          .active { extend: \".item\"; font-weight: bold; }\n\
        }\n";
    let result = compile_normal(source);
    assert!(result.diagnostics.is_clean(), "{:?}", result.diagnostics);
    assert_eq!(
        result.css,
        "nav .item {\n  color: gray;\n}\n\n\
         nav .active {\n  color: gray;\n  font-weight: bold;\n}\n"
    );
}

#[test]
fn test_self_referential_parameter_default_reports() {
    // the default is lazy, so $pad resolves inside the parameter frame
    // and finds itself; the declaration is dropped and the compile
    // finishes
    let source = "\
        @class risky(pad: $pad) { padding: $pad; }\n\
        p { extend: risky; margin: 0; }\n";
    let result = compile_normal(source);
    assert_eq!(result.css, "p {\n  margin: 0;\n}\n");
    assert_eq!(result.diagnostics.error_count(), 1);
}

#[test]
fn test_mutually_referential_parameter_defaults_report() {
    let source = "\
        @class risky(a: $b, b: $a) { margin: $a; padding: $b; }\n\
        p { extend: risky; color: red; }\n";
    let result = compile_normal(source);
    assert_eq!(result.css, "p {\n  color: red;\n}\n");
    assert_eq!(result.diagnostics.error_count(), 2);
}

#[test]
fn test_class_existence_condition() {
    let source = "\
        @class dark { background: black; }\n\
        p {\n\
          @if (dark) { background: black; }\n\
          @if (not light) { color: gray; }\n\
        }\n";
    let result = compile_normal(source);
    assert_eq!(result.css, "p {\n  background: black;\n  color: gray;\n}\n");
}

#[test]
fn test_undefined_gate_suppresses_declaration() {
    let source = "\
        @class risky(ratio: calc(1 / 0)) {\n\
          @if ($ratio) { color: red; }\n\
          margin: 0;\n\
        }\n\
        p { extend: risky; }\n";
    let result = compile_normal(source);
    assert_eq!(result.css, "p {\n  margin: 0;\n}\n");
    assert_eq!(result.diagnostics.error_count(), 1);
}

#[test]
fn test_else_branch_of_lowered_conditional() {
    let source = "\
        @define { compactness: high; }\n\
        p {\n\
          @if ($compactness and false) { padding: 0; }\n\
          @else { padding: 8px; }\n\
        }\n";
    let result = compile_normal(source);
    assert_eq!(result.css, "p {\n  padding: 8px;\n}\n");
}

#[test]
fn test_cycle_is_reported_once_and_output_still_produced() {
    let source = "\
        @class a { extend: b; }\n\
        @class b { extend: a; margin: 0; }\n\
        p { extend: a; }\n";
    let result = compile_normal(source);
    assert_eq!(result.css, "p {\n  margin: 0;\n}\n");
    assert_eq!(result.diagnostics.error_count(), 1);
}

#[test]
fn test_include_provides_classes_and_variables() {
    let mut locator = MockLocator::new();
    locator.add_resource(
        "lib/theme.xcss",
        "@define global { accent: #336699; } @class themed { color: $accent; }",
    );
    let result = compile_with_locator(
        "@include \"lib/theme.xcss\";\nh1 { extend: themed; }",
        Format::Normal,
        Box::new(locator),
    )
    .unwrap();
    assert!(result.diagnostics.is_clean(), "{:?}", result.diagnostics);
    assert_eq!(result.css, "h1 {\n  color: #336699;\n}\n");
}

#[test]
fn test_charset_and_unknown_directives_pass_through() {
    let source = "@charset \"utf-8\";\n@namespace svg url(http://www.w3.org/2000/svg);\np { color: red; }";
    let result = compile_normal(source);
    assert!(result.css.starts_with("@charset \"utf-8\";\n"));
    assert!(result.css.contains("@namespace svg url(http://www.w3.org/2000/svg);"));
    assert!(result.css.ends_with("p {\n  color: red;\n}\n"));
}

#[test]
fn test_deep_nesting_cross_products() {
    let source = "\
        .grid {\n\
          .row, .header {\n\
            .cell { border: 0; }\n\
          }\n\
        }\n";
    let result = compile_normal(source);
    assert_eq!(
        result.css,
        ".grid .row .cell {\n  border: 0;\n}\n\n.grid .header .cell {\n  border: 0;\n}\n"
    );
}

#[test]
fn test_color_functions_in_values() {
    let source = "p { color: darken(tomato, 50); background: lighten(#000000, 100); }";
    let result = compile_normal(source);
    assert_eq!(
        result.css,
        "p {\n  color: #803224;\n  background: #ffffff;\n}\n"
    );
}

#[test]
fn test_parse_error_fails_the_compile() {
    assert!(compile("p { color }", Format::Normal).is_err());
}
