//! Library-level conversion tests over complete keymap sources.

use rstest::rstest;
use zmk_kanata::diagnostics::{ErrorKind, Severity};
use zmk_kanata::dts::ParseError;
use zmk_kanata::pipeline::{ConversionFailure, ConvertOptions, Converter};

mod fixtures;

use fixtures::*;

fn converter() -> Converter {
    Converter::new(ConvertOptions::default())
}

#[test]
fn test_two_rows_of_three() {
    let source = r#"
/ {
    keymap {
        compatible = "zmk,keymap";
        base {
            bindings = <&kp A &kp B &kp C
                        &kp D &kp E &kp F>;
        };
    };
};
"#;
    let output = converter().convert_str(source).unwrap();
    assert_eq!(
        deflayer_block(&output.kanata, "base"),
        Some("(deflayer base\n  a b c\n  d e f\n)")
    );
    assert_eq!(output.metadata.global_settings.tap_time_ms, 200);
    assert_eq!(output.metadata.global_settings.hold_time_ms, 250);
}

#[test]
fn test_global_settings_override() {
    let source = r#"
/ {
    tap-time = <300>;
    hold-time = <400>;
    keymap {
        compatible = "zmk,keymap";
        base { bindings = <&kp A>; };
    };
};
"#;
    let output = converter().convert_str(source).unwrap();
    assert!(output.kanata.contains("(defvar\n  tap-time 300\n  hold-time 400\n)"));
    assert_eq!(output.metadata.global_settings.tap_time_ms, 300);
    assert_eq!(output.metadata.global_settings.hold_time_ms, 400);
}

#[test]
fn test_alias_defined_once_across_layers() {
    let source = r#"
/ {
    behaviors {
        hm: homerow_mods {
            compatible = "zmk,behavior-hold-tap";
            #binding-cells = <2>;
            bindings = <&kp>, <&kp>;
        };
    };
    keymap {
        compatible = "zmk,keymap";
        one_layer { bindings = <&hm LCTRL F &kp X>; };
        two_layer { bindings = <&hm LCTRL F &kp Y>; };
        three_layer { bindings = <&hm LCTRL F &kp Z>; };
        four_layer { bindings = <&hm LCTRL F &kp W>; };
    };
};
"#;
    let output = converter().convert_str(source).unwrap();
    assert_eq!(output.kanata.matches("  hm_lctrl_f (").count(), 1);
    assert_eq!(output.kanata.matches("@hm_lctrl_f").count(), 4);
    assert_eq!(output.metadata.stats.aliases, 1);
}

#[test]
fn test_one_bad_binding_among_valid_ones() {
    let source = r#"
/ {
    keymap {
        compatible = "zmk,keymap";
        base {
            bindings = <&kp A &kp B &kp C &nonsense &kp D &kp E>;
        };
    };
};
"#;
    let output = converter().convert_str(source).unwrap();
    let layer = deflayer_block(&output.kanata, "base").unwrap();
    assert!(layer.contains("  a b c XX d e\n"));

    let report = &output.metadata.error_report;
    assert_eq!(report.total, 1);
    let entries: Vec<_> = report.by_component.values().flatten().collect();
    assert_eq!(entries[0].kind, ErrorKind::BindingResolutionError);
    assert!(entries[0].message.contains("&nonsense"));
}

#[test]
fn test_macro_steps_keep_order() {
    let source = r#"
/ {
    macros {
        shifted_a: shifted_a {
            compatible = "zmk,behavior-macro";
            #binding-cells = <0>;
            bindings = <&macro_press &kp LSHIFT>,
                       <&macro_tap &kp A>,
                       <&macro_release &kp LSHIFT>;
        };
    };
    keymap {
        compatible = "zmk,keymap";
        base { bindings = <&shifted_a &kp B>; };
    };
};
"#;
    let output = converter().convert_str(source).unwrap();
    assert!(output
        .kanata
        .contains("(defmacro shifted_a\n  press lsft\n  tap a\n  release lsft\n)"));
    assert!(deflayer_block(&output.kanata, "base")
        .unwrap()
        .contains("@shifted_a b"));
}

#[rstest]
#[case("&kp LC(LS(LALT))", "C-S-lalt")]
#[case("&kp LS(N1)", "S-1")]
#[case("&kp RA(E)", "RA-e")]
fn test_modifier_expressions(#[case] binding: &str, #[case] expected: &str) {
    let source = format!(
        "/ {{ keymap {{ compatible = \"zmk,keymap\"; base {{ bindings = <{binding} &kp Z>; }}; }}; }};"
    );
    let output = converter().convert_str(&source).unwrap();
    let layer = deflayer_block(&output.kanata, "base").unwrap();
    assert!(
        layer.contains(&format!("  {expected} z\n")),
        "expected {expected} in {layer}"
    );
}

#[test]
fn test_empty_modifier_call_is_placeholder() {
    let source = "/ { keymap { compatible = \"zmk,keymap\"; base { bindings = <&kp LS() &kp Z>; }; }; };";
    let output = converter().convert_str(source).unwrap();
    let layer = deflayer_block(&output.kanata, "base").unwrap();
    assert!(layer.contains("  XX z\n"));
    assert!(layer.contains(";; ERROR: malformed or unknown macro"));
    assert!(output.metadata.error_report.count(Severity::Warning) >= 1);
}

#[test]
fn test_firmware_binding_reported_once() {
    let source = "/ { keymap { compatible = \"zmk,keymap\"; base { bindings = <&rgb_ug RGB_COLOR_HSB(128,100,50) &kp Z>; }; }; };";
    let output = converter().convert_str(source).unwrap();
    let layer = deflayer_block(&output.kanata, "base").unwrap();
    assert!(layer.contains("  XX z\n"));

    let report = &output.metadata.error_report;
    assert_eq!(report.total, 1);
    let entries: Vec<_> = report.by_component.values().flatten().collect();
    assert_ne!(entries[0].kind, ErrorKind::MalformedMacro);
}

#[test]
fn test_unterminated_array_names_its_start() {
    let err = converter().convert_str(MALFORMED_KEYMAP).unwrap_err();
    match &err {
        ConversionFailure::Parse(ParseError::UnterminatedArray { line, .. }) => {
            assert_eq!(*line, 6);
        }
        other => panic!("expected an unterminated array, got {other:?}"),
    }
    assert!(err.to_diagnostic().is_some());
}

#[test]
fn test_duplicate_labels_fail() {
    let source = r#"
/ {
    behaviors {
        dup: first { compatible = "zmk,behavior-tap-dance"; bindings = <&kp A>; };
        dup: second { compatible = "zmk,behavior-tap-dance"; bindings = <&kp B>; };
    };
    keymap { compatible = "zmk,keymap"; base { bindings = <&kp A>; }; };
};
"#;
    let err = converter().convert_str(source).unwrap_err();
    assert!(matches!(err, ConversionFailure::Parse(_)));
    assert!(err.to_string().contains("dup"));
}

#[test]
fn test_full_keymap_is_deterministic() {
    let first = converter().convert_str(FULL_KEYMAP).unwrap();
    let second = converter().convert_str(FULL_KEYMAP).unwrap();
    assert_eq!(first.kanata, second.kanata);
    assert_eq!(first.metadata, second.metadata);
}

#[test]
fn test_extract_without_assembly() {
    let extraction = converter().extract_str(FULL_KEYMAP).unwrap();
    assert_eq!(extraction.config.layers.len(), 2);
    assert_eq!(extraction.config.layer_names(), vec!["default", "nav"]);
    assert!(extraction.config.behaviors.contains_key("hm"));
    assert!(extraction.config.behaviors.contains_key("combo_esc"));
}
