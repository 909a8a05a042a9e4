//! Shared test fixtures for integration and E2E CLI tests.
#![allow(dead_code)] // Not every suite uses every fixture

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Two layers of plain keys and layer switches, no defined behaviors.
pub const BASIC_KEYMAP: &str = r#"
/ {
    keymap {
        compatible = "zmk,keymap";

        default_layer {
            display-name = "Base";
            bindings = <
                &kp Q &kp W &kp E
                &kp A &mo 1 &kp D
            >;
        };

        nav_layer {
            bindings = <
                &kp LEFT &kp UP &kp RIGHT
                &trans   &trans &none
            >;
        };
    };
};
"#;

/// Hold-tap, tap-dance, macro and combo definitions over two layers.
pub const FULL_KEYMAP: &str = r#"
/ {
    behaviors {
        hm: homerow_mods {
            compatible = "zmk,behavior-hold-tap";
            #binding-cells = <2>;
            flavor = "balanced";
            tapping-term-ms = <200>;
            bindings = <&kp>, <&kp>;
        };

        td_esc: tap_dance_esc {
            compatible = "zmk,behavior-tap-dance";
            #binding-cells = <0>;
            tapping-term-ms = <180>;
            bindings = <&kp ESC>, <&kp TAB>;
        };
    };

    macros {
        hello: hello {
            compatible = "zmk,behavior-macro";
            #binding-cells = <0>;
            bindings = <&kp H &kp I>;
        };
    };

    combos {
        compatible = "zmk,combos";

        combo_esc {
            timeout-ms = <40>;
            key-positions = <0 1>;
            bindings = <&kp ESC>;
        };
    };

    keymap {
        compatible = "zmk,keymap";

        default_layer {
            bindings = <
                &kp Q      &kp W       &kp E
                &hm LGUI A &lt 1 SPACE &td_esc
            >;
        };

        nav_layer {
            bindings = <
                &kp LEFT &kp UP &kp RIGHT
                &hello   &trans &none
            >;
        };
    };
};
"#;

/// One layer with a binding the converter cannot resolve.
pub const UNKNOWN_BEHAVIOR_KEYMAP: &str = r#"
/ {
    keymap {
        compatible = "zmk,keymap";

        default_layer {
            bindings = <&kp A &bogus &kp C>;
        };
    };
};
"#;

/// Structurally broken source (unterminated cell array).
pub const MALFORMED_KEYMAP: &str = r#"
/ {
    keymap {
        compatible = "zmk,keymap";
        default_layer {
            bindings = <&kp A &kp B;
        };
    };
};
"#;

/// Writes `content` to `name` inside a fresh temp directory.
///
/// The directory is removed when the returned `TempDir` is dropped, so keep it
/// alive for as long as the path is used.
pub fn write_temp_file(name: &str, content: &str) -> (PathBuf, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join(name);
    fs::write(&path, content).expect("Failed to write temp file");
    (path, temp_dir)
}

/// Writes a keymap source to `test.keymap` in a temp directory.
pub fn create_temp_keymap(content: &str) -> (PathBuf, TempDir) {
    write_temp_file("test.keymap", content)
}

/// Writes a config file next to nothing else and returns its path.
pub fn create_temp_config(content: &str) -> (PathBuf, TempDir) {
    write_temp_file("config.toml", content)
}

/// Path as a `&str` for `Command::args`.
pub fn arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

/// The `(deflayer name ...)` block of a generated file, including its closing paren.
pub fn deflayer_block<'a>(kanata: &'a str, name: &str) -> Option<&'a str> {
    let start = kanata.find(&format!("(deflayer {name}\n"))?;
    let end = kanata[start..].find("\n)")? + start + 2;
    Some(&kanata[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflayer_block() {
        let text = "(defsrc\n  a\n)\n\n(deflayer base\n  a\n)\n\n(deflayer two\n  b\n)\n";
        assert_eq!(deflayer_block(text, "base"), Some("(deflayer base\n  a\n)"));
        assert_eq!(deflayer_block(text, "two"), Some("(deflayer two\n  b\n)"));
        assert_eq!(deflayer_block(text, "three"), None);
    }

    #[test]
    fn test_temp_keymap_written() {
        let (path, _temp) = create_temp_keymap(BASIC_KEYMAP);
        assert_eq!(fs::read_to_string(path).unwrap(), BASIC_KEYMAP);
    }
}
