mod common;
use common::*;

use core_engine::Session;
use pretty_assertions::assert_eq;

fn run_with(config: &core_config::Config, text: &str, snippets: &[(&str, &str)], keys: &[&str]) -> String {
    let mut s = Session::with_text(config, registry(snippets), text).unwrap();
    s.feed(&keys.concat()).unwrap();
    s.text()
}

#[test]
fn later_lines_inherit_trigger_indent() {
    assert_eq!(
        run(&[("test", "for\n    blah")], &["    test", EX, "Hui"]),
        "    for\n        blahHui"
    );
    assert_eq!(run(&[("test", "hui")], &["    test", EX, "blah"]), "    huiblah");
}

#[test]
fn tab_indented_trigger() {
    let config = core_config::Config::default();
    assert_eq!(
        run_with(
            &config,
            "\t",
            &[("test", "first\nsecond\n\tthird")],
            &["test", EX]
        ),
        "\tfirst\n\tsecond\n\t\tthird"
    );
}

#[test]
fn expandtab_turns_tabs_into_spaces() {
    let config = indent_config(3, 3, true);
    assert_eq!(
        run_with(&config, "", &[("m", "\tBlaahblah \t\t  ")], &["m", EX]),
        "   Blaahblah         "
    );
    assert_eq!(
        run_with(&config, "", &[("m", "a\n\tb\n\t\tc")], &["m", EX]),
        "a\n   b\n      c"
    );
}

#[test]
fn expandtab_rewrites_inherited_tab_indent() {
    let config = indent_config(4, 4, true);
    assert_eq!(
        run_with(&config, "\t", &[("test", "a\n\tb")], &["test", EX]),
        "\ta\n        b"
    );
}

#[test]
fn script_lines_follow_fragment_indent() {
    let snippet = [(
        "test",
        "hi\n`!p snip.rv=\"Hallo1\"\nsnip += \"Hallo2\"\nsnip += \"Hallo3\"`\nEnd",
    )];
    assert_eq!(
        run(&snippet, &["<CR>    test", EX]),
        "\n    hi\n    Hallo1\n    Hallo2\n    Hallo3\n    End"
    );
}

const SHIFTING: &str = "hi\n`!p snip.rv = \"i1\"\nsnip >> 1\nsnip += \"i2\"\nsnip << 2\nsnip += \"i0\"\nsnip >> 1\nsnip += \"i1\"\n`\nEnd";

#[test]
fn script_shifts_with_expandtab() {
    let config = indent_config(8, 3, true);
    assert_eq!(
        run_with(&config, "", &[("test", SHIFTING)], &["   test", EX]),
        "   hi\n   i1\n      i2\ni0\n   i1\n   End"
    );
    assert_eq!(
        run_with(&config, "", &[("test", SHIFTING)], &["    test", EX]),
        "    hi\n    i1\n       i2\n i0\n    i1\n    End"
    );
}

#[test]
fn script_shifts_with_tabs() {
    let config = indent_config(4, 3, false);
    assert_eq!(
        run_with(&config, "", &[("test", SHIFTING)], &["   test", EX]),
        "   hi\n   i1\n\t  i2\ni0\n   i1\n   End"
    );
}
