mod common;
use common::*;

use core_config::Config;
use core_engine::Session;
use pretty_assertions::assert_eq;

#[test]
fn mirror_copies_typed_text() {
    assert_eq!(run(&[("test", "$1\n$1")], &["test", EX, "hallo"]), "hallo\nhallo");
    assert_eq!(
        run(&[("test", "$1\n$1")], &["test", EX, "hallo", BS, BS]),
        "hal\nhal"
    );
    assert_eq!(
        run(&[("test", "$1 ${1:replace me}")], &["test", EX, "hallo foo"]),
        "hallo foo hallo foo"
    );
}

#[test]
fn mirror_shows_default_until_edited() {
    let snippet = [("test", "${1:default} and $1")];
    assert_eq!(run(&snippet, &["test", EX]), "default and default");
    assert_eq!(run(&snippet, &["test", EX, JF, "x"]), "default and defaultx");
}

#[test]
fn later_default_becomes_the_primary() {
    let snippet = [("test", "${1} ${1:dflt}")];
    assert_eq!(run(&snippet, &["test", EX]), "dflt dflt");
    assert_eq!(run(&snippet, &["test", EX, "x"]), "x x");
}

#[test]
fn multiline_mirror() {
    let snippet = [("test", "$1\n$1\n${1:x}")];
    assert_eq!(run(&snippet, &["test", EX, "hallo"]), "hallo\nhallo\nhallo");
    assert_eq!(
        run(&snippet, &["test", EX, "a", "<CR>", "b"]),
        "a\nb\na\nb\na\nb"
    );
}

#[test]
fn mirror_takes_its_own_line_indent() {
    assert_eq!(
        run(&[("test", "$1\n\t$1")], &["test", EX, "a", "<CR>", "b"]),
        "a\nb\n\ta\n\tb"
    );
}

#[test]
fn mirror_of_dead_tabstop_empties() {
    let snippet = [("test", "hi ${1:this ${2:second}} $2")];
    assert_eq!(run(&snippet, &["test", EX]), "hi this second second");
    assert_eq!(run(&snippet, &["test", EX, "Hallo"]), "hi Hallo ");
    assert_eq!(
        run(&snippet, &["test", EX, JF, "Hallo"]),
        "hi this Hallo Hallo"
    );
}

#[test]
fn simple_transformations() {
    let snippet = [("test", "$1 ${1/foo/batzl/}")];
    assert_eq!(
        run(&snippet, &["test", EX, "hallo foo boy"]),
        "hallo foo boy hallo batzl boy"
    );
    assert_eq!(run(&snippet, &["test", EX, "hallo"]), "hallo hallo");
    assert_eq!(
        run(&[("test", "${1/foo/batzl/} ${1:replace me}")], &["test", EX, "hallo foo"]),
        "hallo batzl hallo foo"
    );
}

#[test]
fn case_folding_escapes() {
    assert_eq!(
        run(&[("test", r"${1:name} ${1/(\w+)/\u$1/}")], &["test", EX]),
        "name Name"
    );
    assert_eq!(
        run(&[("test", r"$1 ${1/(.)/\u$1/}")], &["test", EX, "hallo"]),
        "hallo Hallo"
    );
    assert_eq!(
        run(&[("test", r"$1 ${1/(.*)/\l$1/}")], &["test", EX, "Hallo"]),
        "Hallo hallo"
    );
    assert_eq!(
        run(&[("test", r"$1 ${1/(.*)/\U$1\E/}")], &["test", EX, "hallo"]),
        "hallo HALLO"
    );
    assert_eq!(
        run(
            &[("test", "${1:Some Text}${1/.+/\\U$0\\E/}\n${1/.+/\\L$0\\E/}")],
            &["test", EX, "SomE tExt "]
        ),
        "SomE tExt SOME TEXT \nsome text "
    );
}

#[test]
fn backreferences() {
    assert_eq!(
        run(&[("test", "$1 ${1/([ab])oo/$1ull/}")], &["test", EX, "foo boo aoo"]),
        "foo boo aoo foo bull aoo"
    );
    assert_eq!(
        run(
            &[("test", r"$1 ${1/(dead) (par[^ ]*)/this $2 is a bit $1/}")],
            &["test", EX, "dead parrot"]
        ),
        "dead parrot this parrot is a bit dead"
    );
}

#[test]
fn conditional_insertion() {
    assert_eq!(
        run(
            &[("test", "$1 ${1/(^a).*/(?0:began with an a)/}")],
            &["test", EX, "a some more text"]
        ),
        "a some more text began with an a"
    );
    let both = [("test", "$1 ${1/(?:(^a)|(^b)).*/(?1:yes:no)/}")];
    assert_eq!(run(&both, &["test", EX, "b some"]), "b some no");
    assert_eq!(run(&both, &["test", EX, "a some"]), "a some yes");
    assert_eq!(
        run(
            &[("test", r"$1 ${1/hal((?:lo)|(?:ul))/(?1:ha\($1\))/}")],
            &["test", EX, "test, halul"]
        ),
        "test, halul test, ha(ul)"
    );
}

#[test]
fn transformation_flags_and_newlines() {
    assert_eq!(
        run(&[("test", r"$1 ${1/test/blah/i}")], &["test", EX, "TEST"]),
        "TEST blah"
    );
    assert_eq!(
        run(&[("test", r"$1 ${1/, */-/g}")], &["test", EX, "a, nice, building"]),
        "a, nice, building a-nice-building"
    );
    assert_eq!(
        run(&[("test", r"${1} ${1/a/b/g}")], &["test", EX, "aaa"]),
        "aaa bbb"
    );
    assert_eq!(
        run(&[("test", r"$1 ${1/, */\n/}")], &["test", EX, "test, hallo"]),
        "test, hallo test\nhallo"
    );
}

#[test]
fn transformation_next_to_its_tabstop() {
    let snippet = [("test", "${1/.+/is something/}${1:some}")];
    assert_eq!(
        run(&snippet, &["hallo test", EX, "some", BS, BS, BS, BS, "more"]),
        "hallo is somethingmore"
    );
    let snippet = [("test", "${1/.+/is something/}${1}")];
    assert_eq!(run(&snippet, &["hallo test", EX]), "hallo ");
    assert_eq!(run(&snippet, &["hallo test", EX, "b"]), "hallo is somethingb");
}

#[test]
fn transformation_inside_tabstop_default() {
    let snippet = [("test", r"$1 ${2:${1/.+/(?0:defined $0)/}}")];
    assert_eq!(
        run(&snippet, &["test", EX, "sometext", JF]),
        "sometext defined sometext"
    );
    assert_eq!(
        run(&snippet, &["test", EX, "sometext", JF, "overwrite"]),
        "sometext overwrite"
    );
}

#[test]
fn invalid_pattern_keeps_trigger() {
    let mut s = session(&[("test", "$1 ${1/(a/b/}")]);
    s.feed(&["test", EX].concat()).unwrap();
    assert_eq!(s.text(), "test");
    assert_eq!(s.engine().depth(), 0);
    let diagnostics = s.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("test"));
}

#[test]
fn self_feeding_mirror_stops_at_the_pass_limit() {
    let mut config = Config::default();
    config.file.engine.max_propagation_passes = 3;
    let mut s = Session::new(&config, registry(&[("test", "${1:a$1}")])).unwrap();
    s.feed(&["test", EX].concat()).unwrap();
    let text = s.text();
    assert!(text.starts_with('a'));
    assert!(text.chars().all(|c| c == 'a'));
    assert!(text.len() <= 1 << 4, "{text:?}");
    assert_eq!(s.engine().depth(), 1);
}
