mod common;
use common::*;

use core_config::Config;
use core_engine::Session;
use pretty_assertions::assert_eq;

const BRACKETS: (&str, &str) = ("m", "[ ${1:first} ${2:sec} ]");

fn left(n: usize) -> String {
    LEFT.repeat(n)
}

/// Start with "hello  this" and the cursor between the two spaces, ready
/// for a trigger to be typed mid-line.
fn mid_line(snippet: (&str, &str)) -> Session {
    let mut s =
        Session::with_text(&Config::default(), registry(&[snippet]), "hello  this").unwrap();
    s.feed(left(5).as_str()).unwrap();
    s
}

#[test]
fn staying_on_the_child_boundary_keeps_it() {
    assert_eq!(
        run(
            &[BRACKETS],
            &["m", EX, "m", EX, "a", left(3).as_str(), JF, "hallo", JF, "world", JF, "end"]
        ),
        "[ [ a hallo ] world ]end"
    );
}

#[test]
fn leaving_the_child_pops_it() {
    assert_eq!(
        run(&[BRACKETS], &["m", EX, "m", EX, "a", left(4).as_str(), JF, "hallo", JF, "world"]),
        "[ [ a sec ] hallo ]world"
    );
    assert_eq!(
        run(
            &[BRACKETS],
            &["m", EX, "m", EX, "m", EX, "a", left(4).as_str(), JF, "hallo", JF, "world", JF, "end"]
        ),
        "[ [ [ a sec ] hallo ] world ]end"
    );
    assert_eq!(
        run(
            &[BRACKETS],
            &["m", EX, "m", EX, "m", EX, "a", left(6).as_str(), JF, "hallo", JF, "end"]
        ),
        "[ [ [ a sec ] sec ] hallo ]end"
    );
}

#[test]
fn vertical_moves_inside_a_single_line_snippet() {
    assert_eq!(
        run(&[("test", "${1:Some}")], &["test", EX, "text", UP.repeat(3).as_str(), DOWN.repeat(6).as_str()]),
        "text"
    );
}

#[test]
fn moving_within_the_span_keeps_snippet_mode() {
    let mut s = mid_line(("test", "$1 ${2:a tab} ${1:Tab}"));
    s.feed(&["test", EX, "tab", left(7).as_str(), JF, "hallo"].concat()).unwrap();
    assert_eq!(s.text(), "hello tab hallo tab this");

    let mut s = mid_line(("test", "${1:Hi} ${2:blub}"));
    s.feed(&["test", EX, "tab", left(3).as_str(), JF, "hallo"].concat()).unwrap();
    assert_eq!(s.text(), "hello tab hallo this");
}

#[test]
fn moving_outside_exits() {
    let mut s = mid_line(("test", "$1 ${2:blub} ${1:Tab}"));
    s.feed(&["test", EX, "tab", RIGHT].concat()).unwrap();
    assert_eq!(s.engine().depth(), 0);
    s.feed(&[JF, "hallo"].concat()).unwrap();
    assert_eq!(s.text(), "hello tab blub tab hallothis");

    let mut s = mid_line(("test", "${1:Hi} ${2:blub}"));
    s.feed(&["test", EX, "tab", left(4).as_str(), JF, "hallo"].concat()).unwrap();
    assert_eq!(s.text(), "hellohallo tab blub this");
}

#[test]
fn moving_below_exits() {
    let mut s = Session::with_text(
        &Config::default(),
        registry(&[("test", "${1:Hi}\n${2:blub}")]),
        "\nbelow",
    )
    .unwrap();
    s.feed(&[UP, "test", EX, "tab", DOWN].concat()).unwrap();
    assert_eq!(s.engine().depth(), 1);
    s.feed(&[DOWN, JF, "x"].concat()).unwrap();
    assert_eq!(s.text(), "tab\nblub\nbelxow");
}
