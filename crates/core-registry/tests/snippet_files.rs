use core_registry::Registry;
use pretty_assertions::assert_eq;
use std::io::Write;

fn all() -> Vec<String> {
    vec!["all".to_string()]
}

fn expanded(r: &Registry, before: &str) -> Option<String> {
    r.select(before, &all())
        .first()
        .map(|c| c.def.template.skeleton())
}

#[test]
fn load_file_from_disk() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(
        tmp,
        "snippet testsnip \"Test Snippet\" b!\nThis is a test snippet!\nendsnippet\n"
    )
    .unwrap();
    let mut r = Registry::new();
    let diags = r.load_file("all", tmp.path()).unwrap();
    assert!(diags.is_empty());
    assert_eq!(
        expanded(&r, "testsnip").as_deref(),
        Some("This is a test snippet!")
    );
    // `b` only matches at the start of the line.
    assert_eq!(expanded(&r, "x testsnip"), None);
}

#[test]
fn missing_file_is_an_error() {
    let mut r = Registry::new();
    let err = r
        .load_file("all", std::path::Path::new("/definitely/not/here.snippets"))
        .unwrap_err();
    assert!(err.to_string().contains("reading snippet file"));
}

#[test]
fn clearsnippets_without_triggers_clears_everything_so_far() {
    let mut r = Registry::new();
    let diags = r.parse_file(
        "all",
        "test_file",
        "snippet testsnip \"Test snippet\"\nThis is a test.\nendsnippet\n\nclearsnippets\n",
    );
    assert!(diags.is_empty());
    assert_eq!(expanded(&r, "testsnip"), None);
}

#[test]
fn clearsnippets_with_triggers() {
    let src = "snippet testsnip \"Test snippet\"\nThis is a test.\nendsnippet\n\n\
               snippet toclear \"Snippet to clear\"\nDo not expand.\nendsnippet\n\n\
               clearsnippets toclear\n";
    let mut r = Registry::new();
    r.parse_file("all", "test_file", src);
    assert_eq!(expanded(&r, "toclear"), None);
    assert_eq!(expanded(&r, "testsnip").as_deref(), Some("This is a test."));

    let mut r = Registry::new();
    r.parse_file(
        "all",
        "test_file",
        &src.replace("clearsnippets toclear", "clearsnippets testsnip toclear"),
    );
    assert!(r.is_empty());
}

#[test]
fn extends_in_file_links_filetypes() {
    let mut r = Registry::new();
    r.parse_file("c", "c.snippets", "snippet main\nint main() {}\nendsnippet\n");
    let diags = r.parse_file("cpp", "cpp.snippets", "extends c\n");
    assert!(diags.is_empty());
    let c = r.select("main", &["cpp".to_string()]);
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].def.filetype, "c");
}

#[test]
fn diagnostics_keep_going() {
    let mut r = Registry::new();
    let diags = r.parse_file(
        "all",
        "test_file",
        "\nunknown directive\nsnippet ok\nfine\nendsnippet\n",
    );
    assert_eq!(
        diags.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["Invalid line 'unknown directive' in test_file(2)"]
    );
    assert_eq!(expanded(&r, "ok").as_deref(), Some("fine"));
}

#[test]
fn invalid_regex_trigger_in_file_is_reported() {
    let mut r = Registry::new();
    let diags = r.parse_file("all", "f", "snippet |(a| \"bad\" r\nx\nendsnippet\n");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].line, Some(1));
    assert!(r.is_empty());
}
